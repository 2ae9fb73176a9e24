//! Gemini Enhancer
//!
//! Asks Google Gemini to rephrase the mission summary. The response is
//! constrained to a JSON schema and validated again locally before use.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{parse_enhanced_text, EnhanceError, EnhancedText, Enhancement, EnhancementInput, TextEnhancer};
use crate::config::GeminiConfig;

const SYSTEM_PROMPT: &str = "You are an underwater inspection mission assistant. \
Given structured detection data from hull/pipeline missions, you must:\n\
1) Explain the mission risk level briefly.\n\
2) Summarize the most important anomalies for an ROV/AUV operator.\n\
3) Provide clear, concise next-step recommendations.\n\
4) Generate a short WhatsApp-friendly alert message.\n\
Respond strictly in compact JSON with keys: headline (string), bullets (array of strings), \
recommendation (string), whatsapp_message (string).\n\n\
The whatsapp_message MUST follow this structure:\n\
  - First line: \"Hey <operator_name>, we found <short risk summary>.\"\n\
  - Then a blank line.\n\
  - One line: \"Mission: <mission_name>\".\n\
  - One line: \"Vessel/ROV: <vessel_id>\".\n\
  - One line: \"Location: <location>\".\n\
  - Blank line.\n\
  - One line: \"Detections: total=<total>, critical=<critical>, warnings=<warnings>.\".\n\
  - At most 3 key findings, one per line, starting with \"- \".\n\
  - Final line starting with \"Recommendation:\" and a concise action item.\n\
Do not wrap the message in backticks or quotes. Keep it under 8 lines total. \
Never change the risk level you are given.";

/// One anomaly as shown to the model (no frame data)
#[derive(Debug, Serialize)]
struct PromptRecord<'a> {
    class_name: &'a str,
    confidence: f64,
    timestamp: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// LLM-backed enhancer
pub struct GeminiEnhancer {
    config: GeminiConfig,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl GeminiEnhancer {
    pub fn new(config: GeminiConfig, timeout: Duration) -> Result<Self, EnhanceError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EnhanceError::Network(e.to_string()))?;

        Ok(Self {
            config,
            timeout,
            http_client,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn request_body(&self, input: &EnhancementInput<'_>) -> Value {
        let excerpt: Vec<PromptRecord<'_>> = input
            .records
            .iter()
            .take(self.config.log_excerpt)
            .map(|r| PromptRecord {
                class_name: &r.class_name,
                confidence: r.confidence,
                timestamp: &r.timestamp,
            })
            .collect();

        let payload = json!({
            "risk_level": input.risk_level,
            "mission_name": input.context.mission_name,
            "vessel_id": input.context.vessel_id,
            "location": input.context.location,
            "operator_name": input.context.operator_name,
            "anomaly_log": excerpt,
            "det_counts": input.counts,
            "summary": input.summary,
            "base_headline": input.draft.headline,
            "base_bullets": input.draft.bullets,
            "base_recommendation": input.draft.recommendation,
            "base_whatsapp_message": input.draft.message_draft,
        });

        let user_prompt = format!(
            "Here is the mission data in JSON format:\n{}\n\n\
             Rewrite headline, bullets, recommendation and especially whatsapp_message to match the structure \
             described above. Use operator_name, mission_name, vessel_id, location, summary.total, \
             summary.critical and summary.warnings when constructing the message. Return only JSON.",
            serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string())
        );

        json!({
            "systemInstruction": { "parts": [{ "text": SYSTEM_PROMPT }] },
            "contents": [{ "role": "user", "parts": [{ "text": user_prompt }] }],
            "generationConfig": {
                "temperature": self.config.temperature,
                "maxOutputTokens": self.config.max_output_tokens,
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
            }
        })
    }

    /// Call the provider and return the first candidate's text
    async fn fetch_text(&self, input: &EnhancementInput<'_>) -> Result<String, EnhanceError> {
        let response = self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&self.request_body(input))
            .send()
            .await
            .map_err(|e| EnhanceError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EnhanceError::Status(response.status().as_u16()));
        }

        let body: GenerateContentResponse =
            response.json().await.map_err(|e| EnhanceError::Parse(e.to_string()))?;

        first_text(&body).map(str::to_string)
    }
}

#[async_trait]
impl TextEnhancer for GeminiEnhancer {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn enhance(&self, input: EnhancementInput<'_>) -> Enhancement {
        let fetched = match tokio::time::timeout(self.timeout, self.fetch_text(&input)).await {
            Ok(result) => result,
            Err(_) => Err(EnhanceError::Timeout(self.timeout.as_secs())),
        };

        let (raw, result) = match fetched {
            Ok(content) => {
                let parsed = parse_enhanced_text(&content);
                (Some(content), parsed)
            }
            Err(e) => (None, Err(e)),
        };

        match result {
            Ok(text) => {
                tracing::debug!("Gemini enhancement accepted ({} bullets)", text.bullets.len());
                Enhancement {
                    text,
                    enhanced: true,
                    raw,
                }
            }
            Err(e) => {
                tracing::warn!("Gemini enhancement discarded, using baseline: {}", e);
                Enhancement {
                    raw,
                    ..Enhancement::baseline(input.draft)
                }
            }
        }
    }
}

/// JSON schema the model output is constrained to
fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "headline": { "type": "STRING" },
            "bullets": { "type": "ARRAY", "items": { "type": "STRING" } },
            "recommendation": { "type": "STRING" },
            "whatsapp_message": { "type": "STRING" },
        },
        "required": ["headline", "bullets", "recommendation", "whatsapp_message"],
        "propertyOrdering": ["headline", "bullets", "recommendation", "whatsapp_message"],
    })
}

fn first_text(body: &GenerateContentResponse) -> Result<&str, EnhanceError> {
    body.candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .and_then(|c| c.parts.first())
        .and_then(|p| p.text.as_deref())
        .filter(|t| !t.trim().is_empty())
        .ok_or(EnhanceError::EmptyResponse)
}
