//! Text Enhancer Module
//!
//! Optional rephrasing of the baseline summary by a generative-text provider.
//!
//! ## Structure
//! - `passthrough`: identity enhancer, always available
//! - `gemini`: LLM-backed enhancer with strict output validation
//!
//! Enhancers only restyle text. Risk level and the dispatch decision are
//! computed before and independently of them, and every failure falls back
//! to the baseline.

pub mod gemini;
pub mod passthrough;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::triage::composer::BaselineText;
use super::triage::rules::MAX_ENHANCED_BULLETS;
use super::triage::types::{AnomalyRecord, DetectionCounts, MissionContext, MissionSummary, RiskLevel};

pub use gemini::GeminiEnhancer;
pub use passthrough::PassthroughEnhancer;

// ============================================================================
// TYPES
// ============================================================================

/// Everything an enhancer may look at
#[derive(Debug, Clone, Copy)]
pub struct EnhancementInput<'a> {
    pub draft: &'a BaselineText,
    pub risk_level: RiskLevel,
    pub context: &'a MissionContext,
    pub counts: &'a DetectionCounts,
    pub summary: &'a MissionSummary,
    pub records: &'a [AnomalyRecord],
}

/// Text fields an enhancer is allowed to rewrite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnhancedText {
    pub headline: String,
    pub bullets: Vec<String>,
    #[serde(alias = "recommendations")]
    pub recommendation: String,
    #[serde(rename = "whatsapp_message")]
    pub message_draft: String,
}

impl EnhancedText {
    pub fn from_baseline(baseline: &BaselineText) -> Self {
        Self {
            headline: baseline.headline.clone(),
            bullets: baseline.bullets.clone(),
            recommendation: baseline.recommendation.clone(),
            message_draft: baseline.message_draft.clone(),
        }
    }
}

/// Result of an enhancement pass. `enhanced = false` means baseline text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enhancement {
    pub text: EnhancedText,
    pub enhanced: bool,
    /// Provider output as received, kept even when it failed validation
    pub raw: Option<String>,
}

impl Enhancement {
    pub fn baseline(draft: &BaselineText) -> Self {
        Self {
            text: EnhancedText::from_baseline(draft),
            enhanced: false,
            raw: None,
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// Internal enhancer failures. Always recovered, never surfaced to callers.
#[derive(Debug, Error)]
pub enum EnhanceError {
    #[error("network error: {0}")]
    Network(String),
    #[error("provider returned status {0}")]
    Status(u16),
    #[error("provider call timed out after {0}s")]
    Timeout(u64),
    #[error("provider returned no content")]
    EmptyResponse,
    #[error("unparsable provider output: {0}")]
    Parse(String),
    #[error("provider output failed schema check: {0}")]
    Schema(String),
}

// ============================================================================
// TRAIT
// ============================================================================

/// Rephrasing capability. Implementations must not fail: on error they
/// return `Enhancement::baseline`.
#[async_trait]
pub trait TextEnhancer: Send + Sync {
    /// Short name for logs and health output
    fn name(&self) -> &'static str;

    async fn enhance(&self, input: EnhancementInput<'_>) -> Enhancement;
}

// ============================================================================
// OUTPUT VALIDATION
// ============================================================================

/// Parse and validate provider output against the enhanced-text schema.
///
/// Strict JSON first; if that fails, the outermost `{ .. }` span is tried.
pub fn parse_enhanced_text(content: &str) -> Result<EnhancedText, EnhanceError> {
    let parsed = match serde_json::from_str::<EnhancedText>(content.trim()) {
        Ok(text) => text,
        Err(strict_err) => {
            let span = extract_json_object(content).ok_or_else(|| EnhanceError::Parse(strict_err.to_string()))?;
            serde_json::from_str::<EnhancedText>(span).map_err(classify_serde_error)?
        }
    };
    validate(parsed)
}

fn extract_json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end > start).then(|| &content[start..=end])
}

fn classify_serde_error(err: serde_json::Error) -> EnhanceError {
    match err.classify() {
        serde_json::error::Category::Data => EnhanceError::Schema(err.to_string()),
        _ => EnhanceError::Parse(err.to_string()),
    }
}

fn validate(mut text: EnhancedText) -> Result<EnhancedText, EnhanceError> {
    if text.headline.trim().is_empty() {
        return Err(EnhanceError::Schema("headline is blank".into()));
    }
    if text.recommendation.trim().is_empty() {
        return Err(EnhanceError::Schema("recommendation is blank".into()));
    }
    if text.message_draft.trim().is_empty() {
        return Err(EnhanceError::Schema("whatsapp_message is blank".into()));
    }
    text.bullets.retain(|b| !b.trim().is_empty());
    text.bullets.truncate(MAX_ENHANCED_BULLETS);
    Ok(text)
}
