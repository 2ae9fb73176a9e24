//! Triage Engine
//!
//! Stateless pipeline for one mission:
//! classify -> compose -> enhance (fallible, recovered) -> dispatch (fallible, reported)

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::classifier::classify;
use super::composer::compose;
use super::rules::ClassPartition;
use super::types::{AgentResult, AnomalyRecord, DetectionCounts, MissionContext, MissionSummary};
use crate::config::Config;
use crate::logic::dispatch::{DispatchRequest, MessagingProvider, NotificationDispatcher, TwilioWhatsApp};
use crate::logic::enhancer::{Enhancement, EnhancementInput, GeminiEnhancer, PassthroughEnhancer, TextEnhancer};

/// Validated input for one triage call
#[derive(Debug, Clone)]
pub struct TriageInput {
    pub records: Vec<AnomalyRecord>,
    pub counts: DetectionCounts,
    pub summary: MissionSummary,
    pub context: MissionContext,
    pub send_requested: bool,
}

#[derive(Clone)]
pub struct TriageEngine {
    partition: ClassPartition,
    enhancer: Arc<dyn TextEnhancer>,
    dispatcher: NotificationDispatcher,
}

impl TriageEngine {
    pub fn new(partition: ClassPartition, enhancer: Arc<dyn TextEnhancer>, dispatcher: NotificationDispatcher) -> Self {
        Self {
            partition,
            enhancer,
            dispatcher,
        }
    }

    /// Wire providers from configuration. Missing or broken credentials
    /// degrade to passthrough text and no messaging.
    pub fn from_config(config: &Config) -> Self {
        let enhancer: Arc<dyn TextEnhancer> = match &config.gemini {
            Some(gemini) => match GeminiEnhancer::new(gemini.clone(), config.enhancer_timeout) {
                Ok(enhancer) => Arc::new(enhancer),
                Err(e) => {
                    tracing::warn!("Gemini enhancer unavailable, using passthrough: {}", e);
                    Arc::new(PassthroughEnhancer)
                }
            },
            None => {
                tracing::warn!("GEMINI_API_KEY not set, LLM enhancement disabled");
                Arc::new(PassthroughEnhancer)
            }
        };

        let provider: Option<Arc<dyn MessagingProvider>> = match &config.twilio {
            Some(twilio) => match TwilioWhatsApp::new(twilio.clone(), config.dispatch_timeout) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    tracing::warn!("Twilio client unavailable, alerts disabled: {}", e);
                    None
                }
            },
            None => {
                tracing::warn!("Twilio WhatsApp not configured, alerts disabled");
                None
            }
        };

        Self::new(
            config.partition.clone(),
            enhancer,
            NotificationDispatcher::new(provider, config.dispatch_timeout),
        )
    }

    pub fn partition(&self) -> &ClassPartition {
        &self.partition
    }

    pub fn enhancer_name(&self) -> &'static str {
        self.enhancer.name()
    }

    pub fn messaging_enabled(&self) -> bool {
        self.dispatcher.is_enabled()
    }

    /// Triage one mission. Never fails: provider problems show up as
    /// `enhanced = false` or in `dispatch`.
    pub async fn triage(&self, input: &TriageInput, cancel: &CancellationToken) -> AgentResult {
        let risk_level = classify(&input.counts, &self.partition);
        let baseline = compose(
            &input.records,
            &input.counts,
            &input.summary,
            risk_level,
            &input.context,
            &self.partition,
        );

        let enhancement_input = EnhancementInput {
            draft: &baseline,
            risk_level,
            context: &input.context,
            counts: &input.counts,
            summary: &input.summary,
            records: &input.records,
        };

        let enhancement = tokio::select! {
            biased;
            _ = cancel.cancelled() => Enhancement::baseline(&baseline),
            enhancement = self.enhancer.enhance(enhancement_input) => enhancement,
        };

        let dispatch = self
            .dispatcher
            .dispatch(
                DispatchRequest {
                    risk_level,
                    total: input.summary.total,
                    phone: input.context.phone.as_deref(),
                    send_requested: input.send_requested,
                    message: &enhancement.text.message_draft,
                },
                cancel,
            )
            .await;

        tracing::info!(
            risk_level = %risk_level,
            total = input.summary.total,
            enhanced = enhancement.enhanced,
            dispatch_attempted = dispatch.attempted,
            dispatch_sent = dispatch.sent,
            "Mission '{}' triaged",
            input.context.mission_name
        );

        let text = enhancement.text;
        AgentResult {
            risk_level,
            headline: text.headline,
            bullets: text.bullets,
            highlights: baseline.highlights,
            recommendation: text.recommendation,
            message_draft: text.message_draft,
            enhanced: enhancement.enhanced,
            llm_raw: enhancement.raw,
            dispatch,
        }
    }
}
