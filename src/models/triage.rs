//! Mission summary request / response

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::mission::{check_counts, check_summary, parse_anomaly_log, AnomalyLogEntry, MissionFields, SummaryPayload};
use crate::error::AppResult;
use crate::logic::triage::rules::ClassPartition;
use crate::logic::triage::types::{AgentResult, DetectionCounts, DispatchOutcome, MissionSummary, RiskLevel};
use crate::logic::triage::TriageInput;

#[derive(Debug, Deserialize)]
pub struct MissionSummaryRequest {
    #[serde(default)]
    pub anomaly_log: Vec<AnomalyLogEntry>,

    /// Optional, must match `anomaly_log` when present
    #[serde(default)]
    pub det_counts: Option<HashMap<String, i64>>,

    /// Optional, must match `anomaly_log` when present
    #[serde(default)]
    pub summary: Option<SummaryPayload>,

    #[serde(flatten)]
    pub mission: MissionFields,
}

impl MissionSummaryRequest {
    /// Validate shape and consistency, then build engine input
    pub fn into_input(self, partition: &ClassPartition) -> AppResult<TriageInput> {
        self.mission.validate()?;

        let records = parse_anomaly_log(self.anomaly_log)?;
        let counts = DetectionCounts::from_records(&records);
        let summary = MissionSummary::from_counts(&counts, partition);

        if let Some(supplied) = &self.det_counts {
            check_counts(supplied, &counts)?;
        }
        if let Some(supplied) = &self.summary {
            check_summary(supplied, records.len(), &summary)?;
        }

        let (context, send_requested) = self.mission.into_context();
        Ok(TriageInput {
            records,
            counts,
            summary,
            context,
            send_requested,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct MissionSummaryResponse {
    pub risk_level: RiskLevel,
    pub headline: String,
    pub bullets: Vec<String>,
    pub highlights: Vec<String>,
    pub recommendations: String,
    pub whatsapp_message: String,
    pub whatsapp: DispatchOutcome,
    pub llm_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_raw: Option<String>,
}

impl From<AgentResult> for MissionSummaryResponse {
    fn from(result: AgentResult) -> Self {
        Self {
            risk_level: result.risk_level,
            headline: result.headline,
            bullets: result.bullets,
            highlights: result.highlights,
            recommendations: result.recommendation,
            whatsapp_message: result.message_draft,
            whatsapp: result.dispatch,
            llm_used: result.enhanced,
            llm_raw: result.llm_raw,
        }
    }
}
