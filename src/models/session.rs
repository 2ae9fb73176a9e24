//! Session request / response models

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::mission::{AnomalyLogEntry, MissionFields};
use crate::logic::session::SessionSnapshot;
use crate::logic::triage::types::{DetectionCounts, MissionSummary};

/// Body of create / replace
#[derive(Debug, Deserialize)]
pub struct SessionLogRequest {
    #[serde(default)]
    pub anomaly_log: Vec<AnomalyLogEntry>,
}

#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    pub anomaly_log: Vec<AnomalyLogEntry>,
    /// Apply the smart-log filter
    #[serde(default)]
    pub dedupe: bool,
}

/// Triage the stored records with this mission context
#[derive(Debug, Deserialize)]
pub struct SessionTriageRequest {
    #[serde(flatten)]
    pub mission: MissionFields,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: Uuid,
    pub anomaly_log: Vec<AnomalyLogEntry>,
    pub det_counts: DetectionCounts,
    pub summary: MissionSummary,
    /// Records kept by a merge
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted: Option<usize>,
}

impl SessionResponse {
    pub fn new(id: Uuid, snapshot: SessionSnapshot) -> Self {
        Self {
            id,
            anomaly_log: snapshot.records.iter().map(AnomalyLogEntry::from_record).collect(),
            det_counts: snapshot.counts,
            summary: snapshot.summary,
            accepted: None,
        }
    }

    pub fn with_accepted(mut self, accepted: usize) -> Self {
        self.accepted = Some(accepted);
        self
    }
}
