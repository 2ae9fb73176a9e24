//! Triage Types
//!
//! Core data structures for mission triage.
//! No logic beyond aggregation helpers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::rules::ClassPartition;

// ============================================================================
// RISK LEVEL
// ============================================================================

/// Coarse mission severity, always recomputed from detection counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::None => "NONE",
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }

    /// Levels that warrant pushing an operator alert
    pub fn is_alertable(&self) -> bool {
        matches!(self, RiskLevel::Medium | RiskLevel::High)
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// SEVERITY
// ============================================================================

/// Per-class severity bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    Warning,
    Normal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::Warning => "WARNING",
            Severity::Normal => "NORMAL",
        }
    }
}

// ============================================================================
// ANOMALY RECORD
// ============================================================================

/// One detection produced by the vision pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyRecord {
    pub class_name: String,
    /// 0.0 - 1.0
    pub confidence: f64,
    pub timestamp: String,
    /// Annotated frame, opaque to the triage core
    pub snapshot: Option<Vec<u8>>,
}

impl AnomalyRecord {
    pub fn new(class_name: impl Into<String>, confidence: f64, timestamp: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            confidence,
            timestamp: timestamp.into(),
            snapshot: None,
        }
    }

    pub fn with_snapshot(mut self, snapshot: Vec<u8>) -> Self {
        self.snapshot = Some(snapshot);
        self
    }
}

// ============================================================================
// DETECTION COUNTS
// ============================================================================

/// Count of records per class. Derived, never hand-edited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionCounts(BTreeMap<String, u64>);

impl DetectionCounts {
    pub fn from_records(records: &[AnomalyRecord]) -> Self {
        let mut counts = BTreeMap::new();
        for record in records {
            *counts.entry(record.class_name.clone()).or_insert(0) += 1;
        }
        Self(counts)
    }

    pub fn get(&self, class_name: &str) -> u64 {
        self.0.get(class_name).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &u64)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Sum of counts over the given classes
    pub fn sum_of(&self, classes: &[String]) -> u64 {
        classes.iter().map(|c| self.get(c)).sum()
    }
}

impl FromIterator<(String, u64)> for DetectionCounts {
    fn from_iter<T: IntoIterator<Item = (String, u64)>>(iter: T) -> Self {
        let mut counts = BTreeMap::new();
        for (class_name, count) in iter {
            *counts.entry(class_name).or_insert(0) += count;
        }
        Self(counts)
    }
}

// ============================================================================
// MISSION SUMMARY
// ============================================================================

/// Severity totals. Invariant: `total = critical + warnings + normal`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionSummary {
    pub total: u64,
    pub critical: u64,
    pub warnings: u64,
    pub normal: u64,
}

impl MissionSummary {
    pub fn from_counts(counts: &DetectionCounts, partition: &ClassPartition) -> Self {
        let critical = counts.sum_of(&partition.critical);
        let warnings = counts.sum_of(&partition.warning);
        let total = counts.total();
        Self {
            total,
            critical,
            warnings,
            normal: total - critical - warnings,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.critical + self.warnings + self.normal == self.total
    }
}

// ============================================================================
// MISSION CONTEXT
// ============================================================================

/// Per-request mission metadata. Not persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionContext {
    pub mission_name: String,
    pub operator_name: String,
    pub vessel_id: String,
    pub location: String,
    pub phone: Option<String>,
}

// ============================================================================
// RESULTS
// ============================================================================

/// Outcome of the notification step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub attempted: bool,
    pub sent: bool,
    pub info: String,
}

impl DispatchOutcome {
    pub fn skipped(info: impl Into<String>) -> Self {
        Self {
            attempted: false,
            sent: false,
            info: info.into(),
        }
    }

    pub fn sent(message_id: impl Into<String>) -> Self {
        Self {
            attempted: true,
            sent: true,
            info: message_id.into(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            attempted: true,
            sent: false,
            info: error.into(),
        }
    }
}

/// Full triage result for one mission
#[derive(Debug, Clone, PartialEq)]
pub struct AgentResult {
    pub risk_level: RiskLevel,
    pub headline: String,
    pub bullets: Vec<String>,
    pub highlights: Vec<String>,
    pub recommendation: String,
    pub message_draft: String,
    pub enhanced: bool,
    /// Unvalidated enhancer output, for debugging
    pub llm_raw: Option<String>,
    pub dispatch: DispatchOutcome,
}
