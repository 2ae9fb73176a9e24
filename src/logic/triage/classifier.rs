//! Risk Classifier
//!
//! Classification logic only - no types, no composition.
//! Input: DetectionCounts, ClassPartition
//! Output: RiskLevel

use super::rules::{ClassPartition, HIGH_CRITICAL_MIN, WARNING_ESCALATION_MIN};
use super::types::{DetectionCounts, RiskLevel};

/// Main classification function
///
/// Pure and total: every set of counts maps to exactly one level.
pub fn classify(counts: &DetectionCounts, partition: &ClassPartition) -> RiskLevel {
    let critical = counts.sum_of(&partition.critical);
    let warnings = counts.sum_of(&partition.warning);
    classify_totals(critical, warnings, counts.total())
}

/// Classification from pre-aggregated totals
pub fn classify_totals(critical: u64, warnings: u64, total: u64) -> RiskLevel {
    if critical >= HIGH_CRITICAL_MIN || (critical == 1 && warnings >= WARNING_ESCALATION_MIN) {
        RiskLevel::High
    } else if critical == 1 || warnings >= WARNING_ESCALATION_MIN {
        RiskLevel::Medium
    } else if total > 0 {
        RiskLevel::Low
    } else {
        RiskLevel::None
    }
}
