//! Triage Rules & Class Partition
//!
//! Constants and the class partition used by the classifier and composer.
//! No classification logic lives here.

use serde::{Deserialize, Serialize};

use super::types::Severity;

// ============================================================================
// DEFAULT CLASS PARTITION
// ============================================================================

/// Classes that indicate structural risk
pub const DEFAULT_CRITICAL_CLASSES: &[&str] = &["corrosion", "damage", "free_span"];

/// Classes that need follow-up but are not structural
pub const DEFAULT_WARNING_CLASSES: &[&str] = &["marine_growth", "debris"];

/// Known neutral classes (reported by the detector, never raise risk)
pub const DEFAULT_NORMAL_CLASSES: &[&str] = &["healthy", "anode"];

// ============================================================================
// RISK THRESHOLDS
// ============================================================================

/// Critical findings at or above this count = HIGH
pub const HIGH_CRITICAL_MIN: u64 = 2;

/// Warning findings at or above this count escalate one critical to HIGH,
/// or zero criticals to MEDIUM
pub const WARNING_ESCALATION_MIN: u64 = 3;

// ============================================================================
// COMPOSER LIMITS
// ============================================================================

/// Max timeline highlights in a summary
pub const MAX_HIGHLIGHTS: usize = 4;

/// Max bullets accepted from an enhancer
pub const MAX_ENHANCED_BULLETS: usize = 6;

// ============================================================================
// SMART LOG
// ============================================================================

/// Minimum confidence gap for a repeated class to be logged again
pub const DIFF_THRESHOLD: f64 = 0.50;

// ============================================================================
// CLASS PARTITION
// ============================================================================

/// Fixed partition of detector classes into critical / warning / neutral.
///
/// Order matters: it is the tie-break priority for summary bullets
/// (critical classes in listed order, then warning classes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassPartition {
    pub critical: Vec<String>,
    pub warning: Vec<String>,
}

impl Default for ClassPartition {
    fn default() -> Self {
        Self {
            critical: DEFAULT_CRITICAL_CLASSES.iter().map(|c| c.to_string()).collect(),
            warning: DEFAULT_WARNING_CLASSES.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl ClassPartition {
    /// Repeated names are kept once, in first-seen order. A class listed
    /// as both critical and warning stays critical.
    pub fn new(critical: Vec<String>, warning: Vec<String>) -> Self {
        let critical = dedup_in_order(critical, &[]);
        let warning = dedup_in_order(warning, &critical);
        Self { critical, warning }
    }

    pub fn severity_of(&self, class_name: &str) -> Severity {
        if self.critical.iter().any(|c| c == class_name) {
            Severity::Critical
        } else if self.warning.iter().any(|c| c == class_name) {
            Severity::Warning
        } else {
            Severity::Normal
        }
    }

    /// Position in the bullet priority list, `None` for neutral classes
    pub fn priority_of(&self, class_name: &str) -> Option<usize> {
        self.critical
            .iter()
            .chain(self.warning.iter())
            .position(|c| c == class_name)
    }

    /// Every class the partition knows about, plus the default neutral ones
    pub fn known_classes(&self) -> Vec<String> {
        let mut classes: Vec<String> = self.critical.iter().chain(self.warning.iter()).cloned().collect();
        for normal in DEFAULT_NORMAL_CLASSES {
            if !classes.iter().any(|c| c == normal) {
                classes.push(normal.to_string());
            }
        }
        classes
    }
}

fn dedup_in_order(classes: Vec<String>, excluded: &[String]) -> Vec<String> {
    let mut kept: Vec<String> = Vec::with_capacity(classes.len());
    for class_name in classes {
        if !excluded.contains(&class_name) && !kept.contains(&class_name) {
            kept.push(class_name);
        }
    }
    kept
}
