//! Triage Module
//!
//! Turns one mission's detections into a risk level, baseline text and an
//! alert decision.
//!
//! ## Structure
//! - `types`: Core types (RiskLevel, AnomalyRecord, DetectionCounts, etc.)
//! - `rules`: Class partition, thresholds and limits
//! - `classifier`: Risk classification
//! - `composer`: Baseline summary text
//! - `engine`: The end-to-end pipeline
//!
//! ## Usage
//! ```ignore
//! use crate::logic::triage::{classify, ClassPartition, DetectionCounts};
//!
//! let risk = classify(&counts, &ClassPartition::default());
//! if risk.is_alertable() {
//!     // MEDIUM or HIGH
//! }
//! ```

pub mod classifier;
pub mod composer;
pub mod engine;
pub mod rules;
pub mod types;

pub use types::{
    AgentResult,
    AnomalyRecord,
    DetectionCounts,
    DispatchOutcome,
    MissionContext,
    MissionSummary,
    RiskLevel,
    Severity,
};

pub use rules::ClassPartition;

pub use classifier::{classify, classify_totals};
pub use composer::{compose, BaselineText};
pub use engine::{TriageEngine, TriageInput};
