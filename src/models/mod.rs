//! Wire models

pub mod mission;
pub mod session;
pub mod triage;

pub use mission::{AnomalyLogEntry, MissionFields, SummaryPayload};
pub use session::{MergeRequest, SessionLogRequest, SessionResponse, SessionTriageRequest};
pub use triage::{MissionSummaryRequest, MissionSummaryResponse};
