//! Mission wire models

use std::collections::{BTreeSet, HashMap};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::logic::triage::types::{AnomalyRecord, DetectionCounts, MissionContext, MissionSummary};

/// One anomaly as exchanged with clients
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnomalyLogEntry {
    #[validate(length(min = 1, max = 64))]
    pub class_name: String,

    #[validate(range(min = 0.0, max = 1.0))]
    pub confidence: f64,

    #[validate(length(max = 64))]
    #[serde(default = "default_timestamp")]
    pub timestamp: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_bytes_base64: Option<String>,
}

fn default_timestamp() -> String {
    "N/A".to_string()
}

impl AnomalyLogEntry {
    pub fn into_record(self) -> AnomalyRecord {
        let snapshot = self.frame_bytes_base64.and_then(|encoded| match STANDARD.decode(encoded.trim()) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!("Dropping undecodable frame for '{}' at {}: {}", self.class_name, self.timestamp, e);
                None
            }
        });

        AnomalyRecord {
            class_name: self.class_name,
            confidence: self.confidence,
            timestamp: self.timestamp,
            snapshot,
        }
    }

    pub fn from_record(record: &AnomalyRecord) -> Self {
        Self {
            class_name: record.class_name.clone(),
            confidence: record.confidence,
            timestamp: record.timestamp.clone(),
            frame_bytes_base64: record.snapshot.as_ref().map(|bytes| STANDARD.encode(bytes)),
        }
    }
}

/// Validate every entry and convert to domain records
pub fn parse_anomaly_log(entries: Vec<AnomalyLogEntry>) -> AppResult<Vec<AnomalyRecord>> {
    for (i, entry) in entries.iter().enumerate() {
        entry
            .validate()
            .map_err(|e| AppError::ValidationError(format!("anomaly_log[{}]: {}", i, e)))?;
    }
    Ok(entries.into_iter().map(AnomalyLogEntry::into_record).collect())
}

/// Mission metadata fields shared by triage requests
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MissionFields {
    #[validate(length(max = 200))]
    #[serde(default = "default_mission_name")]
    pub mission_name: String,

    #[validate(length(max = 200))]
    #[serde(default = "default_operator_name")]
    pub operator_name: String,

    #[validate(length(max = 100))]
    #[serde(default = "default_vessel_id")]
    pub vessel_id: String,

    #[validate(length(max = 200))]
    #[serde(default = "default_location")]
    pub location: String,

    /// Destination in E.164 format, e.g. +6587654321
    #[validate(length(max = 40))]
    #[serde(default)]
    pub phone: Option<String>,

    /// Attempt an alert when the mission warrants one
    #[serde(default = "default_send_whatsapp")]
    pub send_whatsapp: bool,
}

fn default_mission_name() -> String {
    "Subsea Inspection Mission".to_string()
}

fn default_operator_name() -> String {
    "NautiCAI Operator".to_string()
}

fn default_vessel_id() -> String {
    "ROV-NautiCAI-01".to_string()
}

fn default_location() -> String {
    "Offshore Location".to_string()
}

fn default_send_whatsapp() -> bool {
    true
}

impl MissionFields {
    pub fn into_context(self) -> (MissionContext, bool) {
        let context = MissionContext {
            mission_name: self.mission_name,
            operator_name: self.operator_name,
            vessel_id: self.vessel_id,
            location: self.location,
            phone: self.phone,
        };
        (context, self.send_whatsapp)
    }
}

/// Severity totals as sent by clients (signed, so negatives can be rejected)
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SummaryPayload {
    pub total: i64,
    pub critical: i64,
    pub warnings: i64,
    pub normal: i64,
}

/// Check client-supplied counts against the counts derived from the log
pub fn check_counts(supplied: &HashMap<String, i64>, derived: &DetectionCounts) -> AppResult<()> {
    if let Some((class_name, count)) = supplied.iter().find(|(_, count)| **count < 0) {
        return Err(AppError::ValidationError(format!(
            "det_counts['{}'] is negative ({})",
            class_name, count
        )));
    }

    let classes: BTreeSet<&str> = supplied
        .keys()
        .map(String::as_str)
        .chain(derived.iter().map(|(c, _)| c.as_str()))
        .collect();

    for class_name in classes {
        let claimed = supplied.get(class_name).copied().unwrap_or(0) as u64;
        let actual = derived.get(class_name);
        if claimed != actual {
            return Err(AppError::ValidationError(format!(
                "det_counts['{}'] is {} but anomaly_log has {} records of that class",
                class_name, claimed, actual
            )));
        }
    }
    Ok(())
}

/// Check a client-supplied summary against the log
pub fn check_summary(supplied: &SummaryPayload, record_count: usize, derived: &MissionSummary) -> AppResult<()> {
    let fields = [
        ("total", supplied.total, derived.total),
        ("critical", supplied.critical, derived.critical),
        ("warnings", supplied.warnings, derived.warnings),
        ("normal", supplied.normal, derived.normal),
    ];

    if let Some((name, value, _)) = fields.iter().find(|(_, value, _)| *value < 0) {
        return Err(AppError::ValidationError(format!("summary.{} is negative ({})", name, value)));
    }

    if supplied.total as u64 != record_count as u64 {
        return Err(AppError::ValidationError(format!(
            "summary.total ({}) does not match anomaly_log length ({})",
            supplied.total, record_count
        )));
    }

    if let Some((name, value, expected)) = fields.iter().find(|(_, value, expected)| *value as u64 != *expected) {
        return Err(AppError::ValidationError(format!(
            "summary.{} is {} but anomaly_log implies {}",
            name, value, expected
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::triage::rules::ClassPartition;

    fn entry(class_name: &str, confidence: f64) -> AnomalyLogEntry {
        AnomalyLogEntry {
            class_name: class_name.into(),
            confidence,
            timestamp: "00:01".into(),
            frame_bytes_base64: None,
        }
    }

    #[test]
    fn test_snapshot_decoding() {
        let mut e = entry("damage", 0.9);
        e.frame_bytes_base64 = Some(STANDARD.encode([0xffu8, 0xd8, 0xff]));
        assert_eq!(e.into_record().snapshot, Some(vec![0xff, 0xd8, 0xff]));

        let mut bad = entry("damage", 0.9);
        bad.frame_bytes_base64 = Some("***not base64***".into());
        assert_eq!(bad.into_record().snapshot, None);
    }

    #[test]
    fn test_record_roundtrip_keeps_snapshot() {
        let record = AnomalyRecord::new("debris", 0.4, "01:02").with_snapshot(vec![1, 2, 3]);
        let back = AnomalyLogEntry::from_record(&record).into_record();
        assert_eq!(back, record);
    }

    #[test]
    fn test_confidence_out_of_range_rejected() {
        let err = parse_anomaly_log(vec![entry("damage", 0.5), entry("damage", 1.5)]).unwrap_err();
        assert!(err.to_string().starts_with("anomaly_log[1]"));
    }

    #[test]
    fn test_empty_class_name_rejected() {
        assert!(parse_anomaly_log(vec![entry("", 0.5)]).is_err());
    }

    #[test]
    fn test_check_counts() {
        let records = parse_anomaly_log(vec![entry("damage", 0.5), entry("debris", 0.5)]).unwrap();
        let derived = DetectionCounts::from_records(&records);

        let ok: HashMap<String, i64> = [("damage".to_string(), 1), ("debris".to_string(), 1), ("anode".to_string(), 0)]
            .into_iter()
            .collect();
        assert!(check_counts(&ok, &derived).is_ok());

        let negative: HashMap<String, i64> = [("damage".to_string(), -1)].into_iter().collect();
        assert!(check_counts(&negative, &derived).unwrap_err().to_string().contains("negative"));

        let inflated: HashMap<String, i64> = [("damage".to_string(), 3), ("debris".to_string(), 1)].into_iter().collect();
        assert!(check_counts(&inflated, &derived).is_err());
    }

    #[test]
    fn test_check_summary() {
        let records = parse_anomaly_log(vec![entry("damage", 0.5), entry("healthy", 0.5)]).unwrap();
        let derived = MissionSummary::from_counts(&DetectionCounts::from_records(&records), &ClassPartition::default());

        let good = SummaryPayload { total: 2, critical: 1, warnings: 0, normal: 1 };
        assert!(check_summary(&good, records.len(), &derived).is_ok());

        let wrong_total = SummaryPayload { total: 3, ..good };
        assert!(check_summary(&wrong_total, records.len(), &derived)
            .unwrap_err()
            .to_string()
            .contains("does not match anomaly_log length"));

        let negative = SummaryPayload { warnings: -1, ..good };
        assert!(check_summary(&negative, records.len(), &derived).unwrap_err().to_string().contains("negative"));

        let shifted = SummaryPayload { critical: 0, normal: 2, ..good };
        assert!(check_summary(&shifted, records.len(), &derived).is_err());
    }
}
