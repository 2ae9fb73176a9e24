//! Mission Session Aggregator
//!
//! Owns the anomaly records of the active detection run. Counts and the
//! severity summary are rebuilt from the record list after every mutation,
//! never patched in place.

pub mod store;

use thiserror::Error;

use super::triage::rules::{ClassPartition, DIFF_THRESHOLD};
use super::triage::types::{AnomalyRecord, DetectionCounts, MissionSummary};

pub use store::SessionStore;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("record index {index} out of range (session has {len} records)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Derived aggregates of a record list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionAggregates {
    pub counts: DetectionCounts,
    pub summary: MissionSummary,
}

impl SessionAggregates {
    /// Single pass over the records. Idempotent by construction.
    pub fn recompute(records: &[AnomalyRecord], partition: &ClassPartition) -> Self {
        let counts = DetectionCounts::from_records(records);
        let summary = MissionSummary::from_counts(&counts, partition);
        Self { counts, summary }
    }
}

/// Point-in-time copy of a session, safe to use without holding its lock
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub records: Vec<AnomalyRecord>,
    pub counts: DetectionCounts,
    pub summary: MissionSummary,
}

#[derive(Debug, Clone)]
pub struct MissionSession {
    partition: ClassPartition,
    records: Vec<AnomalyRecord>,
    aggregates: SessionAggregates,
}

impl MissionSession {
    pub fn new(partition: ClassPartition) -> Self {
        Self {
            partition,
            records: Vec::new(),
            aggregates: SessionAggregates::default(),
        }
    }

    pub fn with_records(partition: ClassPartition, records: Vec<AnomalyRecord>) -> Self {
        let mut session = Self::new(partition);
        session.new_run(records);
        session
    }

    /// Start a new detection run, replacing every record
    pub fn new_run(&mut self, records: Vec<AnomalyRecord>) {
        self.records = records;
        self.refresh();
    }

    /// Append a batch that belongs to the current run
    pub fn merge(&mut self, records: Vec<AnomalyRecord>) {
        self.records.extend(records);
        self.refresh();
    }

    /// Append only records that pass the smart-log filter, returns how many were kept.
    ///
    /// A record is kept when its class has not been logged yet, or when its
    /// confidence differs from every logged confidence of that class by at
    /// least `DIFF_THRESHOLD`. Accepted records count for later ones in the
    /// same batch.
    pub fn merge_deduplicated(&mut self, records: Vec<AnomalyRecord>) -> usize {
        let mut accepted = 0;
        for record in records {
            let is_different = self
                .records
                .iter()
                .filter(|r| r.class_name == record.class_name)
                .all(|r| (record.confidence - r.confidence).abs() >= DIFF_THRESHOLD);
            if is_different {
                self.records.push(record);
                accepted += 1;
            }
        }
        self.refresh();
        accepted
    }

    /// Remove one record and rebuild the aggregates
    pub fn remove_at(&mut self, index: usize) -> Result<AnomalyRecord, SessionError> {
        if index >= self.records.len() {
            return Err(SessionError::IndexOutOfRange {
                index,
                len: self.records.len(),
            });
        }
        let removed = self.records.remove(index);
        self.refresh();
        Ok(removed)
    }

    pub fn reset(&mut self) {
        self.records.clear();
        self.refresh();
    }

    pub fn records(&self) -> &[AnomalyRecord] {
        &self.records
    }

    pub fn counts(&self) -> &DetectionCounts {
        &self.aggregates.counts
    }

    pub fn summary(&self) -> &MissionSummary {
        &self.aggregates.summary
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            records: self.records.clone(),
            counts: self.aggregates.counts.clone(),
            summary: self.aggregates.summary,
        }
    }

    fn refresh(&mut self) {
        self.aggregates = SessionAggregates::recompute(&self.records, &self.partition);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run() -> Vec<AnomalyRecord> {
        vec![
            AnomalyRecord::new("damage", 0.91, "00:01"),
            AnomalyRecord::new("marine_growth", 0.55, "00:03"),
            AnomalyRecord::new("marine_growth", 0.62, "00:07"),
            AnomalyRecord::new("healthy", 0.80, "00:09"),
        ]
    }

    fn session() -> MissionSession {
        MissionSession::with_records(ClassPartition::default(), run())
    }

    fn assert_exact(session: &MissionSession) {
        let expected = SessionAggregates::recompute(session.records(), &ClassPartition::default());
        assert_eq!(session.counts(), &expected.counts);
        assert_eq!(session.summary(), &expected.summary);
        assert_eq!(session.summary().total as usize, session.len());
        assert!(session.summary().is_consistent());
    }

    #[test]
    fn test_aggregates_follow_records() {
        let s = session();
        assert_eq!(s.summary(), &MissionSummary { total: 4, critical: 1, warnings: 2, normal: 1 });
        assert_eq!(s.counts().get("marine_growth"), 2);
        assert_exact(&s);
    }

    #[test]
    fn test_recompute_idempotent() {
        let s = session();
        let once = SessionAggregates::recompute(s.records(), &ClassPartition::default());
        let twice = SessionAggregates::recompute(s.records(), &ClassPartition::default());
        assert_eq!(once, twice);
        assert_eq!(&once.counts, s.counts());
    }

    #[test]
    fn test_remove_decrements_only_removed_class() {
        let mut s = session();
        let before_counts = s.counts().clone();
        let before_total = s.summary().total;

        let removed = s.remove_at(1).unwrap();
        assert_eq!(removed.class_name, "marine_growth");
        assert_eq!(s.summary().total, before_total - 1);

        for (class_name, count) in before_counts.iter() {
            let expected = if class_name == "marine_growth" { count - 1 } else { *count };
            assert_eq!(s.counts().get(class_name), expected, "class {}", class_name);
        }
        assert_exact(&s);
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut s = session();
        assert_eq!(s.remove_at(4), Err(SessionError::IndexOutOfRange { index: 4, len: 4 }));
        assert_eq!(s.len(), 4);
    }

    #[test]
    fn test_merge_accumulates_within_run() {
        let mut s = session();
        s.merge(vec![AnomalyRecord::new("corrosion", 0.7, "00:12")]);
        assert_eq!(s.summary().critical, 2);
        assert_eq!(s.len(), 5);
        assert_exact(&s);
    }

    #[test]
    fn test_new_run_replaces() {
        let mut s = session();
        s.new_run(vec![AnomalyRecord::new("debris", 0.4, "00:00")]);
        assert_eq!(s.len(), 1);
        assert_eq!(s.counts().get("damage"), 0);
        assert_exact(&s);
    }

    #[test]
    fn test_reset_empties() {
        let mut s = session();
        s.reset();
        assert!(s.is_empty());
        assert_eq!(s.summary(), &MissionSummary::default());
        assert!(s.counts().is_empty());
    }

    #[test]
    fn test_merge_deduplicated_smart_log() {
        let mut s = MissionSession::new(ClassPartition::default());
        let accepted = s.merge_deduplicated(vec![
            AnomalyRecord::new("debris", 0.30, "00:01"),
            // within 0.5 of 0.30, dropped
            AnomalyRecord::new("debris", 0.70, "00:02"),
            // 0.5 away, kept
            AnomalyRecord::new("debris", 0.80, "00:03"),
            AnomalyRecord::new("damage", 0.40, "00:03"),
        ]);
        assert_eq!(accepted, 3);
        assert_eq!(s.counts().get("debris"), 2);

        // tracker is derived from records, so a removed class can be logged again
        s.remove_at(2).unwrap();
        assert_eq!(s.merge_deduplicated(vec![AnomalyRecord::new("damage", 0.41, "00:05")]), 1);
        assert_exact(&s);
    }
}
