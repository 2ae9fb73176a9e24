//! Summary Composer
//!
//! Deterministic baseline text for a triaged mission. Never fails:
//! empty context fields are rendered as-is.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::rules::{ClassPartition, MAX_HIGHLIGHTS};
use super::types::{AnomalyRecord, DetectionCounts, MissionContext, MissionSummary, RiskLevel, Severity};

/// Baseline textual artifacts, before any enhancement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineText {
    pub headline: String,
    pub bullets: Vec<String>,
    pub highlights: Vec<String>,
    pub recommendation: String,
    pub message_draft: String,
}

/// Compose all baseline artifacts for one mission
pub fn compose(
    records: &[AnomalyRecord],
    counts: &DetectionCounts,
    summary: &MissionSummary,
    risk: RiskLevel,
    context: &MissionContext,
    partition: &ClassPartition,
) -> BaselineText {
    let bullets = bullets(counts, partition);
    let highlights = highlights(records);
    let recommendation = recommendation(risk, context);
    let headline = headline(risk, summary, context);
    let message_draft = message_draft(risk, summary, context, &highlights, &recommendation);

    BaselineText {
        headline,
        bullets,
        highlights,
        recommendation,
        message_draft,
    }
}

/// One line per critical/warning class with a non-zero count.
///
/// Descending count, ties broken by partition priority.
pub fn bullets(counts: &DetectionCounts, partition: &ClassPartition) -> Vec<String> {
    let mut ranked: Vec<(&str, u64, usize, Severity)> = counts
        .iter()
        .filter(|(_, count)| **count > 0)
        .filter_map(|(class_name, count)| {
            partition
                .priority_of(class_name)
                .map(|priority| (class_name.as_str(), *count, priority, partition.severity_of(class_name)))
        })
        .collect();

    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .map(|(class_name, count, _, severity)| {
            let tier = match severity {
                Severity::Critical => "critical",
                _ => "warning",
            };
            let plural = if count == 1 { "" } else { "s" };
            format!("{} {} finding{} ({})", count, tier, plural, display_class(class_name))
        })
        .collect()
}

/// Up to four records, highest confidence first, ties in log order
pub fn highlights(records: &[AnomalyRecord]) -> Vec<String> {
    let mut ordered: Vec<&AnomalyRecord> = records.iter().collect();
    // sort_by is stable, equal confidences keep log order
    ordered.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal));

    ordered
        .into_iter()
        .take(MAX_HIGHLIGHTS)
        .map(|r| {
            format!(
                "{} at {} ({}% confidence)",
                display_class(&r.class_name),
                r.timestamp,
                confidence_percent(r.confidence)
            )
        })
        .collect()
}

pub fn recommendation(risk: RiskLevel, context: &MissionContext) -> String {
    match risk {
        RiskLevel::High => format!(
            "Immediate follow-up required on {} at {}: schedule targeted inspection of critical regions, \
             validate structural integrity around free spans or damage, and review the maintenance schedule \
             for affected sections.",
            context.vessel_id, context.location
        ),
        RiskLevel::Medium => format!(
            "Plan a follow-up inspection of the highlighted regions on {} and schedule cleaning or minor repair \
             windows in the next maintenance cycle.",
            context.vessel_id
        ),
        RiskLevel::Low => format!(
            "Conditions on {} are mostly acceptable. Continue routine monitoring and include the highlighted \
             regions in the next standard inspection round.",
            context.vessel_id
        ),
        RiskLevel::None => format!(
            "No anomalies detected for mission '{}'. No immediate action required.",
            context.mission_name
        ),
    }
}

pub fn headline(risk: RiskLevel, summary: &MissionSummary, context: &MissionContext) -> String {
    match risk {
        RiskLevel::None => format!(
            "Mission '{}' on vessel {} near {} has NONE risk: {} detections ({} critical, {} warnings), \
             no detected anomalies, operator: {}.",
            context.mission_name,
            context.vessel_id,
            context.location,
            summary.total,
            summary.critical,
            summary.warnings,
            context.operator_name
        ),
        _ => format!(
            "Mission '{}' on vessel {} near {} has {} risk findings: {} detections ({} critical, {} warnings), \
             operator: {}.",
            context.mission_name,
            context.vessel_id,
            context.location,
            risk.as_str().to_lowercase(),
            summary.total,
            summary.critical,
            summary.warnings,
            context.operator_name
        ),
    }
}

pub fn message_draft(
    risk: RiskLevel,
    summary: &MissionSummary,
    context: &MissionContext,
    highlights: &[String],
    recommendation: &str,
) -> String {
    let mut lines = vec![
        format!("Mission Alert: {} RISK", risk.as_str()),
        format!("Mission: {}", context.mission_name),
        format!("Vessel/ROV: {}", context.vessel_id),
        format!("Location: {}", context.location),
        format!("Operator: {}", context.operator_name),
        String::new(),
    ];

    if summary.total > 0 {
        lines.push(format!(
            "Detections this mission: {} (critical={}, warnings={})",
            summary.total, summary.critical, summary.warnings
        ));
    } else {
        lines.push("No anomalies detected in this mission.".to_string());
    }

    if !highlights.is_empty() {
        lines.push("Key findings:".to_string());
        lines.extend(highlights.iter().map(|h| format!("- {}", h)));
    }

    lines.push(String::new());
    lines.push(format!("Recommendation: {}", recommendation));
    lines.join("\n")
}

fn display_class(class_name: &str) -> String {
    class_name.replace('_', " ")
}

fn confidence_percent(confidence: f64) -> u32 {
    (confidence.clamp(0.0, 1.0) * 100.0).floor() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> MissionContext {
        MissionContext {
            mission_name: "Hull Sweep 7".into(),
            operator_name: "Dana".into(),
            vessel_id: "ROV-01".into(),
            location: "Block B".into(),
            phone: None,
        }
    }

    fn records() -> Vec<AnomalyRecord> {
        vec![
            AnomalyRecord::new("marine_growth", 0.61, "00:01"),
            AnomalyRecord::new("damage", 0.92, "00:04"),
            AnomalyRecord::new("marine_growth", 0.77, "00:09"),
            AnomalyRecord::new("healthy", 0.77, "00:12"),
            AnomalyRecord::new("marine_growth", 0.40, "00:15"),
            AnomalyRecord::new("debris", 0.33, "00:20"),
        ]
    }

    #[test]
    fn test_bullets_ranked_by_count_then_priority() {
        let counts: DetectionCounts = vec![
            ("debris".to_string(), 2),
            ("corrosion".to_string(), 2),
            ("marine_growth".to_string(), 5),
            ("healthy".to_string(), 9),
            ("damage".to_string(), 0),
        ]
        .into_iter()
        .collect();
        let lines = bullets(&counts, &ClassPartition::default());
        assert_eq!(
            lines,
            vec![
                "5 warning findings (marine growth)".to_string(),
                "2 critical findings (corrosion)".to_string(),
                "2 warning findings (debris)".to_string(),
            ]
        );
    }

    #[test]
    fn test_bullets_singular() {
        let counts: DetectionCounts = vec![("free_span".to_string(), 1)].into_iter().collect();
        assert_eq!(bullets(&counts, &ClassPartition::default()), vec!["1 critical finding (free span)"]);
    }

    #[test]
    fn test_highlights_confidence_desc_ties_in_log_order() {
        let lines = highlights(&records());
        assert_eq!(
            lines,
            vec![
                "damage at 00:04 (92% confidence)".to_string(),
                "marine growth at 00:09 (77% confidence)".to_string(),
                "healthy at 00:12 (77% confidence)".to_string(),
                "marine growth at 00:01 (61% confidence)".to_string(),
            ]
        );
    }

    #[test]
    fn test_confidence_percent_truncates() {
        assert_eq!(confidence_percent(0.999), 99);
        assert_eq!(confidence_percent(0.775), 77);
        assert_eq!(confidence_percent(1.0), 100);
        assert_eq!(confidence_percent(1.4), 100);
        assert_eq!(confidence_percent(-0.2), 0);

        let lines = highlights(&[AnomalyRecord::new("damage", 0.999, "00:07")]);
        assert_eq!(lines, vec!["damage at 00:07 (99% confidence)".to_string()]);
    }

    #[test]
    fn test_headline_carries_risk_and_counts_at_every_level() {
        let summary = MissionSummary::default();
        for risk in [RiskLevel::None, RiskLevel::Low, RiskLevel::Medium, RiskLevel::High] {
            let text = headline(risk, &summary, &context());
            assert!(text.to_uppercase().contains(risk.as_str()), "{}", text);
            assert!(text.contains("0 detections (0 critical, 0 warnings)"), "{}", text);
        }
    }

    #[test]
    fn test_highlights_empty_log() {
        assert!(highlights(&[]).is_empty());
    }

    #[test]
    fn test_compose_high_risk() {
        let records = records();
        let counts = DetectionCounts::from_records(&records);
        let summary = MissionSummary::from_counts(&counts, &ClassPartition::default());
        let text = compose(&records, &counts, &summary, RiskLevel::High, &context(), &ClassPartition::default());

        assert!(text.headline.contains("Hull Sweep 7"));
        assert!(text.headline.contains("high risk findings"));
        assert!(text.headline.contains("6 detections (1 critical, 4 warnings)"));
        assert!(text.recommendation.starts_with("Immediate follow-up required on ROV-01 at Block B"));
        assert!(text.message_draft.starts_with("Mission Alert: HIGH RISK\nMission: Hull Sweep 7"));
        assert!(text.message_draft.contains("Detections this mission: 6 (critical=1, warnings=4)"));
        assert!(text.message_draft.contains("Key findings:\n- damage at 00:04 (92% confidence)"));
        assert!(text.message_draft.ends_with(&format!("Recommendation: {}", text.recommendation)));
    }

    #[test]
    fn test_compose_empty_mission() {
        let summary = MissionSummary::default();
        let text = compose(
            &[],
            &DetectionCounts::default(),
            &summary,
            RiskLevel::None,
            &context(),
            &ClassPartition::default(),
        );
        assert!(text.bullets.is_empty());
        assert!(text.highlights.is_empty());
        assert!(text.headline.contains("NONE risk: 0 detections (0 critical, 0 warnings)"));
        assert!(text.headline.contains("no detected anomalies"));
        assert!(text.message_draft.contains("No anomalies detected in this mission."));
        assert!(!text.message_draft.contains("Key findings"));
    }

    #[test]
    fn test_empty_context_rendered_as_is() {
        let text = headline(RiskLevel::Low, &MissionSummary::default(), &MissionContext::default());
        assert!(text.starts_with("Mission '' on vessel  near  has low risk findings"));
    }

    #[test]
    fn test_recommendation_per_level_is_distinct() {
        let ctx = context();
        let levels = [RiskLevel::None, RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];
        let texts: Vec<String> = levels.iter().map(|l| recommendation(*l, &ctx)).collect();
        for (i, a) in texts.iter().enumerate() {
            assert!(!a.is_empty());
            for b in texts.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
