//! Final output validation against the closed schema.
//!
//! The validator rejects, it never rewrites: unknown values must already
//! have been mapped to `"other"` by the normalizer, so any membership
//! failure here is a pipeline bug, not producer noise. Errors carry the
//! field path so a failing payload can be diagnosed from the log line.

use crate::schema::{registry, SignalCategory};

use super::types::{ListingIntel, MaintenanceClaim, Signal};

/// Outcome of validating one output envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a complete output envelope. Never fails on ordinary input;
/// converting a bad report into an error is the caller's decision.
pub fn validate(output: &ListingIntel) -> ValidationReport {
    let mut report = ValidationReport::default();
    let reg = registry();

    if output.listing_id.trim().is_empty() {
        report.errors.push("listing_id: must be non-empty".to_string());
    }
    if output.source_snapshot_id.trim().is_empty() {
        report
            .errors
            .push("source_snapshot_id: must be non-empty".to_string());
    }
    if output.stage_name.trim().is_empty() {
        report.errors.push("stage_name: must be non-empty".to_string());
    }

    let payload = &output.payload;

    for category in SignalCategory::ALL {
        let valid_types = reg.signal_types(category);
        for (index, signal) in payload.signals.category(category).iter().enumerate() {
            let path = format!("payload.signals.{}[{index}]", category.as_str());
            check_signal(signal, &path, &mut report, |t| valid_types.contains(t));
        }
    }

    for (index, claim) in payload.maintenance.claims.iter().enumerate() {
        let path = format!("payload.maintenance.claims[{index}]");
        check_claim(claim, &path, &mut report);
    }

    for (index, flag) in payload.maintenance.red_flags.iter().enumerate() {
        let path = format!("payload.maintenance.red_flags[{index}]");
        check_signal(flag, &path, &mut report, |t| reg.red_flag_types().contains(t));
    }

    for (index, value) in payload.maintenance.evidence_present.iter().enumerate() {
        if !reg.evidence_present_values().contains(value.as_str()) {
            report.errors.push(format!(
                "payload.maintenance.evidence_present[{index}]: '{value}' is not a valid value"
            ));
        }
    }

    for (index, value) in payload.missing_info.iter().enumerate() {
        if !reg.missing_info_values().contains(value.as_str()) {
            report.errors.push(format!(
                "payload.missing_info[{index}]: '{value}' is not a valid value"
            ));
        }
    }

    report
}

fn check_signal(
    signal: &Signal,
    path: &str,
    report: &mut ValidationReport,
    is_valid_type: impl Fn(&str) -> bool,
) {
    if !is_valid_type(&signal.signal_type) {
        report.errors.push(format!(
            "{path}.type: '{}' is not a valid type",
            signal.signal_type
        ));
    }
    if signal.evidence_text.trim().is_empty() {
        report
            .errors
            .push(format!("{path}.evidence_text: must be non-empty"));
    }
    check_confidence(signal.confidence, path, report);
}

fn check_claim(claim: &MaintenanceClaim, path: &str, report: &mut ValidationReport) {
    if !registry().maintenance_claim_types().contains(claim.claim_type.as_str()) {
        report.errors.push(format!(
            "{path}.type: '{}' is not a valid type",
            claim.claim_type
        ));
    }
    if claim.evidence_text.trim().is_empty() {
        report
            .errors
            .push(format!("{path}.evidence_text: must be non-empty"));
    }
    check_confidence(claim.confidence, path, report);
}

fn check_confidence(confidence: f64, path: &str, report: &mut ValidationReport) {
    if !(0.0..=1.0).contains(&confidence) || confidence.is_nan() {
        report.errors.push(format!(
            "{path}.confidence: {confidence} outside [0, 1]"
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RULESET_VERSION, STAGE_NAME, STAGE_VERSION};
    use crate::pipeline::types::{MaintenanceSection, Payload, SignalSet, SourceTextStats};
    use crate::schema::{
        ClaimedCondition, ModsRiskLevel, NegotiationStance, RiskLevel, ServiceHistoryLevel,
        Severity, VerificationLevel,
    };
    use chrono::Utc;

    fn signal(signal_type: &str, confidence: f64) -> Signal {
        Signal {
            signal_type: signal_type.to_string(),
            severity: Severity::High,
            verification_level: VerificationLevel::Verified,
            evidence_text: "written off".to_string(),
            confidence,
        }
    }

    fn valid_output() -> ListingIntel {
        let mut signals = SignalSet::default();
        signals.accident_history.push(signal("writeoff", 0.95));
        ListingIntel {
            listing_id: "listing-1".to_string(),
            source_snapshot_id: "snap-1".to_string(),
            created_at: Utc::now(),
            stage_name: STAGE_NAME.to_string(),
            stage_version: STAGE_VERSION.to_string(),
            ruleset_version: RULESET_VERSION.to_string(),
            llm_version: None,
            payload: Payload {
                risk_level_overall: RiskLevel::High,
                negotiation_stance: NegotiationStance::Unknown,
                claimed_condition: ClaimedCondition::NeedsWork,
                service_history_level: ServiceHistoryLevel::Unknown,
                mods_risk_level: ModsRiskLevel::None,
                signals,
                maintenance: MaintenanceSection::default(),
                missing_info: vec!["service_history_unknown".to_string()],
                extraction_warnings: vec![],
                source_text_stats: SourceTextStats::default(),
            },
        }
    }

    #[test]
    fn valid_output_passes() {
        let report = validate(&valid_output());
        assert!(report.is_valid(), "unexpected errors: {:?}", report.errors);
    }

    #[test]
    fn unknown_signal_type_is_rejected_not_rewritten() {
        let mut output = valid_output();
        output.payload.signals.legality.push(signal("made_up_type", 0.9));
        let report = validate(&output);
        assert!(!report.is_valid());
        assert!(report.errors[0].starts_with("payload.signals.legality[0].type"));
    }

    #[test]
    fn type_valid_in_wrong_category_is_rejected() {
        let mut output = valid_output();
        output.payload.signals.legality.push(signal("writeoff", 0.9));
        assert!(!validate(&output).is_valid());
    }

    #[test]
    fn out_of_range_confidence_is_rejected() {
        let mut output = valid_output();
        output.payload.signals.accident_history[0].confidence = 1.3;
        let report = validate(&output);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("confidence") && e.contains("accident_history[0]")));
    }

    #[test]
    fn empty_evidence_is_rejected() {
        let mut output = valid_output();
        output.payload.signals.accident_history[0].evidence_text = "  ".to_string();
        let report = validate(&output);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("evidence_text")));
    }

    #[test]
    fn envelope_identity_fields_are_required() {
        let mut output = valid_output();
        output.listing_id = "".to_string();
        output.source_snapshot_id = " ".to_string();
        let report = validate(&output);
        assert_eq!(report.errors.len(), 2);
    }

    #[test]
    fn maintenance_vocabulary_is_checked() {
        let mut output = valid_output();
        output
            .payload
            .maintenance
            .evidence_present
            .push("service_book".to_string());
        output.payload.missing_info.push("who_knows".to_string());
        let report = validate(&output);
        assert!(report
            .errors
            .iter()
            .any(|e| e.starts_with("payload.maintenance.evidence_present[0]")));
        assert!(report
            .errors
            .iter()
            .any(|e| e.starts_with("payload.missing_info[1]")));
    }

    #[test]
    fn all_errors_are_collected_not_short_circuited() {
        let mut output = valid_output();
        output.payload.signals.legality.push(signal("bogus", 2.0));
        output.payload.signals.legality[0].evidence_text = String::new();
        let report = validate(&output);
        assert!(report.errors.len() >= 3);
    }
}
