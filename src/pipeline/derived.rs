//! Derived summary fields, computed rule-side only.
//!
//! Each field is a priority-ordered decision table evaluated top to bottom,
//! first match wins, always terminating in an unknown/none default. Pure
//! functions of the final signal set: no I/O, order-independent over the
//! input signal lists.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::schema::{
    ClaimedCondition, ModsRiskLevel, NegotiationStance, RiskLevel, ServiceHistoryLevel, Severity,
    SignalCategory, VerificationLevel,
};

use super::types::{DerivedFields, MaintenanceSection, Signal, SignalSet};

/// Performance mod types that materially change the engine's operating
/// envelope.
const HIGH_RISK_MOD_TYPES: &[&str] = &[
    "stage_2_or_higher",
    "turbo_swap",
    "turbo_upgrade",
    "e85_flex_fuel",
    "track_use",
    "race_build",
    "engine_swap",
    "supercharger",
];

const MEDIUM_RISK_MOD_TYPES: &[&str] = &[
    "tuned",
    "ecu_tune",
    "intake_exhaust",
    "downpipe",
    "intercooler_upgrade",
];

/// Evidence classes counting as documentary proof of servicing.
const RECORD_EVIDENCE: &[&str] = &["logbook", "receipts", "workshop_invoice", "photos_of_records"];

/// Claim types asserting routine servicing; gates the Full tier only.
const SERVICE_CLAIM_TYPES: &[&str] = &[
    "serviced_recently",
    "regular_service_claimed",
    "logbook_mentioned",
    "receipts_mentioned",
    "major_service_done",
];

const FIRM_STANCE_TYPES: &[&str] = &["firm_price", "no_lowballers", "no_timewasters"];
const OPEN_STANCE_TYPES: &[&str] = &["open_to_offers", "need_gone", "urgent_sale"];

/// Compute all five summary fields from the merged, verified signal set.
pub fn compute_derived_fields(
    signals: &SignalSet,
    maintenance: &MaintenanceSection,
    wording: ConditionWording,
) -> DerivedFields {
    DerivedFields {
        risk_level_overall: compute_risk_level_overall(signals),
        mods_risk_level: compute_mods_risk_level(signals),
        service_history_level: compute_service_history_level(maintenance),
        negotiation_stance: compute_negotiation_stance(&signals.seller_behavior),
        claimed_condition: compute_claimed_condition(signals, wording),
    }
}

pub fn compute_risk_level_overall(signals: &SignalSet) -> RiskLevel {
    let mut verified_high = 0usize;
    let mut inferred_high = 0usize;
    let mut medium = 0usize;

    for (_, signal) in signals.iter() {
        match (signal.severity, signal.verification_level) {
            (Severity::High, VerificationLevel::Verified) => verified_high += 1,
            (Severity::High, VerificationLevel::Inferred) => inferred_high += 1,
            (Severity::Medium, _) => medium += 1,
            (Severity::Low, _) => {}
        }
    }

    if verified_high > 0 {
        RiskLevel::High
    } else if medium >= 2 || inferred_high > 0 {
        RiskLevel::Medium
    } else if !signals.is_empty() {
        RiskLevel::Low
    } else {
        RiskLevel::Unknown
    }
}

pub fn compute_mods_risk_level(signals: &SignalSet) -> ModsRiskLevel {
    let has_type = |types: &[&str]| {
        signals
            .mods_performance
            .iter()
            .any(|s| types.contains(&s.signal_type.as_str()))
    };

    if has_type(HIGH_RISK_MOD_TYPES) {
        ModsRiskLevel::High
    } else if has_type(MEDIUM_RISK_MOD_TYPES) {
        ModsRiskLevel::Medium
    } else if signals.mods_performance.is_empty() && !signals.mods_cosmetic.is_empty() {
        ModsRiskLevel::Low
    } else {
        // Performance signals matching neither tier (stage_1, other) also
        // land here.
        ModsRiskLevel::None
    }
}

pub fn compute_service_history_level(maintenance: &MaintenanceSection) -> ServiceHistoryLevel {
    let has_records = maintenance
        .evidence_present
        .iter()
        .any(|e| RECORD_EVIDENCE.contains(&e.as_str()));
    let has_service_claim = maintenance
        .claims
        .iter()
        .any(|c| SERVICE_CLAIM_TYPES.contains(&c.claim_type.as_str()));
    let explicit_none = maintenance.evidence_present.iter().any(|e| e == "none");

    if has_records && has_service_claim {
        ServiceHistoryLevel::Full
    } else if !maintenance.claims.is_empty() {
        // Any surviving claim, including repair-only ones, means some
        // history was stated; only documented service reads Full.
        ServiceHistoryLevel::Partial
    } else if explicit_none {
        ServiceHistoryLevel::None
    } else {
        ServiceHistoryLevel::Unknown
    }
}

/// Firm markers are checked first: a seller stating both "firm price" and
/// "open to offers" reads as firm.
pub fn compute_negotiation_stance(seller_behavior: &[Signal]) -> NegotiationStance {
    let has_type = |types: &[&str]| {
        seller_behavior
            .iter()
            .any(|s| types.contains(&s.signal_type.as_str()))
    };

    if has_type(FIRM_STANCE_TYPES) {
        NegotiationStance::Firm
    } else if has_type(OPEN_STANCE_TYPES) {
        NegotiationStance::Open
    } else {
        NegotiationStance::Unknown
    }
}

pub fn compute_claimed_condition(
    signals: &SignalSet,
    wording: ConditionWording,
) -> ClaimedCondition {
    let high_impact = [
        SignalCategory::MechanicalIssues,
        SignalCategory::AccidentHistory,
        SignalCategory::Legality,
    ];
    let has_high_impact_issue = high_impact
        .iter()
        .flat_map(|c| signals.category(*c).iter())
        .any(|s| s.severity == Severity::High);

    let has_medium = signals.iter().any(|(_, s)| s.severity == Severity::Medium);

    let issue_categories = [
        SignalCategory::Legality,
        SignalCategory::AccidentHistory,
        SignalCategory::MechanicalIssues,
        SignalCategory::CosmeticIssues,
    ];
    let has_negative = issue_categories
        .iter()
        .any(|c| !signals.category(*c).is_empty());

    if has_high_impact_issue {
        ClaimedCondition::NeedsWork
    } else if has_medium {
        ClaimedCondition::Fair
    } else if !has_negative {
        match wording {
            ConditionWording::Superlative => ClaimedCondition::Excellent,
            ConditionWording::Positive => ClaimedCondition::Good,
            ConditionWording::Absent => ClaimedCondition::Unknown,
        }
    } else {
        ClaimedCondition::Unknown
    }
}

/// Positive condition wording found in the listing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionWording {
    Superlative,
    Positive,
    Absent,
}

static SUPERLATIVE_WORDING: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\bimmaculate\b",
        r"\blike\s+new\b",
        r"\bperfect\s+condition\b",
        r"\bmint(?:\s+condition)?\b",
        r"\bshowroom\b",
        r"\bflawless\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid condition wording pattern"))
    .collect()
});

static POSITIVE_WORDING: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b(?:great|good|excellent)\s+condition\b",
        r"\bwell\s+maintained\b",
        r"\bwell\s+looked\s+after\b",
        r"\bruns\s+(?:great|well|perfectly)\b",
        r"\bno\s+issues\b",
        r"\bgreat\s+car\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid condition wording pattern"))
    .collect()
});

/// Detect the seller's own condition wording in the original text.
pub fn detect_condition_wording(text: &str) -> ConditionWording {
    let lower = text.to_lowercase();
    if SUPERLATIVE_WORDING.iter().any(|r| r.is_match(&lower)) {
        ConditionWording::Superlative
    } else if POSITIVE_WORDING.iter().any(|r| r.is_match(&lower)) {
        ConditionWording::Positive
    } else {
        ConditionWording::Absent
    }
}

/// Derive missing_info entries from what the listing never addressed,
/// unioned with the (already normalized) LLM-provided list by the caller.
pub fn compute_missing_info(signals: &SignalSet, maintenance: &MaintenanceSection) -> Vec<String> {
    let mut missing = BTreeSet::new();

    let explicit_none = maintenance.evidence_present.iter().any(|e| e == "none");
    if maintenance.claims.is_empty() && !explicit_none {
        missing.insert("service_history_unknown");
    }
    if signals.legality.is_empty() {
        missing.insert("rego_expiry_unknown");
        missing.insert("rwc_status_unknown");
    }
    if signals.accident_history.is_empty() {
        missing.insert("accident_history_unknown");
    }

    missing.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::MaintenanceClaim;

    fn signal(signal_type: &str, severity: Severity, level: VerificationLevel) -> Signal {
        Signal {
            signal_type: signal_type.to_string(),
            severity,
            verification_level: level,
            evidence_text: "quoted".to_string(),
            confidence: 0.8,
        }
    }

    fn claim(claim_type: &str) -> MaintenanceClaim {
        MaintenanceClaim {
            claim_type: claim_type.to_string(),
            details: None,
            evidence_text: "quoted".to_string(),
            confidence: 0.8,
            verification_level: VerificationLevel::Inferred,
        }
    }

    // ── risk_level_overall ──────────────────────────────────────────

    #[test]
    fn verified_high_forces_high() {
        let mut signals = SignalSet::default();
        signals.legality.push(signal(
            "defected",
            Severity::High,
            VerificationLevel::Verified,
        ));
        assert_eq!(compute_risk_level_overall(&signals), RiskLevel::High);
    }

    #[test]
    fn inferred_high_gives_medium_not_high() {
        let mut signals = SignalSet::default();
        signals.mechanical_issues.push(signal(
            "engine_knock",
            Severity::High,
            VerificationLevel::Inferred,
        ));
        assert_eq!(compute_risk_level_overall(&signals), RiskLevel::Medium);
    }

    #[test]
    fn two_mediums_give_medium_one_gives_low() {
        let mut signals = SignalSet::default();
        signals.seller_behavior.push(signal(
            "firm_price",
            Severity::Medium,
            VerificationLevel::Verified,
        ));
        assert_eq!(compute_risk_level_overall(&signals), RiskLevel::Low);

        signals.mods_performance.push(signal(
            "tuned",
            Severity::Medium,
            VerificationLevel::Inferred,
        ));
        assert_eq!(compute_risk_level_overall(&signals), RiskLevel::Medium);
    }

    #[test]
    fn no_signals_means_unknown() {
        assert_eq!(compute_risk_level_overall(&SignalSet::default()), RiskLevel::Unknown);
    }

    // ── mods_risk_level ─────────────────────────────────────────────

    #[test]
    fn stage_two_is_high_risk() {
        let mut signals = SignalSet::default();
        signals.mods_performance.push(signal(
            "stage_2_or_higher",
            Severity::High,
            VerificationLevel::Verified,
        ));
        // High-risk tier wins even with medium-tier mods alongside.
        signals.mods_performance.push(signal(
            "tuned",
            Severity::Medium,
            VerificationLevel::Verified,
        ));
        assert_eq!(compute_mods_risk_level(&signals), ModsRiskLevel::High);
    }

    #[test]
    fn tune_alone_is_medium_risk() {
        let mut signals = SignalSet::default();
        signals.mods_performance.push(signal(
            "ecu_tune",
            Severity::Medium,
            VerificationLevel::Verified,
        ));
        assert_eq!(compute_mods_risk_level(&signals), ModsRiskLevel::Medium);
    }

    #[test]
    fn cosmetic_mods_only_is_low_risk() {
        let mut signals = SignalSet::default();
        signals.mods_cosmetic.push(signal(
            "aftermarket_wheels",
            Severity::Low,
            VerificationLevel::Verified,
        ));
        assert_eq!(compute_mods_risk_level(&signals), ModsRiskLevel::Low);
    }

    #[test]
    fn untiered_performance_type_falls_through_to_none() {
        let mut signals = SignalSet::default();
        signals.mods_performance.push(signal(
            "stage_1",
            Severity::Low,
            VerificationLevel::Inferred,
        ));
        assert_eq!(compute_mods_risk_level(&signals), ModsRiskLevel::None);
    }

    #[test]
    fn no_mods_means_none() {
        assert_eq!(compute_mods_risk_level(&SignalSet::default()), ModsRiskLevel::None);
    }

    // ── service_history_level ───────────────────────────────────────

    #[test]
    fn records_plus_claim_is_full() {
        let maintenance = MaintenanceSection {
            claims: vec![claim("regular_service_claimed")],
            evidence_present: vec!["logbook".to_string(), "receipts".to_string()],
            red_flags: vec![],
        };
        assert_eq!(compute_service_history_level(&maintenance), ServiceHistoryLevel::Full);
    }

    #[test]
    fn claim_without_records_is_partial() {
        let maintenance = MaintenanceSection {
            claims: vec![claim("serviced_recently")],
            evidence_present: vec![],
            red_flags: vec![],
        };
        assert_eq!(compute_service_history_level(&maintenance), ServiceHistoryLevel::Partial);
    }

    #[test]
    fn repair_only_claims_still_read_partial() {
        let maintenance = MaintenanceSection {
            claims: vec![claim("new_tyres")],
            evidence_present: vec![],
            red_flags: vec![],
        };
        assert_eq!(compute_service_history_level(&maintenance), ServiceHistoryLevel::Partial);
    }

    #[test]
    fn repair_claim_with_records_is_still_not_full() {
        let maintenance = MaintenanceSection {
            claims: vec![claim("clutch_replaced")],
            evidence_present: vec!["receipts".to_string()],
            red_flags: vec![],
        };
        assert_eq!(compute_service_history_level(&maintenance), ServiceHistoryLevel::Partial);
    }

    #[test]
    fn explicit_none_is_none() {
        let maintenance = MaintenanceSection {
            claims: vec![],
            evidence_present: vec!["none".to_string()],
            red_flags: vec![],
        };
        assert_eq!(compute_service_history_level(&maintenance), ServiceHistoryLevel::None);
    }

    #[test]
    fn silence_is_unknown() {
        assert_eq!(
            compute_service_history_level(&MaintenanceSection::default()),
            ServiceHistoryLevel::Unknown
        );
    }

    // ── negotiation_stance ──────────────────────────────────────────

    #[test]
    fn firm_takes_precedence_over_open() {
        let firm = signal("firm_price", Severity::Medium, VerificationLevel::Verified);
        let open = signal("open_to_offers", Severity::Low, VerificationLevel::Verified);
        assert_eq!(
            compute_negotiation_stance(&[open.clone(), firm.clone()]),
            NegotiationStance::Firm
        );
        assert_eq!(compute_negotiation_stance(&[open]), NegotiationStance::Open);
        assert_eq!(compute_negotiation_stance(&[]), NegotiationStance::Unknown);
    }

    // ── claimed_condition ───────────────────────────────────────────

    #[test]
    fn high_impact_issue_means_needs_work() {
        let mut signals = SignalSet::default();
        signals.mechanical_issues.push(signal(
            "not_running",
            Severity::High,
            VerificationLevel::Verified,
        ));
        assert_eq!(
            compute_claimed_condition(&signals, ConditionWording::Superlative),
            ClaimedCondition::NeedsWork
        );
    }

    #[test]
    fn medium_issue_means_fair() {
        let mut signals = SignalSet::default();
        signals.cosmetic_issues.push(signal(
            "scratch",
            Severity::Medium,
            VerificationLevel::Inferred,
        ));
        assert_eq!(
            compute_claimed_condition(&signals, ConditionWording::Positive),
            ClaimedCondition::Fair
        );
    }

    #[test]
    fn positive_wording_needs_clean_signals() {
        let clean = SignalSet::default();
        assert_eq!(
            compute_claimed_condition(&clean, ConditionWording::Superlative),
            ClaimedCondition::Excellent
        );
        assert_eq!(
            compute_claimed_condition(&clean, ConditionWording::Positive),
            ClaimedCondition::Good
        );
        assert_eq!(
            compute_claimed_condition(&clean, ConditionWording::Absent),
            ClaimedCondition::Unknown
        );

        // A low-severity cosmetic issue blocks Good/Excellent.
        let mut signals = SignalSet::default();
        signals.cosmetic_issues.push(signal(
            "paint_fade",
            Severity::Low,
            VerificationLevel::Inferred,
        ));
        assert_eq!(
            compute_claimed_condition(&signals, ConditionWording::Superlative),
            ClaimedCondition::Unknown
        );
    }

    #[test]
    fn seller_behavior_does_not_block_positive_condition() {
        let mut signals = SignalSet::default();
        signals.seller_behavior.push(signal(
            "firm_price",
            Severity::Low,
            VerificationLevel::Verified,
        ));
        assert_eq!(
            compute_claimed_condition(&signals, ConditionWording::Positive),
            ClaimedCondition::Good
        );
    }

    #[test]
    fn wording_detection_tiers() {
        assert_eq!(
            detect_condition_wording("Immaculate example, garaged"),
            ConditionWording::Superlative
        );
        assert_eq!(
            detect_condition_wording("great car, no issues"),
            ConditionWording::Positive
        );
        assert_eq!(
            detect_condition_wording("selling as is"),
            ConditionWording::Absent
        );
    }

    // ── order independence ──────────────────────────────────────────

    #[test]
    fn derivation_is_order_independent() {
        let a = signal("defected", Severity::High, VerificationLevel::Verified);
        let b = signal("no_rego", Severity::High, VerificationLevel::Verified);
        let c = signal("tuned", Severity::Medium, VerificationLevel::Verified);

        let mut forward = SignalSet::default();
        forward.legality.extend([a.clone(), b.clone()]);
        forward.mods_performance.push(c.clone());

        let mut reversed = SignalSet::default();
        reversed.legality.extend([b, a]);
        reversed.mods_performance.push(c);

        let maintenance = MaintenanceSection::default();
        assert_eq!(
            compute_derived_fields(&forward, &maintenance, ConditionWording::Absent),
            compute_derived_fields(&reversed, &maintenance, ConditionWording::Absent)
        );
    }

    // ── missing_info ────────────────────────────────────────────────

    #[test]
    fn silent_listing_flags_all_unknowns() {
        let missing = compute_missing_info(&SignalSet::default(), &MaintenanceSection::default());
        assert_eq!(
            missing,
            vec![
                "accident_history_unknown",
                "rego_expiry_unknown",
                "rwc_status_unknown",
                "service_history_unknown",
            ]
        );
    }

    #[test]
    fn addressed_topics_are_not_flagged() {
        let mut signals = SignalSet::default();
        signals.legality.push(signal(
            "no_rego",
            Severity::High,
            VerificationLevel::Verified,
        ));
        signals.accident_history.push(signal(
            "writeoff",
            Severity::High,
            VerificationLevel::Verified,
        ));
        let maintenance = MaintenanceSection {
            claims: vec![claim("serviced_recently")],
            ..Default::default()
        };
        assert!(compute_missing_info(&signals, &maintenance).is_empty());
    }
}
