//! Normalization of raw LLM output into schema-valid structures.
//!
//! Tolerant by design: producer wording variations are aliased onto the
//! closed enums, unknown values map to `"other"`, and the only thing that
//! drops an item outright is missing evidence text. Rejecting evidence is
//! the verifier's job, not this module's.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::schema::{registry, Severity, SignalCategory, VerificationLevel};

use super::types::{
    LlmExtraction, MaintenanceClaim, MaintenanceSection, RawMaintenanceClaim, RawSignal, Signal,
    SignalSet,
};

/// LLM-side extraction after normalization, before evidence verification.
#[derive(Debug, Clone, Default)]
pub struct NormalizedExtraction {
    pub signals: SignalSet,
    pub maintenance: MaintenanceSection,
    pub missing_info: Vec<String>,
    pub extraction_warnings: Vec<String>,
}

/// Normalize a full LLM extraction.
pub fn normalize_extraction(mut raw: LlmExtraction) -> NormalizedExtraction {
    let mut signals = SignalSet::default();
    let mut dropped = 0usize;

    for category in SignalCategory::ALL {
        let out = signals.category_mut(category);
        for raw_signal in raw.signals.take_category(category) {
            match normalize_signal(raw_signal, category) {
                Some(signal) => out.push(signal),
                None => dropped += 1,
            }
        }
    }

    let mut claims = Vec::new();
    for raw_claim in std::mem::take(&mut raw.maintenance.claims) {
        match normalize_claim(raw_claim) {
            Some(claim) => claims.push(claim),
            None => dropped += 1,
        }
    }

    let mut red_flags = Vec::new();
    for raw_flag in std::mem::take(&mut raw.maintenance.red_flags) {
        match normalize_red_flag(raw_flag) {
            Some(flag) => red_flags.push(flag),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        tracing::debug!(dropped, "dropped evidence-less items during normalization");
    }

    NormalizedExtraction {
        signals,
        maintenance: MaintenanceSection {
            claims,
            evidence_present: normalize_evidence_present_list(&raw.maintenance.evidence_present),
            red_flags,
        },
        missing_info: normalize_missing_info_list(&raw.missing_info),
        extraction_warnings: raw.extraction_warnings,
    }
}

/// Normalize one signal. Returns None only when evidence text is missing.
fn normalize_signal(raw: RawSignal, category: SignalCategory) -> Option<Signal> {
    let evidence_text = raw.evidence_text.trim().to_string();
    if evidence_text.is_empty() {
        return None;
    }
    Some(Signal {
        signal_type: normalize_signal_type(&raw.signal_type, category),
        severity: normalize_severity(raw.severity.as_deref()),
        verification_level: normalize_verification(raw.verification_level.as_deref()),
        evidence_text,
        confidence: normalize_confidence(raw.confidence),
    })
}

fn normalize_claim(raw: RawMaintenanceClaim) -> Option<MaintenanceClaim> {
    let evidence_text = raw.evidence_text.trim().to_string();
    if evidence_text.is_empty() {
        return None;
    }
    Some(MaintenanceClaim {
        claim_type: normalize_claim_type(&raw.claim_type),
        details: raw.details,
        evidence_text,
        confidence: normalize_confidence(raw.confidence),
        verification_level: normalize_verification(raw.verification_level.as_deref()),
    })
}

fn normalize_red_flag(raw: RawSignal) -> Option<Signal> {
    let evidence_text = raw.evidence_text.trim().to_string();
    if evidence_text.is_empty() {
        return None;
    }
    Some(Signal {
        signal_type: normalize_red_flag_type(&raw.signal_type),
        severity: normalize_severity(raw.severity.as_deref()),
        verification_level: normalize_verification(raw.verification_level.as_deref()),
        evidence_text,
        confidence: normalize_confidence(raw.confidence),
    })
}

fn normalize_severity(raw: Option<&str>) -> Severity {
    raw.and_then(Severity::parse).unwrap_or(Severity::Medium)
}

fn normalize_verification(raw: Option<&str>) -> VerificationLevel {
    raw.and_then(VerificationLevel::parse)
        .unwrap_or(VerificationLevel::Inferred)
}

fn normalize_confidence(raw: Option<f64>) -> f64 {
    raw.filter(|c| c.is_finite()).unwrap_or(0.5).clamp(0.0, 1.0)
}

/// Lowercase, trim, and fold spaces/hyphens into underscores.
fn canonical_token(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .replace([' ', '-'], "_")
}

/// Map a raw signal type onto the category's closed enum. Never fails:
/// unknown types become `"other"` so semantic content is kept, not lost.
pub fn normalize_signal_type(raw: &str, category: SignalCategory) -> String {
    let token = canonical_token(raw);
    if token.is_empty() {
        return "other".to_string();
    }
    if registry().is_valid_signal_type(&token, category) {
        return token;
    }
    if let Some(mapped) = signal_type_alias(category, &token) {
        return mapped.to_string();
    }
    tracing::debug!(
        raw,
        category = category.as_str(),
        "unknown signal type, using 'other'"
    );
    "other".to_string()
}

/// Known producer variations per category.
fn signal_type_alias(category: SignalCategory, token: &str) -> Option<&'static str> {
    use SignalCategory::*;
    let mapped = match (category, token) {
        (Legality, "no_registration") => "no_rego",
        (Legality, "expired_rego") => "rego_expired",
        (Legality, "no_roadworthy") => "no_rwc",
        (Legality, "needs_roadworthy") => "rwc_required",
        (Legality, "defect") | (Legality, "defect_notice") => "defected",

        (AccidentHistory, "write_off")
        | (AccidentHistory, "written_off")
        | (AccidentHistory, "total_loss")
        | (AccidentHistory, "totaled") => "writeoff",
        (AccidentHistory, "salvage") => "salvage_title",
        (AccidentHistory, "rebuilt") => "rebuilt_title",
        (AccidentHistory, "flooded") | (AccidentHistory, "water_damaged") => "flood_damage",
        (AccidentHistory, "accident") | (AccidentHistory, "crash_damage") => "accident_damage",
        (AccidentHistory, "hail") => "hail_damage",

        (MechanicalIssues, "knocking") => "engine_knock",
        (MechanicalIssues, "overheating") | (MechanicalIssues, "runs_hot") => "engine_overheating",
        (MechanicalIssues, "leaking_oil") => "oil_leak",
        (MechanicalIssues, "head_gasket") | (MechanicalIssues, "blown_head_gasket") => {
            "head_gasket_suspected"
        }
        (MechanicalIssues, "transmission_issue") | (MechanicalIssues, "trans_problem") => {
            "gearbox_issue"
        }
        (MechanicalIssues, "wont_start") => "starting_issue",
        (MechanicalIssues, "doesnt_start") | (MechanicalIssues, "dead") => "not_running",
        (MechanicalIssues, "engine_light") | (MechanicalIssues, "cel") => "check_engine_light",

        (ModsPerformance, "tune") => "tuned",
        (ModsPerformance, "remapped") | (ModsPerformance, "remap") => "ecu_tune",
        (ModsPerformance, "stage1") | (ModsPerformance, "stage_1_tune") => "stage_1",
        (ModsPerformance, "stage2") | (ModsPerformance, "stage_2") | (ModsPerformance, "stage3") => {
            "stage_2_or_higher"
        }
        (ModsPerformance, "big_turbo") | (ModsPerformance, "upgraded_turbo") => "turbo_upgrade",
        (ModsPerformance, "ethanol") | (ModsPerformance, "flex_fuel") => "e85_flex_fuel",
        (ModsPerformance, "track_car") => "track_use",
        (ModsPerformance, "race_car") => "race_build",

        (SellerBehavior, "need_sold") | (SellerBehavior, "must_go") => "need_gone",
        (SellerBehavior, "fixed_price") | (SellerBehavior, "price_firm") => "firm_price",
        (SellerBehavior, "negotiable")
        | (SellerBehavior, "ono")
        | (SellerBehavior, "or_nearest_offer") => "open_to_offers",
        (SellerBehavior, "swaps") | (SellerBehavior, "trades") => "swap_trade",

        _ => return None,
    };
    Some(mapped)
}

/// Map a raw evidence_present value (string or `{"type": ...}` object) onto
/// the closed enum.
pub fn normalize_evidence_present(value: &Value) -> String {
    let raw = match value {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map
            .get("type")
            .or_else(|| map.get("value"))
            .and_then(Value::as_str)
            .unwrap_or(""),
        _ => "",
    };
    let token = canonical_token(raw);
    if token.is_empty() {
        return "other".to_string();
    }
    if registry().evidence_present_values().contains(token.as_str()) {
        return token;
    }
    evidence_present_alias(&token)
        .map(str::to_string)
        .unwrap_or_else(|| "other".to_string())
}

fn evidence_present_alias(token: &str) -> Option<&'static str> {
    let mapped = match token {
        "service_book" | "service_logbook" | "log_book" | "service_history"
        | "full_service_history" | "fsh" | "log" | "books" | "service_record"
        | "service_records" => "logbook",
        "receipt" | "service_receipts" | "maintenance_receipts" | "reciepts" | "invoices" => {
            "receipts"
        }
        "invoice" | "service_invoice" | "mechanic_invoice" | "workshop_invoices"
        | "garage_invoice" => "workshop_invoice",
        "photos" | "photo" | "pictures" | "images" | "pics" | "documentation_photos" => {
            "photos_of_records"
        }
        "no_records" | "no_evidence" | "unknown" | "n/a" | "na" | "not_provided" => "none",
        _ => return None,
    };
    Some(mapped)
}

/// Normalize and dedupe an evidence_present list. A lone unknown item keeps
/// an `"other"` marker; a list that collapses entirely to `"other"` returns
/// empty, since it carries no usable information.
pub fn normalize_evidence_present_list(values: &[Value]) -> Vec<String> {
    let mut normalized = BTreeSet::new();
    for value in values {
        if matches!(value, Value::Null) || matches!(value, Value::String(s) if s.is_empty()) {
            continue;
        }
        let result = normalize_evidence_present(value);
        if result != "other" || values.len() == 1 {
            normalized.insert(result);
        }
    }
    if values.len() > 1 && normalized.iter().all(|v| v == "other") {
        return Vec::new();
    }
    normalized.into_iter().collect()
}

pub fn normalize_claim_type(raw: &str) -> String {
    let token = canonical_token(raw);
    if token.is_empty() {
        return "other".to_string();
    }
    if registry().maintenance_claim_types().contains(token.as_str()) {
        return token;
    }
    claim_type_alias(&token)
        .map(str::to_string)
        .unwrap_or_else(|| "other".to_string())
}

fn claim_type_alias(token: &str) -> Option<&'static str> {
    let mapped = match token {
        "service_completed" | "serviced" | "recent_service" | "just_serviced" => {
            "serviced_recently"
        }
        "service_history" | "full_service" | "full_service_history" | "regular_service"
        | "regular_servicing" | "dealer_serviced" => "regular_service_claimed",
        "logbook" | "log_book" | "service_book" | "has_logbook" => "logbook_mentioned",
        "receipts" | "has_receipts" | "service_receipts" => "receipts_mentioned",
        "major_service" => "major_service_done",
        "timing_belt" | "timing_belt_replaced" => "timing_belt_done",
        "water_pump" | "water_pump_replaced" => "water_pump_done",
        "clutch" | "new_clutch" => "clutch_replaced",
        "gearbox" | "transmission" => "gearbox_rebuilt",
        "engine" | "rebuilt_engine" | "new_engine" => "engine_rebuilt",
        "tyres" | "tires" | "new_tires" => "new_tyres",
        "brakes" | "brake_pads" => "new_brakes",
        "battery" | "new_battery" => "battery_replaced",
        _ => return None,
    };
    Some(mapped)
}

pub fn normalize_red_flag_type(raw: &str) -> String {
    let token = canonical_token(raw);
    if token.is_empty() || !registry().red_flag_types().contains(token.as_str()) {
        return "other".to_string();
    }
    token
}

pub fn normalize_missing_info_type(raw: &str) -> String {
    let token = canonical_token(raw);
    if token.is_empty() {
        return "other".to_string();
    }
    if registry().missing_info_values().contains(token.as_str()) {
        return token;
    }
    let mapped = match token.as_str() {
        "service_history_none" | "no_service_history" | "service_history_missing" => {
            "service_history_unknown"
        }
        "rwc_status_none" | "no_rwc_info" => "rwc_status_unknown",
        _ => return "other".to_string(),
    };
    mapped.to_string()
}

/// Normalize and dedupe a missing_info list, same `"other"` policy as
/// `normalize_evidence_present_list`.
pub fn normalize_missing_info_list(values: &[String]) -> Vec<String> {
    let mut normalized = BTreeSet::new();
    for value in values {
        if value.is_empty() {
            continue;
        }
        let result = normalize_missing_info_type(value);
        if result != "other" || values.len() == 1 {
            normalized.insert(result);
        }
    }
    if values.len() > 1 && normalized.iter().all(|v| v == "other") {
        return Vec::new();
    }
    normalized.into_iter().collect()
}
