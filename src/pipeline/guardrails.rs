//! Deterministic guardrail rules: regex/keyword detection of high-risk
//! signals that must never be missed, independent of the LLM.
//!
//! Rules only ADD signals, always with `verification_level = verified`,
//! a fixed high confidence, and evidence sliced from the original text.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::{EVIDENCE_WINDOW_CHARS, GUARDRAIL_CONFIDENCE};
use crate::schema::{Severity, SignalCategory, VerificationLevel};

use super::text_prep::{find_evidence_span, PreparedText};
use super::types::{Signal, SignalSet};

/// A compiled rule: one pattern, one signal type.
struct GuardrailRule {
    regex: Regex,
    signal_type: &'static str,
    category: SignalCategory,
    severity: Severity,
}

fn rule(
    pattern: &str,
    signal_type: &'static str,
    category: SignalCategory,
    severity: Severity,
) -> GuardrailRule {
    GuardrailRule {
        // A malformed rule is a build/test-time defect, so expect is fine
        // here; the table is exercised by tests before any evaluation.
        regex: Regex::new(pattern).expect("invalid guardrail pattern"),
        signal_type,
        category,
        severity,
    }
}

/// The versioned rule table (see `config::RULESET_VERSION`), compiled once.
/// Patterns are word-boundary-anchored and evaluated against the lowercase
/// normalized text.
static RULES: LazyLock<Vec<GuardrailRule>> = LazyLock::new(|| {
    use SignalCategory::*;
    use Severity::*;
    vec![
        // Writeoff / salvage
        rule(r"\bwrite[\s-]?off\b", "writeoff", AccidentHistory, High),
        rule(r"\bwritten[\s-]?off\b", "writeoff", AccidentHistory, High),
        rule(r"\brepairable[\s-]?write[\s-]?off\b", "repairable_writeoff", AccidentHistory, High),
        rule(r"\bsalvage\s*title\b", "salvage_title", AccidentHistory, High),
        rule(r"\bsalvage\s*vehicle\b", "salvage_title", AccidentHistory, High),
        rule(r"\bsalvage\b", "salvage_title", AccidentHistory, High),
        rule(r"\brebuilt\s*title\b", "rebuilt_title", AccidentHistory, High),
        rule(r"\bwovr\b", "wovr_listed", AccidentHistory, High),
        rule(r"\bflood(?:ed)?\s*damaged?\b", "flood_damage", AccidentHistory, High),
        rule(r"\bwater\s*damaged?\b", "flood_damage", AccidentHistory, High),
        rule(r"\bstructural\s*damage\b", "structural_damage", AccidentHistory, High),
        rule(r"\bframe\s*damage\b", "structural_damage", AccidentHistory, High),
        rule(r"\bchassis\s*damage\b", "chassis_damage", AccidentHistory, High),
        rule(r"\bairbags?\s*deployed\b", "airbag_deployed", AccidentHistory, High),
        // Legality
        rule(r"\bdefect(?:ed)?\b", "defected", Legality, High),
        rule(r"\bunregistered\b", "unregistered", Legality, High),
        rule(r"\bunreg\b", "unregistered", Legality, High),
        rule(r"\bno\s*rego\b", "no_rego", Legality, High),
        rule(r"\brego\s*expired\b", "rego_expired", Legality, High),
        rule(r"\bno\s*rwc\b", "no_rwc", Legality, High),
        rule(r"\bwithout\s*rwc\b", "no_rwc", Legality, High),
        rule(r"\bneeds?\s*rwc\b", "rwc_required", Legality, Medium),
        rule(r"\brwc\s*required\b", "rwc_required", Legality, Medium),
        rule(r"\bnot\s*roadworthy\b", "not_roadworthy", Legality, High),
        rule(r"\binspection\s*required\b", "inspection_required", Legality, Medium),
        rule(r"\bblue\s*slip\b", "inspection_required", Legality, Medium),
        rule(r"\bpink\s*slip\b", "inspection_required", Legality, Medium),
        // Mechanical
        rule(r"\bnot\s*running\b", "not_running", MechanicalIssues, High),
        rule(r"\bwon'?t\s*start\b", "not_running", MechanicalIssues, High),
        rule(r"\bdoesn'?t\s*start\b", "starting_issue", MechanicalIssues, High),
        rule(r"\bengine\s*blown\b", "not_running", MechanicalIssues, High),
        rule(r"\bblown\s*engine\b", "not_running", MechanicalIssues, High),
        rule(r"\bengine\s*knock(?:ing)?\b", "engine_knock", MechanicalIssues, High),
        rule(r"\bknocking\b", "engine_knock", MechanicalIssues, High),
        rule(r"\boverheating\b", "engine_overheating", MechanicalIssues, High),
        rule(r"\bover\s*heats?\b", "engine_overheating", MechanicalIssues, High),
        rule(r"\bruns?\s*hot\b", "engine_overheating", MechanicalIssues, High),
        rule(r"\bgearbox\s*(?:issue|problem|fault)\b", "gearbox_issue", MechanicalIssues, High),
        rule(r"\btransmission\s*(?:issue|problem|fault)\b", "gearbox_issue", MechanicalIssues, High),
        rule(r"\bslipping\b", "slipping_transmission", MechanicalIssues, High),
        rule(r"\bslips\b", "slipping_transmission", MechanicalIssues, High),
        rule(r"\bhead\s*gasket\b", "head_gasket_suspected", MechanicalIssues, High),
        // Performance mods
        rule(r"\btuned\b", "tuned", ModsPerformance, Medium),
        rule(r"\btune\b", "tuned", ModsPerformance, Medium),
        rule(r"\becu\s*tuned?\b", "ecu_tune", ModsPerformance, Medium),
        rule(r"\bremapped\b", "ecu_tune", ModsPerformance, Medium),
        rule(r"\bstage\s*2\b", "stage_2_or_higher", ModsPerformance, High),
        rule(r"\bstage2\b", "stage_2_or_higher", ModsPerformance, High),
        rule(r"\bstage\s*3\b", "stage_2_or_higher", ModsPerformance, High),
        rule(r"\bstage3\b", "stage_2_or_higher", ModsPerformance, High),
        rule(r"\be85\b", "e85_flex_fuel", ModsPerformance, High),
        rule(r"\bflex\s*fuel\b", "e85_flex_fuel", ModsPerformance, High),
        rule(r"\btrack\s*car\b", "track_use", ModsPerformance, High),
        rule(r"\btrack\s*use\b", "track_use", ModsPerformance, High),
        rule(r"\brace\s*build\b", "race_build", ModsPerformance, High),
        rule(r"\bturbo\s*swap\b", "turbo_swap", ModsPerformance, High),
        rule(r"\bturbo\s*upgrade\b", "turbo_upgrade", ModsPerformance, High),
        rule(r"\bsupercharger\b", "supercharger", ModsPerformance, High),
        rule(r"\bengine\s*swap\b", "engine_swap", ModsPerformance, High),
        // Seller behavior
        rule(r"\bfirm\s*price\b", "firm_price", SellerBehavior, Medium),
        rule(r"\bprice\s*is\s*firm\b", "firm_price", SellerBehavior, Medium),
        rule(r"\bfixed\s*price\b", "firm_price", SellerBehavior, Medium),
        rule(r"\bno\s*low\s*ballers?\b", "no_lowballers", SellerBehavior, Low),
        rule(r"\bno\s*lowballers?\b", "no_lowballers", SellerBehavior, Low),
        rule(r"\bno\s*time\s*wasters?\b", "no_timewasters", SellerBehavior, Low),
        rule(r"\bno\s*timewasters?\b", "no_timewasters", SellerBehavior, Low),
        rule(r"\bneed\s*gone\b", "need_gone", SellerBehavior, Medium),
        rule(r"\bmust\s*sell\b", "urgent_sale", SellerBehavior, Medium),
        rule(r"\burgent\s*sale\b", "urgent_sale", SellerBehavior, Medium),
        rule(r"\bopen\s*to\s*offers\b", "open_to_offers", SellerBehavior, Low),
        rule(r"\bswaps?\b", "swap_trade", SellerBehavior, Low),
        rule(r"\btrades?\s*(?:in|welcome)\b", "swap_trade", SellerBehavior, Low),
    ]
});

/// Quick scan used for `source_text_stats.contains_keywords_high_risk`.
static HIGH_RISK_KEYWORDS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\bwrite[\s-]?off\b",
        r"\bwritten[\s-]?off\b",
        r"\bdefect(?:ed)?\b",
        r"\bnot\s*running\b",
        r"\bsalvage\b",
        r"\bflood\b",
        r"\bstructural\s*damage\b",
        r"\bstage\s*[23]\b",
        r"\be85\b",
        r"\btrack\s*(?:car|use)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid high-risk keyword pattern"))
    .collect()
});

/// Run the full rule table against the prepared text.
///
/// Pure function of the input: no I/O, deterministic, safe to cache by text
/// hash. Overlapping matches of distinct types each yield a distinct signal;
/// repeated matches of the same `(category, type, matched text)` are folded.
pub fn run_guardrails(prepared: &PreparedText) -> SignalSet {
    let mut signals = SignalSet::default();
    let mut detected: HashSet<(SignalCategory, &'static str, String)> = HashSet::new();

    for rule in RULES.iter() {
        for mat in rule.regex.find_iter(&prepared.normalized_text) {
            let key = (rule.category, rule.signal_type, mat.as_str().to_string());
            if !detected.insert(key) {
                continue;
            }

            let evidence = find_evidence_span(
                mat.as_str(),
                &prepared.combined_text,
                &prepared.sentences,
                EVIDENCE_WINDOW_CHARS,
            )
            // The match came from the same text, so this only happens when
            // the normalized form differs from the original; the matched
            // text itself is still verbatim-checkable.
            .unwrap_or_else(|| mat.as_str().to_string());

            signals.category_mut(rule.category).push(Signal {
                signal_type: rule.signal_type.to_string(),
                severity: rule.severity,
                verification_level: VerificationLevel::Verified,
                evidence_text: evidence,
                confidence: GUARDRAIL_CONFIDENCE,
            });
        }
    }

    tracing::debug!(total = signals.total(), "guardrails evaluated");
    signals
}

/// True when the text contains any of the highest-risk keywords.
pub fn contains_high_risk_keywords(text: &str) -> bool {
    let lower = text.to_lowercase();
    HIGH_RISK_KEYWORDS.iter().any(|r| r.is_match(&lower))
}
