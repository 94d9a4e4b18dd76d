//! Evidence verification: the anti-hallucination gate on LLM output.
//!
//! Every LLM-proposed signal, maintenance claim, and red flag must quote
//! evidence found verbatim in the original text or it is rejected. Surviving
//! items get their verification level and confidence re-derived from the
//! wording of the evidence itself; the producer's self-reported values are
//! only a starting point inside the clamp.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::{
    AMBIGUOUS_CONFIDENCE_RANGE, EXPLICIT_CONFIDENCE_RANGE, IMPLICIT_CONFIDENCE_RANGE,
};
use crate::schema::VerificationLevel;

use super::normalizer::NormalizedExtraction;
use super::text_prep::{check_evidence_exists, collapse_whitespace};
use super::types::Signal;

/// Counters from one verification pass, logged per listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifierStats {
    pub verified: usize,
    pub inferred: usize,
    pub rejected: usize,
}

/// Wording class of an evidence span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EvidenceClass {
    Explicit,
    Implicit,
    Ambiguous,
}

/// Definitive wording that warrants a verified level on its own.
static EXPLICIT_MARKERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\bwrite[\s-]?off\b",
        r"\bwritten[\s-]?off\b",
        r"\bdefect(?:ed)?\b",
        r"\bunregistered\b",
        r"\bno\s+rego\b",
        r"\bno\s+rwc\b",
        r"\bnot\s+running\b",
        r"\bwon'?t\s+start\b",
        r"\bengine\s+blown\b",
        r"\bhead\s+gasket\b",
        r"\bflood(?:ed)?\s+damage\b",
        r"\bsalvage\b",
        r"\btuned\b",
        r"\bstage\s*[23]\b",
        r"\be85\b",
        r"\btrack\s*(?:car|use|build)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid explicit marker pattern"))
    .collect()
});

/// Hedged wording that caps a signal at inferred.
const IMPLICIT_MARKERS: &[&str] = &[
    "needs love",
    "bit of love",
    "needs work",
    "easy fix",
    "minor issue",
    "small problem",
    "could be",
    "might need",
    "may need",
    "not sure",
    "possibly",
    "seems to",
];

fn classify_evidence(evidence: &str) -> EvidenceClass {
    let lower = evidence.to_lowercase();
    if EXPLICIT_MARKERS.iter().any(|r| r.is_match(&lower)) {
        return EvidenceClass::Explicit;
    }
    if IMPLICIT_MARKERS.iter().any(|p| lower.contains(p)) {
        return EvidenceClass::Implicit;
    }
    EvidenceClass::Ambiguous
}

/// Re-derive (level, confidence) from the evidence wording. The producer's
/// confidence survives only where it fits inside the class clamp; ambiguous
/// wording never reaches the verified floor.
fn classify(evidence: &str, producer_confidence: f64) -> (VerificationLevel, f64) {
    let (level, (lo, hi)) = match classify_evidence(evidence) {
        EvidenceClass::Explicit => (VerificationLevel::Verified, EXPLICIT_CONFIDENCE_RANGE),
        EvidenceClass::Implicit => (VerificationLevel::Inferred, IMPLICIT_CONFIDENCE_RANGE),
        EvidenceClass::Ambiguous => (VerificationLevel::Inferred, AMBIGUOUS_CONFIDENCE_RANGE),
    };
    (level, producer_confidence.clamp(lo, hi))
}

/// Gate one signal: reject unless the evidence is a verbatim quote, then
/// re-derive its verification level and confidence.
fn verify_signal(mut signal: Signal, original_text: &str) -> Option<Signal> {
    let evidence = collapse_whitespace(&signal.evidence_text);
    if !check_evidence_exists(&evidence, original_text) {
        return None;
    }
    let (level, confidence) = classify(&evidence, signal.confidence);
    signal.evidence_text = evidence;
    signal.verification_level = level;
    signal.confidence = confidence;
    Some(signal)
}

/// Verify a whole normalized extraction against the original text.
///
/// Rejected items are removed silently; counts are returned for logging.
/// `evidence_present`, `missing_info`, and warnings carry no evidence text
/// and pass through untouched.
pub fn verify_extraction(
    extraction: NormalizedExtraction,
    original_text: &str,
) -> (NormalizedExtraction, VerifierStats) {
    let mut stats = VerifierStats::default();
    let mut out = NormalizedExtraction {
        missing_info: extraction.missing_info,
        extraction_warnings: extraction.extraction_warnings,
        ..Default::default()
    };

    for category in crate::schema::SignalCategory::ALL {
        let verified = out.signals.category_mut(category);
        for signal in extraction.signals.category(category).iter().cloned() {
            match verify_signal(signal, original_text) {
                Some(signal) => {
                    stats.count(signal.verification_level);
                    verified.push(signal);
                }
                None => stats.rejected += 1,
            }
        }
    }

    for mut claim in extraction.maintenance.claims {
        let evidence = collapse_whitespace(&claim.evidence_text);
        if !check_evidence_exists(&evidence, original_text) {
            stats.rejected += 1;
            continue;
        }
        let (level, confidence) = classify(&evidence, claim.confidence);
        claim.evidence_text = evidence;
        claim.verification_level = level;
        claim.confidence = confidence;
        stats.count(level);
        out.maintenance.claims.push(claim);
    }

    for flag in extraction.maintenance.red_flags {
        match verify_signal(flag, original_text) {
            Some(flag) => {
                stats.count(flag.verification_level);
                out.maintenance.red_flags.push(flag);
            }
            None => stats.rejected += 1,
        }
    }

    out.maintenance.evidence_present = extraction.maintenance.evidence_present;

    if stats.rejected > 0 {
        tracing::debug!(
            rejected = stats.rejected,
            verified = stats.verified,
            inferred = stats.inferred,
            "rejected items with fabricated or missing evidence"
        );
    }

    (out, stats)
}

impl VerifierStats {
    fn count(&mut self, level: VerificationLevel) {
        match level {
            VerificationLevel::Verified => self.verified += 1,
            VerificationLevel::Inferred => self.inferred += 1,
        }
    }

    pub fn total_kept(&self) -> usize {
        self.verified + self.inferred
    }
}
