//! Pipeline orchestration: one listing in, one validated envelope out.
//!
//! Step order is fixed: prepare text, run guardrails, normalize and verify
//! the LLM stream (or degrade to rule-only), merge, derive, validate. The
//! caller gets either a fully schema-valid envelope or an error; a partially
//! valid payload is never returned.

use std::collections::BTreeSet;

use chrono::Utc;

use crate::config::{RULESET_VERSION, SHORT_DESCRIPTION_THRESHOLD, STAGE_NAME, STAGE_VERSION};

use super::derived::{compute_derived_fields, compute_missing_info, detect_condition_wording};
use super::guardrails::{contains_high_risk_keywords, run_guardrails};
use super::merger::{merge_maintenance, merge_signals};
use super::normalizer::{normalize_extraction, NormalizedExtraction};
use super::text_prep::normalize_text;
use super::types::{
    Listing, ListingIntel, LlmOutcome, Payload, PipelineError, SignalSet, SourceTextStats,
};
use super::validator::validate;
use super::verifier::verify_extraction;

/// Run the full pipeline for one listing.
///
/// `snapshot_id` identifies the source snapshot this run was fed from;
/// callers without a snapshotting layer may pass None to key by listing_id.
pub fn run_pipeline(
    listing: &Listing,
    snapshot_id: Option<&str>,
    llm: LlmOutcome,
) -> Result<ListingIntel, PipelineError> {
    if listing.listing_id.trim().is_empty() {
        return Err(PipelineError::MalformedInput(
            "listing_id is required".to_string(),
        ));
    }

    let prepared = normalize_text(&listing.title, &listing.description);
    let rule_signals = run_guardrails(&prepared);

    let mut llm_version = None;
    let (verified, stats) = match llm {
        LlmOutcome::Available(extraction) => {
            llm_version = extraction.model.clone();
            let normalized = normalize_extraction(extraction);
            verify_extraction(normalized, &prepared.combined_text)
        }
        LlmOutcome::Unavailable(reason) => {
            tracing::warn!(
                listing_id = %listing.listing_id,
                %reason,
                "llm extraction unavailable, continuing rule-only"
            );
            let fallback = NormalizedExtraction {
                extraction_warnings: vec![format!("llm_extraction_unavailable: {reason}")],
                ..Default::default()
            };
            (fallback, Default::default())
        }
    };

    tracing::debug!(
        listing_id = %listing.listing_id,
        rule_signals = rule_signals.total(),
        llm_verified = stats.verified,
        llm_inferred = stats.inferred,
        llm_rejected = stats.rejected,
        "signal streams ready"
    );

    let signals = merge_signals(rule_signals, verified.signals);
    let maintenance = merge_maintenance(verified.maintenance);

    let wording = detect_condition_wording(&prepared.combined_text);
    let derived = compute_derived_fields(&signals, &maintenance, wording);

    // Union the LLM-reported gaps with the rule-side derivation, sorted.
    let missing_info: Vec<String> = verified
        .missing_info
        .into_iter()
        .chain(compute_missing_info(&signals, &maintenance))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut extraction_warnings = verified.extraction_warnings;
    if prepared.original_description.chars().count() < SHORT_DESCRIPTION_THRESHOLD {
        extraction_warnings.push("short_description".to_string());
    }

    let source_text_stats = SourceTextStats {
        title_length: prepared.original_title.chars().count(),
        description_length: prepared.original_description.chars().count(),
        contains_keywords_high_risk: contains_high_risk_keywords(&prepared.combined_text),
    };

    let output = ListingIntel {
        listing_id: listing.listing_id.clone(),
        source_snapshot_id: snapshot_id.unwrap_or(&listing.listing_id).to_string(),
        created_at: Utc::now(),
        stage_name: STAGE_NAME.to_string(),
        stage_version: STAGE_VERSION.to_string(),
        ruleset_version: RULESET_VERSION.to_string(),
        llm_version,
        payload: Payload {
            risk_level_overall: derived.risk_level_overall,
            negotiation_stance: derived.negotiation_stance,
            claimed_condition: derived.claimed_condition,
            service_history_level: derived.service_history_level,
            mods_risk_level: derived.mods_risk_level,
            signals,
            maintenance,
            missing_info,
            extraction_warnings,
            source_text_stats,
        },
    };

    let report = validate(&output);
    if !report.is_valid() {
        tracing::error!(
            listing_id = %listing.listing_id,
            errors = ?report.errors,
            "output failed schema validation, withholding payload"
        );
        return Err(PipelineError::SchemaViolation {
            errors: report.errors,
        });
    }

    Ok(output)
}

/// Rule-only evaluation, for callers that want the guardrail stream without
/// an envelope (spot checks, rule table audits).
pub fn run_guardrails_only(listing: &Listing) -> SignalSet {
    run_guardrails(&normalize_text(&listing.title, &listing.description))
}

/// Per-listing batch result. Exactly one of `output`/`error` is set.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub listing_id: String,
    pub output: Option<ListingIntel>,
    pub error: Option<String>,
}

/// Error-capturing wrapper used by batch processing: one bad listing must
/// not abort the rest.
pub fn run_pipeline_safe(
    listing: &Listing,
    snapshot_id: Option<&str>,
    llm: LlmOutcome,
) -> PipelineOutcome {
    match run_pipeline(listing, snapshot_id, llm) {
        Ok(output) => PipelineOutcome {
            listing_id: listing.listing_id.clone(),
            output: Some(output),
            error: None,
        },
        Err(error) => PipelineOutcome {
            listing_id: listing.listing_id.clone(),
            output: None,
            error: Some(error.to_string()),
        },
    }
}

/// Process a batch of listings sequentially. Runs are independent, so a
/// caller needing throughput can shard the batch across threads instead.
pub fn run_batch(listings: Vec<(Listing, LlmOutcome)>) -> Vec<PipelineOutcome> {
    let total = listings.len();
    let outcomes: Vec<PipelineOutcome> = listings
        .into_iter()
        .map(|(listing, llm)| run_pipeline_safe(&listing, None, llm))
        .collect();
    let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
    tracing::info!(total, failed, "batch complete");
    outcomes
}
