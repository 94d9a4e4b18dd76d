use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::{
    ClaimedCondition, ModsRiskLevel, NegotiationStance, RiskLevel, ServiceHistoryLevel, Severity,
    SignalCategory, VerificationLevel,
};

use super::text_prep::collapse_whitespace;

/// A typed, evidence-backed observation about a listing.
///
/// Invariant: `evidence_text` is a verbatim (case-insensitive,
/// whitespace-normalized) substring of the listing's combined text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    #[serde(rename = "type")]
    pub signal_type: String,
    pub severity: Severity,
    pub verification_level: VerificationLevel,
    pub evidence_text: String,
    pub confidence: f64,
}

impl Signal {
    /// Key identifying duplicate signals across detectors:
    /// `(type, lowercase whitespace-collapsed evidence)`.
    pub fn dedup_key(&self) -> (String, String) {
        (
            self.signal_type.clone(),
            collapse_whitespace(&self.evidence_text.to_lowercase()),
        )
    }
}

/// One ordered signal list per category. Final output order is stable
/// (sorted by type then normalized evidence) so repeated runs on identical
/// input are byte-identical.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalSet {
    pub legality: Vec<Signal>,
    pub accident_history: Vec<Signal>,
    pub mechanical_issues: Vec<Signal>,
    pub cosmetic_issues: Vec<Signal>,
    pub mods_performance: Vec<Signal>,
    pub mods_cosmetic: Vec<Signal>,
    pub seller_behavior: Vec<Signal>,
}

impl SignalSet {
    pub fn category(&self, category: SignalCategory) -> &Vec<Signal> {
        match category {
            SignalCategory::Legality => &self.legality,
            SignalCategory::AccidentHistory => &self.accident_history,
            SignalCategory::MechanicalIssues => &self.mechanical_issues,
            SignalCategory::CosmeticIssues => &self.cosmetic_issues,
            SignalCategory::ModsPerformance => &self.mods_performance,
            SignalCategory::ModsCosmetic => &self.mods_cosmetic,
            SignalCategory::SellerBehavior => &self.seller_behavior,
        }
    }

    pub fn category_mut(&mut self, category: SignalCategory) -> &mut Vec<Signal> {
        match category {
            SignalCategory::Legality => &mut self.legality,
            SignalCategory::AccidentHistory => &mut self.accident_history,
            SignalCategory::MechanicalIssues => &mut self.mechanical_issues,
            SignalCategory::CosmeticIssues => &mut self.cosmetic_issues,
            SignalCategory::ModsPerformance => &mut self.mods_performance,
            SignalCategory::ModsCosmetic => &mut self.mods_cosmetic,
            SignalCategory::SellerBehavior => &mut self.seller_behavior,
        }
    }

    /// Iterate every signal with its category.
    pub fn iter(&self) -> impl Iterator<Item = (SignalCategory, &Signal)> {
        SignalCategory::ALL
            .into_iter()
            .flat_map(|c| self.category(c).iter().map(move |s| (c, s)))
    }

    pub fn total(&self) -> usize {
        SignalCategory::ALL
            .into_iter()
            .map(|c| self.category(c).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// A maintenance claim made by the seller, always evidence-backed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceClaim {
    #[serde(rename = "type")]
    pub claim_type: String,
    pub details: Option<String>,
    pub evidence_text: String,
    pub confidence: f64,
    pub verification_level: VerificationLevel,
}

impl MaintenanceClaim {
    pub fn dedup_key(&self) -> (String, String) {
        (
            self.claim_type.clone(),
            collapse_whitespace(&self.evidence_text.to_lowercase()),
        )
    }
}

/// Maintenance section: claims and red flags come only from the LLM side;
/// evidence_present is a deduplicated, sorted enum-value list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceSection {
    pub claims: Vec<MaintenanceClaim>,
    pub evidence_present: Vec<String>,
    pub red_flags: Vec<Signal>,
}

/// The five summary fields derived purely from the final signal set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedFields {
    pub risk_level_overall: RiskLevel,
    pub mods_risk_level: ModsRiskLevel,
    pub service_history_level: ServiceHistoryLevel,
    pub negotiation_stance: NegotiationStance,
    pub claimed_condition: ClaimedCondition,
}

/// Raw listing input. `listing_id` is required; missing title/description
/// map to empty strings rather than failing the run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Listing {
    pub listing_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub mileage: Option<u64>,
    #[serde(default)]
    pub vehicle_type: Option<String>,
}

/// One signal as proposed by the external LLM collaborator, before
/// normalization. Every field except evidence is tolerated missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSignal {
    #[serde(rename = "type", default)]
    pub signal_type: String,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub verification_level: Option<String>,
    #[serde(default)]
    pub evidence_text: String,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSignalSet {
    #[serde(default)]
    pub legality: Vec<RawSignal>,
    #[serde(default)]
    pub accident_history: Vec<RawSignal>,
    #[serde(default)]
    pub mechanical_issues: Vec<RawSignal>,
    #[serde(default)]
    pub cosmetic_issues: Vec<RawSignal>,
    #[serde(default)]
    pub mods_performance: Vec<RawSignal>,
    #[serde(default)]
    pub mods_cosmetic: Vec<RawSignal>,
    #[serde(default)]
    pub seller_behavior: Vec<RawSignal>,
}

impl RawSignalSet {
    pub fn take_category(&mut self, category: SignalCategory) -> Vec<RawSignal> {
        let list = match category {
            SignalCategory::Legality => &mut self.legality,
            SignalCategory::AccidentHistory => &mut self.accident_history,
            SignalCategory::MechanicalIssues => &mut self.mechanical_issues,
            SignalCategory::CosmeticIssues => &mut self.cosmetic_issues,
            SignalCategory::ModsPerformance => &mut self.mods_performance,
            SignalCategory::ModsCosmetic => &mut self.mods_cosmetic,
            SignalCategory::SellerBehavior => &mut self.seller_behavior,
        };
        std::mem::take(list)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMaintenanceClaim {
    #[serde(rename = "type", default)]
    pub claim_type: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub evidence_text: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub verification_level: Option<String>,
}

/// Raw maintenance section. `evidence_present` items arrive as either plain
/// strings or `{"type": ...}` objects depending on the producer, so they are
/// kept as JSON values until the normalizer extracts them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMaintenance {
    #[serde(default)]
    pub claims: Vec<RawMaintenanceClaim>,
    #[serde(default)]
    pub evidence_present: Vec<serde_json::Value>,
    #[serde(default)]
    pub red_flags: Vec<RawSignal>,
}

/// Parsed output of the external LLM collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmExtraction {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub signals: RawSignalSet,
    #[serde(default)]
    pub maintenance: RawMaintenance,
    #[serde(default)]
    pub missing_info: Vec<String>,
    #[serde(default)]
    pub extraction_warnings: Vec<String>,
}

/// Result of the external LLM call, as seen by this core. How the result was
/// obtained (retries, timeouts, caching) is the collaborator's business.
#[derive(Debug, Clone)]
pub enum LlmOutcome {
    Available(LlmExtraction),
    /// Collaborator absent, failed, or unparseable. Carries the reason for
    /// the extraction warning on the output.
    Unavailable(String),
}

/// Per-listing character counts and a quick high-risk keyword flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceTextStats {
    pub title_length: usize,
    pub description_length: usize,
    pub contains_keywords_high_risk: bool,
}

/// The payload consumers treat as immutable ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub risk_level_overall: RiskLevel,
    pub negotiation_stance: NegotiationStance,
    pub claimed_condition: ClaimedCondition,
    pub service_history_level: ServiceHistoryLevel,
    pub mods_risk_level: ModsRiskLevel,
    pub signals: SignalSet,
    pub maintenance: MaintenanceSection,
    pub missing_info: Vec<String>,
    pub extraction_warnings: Vec<String>,
    pub source_text_stats: SourceTextStats,
}

/// Output envelope. Downstream storage keys by
/// `(listing_id, source_snapshot_id, stage_version)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingIntel {
    pub listing_id: String,
    pub source_snapshot_id: String,
    pub created_at: DateTime<Utc>,
    pub stage_name: String,
    pub stage_version: String,
    pub ruleset_version: String,
    pub llm_version: Option<String>,
    pub payload: Payload,
}

/// Pipeline-surface errors. Signal-level issues (unverifiable evidence,
/// merge collisions) are resolved silently inside the pipeline and never
/// reach this enum.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input refused before any processing (e.g. missing listing_id).
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Final payload failed validation. The invalid payload is withheld.
    #[error("schema validation failed: {}", .errors.join("; "))]
    SchemaViolation { errors: Vec<String> },
}
