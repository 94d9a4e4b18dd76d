use serde::{Deserialize, Serialize};

/// Severity of a detected signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Parse a producer-reported severity string. Unknown values map to None
    /// so the normalizer can apply its own default.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// How strongly the evidence backs a signal. Verified means explicit wording;
/// inferred means indirect wording that is still evidence-backed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationLevel {
    Verified,
    Inferred,
}

impl VerificationLevel {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "verified" => Some(Self::Verified),
            "inferred" => Some(Self::Inferred),
            _ => None,
        }
    }
}

/// The seven fixed signal categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SignalCategory {
    Legality,
    AccidentHistory,
    MechanicalIssues,
    CosmeticIssues,
    ModsPerformance,
    ModsCosmetic,
    SellerBehavior,
}

impl SignalCategory {
    pub const ALL: [SignalCategory; 7] = [
        SignalCategory::Legality,
        SignalCategory::AccidentHistory,
        SignalCategory::MechanicalIssues,
        SignalCategory::CosmeticIssues,
        SignalCategory::ModsPerformance,
        SignalCategory::ModsCosmetic,
        SignalCategory::SellerBehavior,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalCategory::Legality => "legality",
            SignalCategory::AccidentHistory => "accident_history",
            SignalCategory::MechanicalIssues => "mechanical_issues",
            SignalCategory::CosmeticIssues => "cosmetic_issues",
            SignalCategory::ModsPerformance => "mods_performance",
            SignalCategory::ModsCosmetic => "mods_cosmetic",
            SignalCategory::SellerBehavior => "seller_behavior",
        }
    }
}

/// Overall risk summary across all high-impact signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Unknown,
    Low,
    Medium,
    High,
}

/// Risk contributed by performance modifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModsRiskLevel {
    None,
    Low,
    Medium,
    High,
    Unknown,
}

/// How well the service history is documented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceHistoryLevel {
    None,
    Partial,
    Full,
    Unknown,
}

/// Seller's stated flexibility on price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationStance {
    Open,
    Firm,
    Unknown,
}

/// Condition the listing claims, cross-checked against detected signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimedCondition {
    Excellent,
    Good,
    Fair,
    NeedsWork,
    Unknown,
}
