pub mod enums;
pub mod registry;

pub use enums::{
    ClaimedCondition, ModsRiskLevel, NegotiationStance, RiskLevel, ServiceHistoryLevel, Severity,
    SignalCategory, VerificationLevel,
};
pub use registry::{registry, EnumRegistry};
