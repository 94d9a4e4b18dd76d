/// Stage identity recorded on every output envelope.
pub const STAGE_NAME: &str = "listing_description_intelligence";

/// Version of the pipeline logic.
pub const STAGE_VERSION: &str = "v1.0.0";

/// Version of the guardrail rule table. Bump whenever a rule is added,
/// removed, or has its type/severity changed.
pub const RULESET_VERSION: &str = "v1.0";

/// Confidence assigned to every guardrail-detected signal.
pub const GUARDRAIL_CONFIDENCE: f64 = 0.95;

/// Confidence clamp when evidence matches an explicit marker (forced verified).
pub const EXPLICIT_CONFIDENCE_RANGE: (f64, f64) = (0.90, 1.00);

/// Confidence clamp when evidence matches an implicit marker (forced inferred).
pub const IMPLICIT_CONFIDENCE_RANGE: (f64, f64) = (0.40, 0.85);

/// Confidence clamp when evidence matches neither lexicon. Ambiguous wording
/// never defaults to verified.
pub const AMBIGUOUS_CONFIDENCE_RANGE: (f64, f64) = (0.40, 0.70);

/// Character window for evidence extraction when no sentence boundary is usable.
pub const EVIDENCE_WINDOW_CHARS: usize = 200;

/// Descriptions shorter than this get an extraction warning.
pub const SHORT_DESCRIPTION_THRESHOLD: usize = 30;
