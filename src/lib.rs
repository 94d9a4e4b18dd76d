//! Evidence-gated signal extraction and merge engine for vehicle listings.
//!
//! Turns free-text listing titles/descriptions into a schema-valid set of
//! typed, evidence-backed risk signals. Deterministic rule detection and an
//! externally produced LLM extraction are merged with a rule-wins policy;
//! every surviving claim is traceable to verbatim source text.

pub mod config;
pub mod pipeline;
pub mod schema;

pub use pipeline::runner::{run_batch, run_pipeline, run_pipeline_safe, PipelineOutcome};
pub use pipeline::types::{Listing, ListingIntel, LlmExtraction, LlmOutcome, PipelineError};
