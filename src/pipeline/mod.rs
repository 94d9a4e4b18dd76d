pub mod derived;
pub mod guardrails;
pub mod merger;
pub mod normalizer;
pub mod runner;
pub mod text_prep;
pub mod types;
pub mod validator;
pub mod verifier;
