//! Transcript analysis: prompts, the orchestrating pipeline, and output validation.

pub mod pipeline;
pub mod prompts;
pub mod validation;

pub use pipeline::{AnalysisOutcome, Analyzer, AnalyzerSettings};
pub use validation::{ValidationIssue, ValidationReport};
