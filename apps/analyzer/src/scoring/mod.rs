// Criteria-based fit scoring.
// Pure, synchronous and deterministic: no LLM calls, no I/O.

pub mod adjuster;
pub mod matching;

pub use adjuster::{adjust_score, compute_breakdown, rescore};
