use thiserror::Error;

use crate::llm_client::LlmError;

/// Application-level error type returned by the analysis pipeline.
///
/// Malformed model output is never an error here: JSON recovery always yields
/// a profile, at worst a flagged fallback.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Historical source '{source_name}' failed: {message}")]
    Source {
        source_name: String,
        message: String,
    },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code, mirrored in CLI error output.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Llm(LlmError::Timeout { .. }) => "LLM_TIMEOUT",
            AppError::Llm(LlmError::Auth { .. }) => "LLM_AUTH",
            AppError::Llm(LlmError::RateLimited { .. }) => "LLM_RATE_LIMITED",
            AppError::Llm(_) => "LLM_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Source { .. } => "SOURCE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
