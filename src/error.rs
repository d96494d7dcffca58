//! Error types for freight-intake.

use std::time::Duration;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Failures of an extraction capability for a single item (one attachment
/// or one text block). Always contained at the item level.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("{capability} request failed: {reason}")]
    RequestFailed { capability: String, reason: String },

    #[error("{capability} timed out after {timeout:?}")]
    Timeout {
        capability: String,
        timeout: Duration,
    },

    #[error("{capability} returned malformed output: {reason}")]
    MalformedOutput { capability: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

impl ExtractionError {
    /// Whether the capability answered but its payload could not be parsed.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedOutput { .. })
    }
}

/// Classification-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    #[error("Invalid document type: {label}")]
    InvalidDocumentType { label: String },

    #[error("Unknown intent: {label}")]
    UnknownIntent { label: String },

    #[error("Malformed classifier response: {0}")]
    MalformedResponse(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

/// Mail intake errors.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Unparseable message: {0}")]
    Unparseable(String),

    #[error("Sender not allowed: {0:?}")]
    SenderNotAllowed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
