//! Extraction capabilities.
//!
//! The pipeline treats extraction as a black box behind two traits:
//! - [`DocumentExtractor`]: one document file → structured fields
//! - [`TextExtractor`]: raw email text → structured logistics data
//!
//! Implementations:
//! - `mock`: deterministic stub fields per document type
//! - `http`: multipart upload to a remote extraction service
//! - `llm_text`: LLM-backed text structuring
//! - `heuristic`: offline regex-based text structuring

pub mod heuristic;
pub mod http;
pub mod llm_text;
pub mod mock;

pub use heuristic::HeuristicTextExtractor;
pub use http::HttpDocumentExtractor;
pub use llm_text::LlmTextExtractor;
pub use mock::MockDocumentExtractor;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ExtractionError;
use crate::pipeline::dispatch::DocumentRoute;

/// Extracts structured fields from one document file.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// Capability name for logs.
    fn name(&self) -> &str;

    async fn extract_document(
        &self,
        path: &str,
        route: &DocumentRoute,
    ) -> Result<Value, ExtractionError>;
}

/// Structures free-form logistics text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Capability name for logs.
    fn name(&self) -> &str;

    async fn extract_from_text(&self, raw_text: &str) -> Result<Value, ExtractionError>;
}

/// Drop `null` values from objects and arrays, recursively.
pub fn remove_none_values(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, remove_none_values(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .filter(|v| !v.is_null())
                .map(remove_none_values)
                .collect(),
        ),
        other => other,
    }
}
