//! Remote document extraction over HTTP.
//!
//! Uploads the file as multipart form data to `{base_url}/{route.endpoint}`
//! and expects a JSON object of extracted fields back.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::{debug, warn};

use super::{DocumentExtractor, remove_none_values};
use crate::error::ExtractionError;
use crate::pipeline::dispatch::DocumentRoute;

/// Extraction service client.
pub struct HttpDocumentExtractor {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpDocumentExtractor {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ExtractionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractionError::RequestFailed {
                capability: "http".to_string(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            client,
        })
    }

    fn endpoint_url(&self, route: &DocumentRoute) -> String {
        format!("{}/{}", self.base_url, route.endpoint)
    }

    fn request_error(&self, route: &DocumentRoute, e: reqwest::Error) -> ExtractionError {
        if e.is_timeout() {
            ExtractionError::Timeout {
                capability: route.tool.to_string(),
                timeout: self.timeout,
            }
        } else {
            ExtractionError::RequestFailed {
                capability: route.tool.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl DocumentExtractor for HttpDocumentExtractor {
    fn name(&self) -> &str {
        "http"
    }

    async fn extract_document(
        &self,
        path: &str,
        route: &DocumentRoute,
    ) -> Result<Value, ExtractionError> {
        let file_name = Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document");

        let file_bytes = tokio::fs::read(path).await?;
        let size = file_bytes.len();
        let part = Part::bytes(file_bytes).file_name(file_name.to_string());
        let form = Form::new()
            .text("document_type", route.document_type.as_str())
            .part("file", part);

        let url = self.endpoint_url(route);
        debug!(tool = route.tool, url = %url, size, "Uploading document for extraction");

        let resp = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.request_error(route, e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.request_error(route, e))?;

        if !status.is_success() {
            warn!(tool = route.tool, %status, "Extraction service returned an error");
            return Err(ExtractionError::RequestFailed {
                capability: route.tool.to_string(),
                reason: format!("HTTP {status}: {}", body.chars().take(200).collect::<String>()),
            });
        }

        let value: Value =
            serde_json::from_str(&body).map_err(|e| ExtractionError::MalformedOutput {
                capability: route.tool.to_string(),
                reason: format!("response is not JSON: {e}"),
            })?;

        if !value.is_object() {
            return Err(ExtractionError::MalformedOutput {
                capability: route.tool.to_string(),
                reason: "response is not a JSON object".to_string(),
            });
        }

        Ok(remove_none_values(value))
    }
}
