//! Text-extraction handler.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{info, warn};

use crate::capability::TextExtractor;
use crate::error::ExtractionError;
use crate::pipeline::summary::summarize;
use crate::pipeline::types::{EmailInput, NormalizedResponse, error_entry};

/// Error text when the capability answered with something unparseable.
pub const MALFORMED_OUTPUT_ERROR: &str = "Failed to parse structured data from input";

/// Produces `TEXT_DATA_EXTRACTION` responses from the email body.
pub struct TextHandler {
    extractor: Arc<dyn TextExtractor>,
    deadline: Option<Duration>,
}

impl TextHandler {
    pub fn new(extractor: Arc<dyn TextExtractor>) -> Self {
        Self {
            extractor,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub async fn handle(&self, input: &EmailInput) -> NormalizedResponse {
        let call = self.extractor.extract_from_text(&input.body);
        let result = match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, call)
                .await
                .unwrap_or_else(|_| {
                    Err(ExtractionError::Timeout {
                        capability: self.extractor.name().to_string(),
                        timeout: deadline,
                    })
                }),
            None => call.await,
        };

        let extracted_data = match result {
            Ok(data) => {
                info!(
                    email_id = %input.log_id(),
                    extractor = self.extractor.name(),
                    "Text extraction complete"
                );
                data
            }
            Err(e) => {
                warn!(
                    email_id = %input.log_id(),
                    extractor = self.extractor.name(),
                    error = %e,
                    "Text extraction failed"
                );
                failure_entry(&e)
            }
        };

        NormalizedResponse::TextDataExtraction {
            email_summary: summarize(&input.body),
            extracted_data,
        }
    }
}

fn failure_entry(e: &ExtractionError) -> Value {
    if e.is_malformed() {
        error_entry(MALFORMED_OUTPUT_ERROR)
    } else {
        error_entry(format!("Text extraction failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    enum Script {
        Reply(Value),
        Malformed,
        Down,
        Stall,
    }

    struct ScriptedText(Script);

    #[async_trait]
    impl TextExtractor for ScriptedText {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn extract_from_text(&self, _raw_text: &str) -> Result<Value, ExtractionError> {
            match &self.0 {
                Script::Reply(v) => Ok(v.clone()),
                Script::Malformed => Err(ExtractionError::MalformedOutput {
                    capability: "scripted".into(),
                    reason: "not json".into(),
                }),
                Script::Down => Err(ExtractionError::RequestFailed {
                    capability: "scripted".into(),
                    reason: "connection refused".into(),
                }),
                Script::Stall => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(json!({}))
                }
            }
        }
    }

    fn extracted(response: NormalizedResponse) -> Value {
        match response {
            NormalizedResponse::TextDataExtraction { extracted_data, .. } => extracted_data,
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn passes_capability_output_through() {
        let data = json!({"shipment_id": "ABC123", "eta": null});
        let handler = TextHandler::new(Arc::new(ScriptedText(Script::Reply(data.clone()))));
        let response = handler.handle(&EmailInput::text("Shipment ABC123 delayed")).await;
        assert_eq!(response.email_summary(), "Shipment ABC123 delayed");
        assert_eq!(extracted(response), data);
    }

    #[tokio::test]
    async fn malformed_output_has_fixed_error() {
        let handler = TextHandler::new(Arc::new(ScriptedText(Script::Malformed)));
        let data = extracted(handler.handle(&EmailInput::text("x")).await);
        assert_eq!(data, json!({"error": MALFORMED_OUTPUT_ERROR}));
    }

    #[tokio::test]
    async fn other_failures_carry_reason() {
        let handler = TextHandler::new(Arc::new(ScriptedText(Script::Down)));
        let data = extracted(handler.handle(&EmailInput::text("x")).await);
        let message = data["error"].as_str().unwrap();
        assert!(message.starts_with("Text extraction failed: "));
        assert!(message.contains("connection refused"));
    }

    #[tokio::test]
    async fn deadline_is_a_failure() {
        let handler = TextHandler::new(Arc::new(ScriptedText(Script::Stall)))
            .with_deadline(Duration::from_millis(50));
        let data = extracted(handler.handle(&EmailInput::text("x")).await);
        assert!(data["error"].as_str().unwrap().contains("timed out"));
    }
}
