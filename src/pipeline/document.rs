//! Document-extraction handler.
//!
//! Runs each planned attachment through the dispatch table, one at a time,
//! and assembles `tool_outputs` keyed by attachment. A failure on one
//! attachment becomes that attachment's `{"error": ...}` entry; the others
//! are unaffected.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::capability::DocumentExtractor;
use crate::error::{ClassificationError, ExtractionError};
use crate::pipeline::dispatch::route;
use crate::pipeline::summary::summarize;
use crate::pipeline::types::{
    AttachmentPlan, DocumentAssignment, EmailInput, NormalizedResponse, ToolOutputs, error_entry,
};

/// Produces `DATA_EXTRACTION_REQUESTED` responses.
pub struct DocumentHandler {
    extractor: Arc<dyn DocumentExtractor>,
    deadline: Option<Duration>,
}

impl DocumentHandler {
    pub fn new(extractor: Arc<dyn DocumentExtractor>) -> Self {
        Self {
            extractor,
            deadline: None,
        }
    }

    /// Per-attachment deadline. Expiry is recorded like any other failure.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub async fn handle(&self, input: &EmailInput, attachments: &[AttachmentPlan]) -> NormalizedResponse {
        let mut tool_outputs = ToolOutputs::new();

        for plan in attachments {
            let output = self.extract_one(input, plan).await;
            tool_outputs.insert(plan.key.clone(), output);
        }

        let failed = tool_outputs.values().filter(|v| is_error_entry(v)).count();
        info!(
            email_id = %input.log_id(),
            attachments = tool_outputs.len(),
            failed,
            "Document extraction complete"
        );

        NormalizedResponse::DataExtractionRequested {
            email_summary: summarize(&input.body),
            tool_outputs,
        }
    }

    async fn extract_one(&self, input: &EmailInput, plan: &AttachmentPlan) -> Value {
        let document_type = match &plan.document {
            DocumentAssignment::Typed { document_type } => *document_type,
            DocumentAssignment::Unresolved { reason } => {
                warn!(
                    email_id = %input.log_id(),
                    attachment = %plan.key,
                    reason = %reason,
                    "Document type unresolved"
                );
                return error_entry(format!("Could not determine document type: {reason}"));
            }
            DocumentAssignment::Invalid { label } => {
                let err = ClassificationError::InvalidDocumentType {
                    label: label.clone(),
                };
                error!(
                    email_id = %input.log_id(),
                    attachment = %plan.key,
                    error = %err,
                    "Classifier produced an unknown document type"
                );
                return error_entry(err.to_string());
            }
        };

        let route = route(document_type);
        debug!(
            email_id = %input.log_id(),
            attachment = %plan.key,
            document_type = %document_type,
            tool = route.tool,
            "Dispatching attachment"
        );

        let call = self.extractor.extract_document(&plan.path, route);
        let result = match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, call)
                .await
                .unwrap_or_else(|_| {
                    Err(ExtractionError::Timeout {
                        capability: route.tool.to_string(),
                        timeout: deadline,
                    })
                }),
            None => call.await,
        };

        match result {
            Ok(fields) => fields,
            Err(e) => {
                warn!(
                    email_id = %input.log_id(),
                    attachment = %plan.key,
                    document_type = %document_type,
                    error = %e,
                    "Attachment extraction failed"
                );
                error_entry(e.to_string())
            }
        }
    }
}

fn is_error_entry(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|o| o.len() == 1 && o.contains_key("error"))
}
