//! Email processor: the single entry point of the pipeline.
//!
//! Flow:
//! 1. Intent classifier → `Classification` (falls back to acknowledgment on error)
//! 2. Route to exactly one handler (document / text / acknowledgment)
//! 3. Return the handler's response unmodified

use std::sync::Arc;

use futures::StreamExt;
use tracing::{error, info};

use crate::pipeline::acknowledgment::AcknowledgmentHandler;
use crate::pipeline::classifier::IntentClassifier;
use crate::pipeline::document::DocumentHandler;
use crate::pipeline::text::TextHandler;
use crate::pipeline::types::{Classification, EmailInput, Intent, NormalizedResponse};

/// Default number of emails processed in parallel by `process_batch`.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Routes each email to one handler and passes its output through.
///
/// Holds no mutable state; one processor can serve any number of
/// concurrent `process` calls.
pub struct EmailProcessor {
    classifier: Arc<dyn IntentClassifier>,
    document: DocumentHandler,
    text: TextHandler,
    acknowledgment: AcknowledgmentHandler,
}

impl EmailProcessor {
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        document: DocumentHandler,
        text: TextHandler,
    ) -> Self {
        Self {
            classifier,
            document,
            text,
            acknowledgment: AcknowledgmentHandler::new(),
        }
    }

    /// Classify one email and run the matching handler.
    ///
    /// Never fails: classifier errors degrade to acknowledgment, and
    /// capability failures are carried inside the response.
    pub async fn process(&self, input: &EmailInput) -> NormalizedResponse {
        let classification = self.classify(input).await;

        info!(
            email_id = %input.log_id(),
            intent = %classification.intent,
            classifier = self.classifier.name(),
            attachments = classification.attachments.len(),
            "Routing email"
        );

        match classification.intent {
            Intent::DataExtractionRequested => {
                self.document.handle(input, &classification.attachments).await
            }
            Intent::TextDataExtraction => self.text.handle(input).await,
            Intent::InformationalAcknowledgment => self.acknowledgment.handle(input),
        }
    }

    async fn classify(&self, input: &EmailInput) -> Classification {
        match self.classifier.classify(input).await {
            Ok(classification) => classification,
            Err(e) => {
                error!(
                    email_id = %input.log_id(),
                    classifier = self.classifier.name(),
                    error = %e,
                    "Classification failed, acknowledging instead"
                );
                Classification::acknowledgment()
            }
        }
    }

    /// Process many emails, up to `concurrency` at a time.
    ///
    /// Output order equals input order.
    pub async fn process_batch(
        &self,
        inputs: Vec<EmailInput>,
        concurrency: usize,
    ) -> Vec<NormalizedResponse> {
        let total = inputs.len();
        let responses: Vec<NormalizedResponse> = futures::stream::iter(inputs)
            .map(|input| async move { self.process(&input).await })
            .buffered(concurrency.max(1))
            .collect()
            .await;

        info!(total, concurrency, "Batch processed");
        responses
    }
}
