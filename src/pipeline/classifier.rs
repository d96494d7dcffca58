//! Intent classifiers.
//!
//! Three interchangeable implementations behind [`IntentClassifier`]:
//! - [`RuleClassifier`]: deterministic pattern rules, never fails
//! - [`LlmClassifier`]: asks an LLM for the intent and document types
//! - [`HybridClassifier`]: rules first, LLM only when the rules had to guess

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::ClassificationError;
use crate::llm::costs::call_cost;
use crate::llm::{ChatMessage, CompletionRequest, FinishReason, LlmProvider, extract_json_object};
use crate::pipeline::rules::RulesEngine;
use crate::pipeline::types::{
    Classification, DocumentAssignment, EmailInput, Intent, plan_attachments,
};

/// Max tokens for the classification call (small JSON answer).
const CLASSIFY_MAX_TOKENS: u32 = 256;

const CLASSIFY_TEMPERATURE: f32 = 0.0;

/// Body characters sent to the LLM.
const BODY_PREVIEW_CHARS: usize = 4000;

/// Decides the intent (and per-attachment document types) of one email.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    fn name(&self) -> &str;

    async fn classify(&self, input: &EmailInput) -> Result<Classification, ClassificationError>;
}

// ── Rules ───────────────────────────────────────────────────────────

/// Pattern-rule classifier.
pub struct RuleClassifier {
    rules: RulesEngine,
}

impl RuleClassifier {
    pub fn new(rules: RulesEngine) -> Self {
        Self { rules }
    }
}

impl Default for RuleClassifier {
    fn default() -> Self {
        Self::new(RulesEngine::default_rules())
    }
}

#[async_trait]
impl IntentClassifier for RuleClassifier {
    fn name(&self) -> &str {
        "rules"
    }

    async fn classify(&self, input: &EmailInput) -> Result<Classification, ClassificationError> {
        let verdict = self.rules.evaluate(input);
        debug!(
            email_id = %input.log_id(),
            intent = %verdict.classification.intent,
            reason = verdict.reason,
            "Rules classified email"
        );
        Ok(verdict.classification)
    }
}

// ── LLM ─────────────────────────────────────────────────────────────

/// LLM-backed classifier.
pub struct LlmClassifier {
    llm: Arc<dyn LlmProvider>,
}

impl LlmClassifier {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl IntentClassifier for LlmClassifier {
    fn name(&self) -> &str {
        "llm"
    }

    async fn classify(&self, input: &EmailInput) -> Result<Classification, ClassificationError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(build_classifier_system_prompt()),
            ChatMessage::user(build_classifier_user_prompt(input)),
        ])
        .with_temperature(CLASSIFY_TEMPERATURE)
        .with_max_tokens(CLASSIFY_MAX_TOKENS);

        let response = self.llm.complete(request).await?;
        debug!(
            email_id = %input.log_id(),
            model = self.llm.model_name(),
            cost = %call_cost(self.llm.cost_per_token(), response.input_tokens, response.output_tokens),
            truncated = response.finish_reason == FinishReason::Length,
            "Classifier call completed"
        );

        parse_classifier_response(&response.content, input).inspect_err(|e| {
            warn!(
                email_id = %input.log_id(),
                raw_response = %response.content,
                error = %e,
                "Failed to parse classifier response"
            );
        })
    }
}

// ── Hybrid ──────────────────────────────────────────────────────────

/// Rules first; the LLM decides only when the rules were not decisive.
pub struct HybridClassifier {
    rules: RulesEngine,
    llm: LlmClassifier,
}

impl HybridClassifier {
    pub fn new(rules: RulesEngine, llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            rules,
            llm: LlmClassifier::new(llm),
        }
    }
}

#[async_trait]
impl IntentClassifier for HybridClassifier {
    fn name(&self) -> &str {
        "hybrid"
    }

    async fn classify(&self, input: &EmailInput) -> Result<Classification, ClassificationError> {
        let verdict = self.rules.evaluate(input);
        if verdict.decisive {
            debug!(
                email_id = %input.log_id(),
                intent = %verdict.classification.intent,
                reason = verdict.reason,
                "Rules decisive, skipping LLM"
            );
            return Ok(verdict.classification);
        }

        match self.llm.classify(input).await {
            Ok(classification) => {
                info!(
                    email_id = %input.log_id(),
                    rules = %verdict.classification.intent,
                    llm = %classification.intent,
                    "LLM resolved non-decisive rule verdict"
                );
                Ok(classification)
            }
            Err(e) => {
                warn!(
                    email_id = %input.log_id(),
                    error = %e,
                    "LLM classification failed, keeping rule verdict"
                );
                Ok(verdict.classification)
            }
        }
    }
}

// ── Prompt construction ─────────────────────────────────────────────

fn build_classifier_system_prompt() -> String {
    "You classify logistics emails by WHY they were sent. Pick exactly one intent.\n\n\
     Intents:\n\
     - \"data_extraction_requested\": the email has attachments AND the sender explicitly asks \
       to process, extract, enter, or answer questions about their contents \
       (\"please process the attached invoice\", \"what's the total on this invoice?\", \
       \"add this BOL to our system\").\n\
     - \"text_data_extraction\": operational logistics data in the body that needs follow-up: \
       delays, changed appointments, rate quotes to confirm, requests for an ETA, or a \
       detailed shipment update (\"Shipment ABC123 delayed - new ETA needed\").\n\
     - \"informational_acknowledgment\": everything else: advance shipping notices, delivery \
       confirmations, documents shared for reference (\"attached is your invoice\"), training \
       or sample submissions (\"here's a BOL for training the model\"), non-logistics or \
       spam.\n\n\
     Decision logic:\n\
     - Attachments alone never mean extraction; require explicit action language\n\
     - Training, sample, FYI, and for-your-records language means acknowledgment\n\
     - No attachments means data_extraction_requested is impossible\n\
     - When unsure, choose informational_acknowledgment\n\n\
     Document types: bol, shipping_label, item_label, invoice, receipt.\n\
     For data_extraction_requested, give each attachment key its own type.\n\n\
     Respond with ONLY a JSON object:\n\
     {\"intent\": \"...\", \"document_types\": {\"<attachment key>\": \"<type>\"}}"
        .to_string()
}

fn build_classifier_user_prompt(input: &EmailInput) -> String {
    let mut prompt = String::with_capacity(512);

    let keys: Vec<String> = plan_attachments(input.usable_attachments(), |_, _| {
        DocumentAssignment::Unresolved {
            reason: String::new(),
        }
    })
    .into_iter()
    .map(|plan| plan.key)
    .collect();
    if keys.is_empty() {
        prompt.push_str("Attachments: none\n");
    } else {
        prompt.push_str("Attachments:\n");
        for key in &keys {
            prompt.push_str(&format!("  - {key}\n"));
        }
    }

    let body: String = input.body.chars().take(BODY_PREVIEW_CHARS).collect();
    prompt.push_str(&format!("\nEmail body:\n{body}"));
    prompt
}

// ── Response parsing ────────────────────────────────────────────────

#[derive(Debug, serde::Deserialize)]
struct ClassifierResponse {
    intent: String,
    #[serde(default)]
    document_types: BTreeMap<String, String>,
    /// Single type applied to attachments missing from `document_types`.
    #[serde(default)]
    document_type: Option<String>,
}

fn parse_classifier_response(
    raw: &str,
    input: &EmailInput,
) -> Result<Classification, ClassificationError> {
    let json_str = extract_json_object(raw);
    let response: ClassifierResponse = serde_json::from_str(&json_str)
        .map_err(|e| ClassificationError::MalformedResponse(format!("JSON parse error: {e}")))?;

    let intent: Intent = response.intent.parse()?;
    match intent {
        Intent::InformationalAcknowledgment => Ok(Classification::acknowledgment()),
        Intent::TextDataExtraction => Ok(Classification::text_extraction()),
        Intent::DataExtractionRequested if !input.has_usable_attachments() => {
            warn!(
                email_id = %input.log_id(),
                "Classifier asked for document extraction without attachments, acknowledging instead"
            );
            Ok(Classification::acknowledgment())
        }
        Intent::DataExtractionRequested => {
            let plans = plan_attachments(input.usable_attachments(), |key, _| {
                let base = key.split('#').next().unwrap_or(key);
                response
                    .document_types
                    .get(key)
                    .or_else(|| response.document_types.get(base))
                    .or(response.document_type.as_ref())
                    .map(|label| DocumentAssignment::from_label(label))
                    .unwrap_or_else(|| DocumentAssignment::Unresolved {
                        reason: format!("classifier gave no document type for {key}"),
                    })
            });
            Ok(Classification::data_extraction(plans))
        }
    }
}
