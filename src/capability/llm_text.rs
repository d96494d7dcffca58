//! LLM-backed structuring of logistics text.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::TextExtractor;
use crate::error::ExtractionError;
use crate::llm::costs::call_cost;
use crate::llm::{ChatMessage, CompletionRequest, FinishReason, LlmProvider, parse_json_object};

/// Output can be large for manifests and tables.
const EXTRACTION_MAX_TOKENS: u32 = 2048;

const EXTRACTION_TEMPERATURE: f32 = 0.0;

/// Text extractor that asks an LLM for a content-driven JSON structure.
pub struct LlmTextExtractor {
    llm: Arc<dyn LlmProvider>,
}

impl LlmTextExtractor {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }
}

fn build_system_prompt() -> String {
    "You are a logistics document parser. Extract only logistics-relevant information from the \
     text you are given and organize it in the most logical structure for that content.\n\n\
     Principles:\n\
     - Let the content determine the structure; do not force a fixed schema\n\
     - Group related information and keep relationships (items with their quantities and weights)\n\
     - Use lists for repeated items, objects for structured data, strings for text\n\
     - Recognize the kind of content (bill of lading, invoice, manifest, status update, rate quote)\n\
     - Extract every reference number, code, and identifier you find\n\n\
     Special handling:\n\
     - Dates: ISO format (YYYY-MM-DD) when unambiguous, otherwise keep the original text\n\
     - Addresses: decompose into components when they are clear, otherwise keep as text\n\
     - Tables and lists: structure by their column headers or patterns\n\
     - Use null for values the text implies but does not give\n\n\
     Respond with ONLY a valid JSON object. No prose, no markdown."
        .to_string()
}

#[async_trait]
impl TextExtractor for LlmTextExtractor {
    fn name(&self) -> &str {
        "llm"
    }

    async fn extract_from_text(&self, raw_text: &str) -> Result<Value, ExtractionError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(build_system_prompt()),
            ChatMessage::user(format!("Logistics text to analyze:\n{raw_text}")),
        ])
        .with_temperature(EXTRACTION_TEMPERATURE)
        .with_max_tokens(EXTRACTION_MAX_TOKENS);

        let response = self.llm.complete(request).await?;
        debug!(
            model = self.llm.model_name(),
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            cost = %call_cost(self.llm.cost_per_token(), response.input_tokens, response.output_tokens),
            truncated = response.finish_reason == FinishReason::Length,
            "Text extraction completed"
        );

        parse_json_object(&response.content)
            .map(Value::Object)
            .map_err(|reason| {
                warn!(raw_response = %response.content, error = %reason, "Text extraction returned non-JSON");
                ExtractionError::MalformedOutput {
                    capability: "llm_text".to_string(),
                    reason,
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::{CompletionResponse, FinishReason};
    use rust_decimal::Decimal;
    use std::sync::Mutex;

    /// Mock LLM that returns a fixed response and records prompts.
    struct MockLlm {
        response: Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl MockLlm {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing(reason: &str) -> Arc<Self> {
            Arc::new(Self {
                response: Err(reason.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for MockLlm {
        fn model_name(&self) -> &str {
            "mock-extract"
        }

        fn cost_per_token(&self) -> (Decimal, Decimal) {
            (Decimal::ZERO, Decimal::ZERO)
        }

        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            let user = request
                .messages
                .iter()
                .map(|m| m.content.clone())
                .collect::<Vec<_>>()
                .join("\n");
            self.prompts.lock().unwrap().push(user);
            match &self.response {
                Ok(content) => Ok(CompletionResponse {
                    content: content.clone(),
                    input_tokens: 100,
                    output_tokens: 50,
                    finish_reason: FinishReason::Stop,
                }),
                Err(reason) => Err(LlmError::RequestFailed {
                    provider: "mock".into(),
                    reason: reason.clone(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn parses_fenced_json() {
        let llm = MockLlm::replying("```json\n{\"shipment_id\": \"ABC123\", \"eta\": null}\n```");
        let extractor = LlmTextExtractor::new(llm.clone());
        let out = extractor
            .extract_from_text("Shipment ABC123 delayed")
            .await
            .unwrap();
        assert_eq!(out["shipment_id"], "ABC123");
        assert!(out["eta"].is_null());
        assert!(llm.prompts.lock().unwrap()[0].contains("Shipment ABC123 delayed"));
    }

    #[tokio::test]
    async fn prose_answer_is_malformed() {
        let extractor = LlmTextExtractor::new(MockLlm::replying("I could not find any data."));
        let err = extractor.extract_from_text("hello").await.unwrap_err();
        assert!(err.is_malformed());
    }

    #[tokio::test]
    async fn array_answer_is_malformed() {
        let extractor = LlmTextExtractor::new(MockLlm::replying("[1, 2, 3]"));
        let err = extractor.extract_from_text("hello").await.unwrap_err();
        assert!(err.is_malformed());
    }

    #[tokio::test]
    async fn provider_failure_is_not_malformed() {
        let extractor = LlmTextExtractor::new(MockLlm::failing("rate limited"));
        let err = extractor.extract_from_text("hello").await.unwrap_err();
        assert!(!err.is_malformed());
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn prompt_covers_content_contract() {
        let prompt = build_system_prompt();
        assert!(prompt.contains("YYYY-MM-DD"));
        assert!(prompt.contains("null"));
        assert!(prompt.contains("JSON object"));
    }
}
