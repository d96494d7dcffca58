//! Email intake pipeline.
//!
//! Every email flows through:
//! 1. `IntentClassifier::classify()`: rules, LLM, or hybrid
//! 2. One handler: document extraction per attachment, text extraction
//!    of the body, or an acknowledgment
//! 3. `EmailProcessor` returns that handler's response unmodified

pub mod acknowledgment;
pub mod classifier;
pub mod dispatch;
pub mod document;
pub mod processor;
pub mod rules;
pub mod summary;
pub mod text;
pub mod types;

pub use classifier::{HybridClassifier, IntentClassifier, LlmClassifier, RuleClassifier};
pub use processor::EmailProcessor;
pub use types::{EmailInput, Intent, NormalizedResponse};
