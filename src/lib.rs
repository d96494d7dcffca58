//! Freight intake: routes logistics emails to document extraction, text
//! extraction, or an acknowledgment.

pub mod capability;
pub mod config;
pub mod error;
pub mod intake;
pub mod llm;
pub mod pipeline;
