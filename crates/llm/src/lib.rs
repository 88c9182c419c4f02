//! LLM completion client.
//!
//! [`LlmClient`] is the seam between the metering service and the paid model
//! API. [`OpenAiClient`] implements it for any OpenAI-compatible
//! `chat/completions` endpoint.

pub mod client;
pub mod error;
pub mod openai;
pub mod prompt;

pub use client::{Completion, LlmClient};
pub use error::LlmError;
pub use openai::{OpenAiClient, OpenAiConfig};
