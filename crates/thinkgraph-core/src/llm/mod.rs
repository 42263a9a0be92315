//! LLM integration - OpenAI-compatible chat completions
//!
//! This module provides:
//! - The [`CompletionProvider`] seam used by analysis and chat
//! - An HTTP client for `/chat/completions` (OpenRouter by default)
//! - Request/response types matching the OpenAI-compatible API

mod client;
mod provider;
mod types;

pub use client::{DEFAULT_BASE_URL, LlmClient, LlmClientBuilder};
pub use provider::CompletionProvider;
pub use types::{
    ChatRequest, ChatResponse, Choice, FinishReason, LlmResponse, Message, MessageRole,
    ResponseFormat, Usage,
};
