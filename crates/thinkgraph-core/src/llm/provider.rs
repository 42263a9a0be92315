use async_trait::async_trait;

use crate::error::Result;

use super::types::{LlmResponse, Message};

/// Something that can answer a list of chat messages
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, messages: Vec<Message>) -> Result<LlmResponse>;

    /// Like [`complete`](Self::complete), asking for a JSON document when the
    /// backend supports it
    async fn complete_json(&self, messages: Vec<Message>) -> Result<LlmResponse> {
        self.complete(messages).await
    }
}
