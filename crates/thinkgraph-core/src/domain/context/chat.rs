//! Context-aware chat turns

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::domain::graph::GraphStore;
use crate::error::{Error, Result};
use crate::llm::{CompletionProvider, Message};

use super::assembler::ContextAssembler;
use super::types::{ContextMetadata, get_context_metadata};

/// Answer to one chat turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub model: String,
    pub context_metadata: ContextMetadata,
}

/// Runs a chat turn: assemble context, build the prompt, ask the provider
pub struct ChatService<S: GraphStore> {
    assembler: Arc<ContextAssembler<S>>,
    provider: Arc<dyn CompletionProvider>,
}

impl<S: GraphStore> ChatService<S> {
    pub fn new(assembler: Arc<ContextAssembler<S>>, provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            assembler,
            provider,
        }
    }

    /// Context assembly never fails the turn; provider errors do
    pub async fn respond(&self, user_input: &str, session_id: &str) -> Result<ChatReply> {
        if user_input.trim().is_empty() {
            return Err(Error::InvalidInput("message must not be empty".to_string()));
        }

        let context = self
            .assembler
            .get_conversation_context(user_input, session_id)
            .await;
        let prompt = self.assembler.build_enhanced_prompt(user_input, &context);
        let context_metadata = get_context_metadata(&context);

        let response = self
            .provider
            .complete(vec![Message::system(prompt), Message::user(user_input)])
            .await?;

        info!(
            session_id = %session_id,
            model = %response.model,
            used_context = context_metadata.used_context,
            "Chat turn completed"
        );

        Ok(ChatReply {
            response: response.content,
            model: response.model,
            context_metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::extraction::{EntityExtractor, ExtractorConfig};
    use crate::infrastructure::graph::SqliteGraphStore;
    use crate::llm::{LlmResponse, MessageRole};
    use crate::storage::run_migrations;
    use async_trait::async_trait;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Mutex;

    /// Provider that echoes back and records the messages it received
    #[derive(Default)]
    struct RecordingProvider {
        seen: Mutex<Vec<Message>>,
        fail: bool,
    }

    #[async_trait]
    impl CompletionProvider for RecordingProvider {
        async fn complete(&self, messages: Vec<Message>) -> Result<LlmResponse> {
            if self.fail {
                return Err(Error::LLMError("provider down".into()));
            }
            self.seen.lock().unwrap().extend(messages);
            Ok(LlmResponse {
                content: "an answer".into(),
                model: "test/model".into(),
                input_tokens: 1,
                output_tokens: 1,
            })
        }
    }

    async fn service(provider: Arc<RecordingProvider>) -> ChatService<SqliteGraphStore> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");

        let extractor = Arc::new(EntityExtractor::new(ExtractorConfig::default()).unwrap());
        let assembler = ContextAssembler::new(Arc::new(SqliteGraphStore::new(pool)), extractor).unwrap();
        ChatService::new(Arc::new(assembler), provider)
    }

    #[tokio::test]
    async fn test_respond_sends_prompt_and_input() {
        let provider = Arc::new(RecordingProvider::default());
        let chat = service(provider.clone()).await;

        let reply = chat.respond("What is Python?", "s1").await.unwrap();
        assert_eq!(reply.response, "an answer");
        assert_eq!(reply.model, "test/model");
        assert!(!reply.context_metadata.used_context);

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].role, MessageRole::System);
        assert!(seen[0].content.ends_with("Current question: What is Python?"));
        assert_eq!(seen[1], Message::user("What is Python?"));
    }

    #[tokio::test]
    async fn test_empty_input_rejected() {
        let provider = Arc::new(RecordingProvider::default());
        let chat = service(provider.clone()).await;

        let err = chat.respond("  ", "s1").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(provider.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let provider = Arc::new(RecordingProvider {
            fail: true,
            ..Default::default()
        });
        let chat = service(provider).await;
        assert!(matches!(chat.respond("Hello there", "s1").await, Err(Error::LLMError(_))));
    }
}
