//! Conversation context
//!
//! - `mentions`: input-tuned mention extraction
//! - `ranking`: thought relevance and summaries
//! - `prompt`: context-enhanced system prompts
//! - `assembler`: the [`ContextAssembler`] pipeline
//! - `chat`: context-aware completions through a [`crate::llm::CompletionProvider`]

pub mod assembler;
pub mod chat;
pub mod mentions;
pub mod prompt;
pub mod ranking;
pub mod types;

pub use assembler::{ContextAssembler, ContextConfig};
pub use chat::{ChatReply, ChatService};
pub use mentions::MentionExtractor;
pub use prompt::build_enhanced_prompt;
pub use types::{
    ContextMetadata, ConversationContext, RelatedEntity, RelatedThought, SimilarSession,
    ThoughtSource, get_context_metadata,
};
