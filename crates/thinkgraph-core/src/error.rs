//! Error types for Thinkgraph

use thiserror::Error;

/// Result type alias using Thinkgraph's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Thinkgraph error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Extraction errors (E001-E099)
    #[error("Invalid extraction pattern for '{category}': {message}")]
    InvalidPattern { category: String, message: String },

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Embedding backend unavailable")]
    EmbeddingUnavailable,

    // Network errors (E100-E199)
    #[error("Network error: {0}. Check your internet connection.")]
    NetworkError(#[from] reqwest::Error),

    #[error("LLM API error: {0}. Check that THINKGRAPH_API_KEY or OPENROUTER_API_KEY is set.")]
    LLMError(String),

    #[error("Rate limited. Waiting {0} seconds before retry.")]
    RateLimited(u64),

    // Graph errors (E200-E299)
    #[error("Knowledge graph query failed: {0}")]
    GraphQueryFailed(String),

    #[error("Session '{0}' not found. Run `thinkgraph sessions` to see all sessions.")]
    SessionNotFound(String),

    #[error("Thinking analysis failed: {0}")]
    AnalysisFailed(String),

    // Database errors (E400-E499)
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Operation timed out after {0} ms")]
    Timeout(u64),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPattern { .. } => "E001",
            Self::EmbeddingFailed(_) => "E002",
            Self::EmbeddingUnavailable => "E003",
            Self::NetworkError(_) => "E100",
            Self::LLMError(_) => "E101",
            Self::RateLimited(_) => "E102",
            Self::GraphQueryFailed(_) => "E200",
            Self::SessionNotFound(_) => "E201",
            Self::AnalysisFailed(_) => "E202",
            Self::DatabaseError(_) => "E400",
            Self::ConfigError(_) => "E600",
            Self::InvalidInput(_) => "E800",
            Self::Timeout(_) => "E801",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::NetworkError(_) => Some("Check internet connection".to_string()),
            Self::LLMError(_) => Some("export OPENROUTER_API_KEY=<key>".to_string()),
            Self::SessionNotFound(_) => Some("thinkgraph sessions".to_string()),
            Self::ConfigError(_) => Some("thinkgraph config show".to_string()),
            Self::GraphQueryFailed(_) | Self::DatabaseError(_) => {
                Some("thinkgraph stats".to_string())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        let err = Error::InvalidPattern {
            category: "people".to_string(),
            message: "unclosed group".to_string(),
        };
        assert_eq!(err.code(), "E001");
        assert_eq!(Error::SessionNotFound("s1".into()).code(), "E201");
        assert_eq!(Error::Timeout(50).code(), "E801");
    }

    #[test]
    fn test_suggestions() {
        assert_eq!(
            Error::SessionNotFound("s1".into()).suggestion().as_deref(),
            Some("thinkgraph sessions")
        );
        assert!(Error::InvalidInput("empty".into()).suggestion().is_none());
    }

    #[test]
    fn test_display_includes_context() {
        let err = Error::InvalidPattern {
            category: "tools".to_string(),
            message: "bad".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid extraction pattern for 'tools': bad");
    }
}
