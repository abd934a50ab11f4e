use thiserror::Error;

/// Failure of a chat turn or one of its collaborators.
///
/// The detail-only variants render as their bare message so the boundary
/// payload stays `{"error": "<detail>"}`.
#[derive(Error, Debug)]
pub enum ChatError {
    /// Missing credential or unusable configuration. Never retried.
    #[error("{0}")]
    Config(String),

    /// Malformed message sequence handed to a provider.
    #[error("{0}")]
    Protocol(String),

    /// Transport, HTTP status or response-shape failure from a vendor.
    #[error("{0}")]
    Provider(String),

    /// Vector index failure. Swallowed by the retriever, never surfaced by a turn.
    #[error("{0}")]
    Retrieval(String),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ChatError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider(message.into())
    }

    pub fn retrieval(message: impl Into<String>) -> Self {
        Self::Retrieval(message.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "ConfigError",
            Self::Protocol(_) => "ProtocolError",
            Self::Provider(_) => "ProviderError",
            Self::Retrieval(_) => "RetrievalError",
            Self::Storage(_) | Self::Serialization(_) => "StorageError",
        }
    }

    /// Only vendor failures are worth another attempt with a different model.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider(_))
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_variants_display_bare_message() {
        let err = ChatError::config("no credentials configured");
        assert_eq!(err.to_string(), "no credentials configured");
        assert_eq!(err.kind(), "ConfigError");
    }

    #[test]
    fn test_only_provider_errors_are_retryable() {
        assert!(ChatError::provider("503").is_retryable());
        assert!(!ChatError::config("missing key").is_retryable());
        assert!(!ChatError::protocol("bad order").is_retryable());
        assert!(!ChatError::retrieval("index gone").is_retryable());
    }
}
