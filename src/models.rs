use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One chronological entry of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// The three supported vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    Gemini,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] =
        [ProviderKind::OpenAI, ProviderKind::Anthropic, ProviderKind::Gemini];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boundary payload: exactly one of `{content}` or `{error}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnResult {
    Success { content: String },
    Failure { error: String },
}

impl TurnResult {
    pub fn is_success(&self) -> bool {
        matches!(self, TurnResult::Success { .. })
    }
}

impl From<Result<String>> for TurnResult {
    fn from(result: Result<String>) -> Self {
        match result {
            Ok(content) => TurnResult::Success { content },
            Err(e) => TurnResult::Failure { error: e.to_string() },
        }
    }
}

impl fmt::Display for TurnResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnResult::Success { content } => write!(f, "{}", content),
            TurnResult::Failure { error } => write!(f, "error: {}", error),
        }
    }
}

/// Uniform chat capability every vendor adapter exposes.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Sends the full message sequence and returns the assistant text.
    async fn send_chat(&self, messages: &[Message], model: &str) -> Result<String>;
    fn name(&self) -> &str;
    /// True when the vendor credential is configured.
    fn is_available(&self) -> bool;
    fn default_model(&self) -> &str;
}

#[async_trait]
impl<P: ChatProvider + ?Sized> ChatProvider for Arc<P> {
    async fn send_chat(&self, messages: &[Message], model: &str) -> Result<String> {
        (**self).send_chat(messages, model).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn default_model(&self) -> &str {
        (**self).default_model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatError;

    #[test]
    fn test_message_serializes_lowercase_role() {
        let json = serde_json::to_string(&Message::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn test_turn_result_payload_shapes() {
        let ok = TurnResult::from(Ok("done".to_string()));
        assert_eq!(serde_json::to_string(&ok).unwrap(), r#"{"content":"done"}"#);

        let err = TurnResult::from(Err(ChatError::config("no credentials configured")));
        let payload = serde_json::to_string(&err).unwrap();
        assert_eq!(payload, r#"{"error":"no credentials configured"}"#);
        assert!(!err.is_success());
    }
}
