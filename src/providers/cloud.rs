use crate::config::CloudProviderConfig;
use crate::error::{ChatError, Result};
use crate::models::{ChatProvider, Message, Role};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Fixed preamble sent ahead of every single-shot conversation.
pub const ORCHESTRATION_PREAMBLE: &str =
    "You are a helpful AI assistant acting as the orchestration layer in a 3-layer architecture.";

pub(crate) fn build_client(config: &CloudProviderConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()
        .map_err(|e| ChatError::config(format!("failed to build HTTP client: {}", e)))
}

pub(crate) fn require_key<'a>(config: &'a CloudProviderConfig, var: &str) -> Result<&'a str> {
    config
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ChatError::config(format!("{} is not configured", var)))
}

/// Collapses a transport result into either the parsed body or a `Provider` error.
pub(crate) async fn read_json(
    vendor: &str,
    response: std::result::Result<reqwest::Response, reqwest::Error>,
) -> Result<Value> {
    match response {
        Ok(resp) => {
            let status = resp.status();
            if status.is_success() {
                resp.json::<Value>()
                    .await
                    .map_err(|e| {
                        let detail = format!("{} returned an unreadable body: {}", vendor, e);
                        ChatError::provider(detail)
                    })
            } else {
                let body = resp.text().await.unwrap_or_default();
                let error_msg = format!("{} API error: {} - {}", vendor, status, body.trim());
                error!("{}", error_msg);
                Err(ChatError::provider(error_msg))
            }
        }
        Err(e) => {
            let error_msg = format!("{} request failed: {}", vendor, e);
            error!("{}", error_msg);
            Err(ChatError::provider(error_msg))
        }
    }
}

/// Single-shot vendor with a flat message list (Variant A).
pub struct OpenAIProvider {
    config: CloudProviderConfig,
    client: Client,
}

impl OpenAIProvider {
    pub fn new(config: CloudProviderConfig) -> Result<Self> {
        if !config.has_credential() {
            warn!("OpenAI API key not provided, provider will be unavailable");
        }

        let client = build_client(&config)?;
        Ok(Self { config, client })
    }

    fn payload(&self, messages: &[Message], model: &str) -> Value {
        let mut wire = vec![json!({ "role": "system", "content": ORCHESTRATION_PREAMBLE })];
        wire.extend(messages.iter().map(|m| json!({ "role": m.role, "content": m.content })));

        json!({
            "model": model,
            "messages": wire,
            "temperature": self.config.temperature
        })
    }
}

#[async_trait]
impl ChatProvider for OpenAIProvider {
    async fn send_chat(&self, messages: &[Message], model: &str) -> Result<String> {
        let api_key = require_key(&self.config, "OPENAI_API_KEY")?;
        let start = Instant::now();

        debug!("Sending {} messages to OpenAI ({})", messages.len(), model);

        let response = self.client
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&self.payload(messages, model))
            .send()
            .await;

        let body = read_json("OpenAI", response).await?;
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ChatError::provider("OpenAI response carried no message content"))?
            .to_string();

        debug!("OpenAI answered in {}ms", start.elapsed().as_millis());
        Ok(content)
    }

    fn name(&self) -> &str {
        "OpenAI"
    }

    fn is_available(&self) -> bool {
        self.config.has_credential()
    }

    fn default_model(&self) -> &str {
        &self.config.model
    }
}

/// Single-shot vendor with a separate `system` field (Variant B).
pub struct AnthropicProvider {
    config: CloudProviderConfig,
    client: Client,
}

impl AnthropicProvider {
    pub fn new(config: CloudProviderConfig) -> Result<Self> {
        if !config.has_credential() {
            warn!("Anthropic API key not provided, provider will be unavailable");
        }

        let client = build_client(&config)?;
        Ok(Self { config, client })
    }

    fn payload(&self, messages: &[Message], model: &str) -> Value {
        // The messages endpoint rejects inline system turns; lift them into `system`.
        let mut system = ORCHESTRATION_PREAMBLE.to_string();
        let mut wire = Vec::with_capacity(messages.len());
        for message in messages {
            match message.role {
                Role::System => {
                    system.push_str("\n\n");
                    system.push_str(&message.content);
                }
                Role::User | Role::Assistant => {
                    wire.push(json!({ "role": message.role, "content": message.content }));
                }
            }
        }

        json!({
            "model": model,
            "max_tokens": self.config.max_tokens,
            "messages": wire,
            "system": system
        })
    }
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    async fn send_chat(&self, messages: &[Message], model: &str) -> Result<String> {
        let api_key = require_key(&self.config, "ANTHROPIC_API_KEY")?;
        let start = Instant::now();

        debug!("Sending {} messages to Anthropic ({})", messages.len(), model);

        let response = self.client
            .post(format!("{}/v1/messages", self.config.base_url))
            .header("x-api-key", api_key)
            .header("Content-Type", "application/json")
            .header("anthropic-version", "2023-06-01")
            .json(&self.payload(messages, model))
            .send()
            .await;

        let body = read_json("Anthropic", response).await?;
        let content = body["content"][0]["text"]
            .as_str()
            .ok_or_else(|| ChatError::provider("Anthropic response carried no text block"))?
            .to_string();

        debug!("Anthropic answered in {}ms", start.elapsed().as_millis());
        Ok(content)
    }

    fn name(&self) -> &str {
        "Anthropic"
    }

    fn is_available(&self) -> bool {
        self.config.has_credential()
    }

    fn default_model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_payload_prepends_preamble() {
        let provider = OpenAIProvider::new(CloudProviderConfig::openai()).unwrap();
        let payload = provider.payload(&[Message::user("hello")], "gpt-4o-mini");

        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][0]["content"], ORCHESTRATION_PREAMBLE);
        assert_eq!(payload["messages"][1]["content"], "hello");
        assert_eq!(payload["model"], "gpt-4o-mini");
    }

    #[test]
    fn test_anthropic_payload_lifts_system_turns() {
        let provider = AnthropicProvider::new(CloudProviderConfig::anthropic()).unwrap();
        let messages = [Message::system("Answer in French."), Message::user("hello")];
        let payload = provider.payload(&messages, "claude");

        let wire = payload["messages"].as_array().unwrap();
        assert_eq!(wire.len(), 1);
        assert_eq!(wire[0]["role"], "user");
        assert!(payload["system"].as_str().unwrap().ends_with("Answer in French."));
        assert_eq!(payload["max_tokens"], 1024);
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let mut config = CloudProviderConfig::openai();
        config.base_url = "http://127.0.0.1:1".to_string();
        let provider = OpenAIProvider::new(config).unwrap();

        let err = provider.send_chat(&[Message::user("hi")], "gpt-4o-mini").await.unwrap_err();
        assert!(matches!(err, ChatError::Config(_)));
        assert!(!provider.is_available());
    }

    #[tokio::test]
    async fn test_anthropic_missing_key_is_config_error() {
        let mut config = CloudProviderConfig::anthropic();
        config.api_key = Some("  ".to_string());
        config.base_url = "http://127.0.0.1:1".to_string();
        let provider = AnthropicProvider::new(config).unwrap();

        let err = provider.send_chat(&[Message::user("hi")], "claude").await.unwrap_err();
        assert_eq!(err.to_string(), "ANTHROPIC_API_KEY is not configured");
        assert_eq!(err.kind(), "ConfigError");
        assert!(!provider.is_available());
    }
}
