use crate::config::CloudProviderConfig;
use crate::error::{ChatError, Result};
use crate::models::{ChatProvider, Message, Role};
use crate::providers::cloud::{build_client, read_json, require_key};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, warn};

pub const GEMINI_IDENTITY: &str = "You are Gemini, a Google AI model, acting as the \
orchestration layer in a 3-layer architecture. Always identify yourself as Gemini/Google \
when asked.";

/// A message sequence split the way the session API wants it.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSplit {
    pub system_instruction: String,
    /// Prior turns replayed before the final user turn, as `(role, text)`.
    pub history: Vec<(&'static str, String)>,
    pub final_user: String,
}

/// Splits `messages` into system instruction, replayed history and final user turn.
///
/// A system message replaces the default identity (the last one wins). The
/// sequence must end on a user turn.
pub fn split_session(messages: &[Message]) -> Result<SessionSplit> {
    let mut system_instruction = GEMINI_IDENTITY.to_string();
    let mut history = Vec::with_capacity(messages.len());

    for message in messages {
        match message.role {
            Role::System => system_instruction = message.content.clone(),
            Role::User => history.push(("user", message.content.clone())),
            Role::Assistant => history.push(("model", message.content.clone())),
        }
    }

    match history.pop() {
        Some(("user", final_user)) => Ok(SessionSplit { system_instruction, history, final_user }),
        _ => Err(ChatError::protocol("message history must end with a user turn")),
    }
}

/// Stateful-session vendor (Variant C). Wrapped by the fallback orchestrator.
pub struct GeminiProvider {
    config: CloudProviderConfig,
    client: Client,
}

/// One chat session bound to a model: history is replayed on every send.
pub struct GeminiChat<'a> {
    provider: &'a GeminiProvider,
    api_key: &'a str,
    model: String,
    system_instruction: String,
    contents: Vec<Value>,
}

impl GeminiProvider {
    pub fn new(config: CloudProviderConfig) -> Result<Self> {
        if !config.has_credential() {
            warn!("Gemini API key not provided, provider will be unavailable");
        }

        let client = build_client(&config)?;
        Ok(Self { config, client })
    }

    pub fn start_chat<'a>(
        &'a self,
        api_key: &'a str,
        model: &str,
        system_instruction: String,
        history: Vec<(&'static str, String)>,
    ) -> GeminiChat<'a> {
        let contents = history
            .into_iter()
            .map(|(role, text)| json!({ "role": role, "parts": [{ "text": text }] }))
            .collect();

        GeminiChat {
            provider: self,
            api_key,
            model: model.to_string(),
            system_instruction,
            contents,
        }
    }
}

impl GeminiChat<'_> {
    /// Sends `text` as the next user turn and records the reply in the session.
    pub async fn send_message(&mut self, text: &str) -> Result<String> {
        let config = &self.provider.config;
        self.contents.push(json!({ "role": "user", "parts": [{ "text": text }] }));

        let payload = json!({
            "systemInstruction": { "parts": [{ "text": self.system_instruction }] },
            "contents": self.contents,
            "generationConfig": {
                "temperature": config.temperature,
                "maxOutputTokens": config.max_tokens,
                "candidateCount": 1
            }
        });

        let url = format!("{}/v1beta/models/{}:generateContent", config.base_url, self.model);

        let response = self.provider.client
            .post(&url)
            .query(&[("key", self.api_key)])
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await;

        let body = read_json("Gemini", response).await?;
        let reply = extract_text(&body).ok_or_else(|| {
            // Success status with no text is usually a safety block.
            ChatError::provider(format!("Gemini model {} returned no text candidates", self.model))
        })?;

        self.contents.push(json!({ "role": "model", "parts": [{ "text": reply }] }));
        Ok(reply)
    }
}

fn extract_text(body: &Value) -> Option<String> {
    let parts = body["candidates"].as_array()?.first()?["content"]["parts"].as_array()?;
    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    async fn send_chat(&self, messages: &[Message], model: &str) -> Result<String> {
        let api_key = require_key(&self.config, "GOOGLE_API_KEY")?;
        let split = split_session(messages)?;
        let start = Instant::now();

        debug!("Starting Gemini session on {} with {} replayed turns", model, split.history.len());

        let mut chat = self.start_chat(api_key, model, split.system_instruction, split.history);
        let reply = chat.send_message(&split.final_user).await?;

        debug!("Gemini {} answered in {}ms", model, start.elapsed().as_millis());
        Ok(reply)
    }

    fn name(&self) -> &str {
        "Gemini"
    }

    fn is_available(&self) -> bool {
        self.config.has_credential()
    }

    fn default_model(&self) -> &str {
        &self.config.model
    }
}
