use crate::error::{ChatError, Result};
use crate::models::{ChatProvider, Message};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Where a fallback run currently stands.
#[derive(Debug)]
pub enum FallbackState {
    Trying { model: String, index: usize },
    Succeeded { model: String, content: String },
    Exhausted { last_error: ChatError },
}

impl FallbackState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, FallbackState::Trying { .. })
    }
}

/// Terminal state of a run plus the failures recorded on the way there.
#[derive(Debug)]
pub struct FallbackReport {
    pub state: FallbackState,
    pub failures: Vec<(String, String)>,
}

impl FallbackReport {
    pub fn attempts(&self) -> usize {
        match &self.state {
            FallbackState::Succeeded { .. } => self.failures.len() + 1,
            _ => self.failures.len(),
        }
    }

    pub fn into_result(self) -> Result<String> {
        match self.state {
            FallbackState::Succeeded { content, .. } => Ok(content),
            FallbackState::Exhausted { last_error } if !last_error.is_retryable() => {
                Err(last_error)
            }
            FallbackState::Exhausted { last_error } => Err(ChatError::provider(format!(
                "all models failed; last error: {}",
                last_error
            ))),
            FallbackState::Trying { model, .. } => {
                Err(ChatError::provider(format!("fallback stopped while trying {}", model)))
            }
        }
    }
}

/// Ordered retry over model identifiers for one provider.
pub struct FallbackOrchestrator<P> {
    inner: P,
    fallback_models: Vec<String>,
}

impl<P: ChatProvider> FallbackOrchestrator<P> {
    pub fn new(inner: P, fallback_models: Vec<String>) -> Self {
        Self { inner, fallback_models }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// `[primary] ++ fallbacks`, with copies of `primary` removed from the tail.
    pub fn candidates(&self, primary: &str) -> Vec<String> {
        let mut models = vec![primary.to_string()];
        models.extend(self.fallback_models.iter().filter(|m| m.as_str() != primary).cloned());
        models
    }

    pub async fn run(&self, messages: &[Message], primary: &str) -> FallbackReport {
        let candidates = self.candidates(primary);
        let mut failures = Vec::new();
        let mut state = FallbackState::Trying { model: candidates[0].clone(), index: 0 };

        while let FallbackState::Trying { model, index } = state {
            debug!("Fallback attempt {}/{} with {}", index + 1, candidates.len(), model);

            state = match self.inner.send_chat(messages, &model).await {
                Ok(content) => {
                    info!("✅ {} succeeded with {}", self.inner.name(), model);
                    FallbackState::Succeeded { model, content }
                }
                Err(e) if !e.is_retryable() => FallbackState::Exhausted { last_error: e },
                Err(e) => {
                    warn!("⚠️  {} failed ({}). Trying next model...", model, e);
                    failures.push((model, e.to_string()));
                    match candidates.get(index + 1) {
                        Some(next) => FallbackState::Trying {
                            model: next.clone(),
                            index: index + 1,
                        },
                        None => FallbackState::Exhausted { last_error: e },
                    }
                }
            };
        }

        FallbackReport { state, failures }
    }
}

#[async_trait]
impl<P: ChatProvider> ChatProvider for FallbackOrchestrator<P> {
    async fn send_chat(&self, messages: &[Message], model: &str) -> Result<String> {
        self.run(messages, model).await.into_result()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }

    fn default_model(&self) -> &str {
        self.inner.default_model()
    }
}
