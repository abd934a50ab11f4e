use crate::agent::fallback::FallbackOrchestrator;
use crate::agent::history::ConversationStore;
use crate::agent::memory::MemoryRetriever;
use crate::config::{CloudProviderConfig, Config};
use crate::error::{ChatError, Result};
use crate::models::{ChatProvider, Message, ProviderKind, TurnResult};
use crate::providers::{AnthropicProvider, GeminiProvider, OpenAIProvider};
use crate::rag::{Embedder, MiniLmEmbedder};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const CLEAR_COMMAND: &str = "/clear";
pub const CLEARED_ACK: &str = "Conversation history cleared.";
pub const NO_CREDENTIALS: &str = "no credentials configured";

/// The registered adapter for each vendor.
#[derive(Default, Clone)]
pub struct ProviderSet {
    providers: HashMap<ProviderKind, Arc<dyn ChatProvider>>,
}

impl ProviderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: ProviderKind, provider: Arc<dyn ChatProvider>) -> &mut Self {
        self.providers.insert(kind, provider);
        self
    }

    pub fn get(&self, kind: ProviderKind) -> Option<&Arc<dyn ChatProvider>> {
        self.providers.get(&kind)
    }

    /// Builds the three vendor adapters; Gemini goes behind the fallback orchestrator.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut set = Self::new();
        for kind in ProviderKind::ALL {
            let vendor = config
                .provider(kind)
                .cloned()
                .unwrap_or_else(|| CloudProviderConfig::for_kind(kind));

            let provider: Arc<dyn ChatProvider> = match kind {
                ProviderKind::OpenAI => Arc::new(OpenAIProvider::new(vendor)?),
                ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(vendor)?),
                ProviderKind::Gemini => Arc::new(FallbackOrchestrator::new(
                    GeminiProvider::new(vendor)?,
                    config.fallback.models.clone(),
                )),
            };
            set.insert(kind, provider);
        }
        Ok(set)
    }

    /// Explicit hint first, then the first available vendor in `priority` order.
    pub fn resolve(
        &self,
        hint: Option<ProviderKind>,
        priority: &[ProviderKind],
    ) -> Result<ProviderKind> {
        if let Some(kind) = hint {
            return Ok(kind);
        }

        priority
            .iter()
            .copied()
            .find(|kind| self.get(*kind).map_or(false, |p| p.is_available()))
            .ok_or_else(|| ChatError::config(NO_CREDENTIALS))
    }
}

/// Runs one conversational turn end to end.
pub struct ChatOrchestrator {
    config: Config,
    store: ConversationStore,
    retriever: Option<MemoryRetriever>,
    providers: ProviderSet,
}

impl std::fmt::Debug for ChatOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatOrchestrator")
            .field("history", &self.store.path())
            .field("retriever", &self.retriever.is_some())
            .field("provider_priority", &self.config.provider_priority)
            .finish()
    }
}

impl ChatOrchestrator {
    pub fn new(config: Config) -> Result<Self> {
        info!("Initializing chat orchestrator...");

        let storage = &config.storage;
        let store = ConversationStore::new(storage.history_path(), storage.history_window);
        let embedder: Arc<dyn Embedder> = Arc::new(MiniLmEmbedder::new(storage.model_cache_dir()));
        let retriever = MemoryRetriever::new(
            storage.vector_db_path(),
            storage.collection.clone(),
            storage.memory_results,
            embedder,
        );
        let providers = ProviderSet::from_config(&config)?;

        Ok(Self::with_parts(config, store, Some(retriever), providers))
    }

    pub fn with_parts(
        config: Config,
        store: ConversationStore,
        retriever: Option<MemoryRetriever>,
        providers: ProviderSet,
    ) -> Self {
        Self { config, store, retriever, providers }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Boundary form of [`handle_turn`](Self::handle_turn).
    pub async fn respond(&self, user_text: &str, hint: Option<ProviderKind>) -> TurnResult {
        TurnResult::from(self.handle_turn(user_text, hint).await)
    }

    pub async fn handle_turn(&self, user_text: &str, hint: Option<ProviderKind>) -> Result<String> {
        if user_text.trim().eq_ignore_ascii_case(CLEAR_COMMAND) {
            self.store.clear().await?;
            info!("🧹 Conversation history cleared");
            return Ok(CLEARED_ACK.to_string());
        }

        let mut history = self.store.load_window().await;
        self.record_user_turn(&mut history, user_text).await;

        let llm_view = self.build_request_view(&history, user_text).await;

        let kind = self.providers.resolve(hint, &self.config.provider_priority)?;
        let provider = self
            .providers
            .get(kind)
            .ok_or_else(|| ChatError::config(format!("provider {} is not registered", kind)))?;
        let model = provider.default_model().to_string();

        info!("📤 Dispatching turn to {} ({})", provider.name(), model);
        let reply = provider.send_chat(&llm_view, &model).await?;

        self.record_assistant_turn(&mut history, &reply).await;
        Ok(reply)
    }

    /// Appends the user turn and persists it before any provider is contacted.
    async fn record_user_turn(&self, history: &mut Vec<Message>, user_text: &str) {
        history.push(Message::user(user_text));
        if let Err(e) = self.store.save(history).await {
            warn!("Failed to persist user turn: {}", e);
        }
    }

    async fn record_assistant_turn(&self, history: &mut Vec<Message>, reply: &str) {
        history.push(Message::assistant(reply));
        if let Err(e) = self.store.save(history).await {
            warn!("Failed to persist assistant turn: {}", e);
        }
    }

    /// Copy of `history` whose last entry carries the memory block, if any.
    async fn build_request_view(&self, history: &[Message], user_text: &str) -> Vec<Message> {
        let mut view = history.to_vec();

        let context = match &self.retriever {
            Some(retriever) => retriever.query(user_text).await,
            None => None,
        };

        if let (Some(context), Some(last)) = (context, view.last_mut()) {
            debug!("Injecting {} memories into outbound request", context.snippets.len());
            last.content = context.inject(user_text);
        }

        view
    }
}
