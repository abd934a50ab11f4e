use crate::models::ProviderKind;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_cloud_providers")]
    pub cloud_providers: Vec<CloudProviderConfig>,
    /// Order used to pick a vendor when the caller gives no hint.
    #[serde(default = "default_priority")]
    pub provider_priority: Vec<ProviderKind>,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudProviderConfig {
    pub name: ProviderKind,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl CloudProviderConfig {
    pub fn openai() -> Self {
        Self {
            name: ProviderKind::OpenAI,
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
            timeout_seconds: 30,
        }
    }

    pub fn anthropic() -> Self {
        Self {
            name: ProviderKind::Anthropic,
            api_key: None,
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-3-5-sonnet-20240620".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
            timeout_seconds: 30,
        }
    }

    pub fn gemini() -> Self {
        Self {
            name: ProviderKind::Gemini,
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-flash-latest".to_string(),
            max_tokens: 2048,
            temperature: 0.7,
            timeout_seconds: 30,
        }
    }

    pub fn for_kind(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::OpenAI => Self::openai(),
            ProviderKind::Anthropic => Self::anthropic(),
            ProviderKind::Gemini => Self::gemini(),
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.as_deref().map_or(false, |k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Models tried, in order, after the primary Gemini model fails.
    pub models: Vec<String>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            models: vec![
                "gemini-1.5-flash".to_string(),
                "gemini-pro".to_string(),
                "gemini-flash-latest".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub state_dir: PathBuf,
    pub history_file: String,
    pub vector_db_dir: String,
    pub collection: String,
    pub history_window: usize,
    pub memory_results: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: crate::utils::paths::default_state_dir(),
            history_file: "chat_history.json".to_string(),
            vector_db_dir: "vector_db".to_string(),
            collection: "agent_memory".to_string(),
            history_window: 10,
            memory_results: 3,
        }
    }
}

impl StorageConfig {
    pub fn history_path(&self) -> PathBuf {
        self.state_dir.join(&self.history_file)
    }

    pub fn vector_db_path(&self) -> PathBuf {
        self.state_dir.join(&self.vector_db_dir)
    }

    pub fn model_cache_dir(&self) -> PathBuf {
        self.state_dir.join("models")
    }
}

fn default_cloud_providers() -> Vec<CloudProviderConfig> {
    ProviderKind::ALL.iter().map(|kind| CloudProviderConfig::for_kind(*kind)).collect()
}

fn default_priority() -> Vec<ProviderKind> {
    vec![ProviderKind::Gemini, ProviderKind::OpenAI, ProviderKind::Anthropic]
}

fn credential_vars(kind: ProviderKind) -> &'static [&'static str] {
    match kind {
        ProviderKind::OpenAI => &["OPENAI_API_KEY"],
        ProviderKind::Anthropic => &["ANTHROPIC_API_KEY"],
        ProviderKind::Gemini => &["GOOGLE_API_KEY", "GEMINI_API_KEY"],
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Try to load from config file, otherwise use defaults
        let config_path = std::env::current_dir()?.join("config.toml");

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };

        config.apply_credentials(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Adds default settings for every vendor the file does not mention.
    pub fn fill_missing_providers(&mut self) {
        for kind in ProviderKind::ALL {
            if self.provider(kind).is_none() {
                self.cloud_providers.push(CloudProviderConfig::for_kind(kind));
            }
        }
    }

    /// Fills every provider's `api_key` from `lookup`; blank values count as absent.
    ///
    /// Vendors missing from `cloud_providers` are added with defaults first, so
    /// a key in the environment is never ignored.
    pub fn apply_credentials<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        self.fill_missing_providers();
        for provider in &mut self.cloud_providers {
            provider.api_key = credential_vars(provider.name)
                .iter()
                .filter_map(|var| lookup(var))
                .map(|key| key.trim().to_string())
                .find(|key| !key.is_empty());
        }
    }

    pub fn provider(&self, kind: ProviderKind) -> Option<&CloudProviderConfig> {
        self.cloud_providers.iter().find(|p| p.name == kind)
    }

    pub fn any_credentials(&self) -> bool {
        self.cloud_providers.iter().any(|p| p.has_credential())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cloud_providers: default_cloud_providers(),
            provider_priority: default_priority(),
            fallback: FallbackConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}
