//! # Parley - multi-provider chat orchestration
//!
//! Turns a single user utterance into a request against one of several
//! interchangeable language-model vendors.
//!
//! ## Features
//!
//! - OpenAI, Anthropic and Gemini adapters behind one `ChatProvider` trait
//! - Ordered multi-model fallback for Gemini
//! - Long-term memory injected from a local vector index
//! - Sliding-window conversation history persisted between runs
//!
//! ## Usage
//!
//! ```rust,no_run
//! use parley::{ChatOrchestrator, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let orchestrator = ChatOrchestrator::new(config)?;
//!
//!     let result = orchestrator.respond("What did I say about coffee?", None).await;
//!     println!("{}", serde_json::to_string(&result)?);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod models;
pub mod providers;
pub mod rag;
pub mod tools;
pub mod utils;

// Re-export commonly used types for convenience
pub use agent::{
    ChatOrchestrator, ConversationStore, FallbackOrchestrator, MemoryRetriever, ProviderSet,
};
pub use config::{CloudProviderConfig, Config, FallbackConfig, StorageConfig};
pub use error::ChatError;
pub use models::{ChatProvider, Message, ProviderKind, Role, TurnResult};
