pub mod core;
pub mod fallback;
pub mod history;
pub mod memory;

pub use self::core::{ChatOrchestrator, ProviderSet, CLEARED_ACK, CLEAR_COMMAND, NO_CREDENTIALS};
pub use fallback::{FallbackOrchestrator, FallbackReport, FallbackState};
pub use history::ConversationStore;
pub use memory::{MemoryContext, MemoryRetriever};
