use crate::error::Result;
use crate::models::{Message, Role};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Durable sliding-window conversation history backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    path: PathBuf,
    window: usize,
}

impl ConversationStore {
    pub fn new(path: impl Into<PathBuf>, window: usize) -> Self {
        Self { path: path.into(), window }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted history. Missing or unreadable state yields an empty history.
    pub async fn load(&self) -> Vec<Message> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("Could not read history at {:?}: {}. Starting fresh.", self.path, e);
                return Vec::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(history) => history,
            Err(e) => {
                warn!("History at {:?} is corrupt ({}). Starting fresh.", self.path, e);
                Vec::new()
            }
        }
    }

    /// `load` followed by the sliding-window cut, keeping the newest entries.
    ///
    /// A window never opens on an assistant reply whose question was cut off.
    pub async fn load_window(&self) -> Vec<Message> {
        let mut history = self.load().await;
        truncate_to_window(&mut history, self.window);
        drop_leading_replies(&mut history);
        history
    }

    /// Writes to a sibling temp file and renames it over the target.
    pub async fn save(&self, history: &[Message]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(history)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;

        debug!("Saved {} history entries to {:?}", history.len(), self.path);
        Ok(())
    }

    /// Deletes the persisted history. Clearing an absent history is a no-op.
    pub async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

pub fn truncate_to_window(history: &mut Vec<Message>, window: usize) {
    if history.len() > window {
        let excess = history.len() - window;
        history.drain(..excess);
    }
}

fn drop_leading_replies(history: &mut Vec<Message>) {
    let replies = history.iter().take_while(|m| m.role == Role::Assistant).count();
    if replies > 0 {
        debug!("Dropping {} assistant entries at the head of the window", replies);
        history.drain(..replies);
    }
}
