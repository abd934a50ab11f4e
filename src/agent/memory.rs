use crate::error::{ChatError, Result};
use crate::rag::{Embedder, VectorStore};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

const PREVIEW_CHARS: usize = 60;

/// Snippets recalled for one turn, in index relevance order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryContext {
    pub snippets: Vec<String>,
}

impl MemoryContext {
    /// Wraps `user_text` with the memory block for the outbound request.
    pub fn inject(&self, user_text: &str) -> String {
        format!(
            "MEMORY CONTEXT (relevant memories):\n{}\n\n---\nUSER QUESTION:\n{}",
            self, user_text
        )
    }
}

impl fmt::Display for MemoryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.snippets.iter().map(|s| format!("- {}", s)).collect();
        f.write_str(&lines.join("\n"))
    }
}

/// Best-effort lookup of long-term memories relevant to a query.
pub struct MemoryRetriever {
    db_path: PathBuf,
    collection: String,
    limit: usize,
    embedder: Arc<dyn Embedder>,
}

impl MemoryRetriever {
    pub fn new(
        db_path: impl Into<PathBuf>,
        collection: impl Into<String>,
        limit: usize,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            db_path: db_path.into(),
            collection: collection.into(),
            limit,
            embedder,
        }
    }

    /// Never fails: an absent index, a broken index or zero matches all yield `None`.
    pub async fn query(&self, text: &str) -> Option<MemoryContext> {
        match self.try_query(text).await {
            Ok(context) => context,
            Err(e) => {
                error!("❌ [RAG] Memory lookup failed: {}", e);
                None
            }
        }
    }

    async fn try_query(&self, text: &str) -> Result<Option<MemoryContext>> {
        let collection_path = VectorStore::collection_path(&self.db_path, &self.collection);
        if !collection_path.exists() {
            warn!("⚠️  [RAG] No memory index at {:?}", collection_path);
            return Ok(None);
        }

        let store = VectorStore::open(&self.db_path, &self.collection, self.embedder.clone())
            .await
            .map_err(|e| ChatError::retrieval(e.to_string()))?;
        let hits = store
            .search(text, self.limit)
            .map_err(|e| ChatError::retrieval(e.to_string()))?;

        let snippets: Vec<String> = hits.into_iter().map(|(doc, _score)| doc.content).collect();
        let Some(top) = snippets.first() else {
            info!("🧠 [RAG] No relevant memories for this query");
            return Ok(None);
        };

        info!("🧠 [RAG] Context injected ({} items): '{}'", snippets.len(), preview(top));
        Ok(Some(MemoryContext { snippets }))
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
