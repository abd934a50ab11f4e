use super::{Tool, ToolResult};
use crate::config::StorageConfig;
use crate::rag::{Embedder, MiniLmEmbedder, VectorStore};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

/// Long-term memory maintenance: the write side of what the retriever reads.
pub struct KnowledgeTool {
    db_path: PathBuf,
    collection: String,
    embedder: Arc<dyn Embedder>,
    store: Mutex<Option<VectorStore>>,
}

impl KnowledgeTool {
    pub fn new(storage: &StorageConfig) -> Self {
        let embedder: Arc<dyn Embedder> = Arc::new(MiniLmEmbedder::new(storage.model_cache_dir()));
        Self::with_embedder(storage.vector_db_path(), storage.collection.clone(), embedder)
    }

    pub fn with_embedder(
        db_path: impl Into<PathBuf>,
        collection: impl Into<String>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            db_path: db_path.into(),
            collection: collection.into(),
            embedder,
            store: Mutex::new(None),
        }
    }

    /// Locks the collection, opening it on first use.
    async fn open_store(&self) -> Result<MutexGuard<'_, Option<VectorStore>>> {
        let mut guard = self.store.lock().await;
        if guard.is_none() {
            let store =
                VectorStore::open(&self.db_path, &self.collection, self.embedder.clone()).await?;
            *guard = Some(store);
        }
        Ok(guard)
    }

    pub async fn add_memory(&self, content: &str, source: Option<&str>) -> Result<String> {
        if content.trim().is_empty() {
            return Err(anyhow!("memory content is empty"));
        }
        let metadata = json!({
            "source": source.unwrap_or("manual"),
            "created_at": chrono::Utc::now().to_rfc3339(),
        });

        let mut guard = self.open_store().await?;
        let store = guard.as_mut().ok_or_else(|| anyhow!("memory collection unavailable"))?;
        let id = store.add_text(content, metadata).await?;
        info!("🧠 Stored memory {}", id);
        Ok(id)
    }

    pub async fn delete_memory(&self, id: &str) -> Result<bool> {
        let mut guard = self.open_store().await?;
        let store = guard.as_mut().ok_or_else(|| anyhow!("memory collection unavailable"))?;
        store.delete(id).await
    }

    pub async fn list_memories(&self) -> Result<Vec<Value>> {
        let guard = self.open_store().await?;
        let store = guard.as_ref().ok_or_else(|| anyhow!("memory collection unavailable"))?;
        Ok(store
            .documents()
            .iter()
            .map(|d| json!({ "id": d.id, "content": d.content, "metadata": d.metadata }))
            .collect())
    }
}

#[async_trait]
impl Tool for KnowledgeTool {
    fn name(&self) -> &str {
        "knowledge"
    }

    fn description(&self) -> &str {
        "Long-term memory stored in the local vector index"
    }

    fn available_functions(&self) -> Vec<String> {
        vec![
            "add_memory".to_string(),
            "delete_memory".to_string(),
            "list_memories".to_string(),
        ]
    }

    async fn execute(&self, function: &str, args: Value) -> Result<ToolResult> {
        match function {
            "add_memory" => {
                let content = args["content"].as_str()
                    .ok_or_else(|| anyhow!("Missing 'content' parameter"))?;
                match self.add_memory(content, args["source"].as_str()).await {
                    Ok(id) => Ok(ToolResult::ok(json!({ "id": id, "message": "Memory stored." }))),
                    Err(e) => Ok(ToolResult::failed(format!("Failed to store memory: {}", e))),
                }
            }

            "delete_memory" => {
                let id = args["id"].as_str()
                    .ok_or_else(|| anyhow!("Missing 'id' parameter"))?;
                match self.delete_memory(id).await {
                    Ok(true) => {
                        Ok(ToolResult::ok(json!({ "message": format!("Memory {} deleted.", id) })))
                    }
                    Ok(false) => Ok(ToolResult::failed(format!("Memory {} not found.", id))),
                    Err(e) => Ok(ToolResult::failed(e.to_string())),
                }
            }

            "list_memories" => {
                let memories = self.list_memories().await?;
                Ok(ToolResult::ok(json!({ "count": memories.len(), "memories": memories })))
            }

            _ => Err(anyhow!("Unknown function: {}", function)),
        }
    }
}
