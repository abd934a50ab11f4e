use crate::rag::embeddings::Embedder;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub metadata: serde_json::Value,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Collection {
    name: String,
    documents: Vec<Document>,
}

/// A named collection of embedded documents persisted under a directory.
pub struct VectorStore {
    path: PathBuf,
    collection: Collection,
    embedder: Arc<dyn Embedder>,
}

impl VectorStore {
    /// Opens `<dir>/<collection>.json`, creating an empty collection if absent.
    pub async fn open(dir: &Path, collection: &str, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let path = Self::collection_path(dir, collection);

        let collection = if fs::try_exists(&path).await? {
            let content = fs::read_to_string(&path).await?;
            serde_json::from_str(&content)
                .map_err(|e| anyhow!("collection {:?} is unreadable: {}", path, e))?
        } else {
            Collection { name: collection.to_string(), documents: Vec::new() }
        };

        Ok(Self { path, collection, embedder })
    }

    pub fn collection_path(dir: &Path, collection: &str) -> PathBuf {
        dir.join(format!("{}.json", collection))
    }

    pub fn name(&self) -> &str {
        &self.collection.name
    }

    pub fn documents(&self) -> &[Document] {
        &self.collection.documents
    }

    pub fn len(&self) -> usize {
        self.collection.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.documents.is_empty()
    }

    pub async fn add_text(&mut self, content: &str, metadata: serde_json::Value) -> Result<String> {
        let embedding = self.embedder.embed(content)?;
        let id = uuid::Uuid::new_v4().to_string();

        self.collection.documents.push(Document {
            id: id.clone(),
            content: content.to_string(),
            metadata,
            embedding,
        });
        self.save().await?;

        Ok(id)
    }

    /// Removes the document with `id`. Returns false when no such document exists.
    pub async fn delete(&mut self, id: &str) -> Result<bool> {
        let before = self.collection.documents.len();
        self.collection.documents.retain(|d| d.id != id);
        if self.collection.documents.len() == before {
            return Ok(false);
        }
        self.save().await?;
        Ok(true)
    }

    /// Nearest neighbours of `query`, most similar first.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<(Document, f32)>> {
        if self.collection.documents.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query)?;

        let mut scores: Vec<(usize, f32)> = self.collection.documents.iter().enumerate()
            .map(|(i, doc)| (i, cosine_similarity(&query_embedding, &doc.embedding)))
            .collect();

        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scores.into_iter()
            .take(limit)
            .map(|(i, score)| (self.collection.documents[i].clone(), score))
            .collect())
    }

    async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(&self.collection)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!("Saved {} documents to {:?}", self.len(), self.path);
        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    /// One dimension per known keyword.
    struct KeywordEmbedder;

    impl Embedder for KeywordEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let text = text.to_lowercase();
            Ok(["rust", "coffee", "cat"]
                .iter()
                .map(|k| if text.contains(k) { 1.0 } else { 0.0 })
                .collect())
        }
    }

    #[test]
    fn test_cosine_similarity_handles_zero_vectors() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let dir = TempDir::new().unwrap();
        let embedder: Arc<dyn Embedder> = Arc::new(KeywordEmbedder);
        let mut store = VectorStore::open(dir.path(), "agent_memory", embedder).await.unwrap();
        store.add_text("The user drinks coffee every morning", json!({})).await.unwrap();
        store.add_text("The user writes Rust at work", json!({})).await.unwrap();
        store.add_text("The user has a cat named Miso", json!({})).await.unwrap();

        let hits = store.search("what language, rust?", 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].0.content.contains("Rust"));
    }

    #[tokio::test]
    async fn test_add_delete_persist() {
        let dir = TempDir::new().unwrap();
        let embedder: Arc<dyn Embedder> = Arc::new(KeywordEmbedder);
        let mut store = VectorStore::open(dir.path(), "notes", embedder.clone()).await.unwrap();
        let id = store.add_text("cat facts", json!({"source": "test"})).await.unwrap();
        store.add_text("coffee facts", json!({})).await.unwrap();

        assert!(store.delete(&id).await.unwrap());
        assert!(!store.delete(&id).await.unwrap());

        let reopened = VectorStore::open(dir.path(), "notes", embedder).await.unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.name(), "notes");
        assert_eq!(reopened.documents()[0].content, "coffee facts");
    }
}
