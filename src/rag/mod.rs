pub mod embeddings;
pub mod store;

pub use embeddings::{Embedder, EmbeddingModel, MiniLmEmbedder};
pub use store::{Document, VectorStore};
