use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::{api::sync::ApiBuilder, Repo, RepoType};
use std::path::PathBuf;
use std::sync::Mutex;
use tokenizers::{PaddingParams, Tokenizer};
use tracing::info;

/// Turns text into a fixed-length vector for nearest-neighbour search.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// all-MiniLM-L6-v2 sentence embeddings on CPU.
pub struct EmbeddingModel {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl EmbeddingModel {
    pub const MODEL_ID: &'static str = "sentence-transformers/all-MiniLM-L6-v2";

    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        let device = Device::Cpu;

        let api = ApiBuilder::new()
            .with_cache_dir(cache_dir)
            .build()
            .map_err(|e| anyhow!("Failed to init HF API: {}", e))?;

        let repo = api.repo(Repo::new(Self::MODEL_ID.to_string(), RepoType::Model));

        let fetch = |name: &str| {
            repo.get(name).map_err(|e| anyhow!("Failed to get {}: {}", name, e))
        };
        let config_filename = fetch("config.json")?;
        let tokenizer_filename = fetch("tokenizer.json")?;
        let weights_filename = fetch("model.safetensors")?;

        let config: Config = serde_json::from_str(&std::fs::read_to_string(config_filename)?)?;
        let mut tokenizer = Tokenizer::from_file(tokenizer_filename).map_err(|e| anyhow!(e))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: tokenizers::PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        let vb =
            unsafe { VarBuilder::from_mmaped_safetensors(&[weights_filename], DTYPE, &device)? };
        let model = BertModel::load(vb, &config)?;

        Ok(Self { model, tokenizer, device })
    }

    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let tokens = self.tokenizer.encode(text, true).map_err(|e| anyhow!(e))?;
        let token_ids = Tensor::new(tokens.get_ids(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = token_ids.zeros_like()?;

        let embeddings = self.model.forward(&token_ids, &token_type_ids, None)?;

        // Mean pooling
        let (_n_sentence, n_tokens, _hidden_size) = embeddings.dims3()?;
        let embeddings = (embeddings.sum(1)? / (n_tokens as f64))?;
        let embeddings = embeddings.squeeze(0)?;

        // Normalize
        let norm = embeddings.sqr()?.sum_all()?.sqrt()?;
        let embeddings = embeddings.broadcast_div(&norm)?;

        Ok(embeddings.to_vec1()?)
    }
}

/// Loads the MiniLM weights on first use and keeps them for the process.
pub struct MiniLmEmbedder {
    cache_dir: PathBuf,
    model: Mutex<Option<EmbeddingModel>>,
}

impl MiniLmEmbedder {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self { cache_dir: cache_dir.into(), model: Mutex::new(None) }
    }
}

impl Embedder for MiniLmEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut guard = self
            .model
            .lock()
            .map_err(|e| anyhow!("embedding model lock poisoned: {}", e))?;
        if guard.is_none() {
            info!("Loading embedding model {}", EmbeddingModel::MODEL_ID);
            *guard = Some(EmbeddingModel::new(self.cache_dir.clone())?);
        }
        match guard.as_ref() {
            Some(model) => model.embed(text),
            None => Err(anyhow!("embedding model unavailable")),
        }
    }
}
