//! Process-wide model pool. Models are loaded lazily, at most once, and shared
//! read-only by every request until the process exits.

use std::sync::Arc;

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing::info;

use super::{
    embeddings::TextEmbedder,
    linker::ClauseLinker,
    sentiment::{SentimentClassifier, SentimentModel},
};
use crate::config::Settings;

static GLOBAL: OnceCell<ModelPool> = OnceCell::new();

/// Shared handles to the embedder and the sentiment model.
#[derive(Clone)]
pub struct ModelPool {
    embedder: Arc<dyn TextEmbedder>,
    sentiment: Arc<dyn SentimentModel>,
    embed_batch_size: usize,
    classify_batch_size: usize,
}

impl ModelPool {
    /// The process-wide pool, loading it on first use.
    pub fn global(settings: &Settings) -> Result<&'static ModelPool> {
        GLOBAL.get_or_try_init(|| Self::load(settings))
    }

    /// Assemble a pool from explicit capabilities.
    pub fn from_parts(embedder: Arc<dyn TextEmbedder>, sentiment: Arc<dyn SentimentModel>) -> Self {
        Self {
            embedder,
            sentiment,
            embed_batch_size: super::linker::DEFAULT_EMBED_BATCH,
            classify_batch_size: super::sentiment::DEFAULT_CLASSIFY_BATCH,
        }
    }

    pub fn with_batch_sizes(mut self, embed: usize, classify: usize) -> Self {
        self.embed_batch_size = embed.max(1);
        self.classify_batch_size = classify.max(1);
        self
    }

    /// Load the best models compiled into this build.
    pub fn load(settings: &Settings) -> Result<Self> {
        let embedder = load_embedder(settings)?;
        let sentiment = load_sentiment(settings)?;
        info!(dim = embedder.dim(), labels = ?sentiment.labels(), "model pool ready");
        Ok(Self::from_parts(embedder, sentiment)
            .with_batch_sizes(settings.embed_batch_size, settings.classify_batch_size))
    }

    pub fn embedder(&self) -> Arc<dyn TextEmbedder> {
        Arc::clone(&self.embedder)
    }

    pub fn sentiment(&self) -> Arc<dyn SentimentModel> {
        Arc::clone(&self.sentiment)
    }

    pub fn linker(&self) -> ClauseLinker {
        ClauseLinker::new(self.embedder()).with_batch_size(self.embed_batch_size)
    }

    pub fn classifier(&self) -> SentimentClassifier {
        SentimentClassifier::new(self.sentiment()).with_batch_size(self.classify_batch_size)
    }
}

#[cfg(feature = "embeddings")]
fn load_embedder(settings: &Settings) -> Result<Arc<dyn TextEmbedder>> {
    let cache = settings.model_dir.join("fastembed");
    Ok(Arc::new(super::embeddings::FastEmbedder::load(&cache)?))
}

#[cfg(not(feature = "embeddings"))]
fn load_embedder(_settings: &Settings) -> Result<Arc<dyn TextEmbedder>> {
    info!("embeddings feature disabled; using hashing embedder");
    Ok(Arc::new(super::embeddings::HashingEmbedder::default()))
}

#[cfg(feature = "onnx")]
fn load_sentiment(settings: &Settings) -> Result<Arc<dyn SentimentModel>> {
    let dir = settings.model_dir.join("sentiment");
    if dir.join("model.onnx").exists() {
        return Ok(Arc::new(super::sentiment::OnnxSentiment::load(&dir)?));
    }
    tracing::warn!(dir = %dir.display(), "no ONNX sentiment model found; using lexicon");
    Ok(Arc::new(super::sentiment::LexiconSentiment::new()))
}

#[cfg(not(feature = "onnx"))]
fn load_sentiment(_settings: &Settings) -> Result<Arc<dyn SentimentModel>> {
    Ok(Arc::new(super::sentiment::LexiconSentiment::new()))
}
