//! Text embedding capability built on fastembed, with a deterministic
//! feature-hashing fallback when the `embeddings` feature is off.

use std::collections::HashSet;

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

#[cfg(feature = "embeddings")]
use std::{path::Path, sync::Mutex};

#[cfg(feature = "embeddings")]
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

/// Dimension of all-MiniLM-L6-v2 and of the hashing fallback.
pub const EMBEDDING_DIM: usize = 384;

/// Maps a batch of strings to L2-normalised vectors of equal length.
pub trait TextEmbedder: Send + Sync {
    fn dim(&self) -> usize;

    /// One normalised vector per input, in input order.
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;
}

/// L2-normalise a vector in place; zero vectors stay zero.
pub fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot = a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
    let norm_a = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("valid regex"));

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "have", "i", "in",
        "is", "it", "its", "of", "on", "or", "that", "the", "this", "to", "was", "we", "were",
        "will", "with", "our", "they", "their", "should", "would",
    ]
    .into_iter()
    .collect()
});

/// Lowercased word tokens with stop-words removed.
pub fn tokenize(text: &str) -> Vec<String> {
    TOKEN
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .filter(|t| !STOP_WORDS.contains(t.as_str()))
        .collect()
}

/// Bag-of-words embedder using the hashing trick. Deterministic across runs
/// and platforms; used when no neural model is compiled in.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];
        for token in tokenize(text) {
            let hash = fnv1a(token.as_bytes());
            let slot = (hash % self.dim as u64) as usize;
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            vector[slot] += sign;
        }
        normalize(&mut vector);
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(EMBEDDING_DIM)
    }
}

impl TextEmbedder for HashingEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}

/// all-MiniLM-L6-v2 sentence embeddings via fastembed (ONNX under the hood).
#[cfg(feature = "embeddings")]
pub struct FastEmbedder {
    model: Mutex<TextEmbedding>,
}

#[cfg(feature = "embeddings")]
impl FastEmbedder {
    /// Load the model, caching downloaded weights under `cache_dir`.
    pub fn load(cache_dir: &Path) -> Result<Self> {
        let options =
            InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_cache_dir(cache_dir.to_path_buf());
        let model = TextEmbedding::try_new(options)?;
        tracing::info!(cache = %cache_dir.display(), "loaded MiniLM embedder");
        Ok(Self {
            model: Mutex::new(model),
        })
    }
}

#[cfg(feature = "embeddings")]
impl TextEmbedder for FastEmbedder {
    fn dim(&self) -> usize {
        EMBEDDING_DIM
    }

    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut model = self
            .model
            .lock()
            .map_err(|_| anyhow::anyhow!("embedding model lock poisoned"))?;
        let mut embeddings = model.embed(texts.to_vec(), None)?;
        for vector in &mut embeddings {
            normalize(vector);
        }
        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_vectors_are_unit_length() {
        let embedder = HashingEmbedder::default();
        let vectors = embedder
            .embed(&["Consent must be explicit", "consent explicit"])
            .unwrap();
        for v in &vectors {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5);
        }
        assert!(cosine(&vectors[0], &vectors[1]) > 0.75);
    }

    #[test]
    fn blank_text_embeds_to_zero() {
        let embedder = HashingEmbedder::default();
        let vectors = embedder.embed(&["   ", "the and of"]).unwrap();
        assert!(vectors.iter().all(|v| v.iter().all(|x| *x == 0.0)));
    }
}
