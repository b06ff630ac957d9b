//! Sentiment classification: the model capability and the pipeline step that
//! runs it over relevant comments only.

use std::{collections::HashSet, sync::Arc};

use anyhow::{anyhow, ensure, Result as AnyResult};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, instrument};

use crate::{
    data::records::{round_to, ClauseMatch, Sentiment},
    error::{PipelineError, Result, Stage},
};

pub const NEGATIVE: &str = "negative";
pub const NEUTRAL: &str = "neutral";
pub const POSITIVE: &str = "positive";

pub const DEFAULT_CLASSIFY_BATCH: usize = 32;

/// A sequence classifier producing one logit per label.
pub trait SentimentModel: Send + Sync {
    /// Labels in logit order.
    fn labels(&self) -> &[String];

    /// Longest input accepted, in characters.
    fn max_input_chars(&self) -> usize;

    fn logits(&self, texts: &[&str]) -> AnyResult<Vec<Vec<f32>>>;
}

/// Runs a [`SentimentModel`] over the comments the linker kept.
pub struct SentimentClassifier {
    model: Arc<dyn SentimentModel>,
    batch_size: usize,
}

impl SentimentClassifier {
    pub fn new(model: Arc<dyn SentimentModel>) -> Self {
        Self {
            model,
            batch_size: DEFAULT_CLASSIFY_BATCH,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Classify relevant comments; irrelevant ones become `NotApplicable`
    /// without reaching the model. A model failure fails the whole call.
    #[instrument(skip_all, fields(comments = comments.len()))]
    pub fn classify(&self, comments: &[&str], links: &[ClauseMatch]) -> Result<Vec<Sentiment>> {
        if comments.len() != links.len() {
            return Err(PipelineError::stage(
                Stage::Classify,
                anyhow!(
                    "{} comments but {} clause links",
                    comments.len(),
                    links.len()
                ),
            ));
        }

        let relevant: Vec<&str> = comments
            .iter()
            .zip(links)
            .filter(|(_, link)| link.clause.is_relevant())
            .map(|(text, _)| *text)
            .collect();
        info!(
            relevant = relevant.len(),
            skipped = comments.len() - relevant.len(),
            "classifying relevant comments"
        );
        if relevant.is_empty() {
            return Ok(vec![Sentiment::NotApplicable; comments.len()]);
        }

        let mut predictions = self
            .classify_texts(&relevant)
            .map_err(|e| PipelineError::stage(Stage::Classify, e))?
            .into_iter();

        let mut out = Vec::with_capacity(comments.len());
        for link in links {
            if link.clause.is_relevant() {
                let sentiment = predictions.next().ok_or_else(|| {
                    PipelineError::stage(Stage::Classify, anyhow!("classifier returned too few rows"))
                })?;
                out.push(sentiment);
            } else {
                out.push(Sentiment::NotApplicable);
            }
        }
        Ok(out)
    }

    /// Label and probability (4 decimals) for each text.
    pub fn classify_texts(&self, texts: &[&str]) -> AnyResult<Vec<Sentiment>> {
        let labels = self.model.labels();
        ensure!(!labels.is_empty(), "sentiment model has no labels");
        let max_chars = self.model.max_input_chars();

        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let truncated: Vec<&str> = batch.iter().map(|t| truncate_chars(t, max_chars)).collect();
            let logits = self.model.logits(&truncated)?;
            ensure!(
                logits.len() == batch.len(),
                "model returned {} rows for a batch of {}",
                logits.len(),
                batch.len()
            );
            for row in logits {
                ensure!(
                    row.len() == labels.len(),
                    "model returned {} logits for {} labels",
                    row.len(),
                    labels.len()
                );
                let probs = softmax(&row);
                let (top, prob) = argmax(&probs).ok_or_else(|| anyhow!("empty logit row"))?;
                out.push(Sentiment::Classified {
                    label: labels[top].clone(),
                    score: round_to(prob as f64, 4),
                });
            }
        }
        Ok(out)
    }
}

/// Cut `text` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Highest value, lowest index on ties.
fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    values.iter().copied().enumerate().fold(None, |best, (idx, v)| match best {
        Some((_, current)) if v <= current => best,
        _ => Some((idx, v)),
    })
}

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}']+").expect("valid regex"));

static POSITIVE_TERMS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "good", "great", "excellent", "support", "supports", "welcome", "welcomed", "benefit",
        "beneficial", "protect", "protects", "protection", "fair", "clear", "helpful", "improve",
        "improves", "progressive", "appreciate", "love", "positive", "safe", "safer", "strong",
        "empower", "empowers", "transparent", "necessary", "agree", "thank", "thanks", "best",
    ]
    .into_iter()
    .collect()
});

static NEGATIVE_TERMS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "bad", "terrible", "awful", "oppose", "opposed", "against", "unfair", "vague", "harmful",
        "harm", "burden", "burdensome", "costly", "expensive", "invasive", "surveillance",
        "violate", "violates", "violation", "worst", "hate", "reject", "dangerous", "abuse",
        "draconian", "excessive", "unclear", "loophole", "overreach", "fear", "worried", "poor",
        "disagree", "concern", "concerns", "concerned", "problematic", "useless", "angry",
    ]
    .into_iter()
    .collect()
});

static NEGATORS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "not", "no", "never", "nothing", "hardly", "without", "don't", "doesn't", "isn't",
        "aren't", "wasn't", "can't", "cannot", "won't", "didn't", "shouldn't",
    ]
    .into_iter()
    .collect()
});

/// Lexicon classifier over negative / neutral / positive with a short negation
/// window. Used when no ONNX model is compiled in.
pub struct LexiconSentiment {
    labels: Vec<String>,
}

impl LexiconSentiment {
    const NEGATION_WINDOW: usize = 3;

    pub fn new() -> Self {
        Self {
            labels: vec![NEGATIVE.into(), NEUTRAL.into(), POSITIVE.into()],
        }
    }

    fn score(text: &str) -> (f32, f32) {
        let lower = text.to_lowercase();
        let mut positive = 0.0f32;
        let mut negative = 0.0f32;
        let mut since_negator = usize::MAX;
        for word in WORD.find_iter(&lower).map(|m| m.as_str()) {
            if NEGATORS.contains(word) {
                since_negator = 0;
                continue;
            }
            since_negator = since_negator.saturating_add(1);
            let negated = since_negator <= Self::NEGATION_WINDOW;
            let (pos, neg) = (POSITIVE_TERMS.contains(word), NEGATIVE_TERMS.contains(word));
            match (pos, neg, negated) {
                (true, _, false) | (_, true, true) => positive += 1.0,
                (true, _, true) | (_, true, false) => negative += 1.0,
                _ => {}
            }
        }
        (negative, positive)
    }
}

impl Default for LexiconSentiment {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentModel for LexiconSentiment {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn max_input_chars(&self) -> usize {
        2048
    }

    fn logits(&self, texts: &[&str]) -> AnyResult<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let (negative, positive) = Self::score(text);
                vec![2.0 * negative, 0.75, 2.0 * positive]
            })
            .collect())
    }
}

#[cfg(feature = "onnx")]
pub use onnx::OnnxSentiment;

#[cfg(feature = "onnx")]
mod onnx {
    //! RoBERTa-style sequence classifier served by ONNX Runtime.

    use std::{collections::BTreeMap, path::Path, sync::Mutex};

    use anyhow::{anyhow, ensure, Result};
    use ort::{session::Session, value::Tensor};
    use serde::Deserialize;
    use tokenizers::Tokenizer;
    use tracing::info;

    use super::{SentimentModel, NEGATIVE, NEUTRAL, POSITIVE};

    const MAX_TOKENS: usize = 512;

    #[derive(Debug, Deserialize)]
    struct ModelConfig {
        #[serde(default)]
        id2label: BTreeMap<String, String>,
    }

    pub struct OnnxSentiment {
        session: Mutex<Session>,
        tokenizer: Tokenizer,
        labels: Vec<String>,
    }

    impl OnnxSentiment {
        /// Load `model.onnx`, `tokenizer.json` and (optionally) `config.json`.
        pub fn load(model_dir: &Path) -> Result<Self> {
            let model_path = model_dir.join("model.onnx");
            let tokenizer_path = model_dir.join("tokenizer.json");
            ensure!(model_path.exists(), "model.onnx not found in {model_dir:?}");
            ensure!(
                tokenizer_path.exists(),
                "tokenizer.json not found in {model_dir:?}"
            );

            let session = Session::builder()?.commit_from_file(&model_path)?;
            let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| anyhow!("load tokenizer: {e}"))?;
            tokenizer
                .with_truncation(Some(tokenizers::TruncationParams {
                    max_length: MAX_TOKENS,
                    ..Default::default()
                }))
                .map_err(|e| anyhow!("set truncation: {e}"))?;
            tokenizer.with_padding(Some(tokenizers::PaddingParams::default()));

            let labels = read_labels(&model_dir.join("config.json"))?;
            info!(model = %model_path.display(), ?labels, "loaded sentiment model");
            Ok(Self {
                session: Mutex::new(session),
                tokenizer,
                labels,
            })
        }
    }

    fn read_labels(path: &Path) -> Result<Vec<String>> {
        if !path.exists() {
            return Ok(vec![NEGATIVE.into(), NEUTRAL.into(), POSITIVE.into()]);
        }
        let config: ModelConfig = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        let mut indexed: Vec<(usize, String)> = config
            .id2label
            .into_iter()
            .map(|(id, label)| Ok((id.parse::<usize>()?, label.to_lowercase())))
            .collect::<Result<_>>()?;
        indexed.sort_by_key(|(id, _)| *id);
        ensure!(!indexed.is_empty(), "config.json has no id2label entries");
        Ok(indexed.into_iter().map(|(_, label)| label).collect())
    }

    impl SentimentModel for OnnxSentiment {
        fn labels(&self) -> &[String] {
            &self.labels
        }

        fn max_input_chars(&self) -> usize {
            // tokens are truncated separately; this only bounds tokenizer work
            MAX_TOKENS * 8
        }

        fn logits(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            let batch_size = texts.len();
            let encodings = self
                .tokenizer
                .encode_batch(texts.to_vec(), true)
                .map_err(|e| anyhow!("tokenize: {e}"))?;
            let seq_len = encodings
                .iter()
                .map(|e| e.get_ids().len())
                .max()
                .unwrap_or(0);

            let mut input_ids = vec![0i64; batch_size * seq_len];
            let mut attention_mask = vec![0i64; batch_size * seq_len];
            for (i, encoding) in encodings.iter().enumerate() {
                let offset = i * seq_len;
                for (j, &id) in encoding.get_ids().iter().enumerate() {
                    input_ids[offset + j] = id as i64;
                }
                for (j, &mask) in encoding.get_attention_mask().iter().enumerate() {
                    attention_mask[offset + j] = mask as i64;
                }
            }

            let shape = [batch_size as i64, seq_len as i64];
            let ids_tensor = Tensor::from_array((shape, input_ids.into_boxed_slice()))?;
            let mask_tensor = Tensor::from_array((shape, attention_mask.into_boxed_slice()))?;

            let mut session = self
                .session
                .lock()
                .map_err(|_| anyhow!("sentiment session lock poisoned"))?;
            let outputs = session.run(ort::inputs![
                "input_ids" => ids_tensor,
                "attention_mask" => mask_tensor,
            ])?;

            let (output_shape, data) = outputs[0].try_extract_tensor::<f32>()?;
            let dims: &[i64] = output_shape;
            let n_labels = self.labels.len();
            ensure!(
                dims.len() == 2 && dims[0] as usize == batch_size && dims[1] as usize == n_labels,
                "unexpected output shape: {dims:?}, expected [{batch_size}, {n_labels}]"
            );
            Ok(data.chunks(n_labels).map(<[f32]>::to_vec).collect())
        }
    }
}
