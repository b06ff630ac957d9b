//! Runtime configuration utilities for policyiq.

use std::{
    env, fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::Deserialize;

use crate::error::PipelineError;

/// Application configuration resolved from `.env` and defaults.
#[derive(Clone, Deserialize)]
pub struct Settings {
    /// Credential for the narrative generation backend.
    pub groq_api_key: Option<String>,
    /// Credential for the law context backend.
    pub genai_api_key: Option<String>,
    /// Root folder for cached corpora.
    pub data_dir: PathBuf,
    /// Root folder for analysis outputs.
    pub outputs_dir: PathBuf,
    /// Local model files and embedding cache.
    pub model_dir: PathBuf,
    /// Comments embedded per batch.
    pub embed_batch_size: usize,
    /// Comments classified per batch.
    pub classify_batch_size: usize,
    /// Completed reports kept by the request cache.
    pub analysis_cache_capacity: usize,
    /// Timeout for one remote call, in seconds.
    pub remote_timeout_secs: u64,
    /// Attempts made for a remote call before giving up.
    pub remote_max_attempts: u32,
}

impl Settings {
    /// Load configuration from environment with reasonable defaults.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let groq_api_key = non_empty_var("GROQ_API_KEY");
        let genai_api_key = non_empty_var("GENAI_API_KEY");
        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));
        let outputs_dir = env::var("OUTPUTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./outputs"));
        let model_dir = env::var("MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./models"));

        std::fs::create_dir_all(&data_dir).context("creating data dir")?;
        std::fs::create_dir_all(&outputs_dir).context("creating outputs dir")?;

        Ok(Self {
            groq_api_key,
            genai_api_key,
            data_dir,
            outputs_dir,
            model_dir,
            embed_batch_size: parsed_var("EMBED_BATCH_SIZE").unwrap_or(64),
            classify_batch_size: parsed_var("CLASSIFY_BATCH_SIZE").unwrap_or(32),
            analysis_cache_capacity: parsed_var("ANALYSIS_CACHE_CAPACITY").unwrap_or(64),
            remote_timeout_secs: parsed_var("REMOTE_TIMEOUT_SECS").unwrap_or(30),
            remote_max_attempts: parsed_var("REMOTE_MAX_ATTEMPTS").unwrap_or(3),
        })
    }

    /// Settings rooted at explicit directories, without credentials.
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            groq_api_key: None,
            genai_api_key: None,
            data_dir: root.join("data"),
            outputs_dir: root.join("outputs"),
            model_dir: root.join("models"),
            embed_batch_size: 64,
            classify_batch_size: 32,
            analysis_cache_capacity: 64,
            remote_timeout_secs: 30,
            remote_max_attempts: 3,
        }
    }

    /// Convenience helper for derived path segments.
    pub fn join_data<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.data_dir.join(path)
    }

    /// Convenience helper for derived output path segments.
    pub fn join_output<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.outputs_dir.join(path)
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs.max(1))
    }

    /// Credential for the narrative backend, or a configuration error.
    pub fn require_groq_key(&self) -> Result<&str, PipelineError> {
        self.groq_api_key.as_deref().ok_or_else(|| {
            PipelineError::Configuration("GROQ_API_KEY is not set".to_string())
        })
    }

    /// Credential for the law context backend, or a configuration error.
    pub fn require_genai_key(&self) -> Result<&str, PipelineError> {
        self.genai_api_key.as_deref().ok_or_else(|| {
            PipelineError::Configuration("GENAI_API_KEY is not set".to_string())
        })
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("groq_api_key", &redacted(&self.groq_api_key))
            .field("genai_api_key", &redacted(&self.genai_api_key))
            .field("data_dir", &self.data_dir)
            .field("outputs_dir", &self.outputs_dir)
            .field("model_dir", &self.model_dir)
            .field("embed_batch_size", &self.embed_batch_size)
            .field("classify_batch_size", &self.classify_batch_size)
            .field("analysis_cache_capacity", &self.analysis_cache_capacity)
            .field("remote_timeout_secs", &self.remote_timeout_secs)
            .field("remote_max_attempts", &self.remote_max_attempts)
            .finish()
    }
}

fn redacted(key: &Option<String>) -> &'static str {
    match key {
        Some(_) => "<redacted>",
        None => "<unset>",
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::rooted_at(dir.path());
        settings.groq_api_key = Some("gsk_live_abc".into());
        let printed = format!("{settings:?}");
        assert!(!printed.contains("gsk_live_abc"));
        assert!(printed.contains("groq_api_key: \"<redacted>\""));
        assert!(printed.contains("genai_api_key: \"<unset>\""));
    }
}
