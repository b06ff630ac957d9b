//! Error taxonomy shared by every pipeline stage.

use std::fmt;

use thiserror::Error;

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FetchCorpus,
    Link,
    Classify,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchCorpus => "fetch-corpus",
            Self::Link => "link",
            Self::Classify => "classify",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced to callers of the analysis pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing clause corpus or missing credentials for a collaborator.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The uploaded table does not carry the required columns.
    #[error("input schema error: {0}")]
    InputSchema(String),
    /// A remote collaborator failed (timeout, quota, malformed response).
    #[error("external service error ({service}): {message}")]
    ExternalService {
        service: &'static str,
        message: String,
    },
    #[error("{stage} stage failed: {source:#}")]
    Stage {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Wrap a capability failure with the stage it happened in.
    pub fn stage(stage: Stage, source: impl Into<anyhow::Error>) -> Self {
        Self::Stage {
            stage,
            source: source.into(),
        }
    }

    pub fn external(service: &'static str, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service,
            message: message.into(),
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
