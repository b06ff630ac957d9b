//! Clause corpus: the clauses of one law that comments are linked against.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use super::records::IRRELEVANT;
use crate::error::{PipelineError, Result};

/// A discrete, identified section of the law being analysed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    pub clause_id: String,
    #[serde(default)]
    pub title: String,
    /// Descriptive text; the only field that gets embedded.
    #[serde(alias = "simple_summary")]
    pub summary: String,
}

impl Clause {
    pub fn new(
        clause_id: impl Into<String>,
        title: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            clause_id: clause_id.into(),
            title: title.into(),
            summary: summary.into(),
        }
    }
}

/// Non-empty, ordered clause collection with unique ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClauseCorpus {
    clauses: Vec<Clause>,
}

impl ClauseCorpus {
    pub fn new(clauses: Vec<Clause>) -> Result<Self> {
        if clauses.is_empty() {
            return Err(PipelineError::Configuration(
                "clause corpus is empty; nothing to link against".to_string(),
            ));
        }
        let mut seen = HashSet::with_capacity(clauses.len());
        for clause in &clauses {
            if clause.clause_id == IRRELEVANT {
                return Err(PipelineError::Configuration(format!(
                    "clause id '{IRRELEVANT}' is reserved"
                )));
            }
            if !seen.insert(clause.clause_id.as_str()) {
                return Err(PipelineError::Configuration(format!(
                    "duplicate clause id '{}' in corpus",
                    clause.clause_id
                )));
            }
        }
        Ok(Self { clauses })
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.clauses.iter().map(|c| c.clause_id.as_str()).collect()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.clauses.iter().map(|c| c.summary.as_str()).collect()
    }

    pub fn into_clauses(self) -> Vec<Clause> {
        self.clauses
    }
}

/// Produces the clause list for a law.
pub trait CorpusSource: Send + Sync {
    fn fetch<'a>(&'a self, law_name: &'a str) -> BoxFuture<'a, Result<Vec<Clause>>>;
}

/// Parse a JSON list of clauses.
pub fn parse_clauses(json: &str) -> Result<Vec<Clause>> {
    Ok(serde_json::from_str(json)?)
}

/// Read a JSON clause list from disk.
pub fn load_clauses(path: &Path) -> Result<Vec<Clause>> {
    if !path.exists() {
        return Err(PipelineError::Configuration(format!(
            "law context file not found at {}",
            path.display()
        )));
    }
    let raw = std::fs::read_to_string(path)?;
    parse_clauses(&raw)
}

/// Persist a clause list as pretty JSON.
pub fn save_clauses(path: &Path, clauses: &[Clause]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(clauses)?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), clauses = clauses.len(), "saved law context");
    Ok(())
}

/// Clause list stored in a single JSON file, whatever law is asked for.
pub struct FileCorpus {
    path: PathBuf,
}

impl FileCorpus {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CorpusSource for FileCorpus {
    fn fetch<'a>(&'a self, _law_name: &'a str) -> BoxFuture<'a, Result<Vec<Clause>>> {
        Box::pin(async move { load_clauses(&self.path) })
    }
}

/// Reads `<dir>/<law>_context.json` when present, otherwise asks the inner
/// source and persists its answer.
pub struct CachedCorpus {
    dir: PathBuf,
    inner: Arc<dyn CorpusSource>,
}

impl CachedCorpus {
    pub fn new(dir: impl Into<PathBuf>, inner: Arc<dyn CorpusSource>) -> Self {
        Self {
            dir: dir.into(),
            inner,
        }
    }

    /// `<stem>_<hash>_context.json`; the hash of the trimmed name keeps laws
    /// whose stems collide apart.
    pub fn path_for(&self, law_name: &str) -> PathBuf {
        let law_name = law_name.trim();
        let digest = Sha256::digest(law_name.as_bytes());
        self.dir.join(format!(
            "{}_{}_context.json",
            file_stem(law_name),
            hex::encode(&digest[..4])
        ))
    }
}

impl CorpusSource for CachedCorpus {
    fn fetch<'a>(&'a self, law_name: &'a str) -> BoxFuture<'a, Result<Vec<Clause>>> {
        Box::pin(async move {
            let path = self.path_for(law_name);
            if path.exists() {
                info!(path = %path.display(), "using cached law context");
                return load_clauses(&path);
            }
            let clauses = self.inner.fetch(law_name).await?;
            if !clauses.is_empty() {
                save_clauses(&path, &clauses)?;
            }
            Ok(clauses)
        })
    }
}

/// File-system friendly rendition of a law name.
pub fn file_stem(law_name: &str) -> String {
    let stem: String = law_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "law".to_string()
    } else {
        stem
    }
}
