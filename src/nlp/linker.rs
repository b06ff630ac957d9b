//! Clause linker: assigns every comment to the clause it most likely discusses.
//!
//! Clause texts and comments are embedded with the same [`TextEmbedder`], the
//! cosine similarity matrix `S = M · Cᵗ` is computed in one product, and each
//! comment takes the arg-max clause unless the best score falls below
//! [`LINK_THRESHOLD`]. On exact ties the clause that comes first in corpus
//! order wins.

use std::sync::Arc;

use anyhow::{anyhow, ensure};
use ndarray::{Array2, ArrayView1};
use tracing::{debug, info, instrument, warn};

use super::embeddings::TextEmbedder;
use crate::{
    data::{
        corpus::ClauseCorpus,
        records::{ClauseMatch, LinkedClause},
    },
    error::{PipelineError, Result, Stage},
};

/// Comments whose best similarity is strictly below this are irrelevant.
pub const LINK_THRESHOLD: f32 = 0.25;

pub const DEFAULT_EMBED_BATCH: usize = 64;

pub struct ClauseLinker {
    embedder: Arc<dyn TextEmbedder>,
    batch_size: usize,
}

impl ClauseLinker {
    pub fn new(embedder: Arc<dyn TextEmbedder>) -> Self {
        Self {
            embedder,
            batch_size: DEFAULT_EMBED_BATCH,
        }
    }

    /// Comments embedded per call; affects throughput only.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Link each comment to a clause, aligned 1:1 with `comments`.
    #[instrument(skip_all, fields(clauses = corpus.len(), comments = comments.len()))]
    pub fn link(&self, corpus: &ClauseCorpus, comments: &[&str]) -> Result<Vec<ClauseMatch>> {
        if comments.is_empty() {
            return Ok(Vec::new());
        }
        let similarity = self
            .similarity_matrix(corpus, comments)
            .map_err(|e| PipelineError::stage(Stage::Link, e))?;

        let ids = corpus.ids();
        let mut matches = Vec::with_capacity(comments.len());
        for (comment_idx, row) in similarity.rows().into_iter().enumerate() {
            if let Some(clause_idx) = row.iter().position(|score| !score.is_finite()) {
                return Err(PipelineError::stage(
                    Stage::Link,
                    anyhow!(
                        "non-finite similarity for comment {comment_idx} against clause '{}'",
                        ids[clause_idx]
                    ),
                ));
            }
            let (best, score) = best_clause(row).ok_or_else(|| {
                PipelineError::stage(Stage::Link, anyhow!("similarity row is empty"))
            })?;
            let clause = if score < LINK_THRESHOLD {
                LinkedClause::Irrelevant
            } else {
                LinkedClause::Linked(ids[best].to_string())
            };
            matches.push(ClauseMatch {
                clause,
                similarity: score,
            });
        }

        let relevant = matches.iter().filter(|m| m.clause.is_relevant()).count();
        info!(relevant, irrelevant = matches.len() - relevant, "linked comments");
        if relevant == 0 {
            warn!(threshold = LINK_THRESHOLD, "no comment reached the link threshold");
        }
        Ok(matches)
    }

    /// `(n_comments × n_clauses)` cosine similarities.
    pub fn similarity_matrix(
        &self,
        corpus: &ClauseCorpus,
        comments: &[&str],
    ) -> anyhow::Result<Array2<f32>> {
        debug!(clauses = corpus.len(), "vectorizing clauses");
        let clause_rows = self.embedder.embed(&corpus.texts())?;
        ensure!(
            clause_rows.len() == corpus.len(),
            "embedder returned {} vectors for {} clauses",
            clause_rows.len(),
            corpus.len()
        );
        let clauses = to_matrix(clause_rows)?;

        debug!(comments = comments.len(), batch = self.batch_size, "vectorizing comments");
        let mut comment_rows = Vec::with_capacity(comments.len());
        for batch in comments.chunks(self.batch_size) {
            let vectors = self.embedder.embed(batch)?;
            ensure!(
                vectors.len() == batch.len(),
                "embedder returned {} vectors for a batch of {}",
                vectors.len(),
                batch.len()
            );
            comment_rows.extend(vectors);
        }
        let comments = to_matrix(comment_rows)?;
        ensure!(
            comments.ncols() == clauses.ncols(),
            "comment vectors have dimension {} but clause vectors have {}",
            comments.ncols(),
            clauses.ncols()
        );

        Ok(comments.dot(&clauses.t()))
    }
}

/// Arg-max with first-index tie break. Expects finite scores.
pub fn best_clause(row: ArrayView1<'_, f32>) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &score) in row.iter().enumerate() {
        let replace = match best {
            None => true,
            Some((_, current)) => score > current,
        };
        if replace {
            best = Some((idx, score));
        }
    }
    best
}

fn to_matrix(rows: Vec<Vec<f32>>) -> anyhow::Result<Array2<f32>> {
    let n = rows.len();
    let dim = rows.first().map(Vec::len).unwrap_or(0);
    ensure!(
        rows.iter().all(|r| r.len() == dim),
        "embedding vectors have inconsistent dimensions"
    );
    let flat: Vec<f32> = rows.into_iter().flatten().collect();
    Ok(Array2::from_shape_vec((n, dim), flat)?)
}
