//! End-to-end analysis: comments + law context in, impact report out.
//!
//! Stages run strictly in order: parse table, fetch corpus, link, classify,
//! aggregate, narrate. Each stage takes ownership of the records it extends
//! and hands them on.

pub mod cache;

use std::sync::Arc;

use tracing::{info, instrument, warn};

pub use cache::{AnalysisCache, RequestKey, SharedResult, DEFAULT_CACHE_CAPACITY};

use crate::{
    data::{
        comments::CommentTable,
        corpus::{ClauseCorpus, CorpusSource},
        records::AnalyzedComment,
    },
    error::{PipelineError, Result, Stage},
    nlp::ModelPool,
    report::{
        aggregate, insight::narrate, Aggregation, AnalysisReport, ClauseInsight,
        InsightRequester, Insights, Polarity,
    },
};

pub struct Pipeline {
    corpus: Arc<dyn CorpusSource>,
    models: ModelPool,
    insights: Arc<dyn InsightRequester>,
}

impl Pipeline {
    pub fn new(
        corpus: Arc<dyn CorpusSource>,
        models: ModelPool,
        insights: Arc<dyn InsightRequester>,
    ) -> Self {
        Self {
            corpus,
            models,
            insights,
        }
    }

    /// Analyse an uploaded CSV for `law_name`.
    #[instrument(skip(self, csv_bytes), fields(bytes = csv_bytes.len()))]
    pub async fn run(&self, law_name: &str, csv_bytes: &[u8]) -> Result<AnalysisReport> {
        let table = CommentTable::from_csv_bytes(csv_bytes)?;
        self.run_table(law_name, table).await
    }

    pub async fn run_table(&self, law_name: &str, table: CommentTable) -> Result<AnalysisReport> {
        if table.is_empty() {
            info!(%law_name, "no comments to analyse");
            return Ok(AnalysisReport {
                law_name: law_name.to_string(),
                headers: table.headers().to_vec(),
                records: Vec::new(),
                aggregation: Aggregation::default(),
                insights: Insights::default(),
            });
        }

        info!(%law_name, comments = table.len(), "fetching law context");
        let clauses = self
            .corpus
            .fetch(law_name)
            .await
            .map_err(|err| match err {
                PipelineError::Io(_) | PipelineError::Json(_) | PipelineError::Csv(_) => {
                    PipelineError::stage(Stage::FetchCorpus, err)
                }
                other => other,
            })?;
        let corpus = ClauseCorpus::new(clauses)?;
        info!(clauses = corpus.len(), "law context ready");

        let models = self.models.clone();
        let (headers, records) =
            tokio::task::spawn_blocking(move || link_and_classify(&models, &corpus, table))
                .await
                .map_err(|e| PipelineError::stage(Stage::Link, e))??;

        let aggregation = aggregate(&records);
        let mut insights = Insights::default();
        for polarity in Polarity::ALL {
            match aggregation.selection(polarity) {
                Some(selection) => {
                    let narrative_text = narrate(self.insights.as_ref(), law_name, selection).await;
                    insights.set(
                        polarity,
                        ClauseInsight {
                            clause_id: selection.clause_id.clone(),
                            narrative_text,
                        },
                    );
                }
                None => warn!(polarity = polarity.label(), "not enough data for an insight"),
            }
        }

        Ok(AnalysisReport {
            law_name: law_name.to_string(),
            headers,
            records,
            aggregation,
            insights,
        })
    }
}

/// Link every comment, then classify the relevant ones. Output rows are
/// aligned 1:1 with the table rows.
pub fn link_and_classify(
    models: &ModelPool,
    corpus: &ClauseCorpus,
    table: CommentTable,
) -> Result<(Vec<String>, Vec<AnalyzedComment>)> {
    let headers = table.headers().to_vec();
    let (links, sentiments) = {
        let comments = table.comments();
        let links = models.linker().link(corpus, &comments)?;
        let sentiments = models.classifier().classify(&comments, &links)?;
        (links, sentiments)
    };
    let records = table
        .into_rows()
        .into_iter()
        .zip(links)
        .zip(sentiments)
        .map(|((row, link), sentiment)| AnalyzedComment {
            row,
            link,
            sentiment,
        })
        .collect();
    Ok((headers, records))
}

/// A pipeline fronted by an [`AnalysisCache`].
pub struct CachedPipeline {
    pipeline: Arc<Pipeline>,
    cache: AnalysisCache,
}

impl CachedPipeline {
    pub fn new(pipeline: Pipeline) -> Self {
        Self::with_capacity(pipeline, DEFAULT_CACHE_CAPACITY)
    }

    /// Keep at most `capacity` completed reports.
    pub fn with_capacity(pipeline: Pipeline, capacity: usize) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            cache: AnalysisCache::with_capacity(capacity),
        }
    }

    /// Run once per distinct `(law_name, csv_bytes)`; repeats and concurrent
    /// duplicates share the first result.
    pub async fn analyze(&self, law_name: &str, csv_bytes: impl Into<Arc<[u8]>>) -> SharedResult {
        let content: Arc<[u8]> = csv_bytes.into();
        let key = RequestKey::new(law_name, &content);
        let pipeline = Arc::clone(&self.pipeline);
        let law = key.law_name.clone();
        self.cache
            .get_or_run(key, move || async move { pipeline.run(&law, &content).await })
            .await
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }
}
