#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::{bail, Result};
use futures::future::BoxFuture;
use policyiq::{
    data::{
        AnalyzedComment, Clause, ClauseMatch, CommentTable, CorpusSource, LinkedClause, Sentiment,
    },
    nlp::{ModelPool, SentimentModel, TextEmbedder},
    report::{InsightRequest, InsightRequester},
    PipelineError,
};

pub const DIM: usize = 4;

pub fn axis(i: usize) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    v[i] = 1.0;
    v
}

/// Returns the registered vector for a text, the zero vector otherwise.
#[derive(Default)]
pub struct FixedEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    batches: Mutex<Vec<usize>>,
}

impl FixedEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }
}

impl TextEmbedder for FixedEmbedder {
    fn dim(&self) -> usize {
        DIM
    }

    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.batches.lock().unwrap().push(texts.len());
        Ok(texts
            .iter()
            .map(|t| self.vectors.get(*t).cloned().unwrap_or_else(|| vec![0.0; DIM]))
            .collect())
    }
}

/// "bad" reads negative, "good" positive, anything else neutral.
#[derive(Default)]
pub struct ScriptedSentiment {
    labels: Vec<String>,
    pub calls: AtomicUsize,
    fail: bool,
}

impl ScriptedSentiment {
    pub fn new() -> Self {
        Self {
            labels: vec!["negative".into(), "neutral".into(), "positive".into()],
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }
}

impl SentimentModel for ScriptedSentiment {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn max_input_chars(&self) -> usize {
        512
    }

    fn logits(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("out of memory");
        }
        Ok(texts
            .iter()
            .map(|t| {
                if t.contains("bad") {
                    vec![3.0, 0.0, 0.0]
                } else if t.contains("good") {
                    vec![0.0, 0.0, 3.0]
                } else {
                    vec![0.0, 3.0, 0.0]
                }
            })
            .collect())
    }
}

/// Corpus source returning a fixed clause list and counting calls.
pub struct StaticCorpus {
    clauses: Vec<Clause>,
    pub calls: AtomicUsize,
    delay: Duration,
    fail_first: bool,
}

impl StaticCorpus {
    pub fn new(clauses: Vec<Clause>) -> Self {
        Self {
            clauses,
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            fail_first: false,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_first(mut self) -> Self {
        self.fail_first = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CorpusSource for StaticCorpus {
    fn fetch<'a>(
        &'a self,
        _law_name: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Clause>, PipelineError>> {
        Box::pin(async move {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail_first && call == 0 {
                return Err(PipelineError::external("law-context", "quota exceeded"));
            }
            Ok(self.clauses.clone())
        })
    }
}

/// Records every request and answers with a canned sentence.
#[derive(Default)]
pub struct RecordingInsights {
    pub requests: Mutex<Vec<InsightRequest>>,
}

impl RecordingInsights {
    pub fn requests(&self) -> Vec<InsightRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl InsightRequester for RecordingInsights {
    fn request<'a>(&'a self, request: &'a InsightRequest) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(request.clone());
            Ok(format!("Citizens feel strongly about {}.", request.clause_id))
        })
    }
}

pub struct FailingInsights;

impl InsightRequester for FailingInsights {
    fn request<'a>(&'a self, _request: &'a InsightRequest) -> BoxFuture<'a, Result<String>> {
        Box::pin(async { bail!("rate limited") })
    }
}

pub fn clauses() -> Vec<Clause> {
    vec![
        Clause::new("Section 1", "Consent", "consent summary"),
        Clause::new("Section 2", "Penalties", "penalty summary"),
        Clause::new("Section 3", "Data localisation", "localisation summary"),
    ]
}

/// Embedder placing each clause on its own axis; comments mentioning a topic
/// land on that axis, everything else embeds to zero.
pub fn topic_embedder(comments: &[&str]) -> FixedEmbedder {
    let mut embedder = FixedEmbedder::new()
        .with("consent summary", axis(0))
        .with("penalty summary", axis(1))
        .with("localisation summary", axis(2));
    for comment in comments {
        let axis_idx = if comment.contains("consent") {
            Some(0)
        } else if comment.contains("penalt") {
            Some(1)
        } else if comment.contains("local") {
            Some(2)
        } else {
            None
        };
        if let Some(i) = axis_idx {
            embedder = embedder.with(comment, axis(i));
        }
    }
    embedder
}

pub fn pool(embedder: FixedEmbedder, sentiment: ScriptedSentiment) -> ModelPool {
    ModelPool::from_parts(Arc::new(embedder), Arc::new(sentiment))
}

/// Clean (or not) record built directly, for aggregation tests.
pub fn analyzed(comment: &str, clause: Option<&str>, label: Option<&str>) -> AnalyzedComment {
    let row = CommentTable::from_comments([comment])
        .into_rows()
        .pop()
        .unwrap();
    AnalyzedComment {
        row,
        link: ClauseMatch {
            clause: clause
                .map(|c| LinkedClause::Linked(c.to_string()))
                .unwrap_or(LinkedClause::Irrelevant),
            similarity: if clause.is_some() { 0.8 } else { 0.1 },
        },
        sentiment: label
            .map(|l| Sentiment::Classified {
                label: l.to_string(),
                score: 0.9,
            })
            .unwrap_or(Sentiment::NotApplicable),
    }
}

pub fn csv_of(comments: &[&str]) -> Vec<u8> {
    let mut out = String::from("Author,Comment\n");
    for (i, c) in comments.iter().enumerate() {
        out.push_str(&format!("user{i},\"{c}\"\n"));
    }
    out.into_bytes()
}
