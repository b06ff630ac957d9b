//! Per-clause sentiment counts and selection of the most opposed / most
//! supported clause.
//!
//! Clauses are kept in order of first appearance among clean records, and the
//! arg-max over a polarity keeps the earliest clause on ties.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    data::records::AnalyzedComment,
    nlp::sentiment::{NEGATIVE, NEUTRAL, POSITIVE},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Negative,
    Positive,
}

impl Polarity {
    pub const ALL: [Polarity; 2] = [Polarity::Negative, Polarity::Positive];

    /// Sentiment label counted for this polarity.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Negative => NEGATIVE,
            Self::Positive => POSITIVE,
        }
    }

    /// Key used in the insight side channel.
    pub fn insight_key(&self) -> &'static str {
        match self {
            Self::Negative => "opposed",
            Self::Positive => "supported",
        }
    }
}

/// `(clause, label) -> count` over clean records; absent pairs read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClauseSentimentSummary {
    counts: IndexMap<String, IndexMap<String, usize>>,
}

/// One row of the clause breakdown table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClauseBreakdown {
    pub clause_id: String,
    #[serde(flatten)]
    pub counts: IndexMap<String, usize>,
}

impl ClauseSentimentSummary {
    fn record(&mut self, clause: &str, label: &str) {
        *self
            .counts
            .entry(clause.to_string())
            .or_default()
            .entry(label.to_string())
            .or_insert(0) += 1;
    }

    pub fn count(&self, clause: &str, label: &str) -> usize {
        self.counts
            .get(clause)
            .and_then(|labels| labels.get(label))
            .copied()
            .unwrap_or(0)
    }

    /// Clauses in first-appearance order.
    pub fn clauses(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    pub fn total(&self, label: &str) -> usize {
        self.counts
            .values()
            .map(|labels| labels.get(label).copied().unwrap_or(0))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// negative / neutral / positive first, then any other label seen.
    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = [NEGATIVE, NEUTRAL, POSITIVE]
            .iter()
            .map(|l| l.to_string())
            .collect();
        for per_clause in self.counts.values() {
            for label in per_clause.keys() {
                if !labels.contains(label) {
                    labels.push(label.clone());
                }
            }
        }
        labels
    }

    /// Zero-filled breakdown rows, one per clause.
    pub fn breakdown(&self) -> Vec<ClauseBreakdown> {
        let labels = self.labels();
        self.clauses()
            .map(|clause| ClauseBreakdown {
                clause_id: clause.to_string(),
                counts: labels
                    .iter()
                    .map(|label| (label.clone(), self.count(clause, label)))
                    .collect(),
            })
            .collect()
    }

    /// Clause with the highest count for `label`, earliest on ties. `None`
    /// when no clause has any.
    pub fn top_clause(&self, label: &str) -> Option<(&str, usize)> {
        if self.total(label) == 0 {
            return None;
        }
        let mut best: Option<(&str, usize)> = None;
        for clause in self.clauses() {
            let count = self.count(clause, label);
            if best.map_or(true, |(_, top)| count > top) {
                best = Some((clause, count));
            }
        }
        best
    }
}

/// The clause picked for one polarity and the comments backing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsightSelection {
    pub polarity: Polarity,
    pub clause_id: String,
    pub count: usize,
    /// Clean comments on this clause with this polarity, in input order.
    pub comments: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregation {
    pub summary: ClauseSentimentSummary,
    /// Label counts across all clean records, first-appearance order.
    pub distribution: IndexMap<String, usize>,
    pub opposed: Option<InsightSelection>,
    pub supported: Option<InsightSelection>,
}

impl Aggregation {
    pub fn selection(&self, polarity: Polarity) -> Option<&InsightSelection> {
        match polarity {
            Polarity::Negative => self.opposed.as_ref(),
            Polarity::Positive => self.supported.as_ref(),
        }
    }

    pub fn clean_count(&self) -> usize {
        self.distribution.values().sum()
    }
}

/// Group clean records and pick the strongest clause per polarity.
#[instrument(skip_all, fields(records = records.len()))]
pub fn aggregate(records: &[AnalyzedComment]) -> Aggregation {
    let clean: Vec<&AnalyzedComment> = records.iter().filter(|r| r.is_clean()).collect();

    let mut summary = ClauseSentimentSummary::default();
    let mut distribution: IndexMap<String, usize> = IndexMap::new();
    for record in &clean {
        if let Some(clause) = record.link.clause.clause_id() {
            let label = record.sentiment.label();
            summary.record(clause, label);
            *distribution.entry(label.to_string()).or_insert(0) += 1;
        }
    }

    let select = |polarity: Polarity| {
        summary
            .top_clause(polarity.label())
            .map(|(clause, count)| InsightSelection {
                polarity,
                clause_id: clause.to_string(),
                count,
                comments: clean
                    .iter()
                    .filter(|r| {
                        r.link.clause.clause_id() == Some(clause)
                            && r.sentiment.label() == polarity.label()
                    })
                    .map(|r| r.comment().to_string())
                    .collect(),
            })
    };
    let opposed = select(Polarity::Negative);
    let supported = select(Polarity::Positive);

    info!(
        clean = clean.len(),
        clauses = summary.counts.len(),
        opposed = opposed.as_ref().map(|s| s.clause_id.as_str()),
        supported = supported.as_ref().map(|s| s.clause_id.as_str()),
        "aggregated clause sentiment"
    );

    Aggregation {
        summary,
        distribution,
        opposed,
        supported,
    }
}
