//! Aggregation, narrative insights and the final impact report.

pub mod aggregate;
pub mod insight;
pub mod render;

use indexmap::IndexMap;
use serde::Serialize;

pub use aggregate::{aggregate, Aggregation, ClauseSentimentSummary, InsightSelection, Polarity};
pub use insight::{DisabledInsights, GroqInsights, InsightRequest, InsightRequester};

use crate::data::records::AnalyzedComment;

/// Narrative attached to a selected clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClauseInsight {
    pub clause_id: String,
    pub narrative_text: String,
}

/// Insight side channel: at most one entry per polarity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Insights {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opposed: Option<ClauseInsight>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported: Option<ClauseInsight>,
}

impl Insights {
    pub fn get(&self, polarity: Polarity) -> Option<&ClauseInsight> {
        match polarity {
            Polarity::Negative => self.opposed.as_ref(),
            Polarity::Positive => self.supported.as_ref(),
        }
    }

    pub fn set(&mut self, polarity: Polarity, insight: ClauseInsight) {
        match polarity {
            Polarity::Negative => self.opposed = Some(insight),
            Polarity::Positive => self.supported = Some(insight),
        }
    }
}

/// Full result of one analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub law_name: String,
    /// Original column order of the uploaded table.
    pub headers: Vec<String>,
    /// Every input row, aligned with the input.
    pub records: Vec<AnalyzedComment>,
    pub aggregation: Aggregation,
    pub insights: Insights,
}

impl AnalysisReport {
    /// Rows linked to a clause and classified.
    pub fn clean_records(&self) -> impl Iterator<Item = &AnalyzedComment> {
        self.records.iter().filter(|r| r.is_clean())
    }

    pub fn relevant_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.link.clause.is_relevant())
            .count()
    }

    /// JSON view served by the API.
    pub fn to_dto(&self, all_rows: bool) -> ReportDto<'_> {
        let rows = if all_rows {
            self.records.iter().collect()
        } else {
            self.clean_records().collect()
        };
        ReportDto {
            law_name: &self.law_name,
            total_comments: self.records.len(),
            relevant_comments: self.relevant_count(),
            clean_comments: self.aggregation.clean_count(),
            distribution: &self.aggregation.distribution,
            breakdown: self.aggregation.summary.breakdown(),
            selections: Polarity::ALL
                .iter()
                .filter_map(|p| self.aggregation.selection(*p))
                .map(|s| SelectionDto {
                    polarity: s.polarity,
                    clause_id: &s.clause_id,
                    count: s.count,
                })
                .collect(),
            insights: &self.insights,
            rows,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReportDto<'a> {
    pub law_name: &'a str,
    pub total_comments: usize,
    pub relevant_comments: usize,
    pub clean_comments: usize,
    pub distribution: &'a IndexMap<String, usize>,
    pub breakdown: Vec<aggregate::ClauseBreakdown>,
    pub selections: Vec<SelectionDto<'a>>,
    pub insights: &'a Insights,
    pub rows: Vec<&'a AnalyzedComment>,
}

#[derive(Debug, Serialize)]
pub struct SelectionDto<'a> {
    pub polarity: Polarity,
    pub clause_id: &'a str,
    pub count: usize,
}
