//! Typed comment records threaded through the pipeline.
//!
//! Internally a link is either a clause id or [`LinkedClause::Irrelevant`] and a
//! sentiment is either a classified label or [`Sentiment::NotApplicable`]. The
//! sentinel strings only appear at the CSV/JSON boundary.

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::comments::CommentRow;

pub const IRRELEVANT: &str = "Irrelevant";
pub const NOT_APPLICABLE: &str = "N/A";

pub const LINKED_CLAUSE_COLUMN: &str = "Linked_Clause";
pub const MATCH_CONFIDENCE_COLUMN: &str = "Match_Confidence";
pub const SENTIMENT_LABEL_COLUMN: &str = "Sentiment_Label";
pub const SENTIMENT_SCORE_COLUMN: &str = "Sentiment_Score";

/// Columns appended by the pipeline, in output order.
pub const DERIVED_COLUMNS: [&str; 4] = [
    LINKED_CLAUSE_COLUMN,
    MATCH_CONFIDENCE_COLUMN,
    SENTIMENT_LABEL_COLUMN,
    SENTIMENT_SCORE_COLUMN,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkedClause {
    Linked(String),
    Irrelevant,
}

impl LinkedClause {
    pub fn clause_id(&self) -> Option<&str> {
        match self {
            Self::Linked(id) => Some(id),
            Self::Irrelevant => None,
        }
    }

    pub fn is_relevant(&self) -> bool {
        matches!(self, Self::Linked(_))
    }

    /// Boundary representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Linked(id) => id,
            Self::Irrelevant => IRRELEVANT,
        }
    }
}

/// Outcome of linking one comment.
#[derive(Debug, Clone, PartialEq)]
pub struct ClauseMatch {
    pub clause: LinkedClause,
    /// Unrounded cosine similarity against the best clause.
    pub similarity: f32,
}

impl ClauseMatch {
    /// Similarity rounded to two decimals for reporting.
    pub fn confidence(&self) -> f64 {
        round_to(self.similarity as f64, 2)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sentiment {
    Classified { label: String, score: f64 },
    NotApplicable,
}

impl Sentiment {
    pub fn label(&self) -> &str {
        match self {
            Self::Classified { label, .. } => label,
            Self::NotApplicable => NOT_APPLICABLE,
        }
    }

    pub fn score(&self) -> f64 {
        match self {
            Self::Classified { score, .. } => *score,
            Self::NotApplicable => 0.0,
        }
    }

    pub fn is_classified(&self) -> bool {
        matches!(self, Self::Classified { .. })
    }
}

/// One input row extended with its clause link and sentiment.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedComment {
    pub row: CommentRow,
    pub link: ClauseMatch,
    pub sentiment: Sentiment,
}

impl AnalyzedComment {
    pub fn comment(&self) -> &str {
        self.row.comment()
    }

    /// Linked to a real clause and carrying a classified label.
    pub fn is_clean(&self) -> bool {
        self.link.clause.is_relevant()
            && self.sentiment.is_classified()
            && self.sentiment.label() != NOT_APPLICABLE
    }

    /// Values for [`DERIVED_COLUMNS`], in the same order.
    pub fn derived_fields(&self) -> [String; 4] {
        [
            self.link.clause.as_str().to_string(),
            format!("{:?}", self.link.confidence()),
            self.sentiment.label().to_string(),
            format!("{:?}", self.sentiment.score()),
        ]
    }
}

impl Serialize for AnalyzedComment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.row.len() + DERIVED_COLUMNS.len()))?;
        for (name, value) in self.row.fields() {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry(LINKED_CLAUSE_COLUMN, self.link.clause.as_str())?;
        map.serialize_entry(MATCH_CONFIDENCE_COLUMN, &self.link.confidence())?;
        map.serialize_entry(SENTIMENT_LABEL_COLUMN, self.sentiment.label())?;
        map.serialize_entry(SENTIMENT_SCORE_COLUMN, &self.sentiment.score())?;
        map.end()
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_rounds_to_two_decimals() {
        let m = ClauseMatch {
            clause: LinkedClause::Irrelevant,
            similarity: 0.2468,
        };
        assert_eq!(m.confidence(), 0.25);
    }

    #[test]
    fn sentinels_only_at_the_boundary() {
        assert_eq!(LinkedClause::Irrelevant.as_str(), "Irrelevant");
        assert_eq!(Sentiment::NotApplicable.label(), "N/A");
        assert_eq!(Sentiment::NotApplicable.score(), 0.0);
        assert!(!LinkedClause::Irrelevant.is_relevant());
        assert_eq!(
            LinkedClause::Linked("Section 4".into()).clause_id(),
            Some("Section 4")
        );
    }
}
