//! Data contracts and ingestion layer: comment tables, clause corpora and the
//! remote law context fetcher.

pub mod comments;
pub mod corpus;
pub mod http;
pub mod lawfetch;
pub mod records;

pub use comments::{CommentRow, CommentTable, COMMENT_COLUMN};
pub use corpus::{CachedCorpus, Clause, ClauseCorpus, CorpusSource, FileCorpus};
pub use records::{AnalyzedComment, ClauseMatch, LinkedClause, Sentiment};
