//! Inference capabilities and the clause linker.

pub mod embeddings;
pub mod linker;
pub mod pool;
pub mod sentiment;

pub use embeddings::{HashingEmbedder, TextEmbedder};
pub use linker::{ClauseLinker, LINK_THRESHOLD};
pub use pool::ModelPool;
pub use sentiment::{LexiconSentiment, SentimentClassifier, SentimentModel};
