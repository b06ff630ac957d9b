//! Links public comments on a law to the clauses they discuss, classifies
//! their sentiment and summarises which clauses draw the strongest reaction.

pub mod api;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod nlp;
pub mod pipeline;
pub mod report;

pub use error::{PipelineError, Stage};
