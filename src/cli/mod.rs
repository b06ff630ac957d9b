//! Command-line interface wiring for policyiq.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::{
    config::Settings,
    data::{lawfetch::GeminiCorpus, CachedCorpus, CorpusSource},
    report::{DisabledInsights, GroqInsights, InsightRequester},
};

pub mod analyze;
pub mod fetch_law;
pub mod serve;

/// Top-level CLI definition.
#[derive(Debug, Parser)]
#[command(author, version, about = "Public comment impact analysis for legislation", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Parse CLI arguments from the environment.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Dispatch the selected sub-command.
    pub async fn dispatch(self, settings: Settings) -> Result<()> {
        match self.command {
            Commands::Analyze(args) => analyze::run(args, settings).await,
            Commands::FetchLaw(args) => fetch_law::run(args, settings).await,
            Commands::Serve(args) => serve::run(args, settings).await,
        }
    }
}

/// Supported sub-commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Link comments to clauses, classify sentiment and write the impact report.
    Analyze(analyze::Args),
    /// Fetch and cache the clause summary of a law.
    FetchLaw(fetch_law::Args),
    /// Serve the JSON API.
    Serve(serve::Args),
}

/// Corpus cached under `DATA_DIR/laws_json`, fetched remotely on a miss.
pub(crate) fn remote_corpus(settings: &Settings) -> Result<Arc<dyn CorpusSource>> {
    let remote: Arc<dyn CorpusSource> = Arc::new(GeminiCorpus::from_settings(settings)?);
    Ok(Arc::new(CachedCorpus::new(
        settings.join_data("laws_json"),
        remote,
    )))
}

pub(crate) fn insight_backend(
    settings: &Settings,
    skip: bool,
) -> Result<Arc<dyn InsightRequester>> {
    if skip {
        return Ok(Arc::new(DisabledInsights));
    }
    Ok(Arc::new(GroqInsights::from_settings(settings)?))
}
