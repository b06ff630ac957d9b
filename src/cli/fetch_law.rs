//! CLI entry-point for fetching and caching a law's clause summary.

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{config::Settings, data::ClauseCorpus};

/// Args for the `fetch-law` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Display name of the law.
    #[arg(long)]
    pub law: String,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let source = super::remote_corpus(&settings)?;
    let clauses = source
        .fetch(&args.law)
        .await
        .with_context(|| format!("fetch law context for '{}'", args.law))?;
    let corpus = ClauseCorpus::new(clauses)?;
    info!(clauses = corpus.len(), "law context cached");
    println!("{}", serde_json::to_string_pretty(corpus.clauses())?);
    Ok(())
}
