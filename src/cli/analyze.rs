//! CLI entry-point for a one-shot analysis run.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{
    config::Settings,
    data::{CorpusSource, FileCorpus},
    nlp::ModelPool,
    pipeline::Pipeline,
    report::render::{render_text, write_outputs},
};

/// Args for the `analyze` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Display name of the law.
    #[arg(long)]
    pub law: String,
    /// CSV file with a `Comment` column.
    #[arg(long)]
    pub comments: PathBuf,
    /// Clause list JSON to use instead of fetching the law context.
    #[arg(long)]
    pub corpus: Option<PathBuf>,
    /// Do not call the narrative backend.
    #[arg(long)]
    pub skip_insights: bool,
    /// Write irrelevant rows to the output table too.
    #[arg(long)]
    pub all_rows: bool,
    /// Override the output directory.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let bytes = tokio::fs::read(&args.comments)
        .await
        .with_context(|| format!("read {}", args.comments.display()))?;

    let corpus: Arc<dyn CorpusSource> = match &args.corpus {
        Some(path) => Arc::new(FileCorpus::new(path)),
        None => super::remote_corpus(&settings)?,
    };
    let insights = super::insight_backend(&settings, args.skip_insights)?;
    let models = ModelPool::global(&settings)?.clone();

    let pipeline = Pipeline::new(corpus, models, insights);
    let report = pipeline
        .run(&args.law, &bytes)
        .await
        .with_context(|| format!("analysis of '{}' failed", args.law))?;

    let out_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| settings.outputs_dir.clone());
    let paths = write_outputs(&report, &out_dir, args.all_rows)?;
    info!(report = %paths.report.display(), insights = %paths.insights.display(), "analysis complete");
    println!("{}", render_text(&report));
    Ok(())
}
