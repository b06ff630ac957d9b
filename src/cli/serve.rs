//! CLI entry-point for serving the HTTP API.

use std::sync::Arc;

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use crate::{
    api::{self, AppState},
    config::Settings,
    nlp::ModelPool,
    pipeline::{CachedPipeline, Pipeline},
};

/// Run the Axum server.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Port to bind (default 8080).
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
    /// Host address, defaults to localhost.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
    /// Serve without calling the narrative backend.
    #[arg(long)]
    pub skip_insights: bool,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let corpus = super::remote_corpus(&settings)?;
    let insights = super::insight_backend(&settings, args.skip_insights)?;
    let models = ModelPool::global(&settings)?.clone();
    let state = AppState {
        service: Arc::new(CachedPipeline::with_capacity(
            Pipeline::new(corpus, models, insights),
            settings.analysis_cache_capacity,
        )),
    };
    api::serve(state, args.host, args.port).await
}
