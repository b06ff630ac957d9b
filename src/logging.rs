//! Structured logging bootstrap using `tracing`.
//!
//! Logs go to stderr so that stdout carries only the rendered impact report
//! (`analyze`) or the clause JSON (`fetch-law`). HTTP client and inference
//! runtime chatter is held at `warn` unless `RUST_LOG` says otherwise.

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_DIRECTIVES: &str = "info,hyper=warn,hyper_util=warn,reqwest=warn,ort=warn";

/// `RUST_LOG` if it parses, [`DEFAULT_DIRECTIVES`] otherwise.
pub fn env_filter() -> Result<EnvFilter> {
    Ok(EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_DIRECTIVES))?)
}

/// Install the global subscriber; a second call is a no-op.
pub fn init_tracing() -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_line_number(true)
        .with_file(true)
        .with_writer(std::io::stderr)
        .with_filter(env_filter()?);

    tracing_subscriber::registry().with(fmt_layer).try_init()?;
    tracing::debug!(default = DEFAULT_DIRECTIVES, "tracing initialised");
    Ok(())
}
