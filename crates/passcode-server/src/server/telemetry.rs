//! # Logging
//!
//! Human-readable logs always go to the console via `tracing_subscriber::fmt`.
//! When a log file is configured, a second plain-text layer appends the same
//! events to it, so a record of ingested batches and dispense requests
//! survives the terminal session.
//!
//! Filtering follows `RUST_LOG` and defaults to `info`.
//!
//! ```bash
//! RUST_LOG=passcode=debug,info passcode-server --log-file server.log
//! ```

use anyhow::Context;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry(log_file: Option<&Path>) -> anyhow::Result<()> {
    let console = tracing_subscriber::fmt::layer()
        .with_thread_ids(true)
        .with_line_number(true)
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_file(true);

    let file = log_file
        .map(|path| -> anyhow::Result<_> {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;

            Ok(tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_writer(Arc::new(file)))
        })
        .transpose()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(console)
        .with(file)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(())
}
