//! # Dodo Runner
//!
//! Loads an environment configuration, builds the kinematic reference
//! backend and rolls out a fixed policy while logging reward diagnostics.
//! Set `RUST_LOG=debug` to see per-reset and per-resample events.

use anyhow::Result;
use clap::Parser;
use dodo::app::{self, Args};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let summary = app::run(&args)?;
    tracing::info!(
        steps = summary.steps,
        resets = summary.resets,
        mean_reward = summary.mean_reward,
        "rollout finished"
    );
    Ok(())
}
