// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Headless simulation driver: load a bootstrap document, pick a built-in
//! policy off the shelf, tick the engine at a fixed cadence, report rounds.

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use matter_core::{
    builtin_shelf, BootstrapConfig, EngineBuilder, ProgressSink, DEFAULT_VIEWPORT_HEIGHT,
    DEFAULT_VIEWPORT_WIDTH,
};

#[derive(Debug, Parser)]
#[command(name = "matter", version, about = "Hex-grid programmable-matter simulator")]
struct Args {
    /// Path to a bootstrap JSON document (hex_size, init_state, phase maxima).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Cyclic index into the built-in policy shelf (0 wraps to the last).
    #[arg(long, default_value_t = 1)]
    policy: usize,

    /// Number of ticks to run before stopping.
    #[arg(long, default_value_t = 40)]
    ticks: u64,

    /// Milliseconds between ticks.
    #[arg(long = "cadence-ms", default_value_t = 250)]
    cadence_ms: u64,

    /// Viewport width in pixels; the grid shape derives from it.
    #[arg(long, default_value_t = DEFAULT_VIEWPORT_WIDTH)]
    width: u32,

    /// Viewport height in pixels; the grid shape derives from it.
    #[arg(long, default_value_t = DEFAULT_VIEWPORT_HEIGHT)]
    height: u32,
}

/// Logs the round counter whenever it changes.
#[derive(Debug, Default)]
struct RoundLogger(AtomicU64);

impl ProgressSink for RoundLogger {
    fn on_round(&self, round: u64) {
        let previous = self.0.swap(round, Ordering::SeqCst);
        if previous != round {
            info!(round, "round advanced");
        }
    }
}

fn load_bootstrap(path: Option<&PathBuf>) -> Result<BootstrapConfig> {
    match path {
        Some(path) => {
            let data = std::fs::read_to_string(path)
                .with_context(|| format!("reading bootstrap document {}", path.display()))?;
            serde_json::from_str(&data)
                .with_context(|| format!("parsing bootstrap document {}", path.display()))
        }
        None => Ok(BootstrapConfig::new()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = load_bootstrap(args.config.as_ref())?;
    let shelf = builtin_shelf();
    let name = shelf.select(args.policy)?.to_owned();
    let policy = shelf
        .build(&name)
        .with_context(|| format!("building policy '{name}'"))?;
    info!(policy = %name, "selected particle policy");

    let mut engine = EngineBuilder::new(policy)
        .viewport(args.width, args.height)
        .bootstrap(config)
        .progress(Arc::new(RoundLogger::default()))
        .build()?;

    let cadence = Duration::from_millis(args.cadence_ms);
    engine.start();
    for _ in 0..args.ticks {
        engine.tick()?;
        if cadence > Duration::ZERO {
            std::thread::sleep(cadence);
        }
    }
    engine.stop();

    let mut out = std::io::stdout().lock();
    writeln!(
        out,
        "policy={name} ticks={} round={} particles={}",
        args.ticks,
        engine.current_round(),
        engine.live_count()
    )?;
    Ok(())
}
