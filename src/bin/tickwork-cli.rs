//! Tickwork CLI - drive a synthetic workload and manage config files
//!
//! `simulate` stands in for a host tick driver so the scheduler's pacing,
//! gating and shutdown behavior can be observed from the command line.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tickwork::runtime::config::{load_config, write_config};
use tickwork::runtime::error::ActionError;
use tickwork::runtime::{
    ActionRuntime, DelayedAction, GatedAction, LeafAction, ReadinessFlag, RepeatUntil,
    RepeatingEffect, RuntimeConfig,
};

#[derive(Parser)]
#[command(name = "tickwork")]
#[command(about = "Cooperative tick-driven action scheduler", long_about = None)]
struct Cli {
    /// Config file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a synthetic workload through the scheduler
    Simulate {
        /// Number of ticks to drive
        #[arg(long, default_value = "40")]
        ticks: u32,

        /// Tick at which the readiness flag turns on
        #[arg(long, default_value = "10")]
        ready_at: u32,

        /// Delayed actions to queue
        #[arg(long, default_value = "8")]
        actions: u32,

        /// Delay in ticks for each delayed action
        #[arg(long, default_value = "3")]
        delay: u32,

        /// Interval between ticks in milliseconds
        #[arg(long, default_value = "50")]
        interval_ms: u64,
    },

    /// Write the default configuration to a file
    InitConfig {
        /// Destination path
        path: PathBuf,
    },

    /// Load, validate and print a configuration file
    ShowConfig {
        /// Config path
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            ticks,
            ready_at,
            actions,
            delay,
            interval_ms,
        } => {
            let config = match &cli.config {
                Some(path) => load_config(path)?,
                None => RuntimeConfig::default(),
            };
            simulate(config, ticks, ready_at, actions, delay, interval_ms)?;
        }

        Commands::InitConfig { path } => {
            write_config(&path, &RuntimeConfig::default())?;
            println!("Wrote default config to {:?}", path);
        }

        Commands::ShowConfig { path } => {
            let config = load_config(&path)?;
            let json =
                serde_json::to_string_pretty(&config).context("Failed to render config")?;
            println!("{json}");
        }
    }

    Ok(())
}

fn simulate(
    config: RuntimeConfig,
    ticks: u32,
    ready_at: u32,
    actions: u32,
    delay: u32,
    interval_ms: u64,
) -> Result<()> {
    let handshake = ReadinessFlag::new();
    let mut runtime = ActionRuntime::start(config, handshake.shared())?;

    let effects = Arc::new(AtomicUsize::new(0));
    for i in 0..actions {
        let effects = effects.clone();
        runtime.add_action(
            DelayedAction::new(
                delay,
                LeafAction::labeled(format!("delayed-{i}"), move || {
                    effects.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                }),
            ),
            false,
        );
    }

    let gated_effects = effects.clone();
    runtime.add_action(
        GatedAction::new(
            handshake.shared(),
            LeafAction::labeled("announce-identity", move || {
                gated_effects.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }),
        ),
        true,
    );

    runtime.add_action(
        LeafAction::labeled("broken-packet", || {
            Err(ActionError::failed("peer closed connection"))
        }),
        false,
    );

    // Never stops on its own; the forced drain at shutdown ends it
    runtime.add_action(
        RepeatUntil::new(RepeatingEffect::new(|| Ok(())).with_label("settle"), || false),
        false,
    );

    let background = effects.clone();
    runtime.submit(move || {
        background.fetch_add(1, Ordering::Relaxed);
        Ok(())
    })?;

    for tick in 1..=ticks {
        if tick == ready_at {
            handshake.set_ready(true);
        }
        runtime.tick();
        std::thread::sleep(Duration::from_millis(interval_ms));
    }

    let pending = runtime.has_pending_work();
    let stats = runtime.shutdown()?;

    println!("Ticks driven:      {}", stats.ticks);
    println!("Advances:          {}", stats.advances);
    println!("Completed:         {}", stats.completed);
    println!("Failed:            {}", stats.failed);
    println!("Discarded:         {}", stats.discarded);
    println!("Work pending at shutdown: {}", pending);
    println!("Effects observed:  {}", effects.load(Ordering::Relaxed));

    Ok(())
}
