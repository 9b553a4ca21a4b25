// src/main.rs
//
// =============================================================================
// DECKHAND: COMMANDER & ENTRY POINT (v 0.1 )
// =============================================================================
//
// The wiring center.
//
// Modes:
// 1. RUN:         Execute the restriction digest against a runtime backend.
// 2. META:        Print the protocol metadata block as JSON.
// 3. INIT-CONFIG: Write the default protocol config as YAML.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

// --- MODULES ---
mod core;
mod deck;
mod protocol;
mod runtime;
mod sim;
mod trace;

use crate::core::RunReport;
use crate::protocol::{run_restriction_digest, ProtocolConfig};
use crate::runtime::{RuntimeFactory, RuntimeKind};

// ============================================================================
// 1. CLI DEFINITION
// ============================================================================

#[derive(Parser)]
#[command(
    name = "deckhand",
    version,
    about = "Liquid-handling protocol runner with a deck simulator"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the restriction digest protocol.
    Run {
        /// YAML protocol config; defaults reproduce the reference procedure.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Which runtime executes the commands.
        #[arg(long, value_enum, default_value = "sim")]
        backend: Backend,

        /// Robot hostname (only meaningful with --backend robot).
        #[arg(long, default_value = "ot2.local")]
        host: String,

        /// Pause between echoed trace lines, for human-paced output.
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Suppress the trace echo (the run report still prints).
        #[arg(long)]
        quiet: bool,
    },

    /// Print the protocol metadata block as JSON.
    Meta,

    /// Write the default protocol config as YAML.
    InitConfig {
        #[arg(long, default_value = "protocol.yaml")]
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    Sim,
    Robot,
}

// ============================================================================
// 2. ENTRY POINT
// ============================================================================

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            backend,
            host,
            delay_ms,
            quiet,
        } => cmd_run(config, backend, host, delay_ms, quiet),

        Commands::Meta => {
            println!("{}", serde_json::to_string_pretty(&protocol::metadata())?);
            Ok(())
        }

        Commands::InitConfig { path } => {
            let yaml = ProtocolConfig::default().to_yaml()?;
            std::fs::write(&path, yaml)
                .with_context(|| format!("writing {}", path.display()))?;
            log::info!("Wrote default protocol config to {}", path.display());
            Ok(())
        }
    }
}

// ============================================================================
// 3. RUN MODE
// ============================================================================

fn cmd_run(
    config: Option<PathBuf>,
    backend: Backend,
    host: String,
    delay_ms: Option<u64>,
    quiet: bool,
) -> Result<()> {
    let cfg = match config {
        Some(path) => ProtocolConfig::from_yaml_file(&path)?,
        None => ProtocolConfig::default(),
    };

    let kind = match backend {
        Backend::Sim => RuntimeKind::Simulated {
            echo_delay: delay_ms.map(Duration::from_millis),
            quiet,
        },
        Backend::Robot => RuntimeKind::Robot { host },
    };

    let started_at = Utc::now();
    let mut api = RuntimeFactory::get(&kind)?;

    run_restriction_digest(api.as_mut(), &cfg).context("protocol run aborted")?;

    let report = RunReport {
        run_id: Uuid::new_v4(),
        execution_host: hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "localhost".into()),
        started_at,
        finished_at: Utc::now(),
        commands_executed: api.commands_executed(),
        tips_consumed: api.tips_consumed(),
    };

    log::info!(
        "🧪 Run {} complete: {} commands, {} tips",
        report.run_id,
        report.commands_executed,
        report.tips_consumed
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
