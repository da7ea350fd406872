//! ACP Agent runner
//!
//! Runs the buyer and seller agents together against a local marketplace.
//! `buyer` and `seller` on their own need an external ACP backend, which this
//! binary does not ship, so they exit with an error pointing at `demo`.
//!
//! # Usage
//!
//! ```bash
//! # Buyer and seller in one process, stops when the job settles
//! acp-agent demo
//!
//! # Seller that rejects jobs after payment
//! acp-agent demo --reject-after-payment
//!
//! # JSON logs, credentials from another file
//! acp-agent --env-file .env.staging --log-format json demo
//! ```
//!
//! Credentials are read from the environment after loading the env file
//! (`.env.local` by default): `BUYER_*` / `SELLER_*` wallet settings and, for
//! the seller, `CHR_PRIV_KEY`.

mod agents;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use acp_agents::env::load_env_file;
use acp_agents::{AgentRole, RuntimeConfig};

// =============================================================================
// CLI Arguments
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

/// ACP Agent - buyer and seller agents for the Agent Commerce Protocol
#[derive(Parser, Debug)]
#[command(name = "acp-agent")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Env file loaded before reading credentials (overrides existing variables)
    #[arg(long, env = "ACP_ENV_FILE", default_value = ".env.local")]
    env_file: PathBuf,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "ACP_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log format
    #[arg(long, env = "ACP_LOG_FORMAT", value_enum, default_value = "pretty")]
    log_format: LogFormat,

    /// Seconds in-flight jobs may take to finish after shutdown
    #[arg(long, env = "ACP_DRAIN_TIMEOUT_SECS", default_value_t = 10)]
    drain_timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Buyer alone (requires an external ACP backend)
    Buyer,

    /// Seller alone (requires an external ACP backend)
    Seller,

    /// Run seller and buyer together until the job settles
    Demo {
        /// Reject jobs after payment instead of delivering
        #[arg(long, env = "SELLER_REJECT_AFTER_PAYMENT")]
        reject_after_payment: bool,
    },
}

impl Args {
    fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            drain_timeout: Duration::from_secs(self.drain_timeout_secs),
        }
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parsed twice so env-backed options also see values from the env file.
    let args = Args::parse();
    let env_loaded = load_env_file(&args.env_file)?;
    let args = Args::parse();

    init_logging(&args.log_level, args.log_format)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        env_file = %args.env_file.display(),
        env_loaded,
        "Starting ACP agent"
    );

    let (stop, _stopped) = watch::channel(false);
    let signal_stop = stop.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = signal_stop.send(true);
    });

    let runtime_config = args.runtime_config();
    match args.command {
        Command::Buyer => agents::standalone_role(AgentRole::Buyer)?,
        Command::Seller => agents::standalone_role(AgentRole::Seller)?,
        Command::Demo {
            reject_after_payment,
        } => agents::run_demo(runtime_config, reject_after_payment, stop).await?,
    }

    tracing::info!("ACP agent stopped");
    Ok(())
}

// =============================================================================
// Initialization Functions
// =============================================================================

/// Initialize tracing/logging
fn init_logging(level: &str, format: LogFormat) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => {
            subscriber
                .with(fmt::layer().json().with_target(true))
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(fmt::layer().pretty().with_target(true))
                .init();
        }
    }

    Ok(())
}

// =============================================================================
// Graceful Shutdown
// =============================================================================

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
