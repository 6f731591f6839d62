//! Command-line entry point for the catalog pipeline.

mod error;
mod gate;
mod nginx;
mod pipeline;

use crate::error::{ErrorKind, Result};
use crate::gate::RunGate;
use clap::{Parser, Subcommand};
use exn::ResultExt;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tiledepot_config::Config;
use tiledepot_storage::StoreHandle;
use tiledepot_storage::store::SshStore;
use tracing_subscriber::EnvFilter;

// Process-wide: every trigger contends on this one gate. A gate built per
// invocation would hand each trigger its own lock and never reject anything.
static GATE: RunGate = RunGate::new();

#[derive(Parser)]
#[command(name = "tiledepot", version, about = "Catalog, checksum and mirror pipeline for versioned tile releases")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full update pipeline once
    Run {
        /// Path to the configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run { config } => run_once(config.as_deref()).await,
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run_once(config_path: Option<&Path>) -> Result<()> {
    let _permit = GATE.try_acquire()?;
    let config = Config::load(config_path).or_raise(|| ErrorKind::Config)?;

    let remote = &config.remote;
    let store: StoreHandle = Arc::new(
        SshStore::new(remote.host.clone(), remote.port, remote.identity_file.clone(), config.extension.clone())
            .with_command_timeout(Duration::from_secs(remote.command_timeout_secs))
            .with_fetch_timeout(Duration::from_secs(remote.fetch_timeout_secs)),
    );

    pipeline::run(&config, &store).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_triggers_contend_on_one_gate() {
        // Both triggers must see the same gate; a permit held by one run
        // rejects the other.
        let permit = GATE.try_acquire().unwrap();
        assert!(GATE.try_acquire().is_err());
        drop(permit);
        assert!(GATE.try_acquire().is_ok());
    }
}
