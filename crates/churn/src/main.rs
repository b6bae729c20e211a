//! Churn Prediction
//!
//! Trains churn classifiers on the telco CSV export and serves the best one
//! over HTTP, with a small HTML frontend in front of the service.

use std::path::PathBuf;

use anyhow::Result;
use churn::commands;
use clap::{Parser, Subcommand};
use config::{config_path, Settings};
use tracing_subscriber::EnvFilter;

/// Churn Prediction
#[derive(Parser)]
#[command(name = "churn")]
#[command(about = "Train, serve and query customer churn models")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (defaults to $CHURN_CONFIG, then config/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit every configured candidate and persist the best pipeline
    Train,

    /// Write per-column statistics and the churn distribution of the dataset
    Describe,

    /// Run the inference service
    Serve,

    /// Run the HTML frontend that proxies to the inference service
    Frontend,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flag when set.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let path = config_path(cli.config.as_deref());
    let settings = Settings::load_or_default(&path)?;

    match cli.command {
        Commands::Train => {
            tokio::task::spawn_blocking(move || commands::train::run(&settings)).await??;
        }
        Commands::Describe => {
            commands::describe::run(&settings)?;
        }
        Commands::Serve => {
            churn_api::serve(&settings).await?;
        }
        Commands::Frontend => {
            churn_frontend::serve(&settings).await?;
        }
    }

    Ok(())
}
