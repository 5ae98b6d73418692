//! # Comment Pipeline CLI (`pipeline`)
//!
//! ## Usage
//!
//! ```bash
//! pipeline --config ./config/pipeline.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pipeline serve` | Start the HTTP server (`POST /pipeline`) |
//! | `pipeline run --email <e> --source <s>` | Run the pipeline once and print the response |
//! | `pipeline history` | List the records in the result store |
//!
//! If the config file does not exist, built-in defaults are used.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

use comment_pipeline::config::{self, Config};
use comment_pipeline::pipeline::Pipeline;
use comment_pipeline::server;
use comment_pipeline::store::ResultStore;

/// Comment Pipeline — fetch comments, summarize and classify them with a
/// language model, store the results, and notify.
#[derive(Parser)]
#[command(
    name = "pipeline",
    about = "Comment Pipeline — summarize and classify external comments with a language model",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/pipeline.toml`. When the file is absent,
    /// built-in defaults are used.
    #[arg(long, global = true, default_value = "./config/pipeline.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    ///
    /// Binds to `[server].bind` and serves `POST /pipeline` and `GET /health`.
    Serve,

    /// Run the pipeline once and print the response as JSON.
    Run {
        /// Notification recipient.
        #[arg(long)]
        email: String,

        /// Label recorded with every stored item.
        #[arg(long, default_value = "cli")]
        source: String,
    },

    /// List records in the result store.
    History {
        /// Print the raw JSON collection instead of a summary.
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        tracing::info!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::minimal())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = load_or_default(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Run { email, source } => {
            let pipeline = Pipeline::from_config(&cfg)?;
            let response = pipeline.run(&email, &source).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::History { json } => {
            let store = ResultStore::new(&cfg.storage.path);
            if json {
                println!("{}", serde_json::to_string_pretty(&store.load())?);
                return Ok(());
            }

            let records = store.load_records();
            if records.is_empty() {
                println!("No stored records in {}", store.path().display());
                return Ok(());
            }
            for record in &records {
                println!(
                    "{}  [{}] {:<8} {}",
                    record.item.timestamp,
                    record.source,
                    record.item.sentiment.as_str(),
                    record.item.analysis
                );
            }
            println!("{} records in {}", records.len(), store.path().display());
        }
    }

    Ok(())
}
