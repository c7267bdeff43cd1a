//! DeskMate CLI - main entry point
//!
//! Drives the same core the HTTP layer consumes: ingest documents, ask
//! questions, and inspect dependency health from the command line.

use std::io::Read;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use deskmate::{metrics, rag, AppState, Settings};

#[derive(Parser)]
#[command(name = "deskmate")]
#[command(about = "Local-first service desk copilot", long_about = None)]
#[command(version)]
struct Cli {
    /// Address to expose Prometheus metrics (e.g., 0.0.0.0:9898)
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest text into the vector and graph indexes
    Ingest {
        /// Document title (defaults to "Untitled")
        #[arg(short, long)]
        title: Option<String>,

        /// Inline text to ingest
        #[arg(long)]
        text: Option<String>,

        /// File to read text from (stdin when neither is given)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Ask a question against the ingested knowledge base
    Ask {
        /// The question to answer
        question: String,

        /// Override the number of chunks to retrieve
        #[arg(long)]
        top_k: Option<usize>,

        /// Override the model provider for this call
        #[arg(long)]
        provider: Option<String>,
    },

    /// Probe dependencies and print the health report
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("deskmate=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    if let Some(addr) = &cli.metrics_addr {
        let addr = addr.parse().context("invalid metrics address")?;
        metrics::spawn_metrics_server(addr);
    }

    let settings = Settings::from_env()?;
    let state = AppState::initialise(settings).await;

    let outcome = run_command(&state, cli.command).await;
    state.shutdown();
    outcome
}

async fn run_command(state: &AppState, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Ingest { title, text, file } => {
            let text = match (text, file) {
                (Some(inline), _) => inline,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                (None, None) => {
                    let mut buffer = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buffer)
                        .context("failed to read stdin")?;
                    buffer
                }
            };

            let started = Instant::now();
            metrics::record_request_start("ingest");
            let result = state.ingest().ingest_text(title.as_deref(), &text).await;
            metrics::record_request_result("ingest", started.elapsed(), result.is_ok());

            print_json(&result?)
        }
        Commands::Ask {
            question,
            top_k,
            provider,
        } => {
            let started = Instant::now();
            metrics::record_request_start("ask");
            let result = rag::ask(state, &question, top_k, provider.as_deref()).await;
            metrics::record_request_result("ask", started.elapsed(), result.is_ok());

            print_json(&result?)
        }
        Commands::Health => print_json(&state.health().await),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
