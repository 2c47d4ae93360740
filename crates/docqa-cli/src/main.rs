//! docqa CLI - Command-line interface
//!
//! Usage:
//!   docqa ingest <path> [--document-id <id>]
//!   docqa query <question> [--top-k <n>]
//!   docqa chat [--ingest <path>] [--top-k <n>]

mod repl;

use anyhow::Context;
use clap::{Parser, Subcommand};
use docqa_core::{AppConfig, LoggingConfig};
use docqa_rag::{IngestReport, IngestionPipeline, OllamaClient, RagOrchestrator};
use docqa_vector::{EmbeddingClient, OllamaEmbedding, VectorStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docqa")]
#[command(about = "Ask questions about your documents")]
#[command(version)]
struct Cli {
    /// TOML configuration file (environment variables override it)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a text or Markdown document
    Ingest {
        /// Path to the document
        path: PathBuf,
        /// Document identity (defaults to the file name)
        #[arg(long)]
        document_id: Option<String>,
    },
    /// Answer a single question
    Query {
        /// Question to ask
        question: String,
        /// Number of context chunks
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Interactive question loop
    Chat {
        /// Ingest this document before starting
        #[arg(long)]
        ingest: Option<PathBuf>,
        /// Document identity for --ingest
        #[arg(long)]
        document_id: Option<String>,
        /// Number of context chunks
        #[arg(long)]
        top_k: Option<usize>,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)
            .and_then(AppConfig::with_env_override)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::from_env().context("Failed to load config from environment")?,
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn init_tracing(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    if config.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging);

    let store = docqa_vector::connect(&config.store, config.retry.timeout())
        .context("Failed to open vector store")?;

    let outcome = run(cli.command, &config, store.clone()).await;

    if let Err(e) = store.close().await {
        tracing::warn!(error = %e, "Failed to close vector store");
    }
    outcome
}

async fn run(
    command: Commands,
    config: &AppConfig,
    store: Arc<dyn VectorStore>,
) -> anyhow::Result<()> {
    let embedder: Arc<dyn EmbeddingClient> = Arc::new(OllamaEmbedding::from_config(config)?);
    let ingestion = IngestionPipeline::new(embedder.clone(), store.clone(), config);
    ingestion
        .ensure_schema()
        .await
        .context("Failed to prepare collection")?;

    match command {
        Commands::Ingest { path, document_id } => {
            let report = ingest_file(&ingestion, &path, document_id.as_deref()).await?;
            print_report(&report);
        }
        Commands::Query { question, top_k } => {
            let orchestrator = orchestrator(embedder, store, config, top_k)?;
            let response = orchestrator.ask(&question).await?;
            println!("{}", response.answer);
        }
        Commands::Chat {
            ingest,
            document_id,
            top_k,
        } => {
            if let Some(path) = ingest {
                let report = ingest_file(&ingestion, &path, document_id.as_deref()).await?;
                print_report(&report);
            }

            let orchestrator = orchestrator(embedder, store, config, top_k)?;
            let input = BufReader::new(tokio::io::stdin());
            let summary = repl::run(&orchestrator, input, tokio::io::stdout()).await?;
            tracing::info!(
                answered = summary.answered,
                failed = summary.failed,
                "Chat session ended"
            );
        }
    }

    Ok(())
}

async fn ingest_file(
    pipeline: &IngestionPipeline,
    path: &Path,
    document_id: Option<&str>,
) -> anyhow::Result<IngestReport> {
    let document = docqa_parser::load_document(path, document_id)
        .with_context(|| format!("Failed to load {}", path.display()))?;

    let report = pipeline
        .ingest(&document)
        .await
        .with_context(|| format!("Failed to ingest {}", path.display()))?;
    Ok(report)
}

fn orchestrator(
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    config: &AppConfig,
    top_k: Option<usize>,
) -> anyhow::Result<RagOrchestrator> {
    let completion = Arc::new(OllamaClient::from_config(config)?);
    let orchestrator = RagOrchestrator::from_config(embedder, store, completion, config);
    Ok(match top_k {
        Some(k) => orchestrator.with_top_k(k),
        None => orchestrator,
    })
}

fn print_report(report: &IngestReport) {
    println!(
        "Ingested {}: {} chunk(s), {} upserted in {:.2?}",
        report.document_id, report.chunk_count, report.upserted, report.elapsed
    );
}
