use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use docsync_rag::api::ApiClient;
use docsync_rag::config::{Config, DEFAULT_CONFIG_PATH};
use docsync_rag::credential;
use docsync_rag::embedder::gemini::GeminiEmbedder;
use docsync_rag::generator::gemini::GeminiGenerator;
use docsync_rag::indexer::sync::Synchronizer;
use docsync_rag::query::{QueryEngine, repl};
use docsync_rag::status;
use docsync_rag::store::VectorStore;

#[derive(Parser)]
#[command(name = "docsync-rag", version, about = "Sync a document folder into a vector store and ask questions about it")]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Override the documents directory
    #[arg(long)]
    docs_dir: Option<String>,

    /// Override the vector store directory
    #[arg(long)]
    store_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add new documents to the store and remove deleted ones
    Sync,
    /// Ask questions about the indexed documents
    Ask {
        /// Ask a single question and exit instead of starting the prompt loop
        #[arg(short, long)]
        question: Option<String>,

        /// Number of chunks to retrieve for a single question
        #[arg(short = 'k', long, value_parser = clap::value_parser!(u64).range(1..))]
        chunks: Option<u64>,
    },
    /// List indexed documents
    Status,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = Config::load(&cli.config)?;
    if let Some(dir) = cli.docs_dir {
        config.docs_dir = dir;
    }
    if let Some(dir) = cli.store_dir {
        config.store_dir = dir;
    }
    config.validate().context("invalid configuration")?;

    match cli.command {
        Command::Sync => run_sync(&config),
        Command::Ask { question, chunks } => run_ask(&config, question, chunks),
        Command::Status => run_status(&config),
    }
}

fn api_client(config: &Config) -> Result<ApiClient> {
    let key = credential::resolve(&config.api_key_env)?;
    ApiClient::new(&config.api_base, key, config.request_timeout()).context("failed to build HTTP client")
}

fn run_sync(config: &Config) -> Result<ExitCode> {
    let docs_dir = config.docs_path();
    if !docs_dir.is_dir() {
        error!(
            "The documents directory '{}' was not found. Create it and add your documents before running sync.",
            docs_dir.display()
        );
        return Ok(ExitCode::FAILURE);
    }

    let client = api_client(config)?;
    let embedder = GeminiEmbedder::new(client, &config.embedding.model, config.embedding.dimensions);
    info!("Using embedding model {}", config.embedding.model);

    let mut store = VectorStore::open_or_create(config.store_path(), config.embedding.dimensions)
        .context("failed to open vector store")?;

    let report = Synchronizer::new(&mut store, &embedder, config.splitter())
        .with_progress(io::stderr().is_terminal())
        .run(&docs_dir)?;
    report.log_summary();

    Ok(ExitCode::SUCCESS)
}

fn run_ask(config: &Config, question: Option<String>, chunks: Option<u64>) -> Result<ExitCode> {
    let client = api_client(config)?;
    let embedder = Arc::new(GeminiEmbedder::new(
        client.clone(),
        &config.embedding.model,
        config.embedding.dimensions,
    ));
    let generator = Arc::new(GeminiGenerator::new(client, &config.generation.model));

    let engine = QueryEngine::load(&config.store_path(), embedder, generator);
    if !engine.is_available() {
        println!("{}", docsync_rag::query::CANNOT_PROCEED);
        return Ok(ExitCode::FAILURE);
    }

    let stdout = io::stdout();
    match question {
        Some(question) => {
            let k = match chunks {
                Some(k) => usize::try_from(k).context("chunk count too large")?,
                None => config.default_k,
            };
            repl::ask_once(&engine, &question, k, &mut stdout.lock())?;
        }
        None => {
            let stdin = io::stdin();
            repl::run(&engine, stdin.lock(), stdout.lock())?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn run_status(config: &Config) -> Result<ExitCode> {
    let store = VectorStore::open_existing(config.store_path(), config.embedding.dimensions)
        .context("failed to open vector store (has `sync` been run?)")?;

    status::write_status(&store, &mut io::stdout().lock())?;
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask_rejects_zero_chunks() {
        assert!(Cli::try_parse_from(["docsync-rag", "ask", "-q", "why?", "-k", "0"]).is_err());
    }

    #[test]
    fn test_ask_accepts_positive_chunks() {
        let cli = Cli::try_parse_from(["docsync-rag", "ask", "-q", "why?", "-k", "3"]).unwrap();
        match cli.command {
            Command::Ask { question, chunks } => {
                assert_eq!(question.as_deref(), Some("why?"));
                assert_eq!(chunks, Some(3));
            }
            _ => panic!("expected ask"),
        }
    }
}
