//! # KB Harness CLI (`kb`)
//!
//! The `kb` binary manages a local knowledge base: database setup, document
//! ingestion, inspection, search, question answering, and the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! kb --config ./config/kb.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `kb init` | Create the SQLite database and schema |
//! | `kb ingest <paths>...` | Extract, chunk and store files (directories are walked) |
//! | `kb extract <path>` | Print a file's text units without storing them |
//! | `kb files` | List ingested files and the total chunk count |
//! | `kb clear` | Empty the knowledge base |
//! | `kb search "<query>"` | Show the best-matching chunks with scores |
//! | `kb ask "<question>"` | Answer a question from the knowledge base |
//! | `kb serve` | Start the HTTP server |
//!
//! Logs go to stderr and honour `RUST_LOG` (default `info`).

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use kb_harness::answer::{self, ChatCompletionGenerator};
use kb_harness::config::{self, Config};
use kb_harness::extract::{self, ExtractOptions};
use kb_harness::ingest;
use kb_harness::migrate;
use kb_harness::server;
use kb_harness::sqlite_store::SqliteStore;
use kb_harness_core::search::score_chunks;
use kb_harness_core::store::KnowledgeStore;

/// KB Harness CLI: document ingestion and lexical question answering.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/kb.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "kb",
    about = "KB Harness: document ingestion and lexical question answering",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/kb.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Ingest files into the knowledge base.
    ///
    /// Directories are walked recursively and only supported files
    /// (.docx, .xlsx, .xls, .pdf, .txt) are picked up. A file that fails
    /// is reported and the rest still run; the exit code is non-zero if
    /// any file failed.
    Ingest {
        /// Files or directories to ingest.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Print the text units extracted from one file, without storing them.
    Extract {
        /// File to extract.
        path: PathBuf,
    },

    /// List ingested files and the total chunk count.
    Files,

    /// Remove every chunk and file record.
    Clear,

    /// Show the chunks that best match a query, with scores.
    Search {
        /// Search query.
        query: String,

        /// Maximum number of results (defaults to `retrieval.top_k`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Answer a question from the knowledge base.
    Ask {
        /// The question.
        question: String,
    },

    /// Start the HTTP server on `server.bind`.
    Serve,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { paths } => {
            run_ingest(&cfg, &paths).await?;
        }
        Commands::Extract { path } => {
            let bytes = tokio::fs::read(&path).await?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let options = ExtractOptions::from(&cfg.extraction);
            let units = tokio::task::spawn_blocking(move || {
                extract::extract_units(&name, &bytes, &options)
            })
            .await??;
            for unit in units {
                println!("{}", unit);
            }
        }
        Commands::Files => {
            let store = SqliteStore::connect(&cfg).await?;
            let summary = store.summary().await?;
            if summary.files.is_empty() {
                println!("No files ingested.");
            }
            for file in &summary.files {
                let when = chrono::DateTime::from_timestamp_millis(file.time)
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_default();
                println!("{}  {} chunks  {}", file.name, file.chunks, when);
            }
            println!("Total chunks: {}", summary.total_chunks);
            store.close().await;
        }
        Commands::Clear => {
            let store = SqliteStore::connect(&cfg).await?;
            store.clear().await?;
            store.close().await;
            println!("Knowledge base cleared.");
        }
        Commands::Search { query, limit } => {
            let store = SqliteStore::connect(&cfg).await?;
            let chunks = store.read_all().await?;
            store.close().await;

            let limit = limit.unwrap_or(cfg.retrieval.top_k);
            let results = score_chunks(&chunks, &query);
            if results.is_empty() {
                println!("No results.");
            }
            for (rank, hit) in results.iter().take(limit).enumerate() {
                println!(
                    "{}. [score: {:.2}] chunk #{}",
                    rank + 1,
                    hit.score,
                    hit.index
                );
                println!("    {}", hit.text.replace('\n', "\n    "));
                println!();
            }
        }
        Commands::Ask { question } => {
            let store = SqliteStore::connect(&cfg).await?;
            let generator = ChatCompletionGenerator::from_config(&cfg.llm)?;
            let reply = answer::ask(&store, &generator, &question, cfg.retrieval.top_k).await;
            store.close().await;
            println!("{}", reply?);
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

async fn run_ingest(cfg: &Config, paths: &[PathBuf]) -> Result<()> {
    let options = ExtractOptions::from(&cfg.extraction);
    let files = ingest::collect_files(paths, &options)?;
    if files.is_empty() {
        println!("No supported files found.");
        return Ok(());
    }

    let store = SqliteStore::connect(cfg).await?;
    let mut failed = 0usize;
    for path in &files {
        match ingest::ingest_path(&store, cfg, path).await {
            Ok(report) => println!(
                "{}: {} new chunks ({} total)",
                path.display(),
                report.new_chunks,
                report.total_chunks
            ),
            Err(e) => {
                failed += 1;
                tracing::warn!(file = %path.display(), error = %e, "ingest failed");
                eprintln!("{}: {}", path.display(), e);
            }
        }
    }
    store.close().await;

    println!(
        "Ingested {} of {} files.",
        files.len() - failed,
        files.len()
    );
    if failed > 0 {
        anyhow::bail!("{} file(s) failed to ingest", failed);
    }
    Ok(())
}
