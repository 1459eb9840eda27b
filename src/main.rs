use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rag_retrieval::config::{Settings, load_settings};
use rag_retrieval::embedder::{EmbeddingProvider, HashingEmbedder};
use rag_retrieval::ingest::Ingestor;
use rag_retrieval::telemetry::init_telemetry;
use rag_retrieval::utils::load_documents;
use rag_retrieval::{EmbeddingEncoding, Retriever, ScoredCandidate, VectorDb};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "rag-retrieval",
    about = "Ingest documents and retrieve the chunks most similar to a query"
)]
struct Cli {
    /// Optional TOML settings file (defaults to ./rag.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database holding the corpus.
    #[arg(long, global = true, env = "RAG_DATABASE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chunk, embed and store every .txt/.md file under a directory.
    Ingest {
        dir: PathBuf,
        #[arg(long)]
        encoding: Option<EmbeddingEncoding>,
        #[arg(long)]
        max_chunk_chars: Option<usize>,
    },
    /// Retrieve the best chunks for a query. Reads queries from stdin when no text is given.
    Query {
        text: Option<String>,
        #[arg(long, env = "RAG_TOP_K")]
        top_k: Option<usize>,
        #[arg(long, env = "RAG_MIN_SIMILARITY")]
        min_similarity: Option<f64>,
        /// Print results as a JSON array.
        #[arg(long)]
        json: bool,
    },
    /// Print document and chunk counts.
    Stats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_telemetry("info");

    let cwd = std::env::current_dir().context("failed to resolve working directory")?;
    let mut settings = load_settings(cli.config.as_deref(), &cwd)?;
    if let Some(database) = cli.database {
        settings.database = database;
    }

    match cli.command {
        Command::Ingest {
            dir,
            encoding,
            max_chunk_chars,
        } => {
            if let Some(encoding) = encoding {
                settings.encoding = encoding;
            }
            if let Some(max_chunk_chars) = max_chunk_chars {
                settings.max_chunk_chars = max_chunk_chars;
            }
            settings.validate()?;
            run_ingest(&settings, &dir)
        }
        Command::Query {
            text,
            top_k,
            min_similarity,
            json,
        } => {
            if let Some(top_k) = top_k {
                settings.top_k = top_k;
            }
            if min_similarity.is_some() {
                settings.min_similarity = min_similarity;
            }
            settings.validate()?;
            run_query(&settings, text.as_deref(), json)
        }
        Command::Stats => {
            settings.validate()?;
            run_stats(&settings)
        }
    }
}

fn open_db(settings: &Settings) -> Result<VectorDb> {
    VectorDb::open(&settings.database)
        .with_context(|| format!("failed to open corpus at {}", settings.database.display()))
}

fn run_ingest(settings: &Settings, dir: &Path) -> Result<()> {
    let documents = load_documents(dir)
        .with_context(|| format!("failed to load documents from {}", dir.display()))?;
    if documents.is_empty() {
        warn!(dir = %dir.display(), "no .txt or .md documents found");
        return Ok(());
    }

    let db = open_db(settings)?;
    let embedder = HashingEmbedder::new(settings.dimensions)?;
    let report = Ingestor::new(&db, &embedder, settings.encoding, settings.max_chunk_chars)
        .ingest(&documents)?;

    println!(
        "Stored {} chunks from {} documents in {}",
        report.chunks,
        report.documents,
        settings.database.display()
    );
    Ok(())
}

fn run_query(settings: &Settings, text: Option<&str>, json: bool) -> Result<()> {
    let db = open_db(settings)?;
    let embedder = HashingEmbedder::new(settings.dimensions)?;
    let retriever = Retriever::new(db);

    if let Some(text) = text {
        return answer(&retriever, &embedder, settings, text, json);
    }

    info!("reading queries from stdin (Ctrl+D to exit)");
    loop {
        let mut query = String::new();
        print!("> ");
        std::io::stdout().flush()?;

        if std::io::stdin().read_line(&mut query)? == 0 {
            break;
        }

        let query = query.trim();
        if query.is_empty() {
            continue;
        }

        if let Err(err) = answer(&retriever, &embedder, settings, query, json) {
            eprintln!("Error: {err:#}");
        }
    }

    Ok(())
}

fn answer(
    retriever: &Retriever<VectorDb>,
    embedder: &HashingEmbedder,
    settings: &Settings,
    text: &str,
    json: bool,
) -> Result<()> {
    let query = embedder.embed(text)?;
    let selection = retriever.retrieve_with_report(&query, &settings.retrieval_options())?;
    if !selection.skipped.is_empty() {
        warn!(
            skipped = selection.skipped.len(),
            considered = selection.considered(),
            "some chunks could not be scored"
        );
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&selection.results)?);
    } else {
        print_results(&selection.results);
    }
    Ok(())
}

fn print_results(results: &[ScoredCandidate]) {
    if results.is_empty() {
        println!("no matching chunks");
        return;
    }

    for (rank, hit) in results.iter().enumerate() {
        let origin = hit
            .document_source
            .as_deref()
            .or(hit.document_title.as_deref())
            .unwrap_or("unknown source");
        println!(
            "{}. [{:.4}] chunk {} ({origin})\n   {}",
            rank + 1,
            hit.similarity,
            hit.id,
            hit.text
        );
    }
}

fn run_stats(settings: &Settings) -> Result<()> {
    let stats = open_db(settings)?.stats()?;
    println!("database: {}", settings.database.display());
    println!("documents: {}", stats.documents);
    println!("chunks: {}", stats.chunks);
    println!("chunks without embedding: {}", stats.chunks_without_embedding);
    Ok(())
}
