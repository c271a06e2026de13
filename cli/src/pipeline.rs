//! Load → embed corpus → build index → embed query → search

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::builder::RangedU64ValueParser;
use clap::Parser;
use semsearch_core::{
    AvailableModel, IndexConfig, IndexedItem, LoadObserver, SearchResult, SessionConfig,
    SessionManager, VectorIndex,
};

use crate::error::{CliError, CliResult};

/// Corpus used when no `--corpus` file is given
pub const DEMO_PHRASES: [&str; 3] = [
    "That is a very happy Person",
    "That is a Happy Dog",
    "Today is a sunny day",
];

pub const DEFAULT_QUERY: &str = "Is it summer yet?";

#[derive(Parser, Debug, Clone)]
#[command(name = "semsearch")]
#[command(about = "Embed a phrase corpus and find the entries nearest to a query")]
#[command(version)]
pub struct Args {
    /// Embedding model to load
    #[arg(long, default_value_t = AvailableModel::BgeSmallEnV15)]
    pub model: AvailableModel,

    /// File with one phrase per line (defaults to a built-in demo corpus)
    #[arg(long)]
    pub corpus: Option<PathBuf>,

    /// Query text
    #[arg(long, short, default_value = DEFAULT_QUERY)]
    pub query: String,

    /// Number of neighbors to return
    #[arg(
        short = 'k',
        long = "top",
        default_value_t = 1,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub k: usize,

    /// Directory for downloaded model files
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Always scan exhaustively, even for large corpora
    #[arg(long)]
    pub exact: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// List the available models and exit
    #[arg(long)]
    pub list_models: bool,
}

impl Args {
    /// Environment-derived session config with `--cache-dir` applied
    pub fn session_config(&self) -> SessionConfig {
        let mut config = SessionConfig::from_env();
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = Some(dir.clone());
        }
        config
    }

    pub fn index_config(&self) -> IndexConfig {
        if self.exact {
            IndexConfig::exact()
        } else {
            IndexConfig::default()
        }
    }
}

/// Outcome of one pipeline run
#[derive(Debug)]
pub struct Report {
    pub model: AvailableModel,
    pub query: String,
    pub corpus_size: usize,
    pub result: SearchResult,
    /// Time spent embedding, indexing and searching (model load excluded)
    pub elapsed: Duration,
}

/// Forwards load events to tracing
struct TracingObserver;

impl LoadObserver for TracingObserver {
    fn on_start(&mut self, model: AvailableModel) {
        tracing::info!("Loading {}", model);
    }

    fn on_progress(&mut self, fraction: f32) {
        tracing::debug!("Load progress {:.0}%", fraction * 100.0);
    }
}

/// Read one phrase per line, skipping blank lines
pub fn read_corpus(path: &Path) -> CliResult<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Corpus {
        path: path.to_path_buf(),
        source,
    })?;

    let phrases: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();

    if phrases.is_empty() {
        return Err(CliError::EmptyCorpus(path.to_path_buf()));
    }
    Ok(phrases)
}

pub async fn run(manager: &SessionManager, args: &Args) -> CliResult<Report> {
    let corpus = match &args.corpus {
        Some(path) => read_corpus(path)?,
        None => DEMO_PHRASES.iter().map(|p| p.to_string()).collect(),
    };

    let session = manager.load_model(args.model, &mut TracingObserver).await?;

    let start = Instant::now();
    let embeddings = session.infer(&corpus).await?;
    let index = VectorIndex::build_with_config(
        IndexedItem::from_phrases(&corpus, embeddings)?,
        args.index_config(),
    )?;

    let query = session.infer(&[args.query.as_str()]).await?;
    let result = index.search(&query[0], args.k)?;
    let elapsed = start.elapsed();

    tracing::info!("Index & search took {:?}", elapsed);

    Ok(Report {
        model: args.model,
        query: args.query.clone(),
        corpus_size: corpus.len(),
        result,
        elapsed,
    })
}

/// Human-readable or JSON rendering of a report
pub fn render(report: &Report, json: bool) -> CliResult<String> {
    if json {
        let value = serde_json::json!({
            "model": report.model,
            "query": report.query,
            "corpusSize": report.corpus_size,
            "elapsedMs": report.elapsed.as_secs_f64() * 1000.0,
            "result": report.result,
        });
        return Ok(serde_json::to_string_pretty(&value)?);
    }

    let mut out = format!("Query: {}\n", report.query);
    if report.result.is_empty() {
        out.push_str("No results\n");
    }
    for (rank, neighbor) in report.result.neighbors.iter().enumerate() {
        out.push_str(&format!(
            "{}. [{}] {} ({}) distance={:.4}\n",
            rank + 1,
            neighbor.id,
            neighbor.title,
            neighbor.url,
            neighbor.distance
        ));
    }
    if !report.result.exact {
        out.push_str("(approximate)\n");
    }
    Ok(out)
}

pub fn list_models() -> String {
    AvailableModel::ALL
        .iter()
        .map(|m| format!("{:<24}{}d", m.name(), m.dimension()))
        .collect::<Vec<_>>()
        .join("\n")
}
