//! CiteGraph command-line driver
//!
//! Wires configuration, a paper source (live APIs or the local shard
//! dataset), and the traversal engine together. Ctrl-C cancels a running
//! traversal cooperatively; whatever was accumulated is still saved.

use anyhow::Context;
use citegraph_common::config::ObservabilityConfig;
use citegraph_common::{AppConfig, Doi, JournalCatalog, PaperSource};
use citegraph_engine::{analysis, store, CancelToken, TraversalConfig, Traverser};
use citegraph_provider::{CrossrefClient, Harvester, LiveSource, ShardStore};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "citegraph", version, about = "Explore the citation neighborhood of a paper")]
struct Cli {
    /// Path to a TOML config file; otherwise config/ files and APP__
    /// environment variables are used
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Expand the citation neighborhood of a DOI and save the graph
    Expand {
        /// Root DOI to start from
        doi: String,

        /// Depth bound (overrides configuration)
        #[arg(long)]
        depth: Option<u32>,

        /// Concurrent fetch workers (overrides configuration)
        #[arg(long)]
        workers: Option<usize>,

        /// Resume from a previously saved graph
        #[arg(long)]
        seed: Option<PathBuf>,

        /// Output file; defaults to the filename convention in the
        /// configured output directory
        #[arg(long)]
        output: Option<PathBuf>,

        /// Use the local shard dataset instead of the live APIs
        #[arg(long)]
        offline: bool,
    },

    /// Re-export a saved graph in the nested-tree layout
    ExportTree {
        /// Saved graph file (either layout)
        input: PathBuf,

        /// Output file; defaults to `<input stem>_tree.json`
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Rank journals among the leaf nodes of a saved graph
    Journals {
        /// Saved graph file (either layout)
        input: PathBuf,
    },

    /// Build local shard files from Crossref journal listings
    Harvest {
        /// ISSN to harvest; repeatable
        #[arg(long, required = true)]
        issn: Vec<String>,

        #[arg(long)]
        from_year: i32,

        #[arg(long)]
        to_year: i32,
    },

    /// Search Crossref journals by name
    SearchJournal {
        name: String,

        #[arg(long, default_value_t = 10)]
        rows: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("failed to load config from {path}"))?,
        None => AppConfig::load().context("failed to load configuration")?,
    };

    init_tracing(&config.observability);
    info!("citegraph v{}", citegraph_common::VERSION);

    match cli.command {
        Command::Expand {
            doi,
            depth,
            workers,
            seed,
            output,
            offline,
        } => expand(&config, doi, depth, workers, seed, output, offline).await,
        Command::ExportTree { input, output } => export_tree(input, output),
        Command::Journals { input } => journals(&config, input),
        Command::Harvest {
            issn,
            from_year,
            to_year,
        } => harvest(&config, issn, from_year, to_year).await,
        Command::SearchJournal { name, rows } => search_journal(&config, name, rows).await,
    }
}

fn init_tracing(observability: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&observability.log_level));

    if observability.json_logging {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn load_catalog(config: &AppConfig) -> anyhow::Result<JournalCatalog> {
    match &config.storage.catalog_file {
        Some(path) => JournalCatalog::from_file(path)
            .with_context(|| format!("failed to load journal catalog from {path}")),
        None => Ok(JournalCatalog::builtin()),
    }
}

async fn expand(
    config: &AppConfig,
    doi: String,
    depth: Option<u32>,
    workers: Option<usize>,
    seed: Option<PathBuf>,
    output: Option<PathBuf>,
    offline: bool,
) -> anyhow::Result<()> {
    let catalog = load_catalog(config)?;

    let source: Arc<dyn PaperSource> = if offline {
        Arc::new(ShardStore::open(&config.storage.shard_dir, &catalog)?)
    } else {
        Arc::new(LiveSource::from_config(config)?)
    };

    let mut traversal = TraversalConfig::from(&config.crawler);
    if let Some(depth) = depth {
        traversal.max_depth = depth;
    }
    if let Some(workers) = workers {
        traversal.workers = workers;
    }

    let seed = match seed {
        Some(path) => Some(
            store::load_file(&path)
                .with_context(|| format!("failed to load seed graph from {}", path.display()))?,
        ),
        None => None,
    };

    let cancel = CancelToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping traversal");
            signal_cancel.cancel();
        }
    });

    let engine = Traverser::new(source, traversal);
    let outcome = engine.expand(&Doi::new(doi), seed, &cancel).await?;

    let path = match output {
        Some(path) => {
            let file = std::fs::File::create(&path)?;
            store::save(&outcome.graph, file)?;
            path
        }
        None => store::save_to_dir(&outcome.graph, &config.storage.output_dir)?,
    };

    info!(
        nodes = outcome.graph.node_count(),
        degraded = outcome.stats.degraded,
        forward_failures = outcome.stats.forward_failures,
        backward_failures = outcome.stats.backward_failures,
        cancelled = outcome.stats.cancelled,
        path = %path.display(),
        "graph saved"
    );

    Ok(())
}

fn export_tree(input: PathBuf, output: Option<PathBuf>) -> anyhow::Result<()> {
    let graph = store::load_file(&input)?;
    let output = output.unwrap_or_else(|| {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("graph");
        input.with_file_name(format!("{stem}_tree.json"))
    });

    store::export_tree_to_file(&graph, &output)?;
    info!(path = %output.display(), "tree view exported");
    Ok(())
}

fn journals(config: &AppConfig, input: PathBuf) -> anyhow::Result<()> {
    let catalog = load_catalog(config)?;
    let graph = store::load_file(&input)?;

    let ranked = analysis::popular_journals(&graph, &catalog);
    println!("Most popular journals among {} leaf nodes:", graph.leaf_dois().len());
    for entry in ranked {
        println!("{:>6}  {}", entry.count, entry.journal);
    }
    Ok(())
}

async fn harvest(
    config: &AppConfig,
    issns: Vec<String>,
    from_year: i32,
    to_year: i32,
) -> anyhow::Result<()> {
    if from_year > to_year {
        anyhow::bail!("from_year {from_year} is after to_year {to_year}");
    }

    let client = CrossrefClient::new(&config.crossref)?;
    let harvester = Harvester::new(&client, &config.storage.shard_dir);

    for issn in issns {
        let written = harvester.harvest_journal(&issn, from_year, to_year).await?;
        info!(issn = %issn, files = written.len(), "journal harvested");
    }
    Ok(())
}

async fn search_journal(config: &AppConfig, name: String, rows: u32) -> anyhow::Result<()> {
    let client = CrossrefClient::new(&config.crossref)?;
    let hits = client.search_journals(&name, rows).await?;

    for hit in hits {
        println!("{}  [{}]", hit.title, hit.issns.join(", "));
    }
    Ok(())
}
