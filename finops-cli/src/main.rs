//! `finops`: sample data, ETL, corpus ingestion, question answering and
//! the HTTP API from one binary.

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use finops_rag::evaluation::default_cases;
use finops_rag::loader::DEFAULT_EXTENSIONS;
use finops_rag::openai::{OpenAIChatProvider, OpenAIEmbeddingProvider};
use finops_rag::{
    Document, EmbeddingProvider, FileVectorIndex, IngestMode, RagPipeline, evaluate,
    load_directory, load_table,
};
use finops_server::{AppState, ServerConfig, run_server};
use finops_warehouse::{
    BILLING_FILE, DEFAULT_IDLE_THRESHOLD, DEFAULT_MONTHS, DEFAULT_RESOURCES_PER_MONTH,
    DEFAULT_SEED, InvoiceMonth, RESOURCES_FILE, Warehouse, generate_sample, run_etl,
    write_sample_csvs,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "finops", version, about = "FinOps cost analytics and RAG assistant")]
struct Cli {
    /// SQLite warehouse file (overrides FINOPS_WAREHOUSE_PATH)
    #[arg(long, global = true)]
    warehouse: Option<PathBuf>,

    /// Vector index directory (overrides FINOPS_INDEX_DIR)
    #[arg(long, global = true)]
    index: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write synthetic billing.csv and resources.csv
    Sample {
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
        #[arg(long, default_value_t = DEFAULT_MONTHS)]
        months: usize,
        #[arg(long, default_value_t = DEFAULT_RESOURCES_PER_MONTH)]
        per_month: usize,
    },
    /// Load billing and resource CSVs into the warehouse
    Etl {
        #[arg(long)]
        billing: Option<PathBuf>,
        #[arg(long)]
        resources: Option<PathBuf>,
    },
    /// Populate the vector index from markdown docs and warehouse tables
    Ingest {
        #[arg(long)]
        docs: Option<PathBuf>,
        /// Warehouse table to ingest row by row (repeatable)
        #[arg(long = "table")]
        tables: Vec<String>,
        #[arg(long, value_enum, default_value_t = ModeArg::Replace)]
        mode: ModeArg,
    },
    /// Answer a question from the indexed corpus
    Ask { question: String },
    /// Print the KPI snapshot as JSON
    Kpis,
    /// Print idle resources as JSON
    Idle {
        /// Invoice month (YYYY-MM); all months when omitted
        #[arg(long)]
        month: Option<String>,
        #[arg(long, default_value_t = DEFAULT_IDLE_THRESHOLD)]
        threshold: f64,
    },
    /// Run retrieval evaluation over the built-in question set
    Eval {
        #[arg(long, default_value_t = 3)]
        k: usize,
        #[arg(long, default_value = "data/processed/eval_report.json")]
        out: PathBuf,
    },
    /// Start the HTTP API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ModeArg {
    Replace,
    Append,
}

impl From<ModeArg> for IngestMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Replace => IngestMode::Replace,
            ModeArg::Append => IngestMode::Append,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(path) = cli.warehouse {
        config.warehouse_path = path;
    }
    if let Some(dir) = cli.index {
        config.index_dir = dir;
    }

    match cli.command {
        Command::Sample { out, seed, months, per_month } => {
            let dir = out.unwrap_or_else(|| config.raw_dir.clone());
            let data = generate_sample(seed, months, per_month);
            let (billing, resources) = write_sample_csvs(&dir, &data)
                .with_context(|| format!("failed to write sample data to {}", dir.display()))?;
            println!("{}\n{}", billing.display(), resources.display());
        }
        Command::Etl { billing, resources } => {
            let billing = billing.unwrap_or_else(|| config.raw_dir.join(BILLING_FILE));
            let resources = resources.unwrap_or_else(|| config.raw_dir.join(RESOURCES_FILE));
            let warehouse = open_warehouse(&config)?;
            let report = run_etl(&billing, &resources, &warehouse).context("ETL failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Ingest { docs, tables, mode } => {
            let docs_dir = docs.unwrap_or_else(|| config.docs_dir.clone());
            let documents = collect_documents(&config, &docs_dir, &tables)?;

            let pipeline = build_pipeline(&config).await?;
            let report =
                pipeline.ingest(&documents, mode.into()).await.context("ingestion failed")?;
            println!("ingested {} documents as {} fragments", report.documents, report.fragments);
        }
        Command::Ask { question } => {
            let pipeline = build_pipeline(&config).await?;
            let answer = pipeline.ask(&question).await?;
            println!("{}", answer.text);
            if !answer.sources.is_empty() {
                println!("\nSources:");
                for source in &answer.sources {
                    println!("- {source}");
                }
            }
        }
        Command::Kpis => {
            let warehouse = open_warehouse(&config)?;
            match warehouse.kpi_snapshot()? {
                Some(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot)?),
                None => println!("No data available"),
            }
        }
        Command::Idle { month, threshold } => {
            let month = month.map(|m| m.parse::<InvoiceMonth>()).transpose()?;
            let warehouse = open_warehouse(&config)?;
            let idle = warehouse.find_idle_resources(threshold, month.as_ref())?;
            println!("{}", serde_json::to_string_pretty(&idle)?);
        }
        Command::Eval { k, out } => {
            let pipeline = build_pipeline(&config).await?;
            let report = evaluate(&pipeline, &default_cases(), k).await?;
            if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&out, serde_json::to_string_pretty(&report)?)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!(
                "recall@{}: {:.2}, answer score: {:.2} ({})",
                report.k,
                report.average_recall,
                report.average_score,
                out.display()
            );
        }
        Command::Serve { host, port } => {
            let server = ServerConfig {
                host: host.unwrap_or_else(|| config.host.clone()),
                port: port.unwrap_or(config.port),
            };
            let state = AppState {
                warehouse: Arc::new(open_warehouse(&config)?),
                pipeline: Arc::new(build_pipeline(&config).await?),
            };
            run_server(server, state).await?;
        }
    }

    Ok(())
}

/// Gather the ingestion corpus. Runs before the index is touched, so a
/// missing source leaves the existing index intact.
fn collect_documents(
    config: &AppConfig,
    docs_dir: &Path,
    tables: &[String],
) -> Result<Vec<Document>> {
    let mut documents = load_directory(docs_dir, DEFAULT_EXTENSIONS)
        .with_context(|| format!("failed to load documents from {}", docs_dir.display()))?;
    if !tables.is_empty() {
        let warehouse = open_warehouse(config)?;
        for table in tables {
            documents.extend(
                load_table(&warehouse, table)
                    .with_context(|| format!("failed to load table '{table}'"))?,
            );
        }
    }
    Ok(documents)
}

fn open_warehouse(config: &AppConfig) -> Result<Warehouse> {
    Warehouse::open(&config.warehouse_path).with_context(|| {
        format!("failed to open warehouse at {}", config.warehouse_path.display())
    })
}

async fn build_pipeline(config: &AppConfig) -> Result<RagPipeline> {
    let api_key = config.api_key()?;
    let embedder = OpenAIEmbeddingProvider::new(api_key)?
        .with_base_url(&config.openai_base_url)
        .with_model(&config.embedding_model)
        .with_dimensions(config.embedding_dimensions);
    let chat = OpenAIChatProvider::new(api_key)?
        .with_base_url(&config.openai_base_url)
        .with_model(&config.chat_model);

    let index = FileVectorIndex::open(&config.index_dir, embedder.dimensions())
        .await
        .with_context(|| {
            format!("failed to open vector index at {}", config.index_dir.display())
        })?;
    info!(
        index = %config.index_dir.display(),
        dimensions = embedder.dimensions(),
        "opened vector index"
    );

    RagPipeline::builder()
        .config(config.rag_config()?)
        .embedding_provider(Arc::new(embedder))
        .vector_index(Arc::new(index))
        .completion_provider(Arc::new(chat))
        .build()
        .context("failed to build RAG pipeline")
}
