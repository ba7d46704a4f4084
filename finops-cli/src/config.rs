//! Runtime configuration for the `finops` binary.
//!
//! Values come from `.env` (loaded by `main`), then `FINOPS_*` and
//! `OPENAI_*` environment variables. Command-line flags override both.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use finops_rag::RagConfig;
use finops_rag::openai::{
    DEFAULT_BASE_URL, DEFAULT_CHAT_MODEL, DEFAULT_DIMENSIONS, DEFAULT_EMBEDDING_MODEL,
};

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub warehouse_path: PathBuf,
    pub index_dir: PathBuf,
    pub docs_dir: PathBuf,
    pub raw_dir: PathBuf,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub chat_model: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub timeout: Duration,
    pub host: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        let defaults = RagConfig::default();
        Self {
            warehouse_path: PathBuf::from("data/processed/warehouse.db"),
            index_dir: PathBuf::from("data/processed/vector_store"),
            docs_dir: PathBuf::from("docs"),
            raw_dir: PathBuf::from("data/raw"),
            openai_api_key: None,
            openai_base_url: DEFAULT_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimensions: DEFAULT_DIMENSIONS,
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            chunk_size: defaults.chunk_size,
            chunk_overlap: defaults.chunk_overlap,
            top_k: defaults.top_k,
            timeout: defaults.embed_timeout,
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim().parse::<T>().with_context(|| format!("invalid value for {key}: '{raw}'"))
        })
        .transpose()
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok().filter(|value| !value.is_empty()))
    }

    /// Read configuration through `lookup`, falling back to defaults for
    /// unset keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = lookup("FINOPS_WAREHOUSE_PATH") {
            config.warehouse_path = path.into();
        }
        if let Some(dir) = lookup("FINOPS_INDEX_DIR") {
            config.index_dir = dir.into();
        }
        if let Some(dir) = lookup("FINOPS_DOCS_DIR") {
            config.docs_dir = dir.into();
        }
        if let Some(dir) = lookup("FINOPS_RAW_DIR") {
            config.raw_dir = dir.into();
        }
        if let Some(host) = lookup("FINOPS_HOST") {
            config.host = host;
        }
        if let Some(port) = parsed(&lookup, "FINOPS_PORT")? {
            config.port = port;
        }
        if let Some(size) = parsed(&lookup, "FINOPS_CHUNK_SIZE")? {
            config.chunk_size = size;
        }
        if let Some(overlap) = parsed(&lookup, "FINOPS_CHUNK_OVERLAP")? {
            config.chunk_overlap = overlap;
        }
        if let Some(k) = parsed(&lookup, "FINOPS_TOP_K")? {
            config.top_k = k;
        }
        if let Some(secs) = parsed::<u64>(&lookup, "FINOPS_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs);
        }

        config.openai_api_key = lookup("OPENAI_API_KEY");
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            config.openai_base_url = url;
        }
        if let Some(model) = lookup("OPENAI_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Some(dims) = parsed(&lookup, "OPENAI_EMBEDDING_DIMENSIONS")? {
            config.embedding_dimensions = dims;
        }
        if let Some(model) = lookup("OPENAI_CHAT_MODEL") {
            config.chat_model = model;
        }

        Ok(config)
    }

    /// Pipeline settings derived from this configuration.
    pub fn rag_config(&self) -> Result<RagConfig> {
        RagConfig::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .top_k(self.top_k)
            .embed_timeout(self.timeout)
            .completion_timeout(self.timeout)
            .build()
            .context("invalid RAG configuration")
    }

    pub fn api_key(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .context("OPENAI_API_KEY must be set for embedding and chat calls")
    }
}
