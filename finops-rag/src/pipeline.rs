//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates the ingest workflow (chunk → embed →
//! upsert) and the per-question workflow (embed → retrieve → compose →
//! complete) by composing an [`EmbeddingProvider`], a [`VectorIndex`], a
//! [`Chunker`], and a [`CompletionProvider`].
//!
//! # Example
//!
//! ```rust,ignore
//! use finops_rag::{IngestMode, InMemoryVectorIndex, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_index(Arc::new(InMemoryVectorIndex::new(1536)))
//!     .completion_provider(Arc::new(my_llm))
//!     .build()?;
//!
//! pipeline.ingest(&documents, IngestMode::Replace).await?;
//! let answer = pipeline.ask("Which resources are idle?").await?;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::chunking::{Chunker, chunker_for};
use crate::completion::CompletionProvider;
use crate::composer::{AnswerComposer, RETRIEVAL_FAILED_ANSWER};
use crate::config::RagConfig;
use crate::document::{Answer, AnswerKind, Document, RetrievalResult};
use crate::embedding::{EmbeddingProvider, check_embedding};
use crate::error::{RagError, Result};
use crate::retriever::Retriever;
use crate::similarity::SearchParams;
use crate::vectorstore::VectorIndex;

/// Whether an ingestion run starts from an empty index or adds to it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IngestMode {
    /// Clear the index before ingesting.
    #[default]
    Replace,
    /// Keep existing fragments; re-ingested content is duplicated.
    Append,
}

/// Summary of one ingestion run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestReport {
    /// Documents processed.
    pub documents: usize,
    /// Fragments written to the index.
    pub fragments: usize,
}

/// The RAG pipeline orchestrator. Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_index: Arc<dyn VectorIndex>,
    chunker: Arc<dyn Chunker>,
    retriever: Retriever,
    composer: AnswerComposer,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the vector index.
    pub fn vector_index(&self) -> &Arc<dyn VectorIndex> {
        &self.vector_index
    }

    /// Ingest `documents`: chunk → embed → upsert, one document at a time.
    ///
    /// # Errors
    ///
    /// Stops at the first document whose embedding or upsert fails and
    /// returns that error. Documents ingested before it stay in the index.
    /// A batch of the wrong size, or holding an empty, wrongly sized, or
    /// non-finite vector, is a [`RagError::EmbeddingError`].
    pub async fn ingest(&self, documents: &[Document], mode: IngestMode) -> Result<IngestReport> {
        if mode == IngestMode::Replace {
            self.vector_index.clear().await.map_err(|e| {
                error!(error = %e, "failed to clear index before ingestion");
                e
            })?;
        }

        let mut report = IngestReport::default();
        for document in documents {
            report.fragments += self.ingest_document(document).await?;
            report.documents += 1;
        }

        info!(
            mode = ?mode,
            document_count = report.documents,
            fragment_count = report.fragments,
            "ingestion complete"
        );
        Ok(report)
    }

    async fn ingest_document(&self, document: &Document) -> Result<usize> {
        let mut fragments = self.chunker.chunk(document);
        if fragments.is_empty() {
            info!(document.id = %document.id, fragment_count = 0, "ingested document (empty)");
            return Ok(0);
        }

        let texts: Vec<&str> = fragments.iter().map(|f| f.text.as_str()).collect();
        let provider = self.embedding_provider.name().to_string();
        let embeddings = tokio::time::timeout(
            self.config.embed_timeout,
            self.embedding_provider.embed_batch(&texts),
        )
        .await
        .map_err(|_| RagError::EmbeddingError {
            provider: provider.clone(),
            message: format!("timed out after {:?}", self.config.embed_timeout),
        })
        .and_then(|inner| inner)
        .map_err(|e| {
            error!(document.id = %document.id, error = %e, "embedding failed during ingestion");
            e
        })?;

        if embeddings.len() != fragments.len() {
            error!(
                document.id = %document.id,
                expected = fragments.len(),
                actual = embeddings.len(),
                "embedding batch size mismatch"
            );
            return Err(RagError::EmbeddingError {
                provider,
                message: format!(
                    "expected {} embeddings for document '{}', got {}",
                    fragments.len(),
                    document.id,
                    embeddings.len()
                ),
            });
        }

        let expected = self.vector_index.dimensions();
        for embedding in &embeddings {
            check_embedding(&provider, embedding, expected).inspect_err(|e| {
                error!(document.id = %document.id, error = %e, "rejected embedding batch");
            })?;
        }

        for (fragment, embedding) in fragments.iter_mut().zip(embeddings) {
            fragment.embedding = embedding;
        }

        self.vector_index.upsert(&fragments).await.map_err(|e| {
            error!(document.id = %document.id, error = %e, "upsert failed during ingestion");
            e
        })?;

        info!(document.id = %document.id, fragment_count = fragments.len(), "ingested document");
        Ok(fragments.len())
    }

    /// Retrieve the configured top-k fragments for `question`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyQuestion`] for blank input, otherwise the
    /// retriever's embedding or index error.
    pub async fn retrieve(&self, question: &str) -> Result<RetrievalResult> {
        if question.trim().is_empty() {
            return Err(RagError::EmptyQuestion);
        }
        self.retriever.retrieve(question, self.config.top_k).await
    }

    /// Answer `question` end to end.
    ///
    /// Per-question failures become canned answers; only blank input is an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyQuestion`] if `question` is empty or
    /// whitespace, before any stage runs.
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        if question.trim().is_empty() {
            warn!("rejected empty question");
            return Err(RagError::EmptyQuestion);
        }

        let fragments = match self.retriever.retrieve(question, self.config.top_k).await {
            Ok(fragments) => fragments,
            Err(e) => {
                error!(error = %e, "retrieval failed");
                return Ok(Answer {
                    text: RETRIEVAL_FAILED_ANSWER.to_string(),
                    sources: Vec::new(),
                    kind: AnswerKind::RetrievalFailed,
                });
            }
        };

        Ok(self.composer.answer(question, &fragments).await)
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// The embedding provider, vector index, and completion provider are
/// required. The config defaults to [`RagConfig::default()`] and the chunker
/// to the one selected by the config's chunk strategy.
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_index: Option<Arc<dyn VectorIndex>>,
    chunker: Option<Arc<dyn Chunker>>,
    completion_provider: Option<Arc<dyn CompletionProvider>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector index backend.
    pub fn vector_index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.vector_index = Some(index);
        self
    }

    /// Override the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the completion provider.
    pub fn completion_provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.completion_provider = Some(provider);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing or the
    /// embedder and index disagree on dimensionality.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_index = self
            .vector_index
            .ok_or_else(|| RagError::ConfigError("vector_index is required".to_string()))?;
        let completion_provider = self
            .completion_provider
            .ok_or_else(|| RagError::ConfigError("completion_provider is required".to_string()))?;
        let chunker = self.chunker.unwrap_or_else(|| chunker_for(&config));

        if embedding_provider.dimensions() != vector_index.dimensions() {
            return Err(RagError::ConfigError(format!(
                "embedding provider produces {} dimensions but the index expects {}",
                embedding_provider.dimensions(),
                vector_index.dimensions()
            )));
        }

        let retriever =
            Retriever::new(embedding_provider.clone(), vector_index.clone(), config.embed_timeout)
                .with_params(SearchParams::from(&config));
        let composer = AnswerComposer::new(
            completion_provider,
            config.temperature,
            config.completion_timeout,
        );

        Ok(RagPipeline { config, embedding_provider, vector_index, chunker, retriever, composer })
    }
}
