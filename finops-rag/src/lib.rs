//! Retrieval-augmented question answering for FinOps data.
//!
//! This crate provides:
//! - Corpus loading from markdown directories and warehouse tables
//! - Fixed-size and boundary-preferring chunking with overlap
//! - In-memory and durable file-backed vector indexes with MMR diversification
//! - Retriever and answer composer wired together by [`RagPipeline`]
//! - OpenAI-compatible embedding and chat providers (`openai` feature)
//! - Keyword-based retrieval evaluation
//!
//! External services are reached only through the [`EmbeddingProvider`] and
//! [`CompletionProvider`] traits, so tests can inject deterministic doubles.

pub mod chunking;
pub mod completion;
pub mod composer;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod evaluation;
pub mod inmemory;
pub mod loader;
#[cfg(feature = "openai")]
pub mod openai;
pub mod persistent;
pub mod pipeline;
pub mod retriever;
pub mod similarity;
pub mod vectorstore;

pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker, chunker_for};
pub use completion::CompletionProvider;
pub use composer::{
    AnswerComposer, GENERATION_FAILED_ANSWER, NO_CONTEXT_ANSWER, RETRIEVAL_FAILED_ANSWER,
    build_prompt,
};
pub use config::{ChunkStrategy, RagConfig, RagConfigBuilder};
pub use document::{Answer, AnswerKind, Document, Fragment, RetrievalResult, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use evaluation::{EvalCase, EvalReport, EvalRow, evaluate};
pub use inmemory::InMemoryVectorIndex;
pub use loader::{Row, TableSource, load_directory, load_table};
pub use persistent::FileVectorIndex;
pub use pipeline::{IngestMode, IngestReport, RagPipeline, RagPipelineBuilder};
pub use retriever::Retriever;
pub use similarity::{SearchParams, cosine_similarity};
pub use vectorstore::VectorIndex;
