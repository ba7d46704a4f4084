//! Error types for the `finops-rag` crate.

use thiserror::Error;

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// The corpus loader could not reach its input (missing directory or table).
    #[error("Source unavailable ({source_name}): {message}")]
    SourceUnavailable {
        /// The directory path or table name that could not be read.
        source_name: String,
        /// A description of the failure.
        message: String,
    },

    /// The vector index storage could not be opened, read, or written.
    #[error("Index unavailable ({backend}): {message}")]
    IndexUnavailable {
        /// The index backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A vector did not have the dimensionality the index was opened with.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensionality configured for the index.
        expected: usize,
        /// Dimensionality of the offending vector.
        actual: usize,
    },

    /// The embedding service was unreachable, timed out, or returned malformed output.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The completion service was unreachable, timed out, or returned a blank reply.
    #[error("Completion error ({provider}): {message}")]
    CompletionError {
        /// The completion provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during document chunking.
    #[error("Chunking error: {0}")]
    ChunkingError(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The question was empty or whitespace only.
    #[error("Question cannot be empty")]
    EmptyQuestion,
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
