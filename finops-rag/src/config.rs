//! Configuration for the RAG pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Which chunking strategy the pipeline uses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStrategy {
    /// Fixed character windows at `i * (chunk_size - chunk_overlap)`.
    #[default]
    Fixed,
    /// Windows that prefer paragraph, sentence, then whitespace boundaries.
    Recursive,
}

/// Configuration parameters for the RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum fragment size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive fragments.
    pub chunk_overlap: usize,
    /// Chunking strategy.
    pub chunk_strategy: ChunkStrategy,
    /// Number of fragments to retrieve per question.
    pub top_k: usize,
    /// Minimum cosine similarity a fragment must reach to be returned.
    /// `None` returns the best-effort top-k regardless of absolute score.
    pub similarity_floor: Option<f32>,
    /// MMR balance: 1.0 is pure relevance, 0.0 is pure diversity.
    pub mmr_lambda: f32,
    /// Candidate pool size for MMR, as a multiple of `top_k`.
    pub mmr_fetch_multiplier: f32,
    /// Sampling temperature passed to the completion service.
    pub temperature: f32,
    /// Upper bound on a single embedding call.
    pub embed_timeout: Duration,
    /// Upper bound on a single completion call.
    pub completion_timeout: Duration,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 200,
            chunk_overlap: 50,
            chunk_strategy: ChunkStrategy::Fixed,
            top_k: 10,
            similarity_floor: None,
            mmr_lambda: 0.5,
            mmr_fetch_multiplier: 2.0,
            temperature: 0.0,
            embed_timeout: Duration::from_secs(10),
            completion_timeout: Duration::from_secs(10),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum fragment size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive fragments in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the chunking strategy.
    pub fn chunk_strategy(mut self, strategy: ChunkStrategy) -> Self {
        self.config.chunk_strategy = strategy;
        self
    }

    /// Set the number of fragments to retrieve per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set a minimum similarity floor for returned fragments.
    pub fn similarity_floor(mut self, floor: f32) -> Self {
        self.config.similarity_floor = Some(floor);
        self
    }

    /// Set the MMR relevance/diversity balance.
    pub fn mmr_lambda(mut self, lambda: f32) -> Self {
        self.config.mmr_lambda = lambda;
        self
    }

    /// Set the MMR candidate pool multiplier.
    pub fn mmr_fetch_multiplier(mut self, multiplier: f32) -> Self {
        self.config.mmr_fetch_multiplier = multiplier;
        self
    }

    /// Set the completion temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Set the timeout for a single embedding call.
    pub fn embed_timeout(mut self, timeout: Duration) -> Self {
        self.config.embed_timeout = timeout;
        self
    }

    /// Set the timeout for a single completion call.
    pub fn completion_timeout(mut self, timeout: Duration) -> Self {
        self.config.completion_timeout = timeout;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `mmr_lambda` is outside `0.0..=1.0`
    /// - `mmr_fetch_multiplier < 1.0`
    /// - either timeout is zero
    pub fn build(self) -> Result<RagConfig> {
        let config = self.config;
        if config.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        if config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if !(0.0..=1.0).contains(&config.mmr_lambda) {
            return Err(RagError::ConfigError(format!(
                "mmr_lambda ({}) must be within 0.0..=1.0",
                config.mmr_lambda
            )));
        }
        if config.mmr_fetch_multiplier < 1.0 {
            return Err(RagError::ConfigError(format!(
                "mmr_fetch_multiplier ({}) must be at least 1.0",
                config.mmr_fetch_multiplier
            )));
        }
        if config.embed_timeout.is_zero() || config.completion_timeout.is_zero() {
            return Err(RagError::ConfigError("timeouts must be non-zero".to_string()));
        }
        Ok(config)
    }
}
