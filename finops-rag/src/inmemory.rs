//! In-memory vector index using cosine similarity.
//!
//! This module provides [`InMemoryVectorIndex`], a zero-dependency index
//! backed by a `Vec` protected by a `tokio::sync::RwLock`. It is suitable
//! for development, testing, and small corpora; nothing survives a restart.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Fragment, RetrievalResult};
use crate::error::{RagError, Result};
use crate::similarity::{SearchParams, rank};
use crate::vectorstore::{VectorIndex, validate_dimensions};

/// An in-memory vector index using exact cosine search.
///
/// # Example
///
/// ```rust,ignore
/// use finops_rag::{InMemoryVectorIndex, VectorIndex};
///
/// let index = InMemoryVectorIndex::new(384);
/// index.upsert(&fragments).await?;
/// ```
#[derive(Debug)]
pub struct InMemoryVectorIndex {
    dimensions: usize,
    fragments: RwLock<Vec<Fragment>>,
}

impl InMemoryVectorIndex {
    /// Create a new empty index accepting `dimensions`-sized embeddings.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, fragments: RwLock::new(Vec::new()) }
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(&self, fragments: &[Fragment]) -> Result<()> {
        validate_dimensions(fragments, self.dimensions)?;
        let mut stored = self.fragments.write().await;
        stored.extend_from_slice(fragments);
        Ok(())
    }

    async fn search(
        &self,
        embedding: &[f32],
        k: usize,
        diversify: bool,
        params: &SearchParams,
    ) -> Result<RetrievalResult> {
        if embedding.len() != self.dimensions {
            return Err(RagError::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            });
        }
        let stored = self.fragments.read().await;
        Ok(rank(&stored, embedding, k, diversify, params))
    }

    async fn clear(&self) -> Result<()> {
        self.fragments.write().await.clear();
        Ok(())
    }

    async fn len(&self) -> usize {
        self.fragments.read().await.len()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
