//! Vector index trait for storing and searching fragment embeddings.

use async_trait::async_trait;

use crate::document::{Fragment, RetrievalResult};
use crate::error::Result;
use crate::similarity::SearchParams;

/// A storage backend for fragment embeddings with similarity search.
///
/// Any exact or approximate nearest-neighbour store that honours this
/// contract can back the pipeline. Implementations must be safe for
/// concurrent readers with a single writer: a query never observes a
/// partially applied upsert.
///
/// # Example
///
/// ```rust,ignore
/// use finops_rag::{VectorIndex, InMemoryVectorIndex};
///
/// let index = InMemoryVectorIndex::new(384);
/// index.upsert(&fragments).await?;
/// let results = index.query(&query_embedding, 5, true).await?;
/// ```
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Add fragments to the index. Every fragment must carry an embedding of
    /// [`dimensions()`](VectorIndex::dimensions) values; otherwise the whole
    /// batch is rejected and nothing is stored. Duplicate text is allowed.
    async fn upsert(&self, fragments: &[Fragment]) -> Result<()>;

    /// Return up to `k` fragments ordered by relevance to `embedding`,
    /// using the default [`SearchParams`].
    ///
    /// With `diversify` set, near-duplicate fragments are traded for more
    /// varied ones. An empty index yields an empty result, not an error.
    async fn query(
        &self,
        embedding: &[f32],
        k: usize,
        diversify: bool,
    ) -> Result<RetrievalResult> {
        self.search(embedding, k, diversify, &SearchParams::default()).await
    }

    /// Like [`query`](VectorIndex::query), with the similarity floor and MMR
    /// tunables supplied by the caller.
    async fn search(
        &self,
        embedding: &[f32],
        k: usize,
        diversify: bool,
        params: &SearchParams,
    ) -> Result<RetrievalResult>;

    /// Remove every fragment.
    async fn clear(&self) -> Result<()>;

    /// Number of stored fragments.
    async fn len(&self) -> usize;

    /// Whether the index holds no fragments.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Embedding dimensionality this index accepts.
    fn dimensions(&self) -> usize;
}

/// Check that every fragment has an embedding of `expected` values.
pub(crate) fn validate_dimensions(fragments: &[Fragment], expected: usize) -> Result<()> {
    if let Some(bad) = fragments.iter().find(|f| f.embedding.len() != expected) {
        return Err(crate::error::RagError::DimensionMismatch {
            expected,
            actual: bad.embedding.len(),
        });
    }
    Ok(())
}
