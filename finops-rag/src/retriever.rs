//! Query embedding and index lookup.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::document::RetrievalResult;
use crate::embedding::{EmbeddingProvider, check_embedding};
use crate::error::{RagError, Result};
use crate::similarity::SearchParams;
use crate::vectorstore::VectorIndex;

/// Embeds a question and looks up diversified neighbours in a [`VectorIndex`].
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    timeout: Duration,
    params: SearchParams,
}

impl Retriever {
    /// Create a retriever bounding each embedding call by `timeout`.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        timeout: Duration,
    ) -> Self {
        Self { embedder, index, timeout, params: SearchParams::default() }
    }

    /// Search with these tunables instead of the defaults.
    pub fn with_params(mut self, params: SearchParams) -> Self {
        self.params = params;
        self
    }

    /// Return up to `k` fragments relevant to `question`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if the embedder fails, times out,
    /// or produces an empty, wrongly sized, or non-finite vector. Index
    /// failures are passed through unchanged. Nothing is retried.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<RetrievalResult> {
        let provider = self.embedder.name().to_string();
        let embedding = tokio::time::timeout(self.timeout, self.embedder.embed(question))
            .await
            .map_err(|_| {
                warn!(
                    provider = %provider,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "embedding timed out"
                );
                RagError::EmbeddingError {
                    provider: provider.clone(),
                    message: format!("timed out after {:?}", self.timeout),
                }
            })??;

        check_embedding(&provider, &embedding, self.index.dimensions())?;

        let results = self.index.search(&embedding, k, true, &self.params).await?;
        debug!(k, result_count = results.len(), "retrieved fragments");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Fragment;
    use crate::inmemory::InMemoryVectorIndex;
    use async_trait::async_trait;

    struct Fixed(Vec<f32>);

    #[async_trait]
    impl EmbeddingProvider for Fixed {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }
        fn dimensions(&self) -> usize {
            self.0.len()
        }
    }

    struct Stalled;

    #[async_trait]
    impl EmbeddingProvider for Stalled {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![1.0, 0.0])
        }
        fn dimensions(&self) -> usize {
            2
        }
    }

    fn retriever(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<InMemoryVectorIndex>,
    ) -> Retriever {
        Retriever::new(embedder, index, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn empty_index_returns_nothing() {
        let index = Arc::new(InMemoryVectorIndex::new(2));
        let results = retriever(Arc::new(Fixed(vec![1.0, 0.0])), index)
            .retrieve("anything", 5)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn malformed_embeddings_are_rejected() {
        let index = Arc::new(InMemoryVectorIndex::new(2));
        for bad in [vec![], vec![1.0, 0.0, 0.0], vec![f32::NAN, 1.0]] {
            let err = retriever(Arc::new(Fixed(bad)), index.clone())
                .retrieve("q", 3)
                .await
                .unwrap_err();
            assert!(matches!(err, RagError::EmbeddingError { .. }));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_embedder_times_out() {
        let index = Arc::new(InMemoryVectorIndex::new(2));
        let err = retriever(Arc::new(Stalled), index).retrieve("q", 3).await.unwrap_err();
        assert!(matches!(err, RagError::EmbeddingError { .. }));
    }

    #[tokio::test]
    async fn returns_nearest_fragment_first() {
        let index = Arc::new(InMemoryVectorIndex::new(2));
        index
            .upsert(&[
                Fragment {
                    id: "d#0".into(),
                    document_id: "d".into(),
                    text: "compute".into(),
                    embedding: vec![1.0, 0.0],
                },
                Fragment {
                    id: "d#1".into(),
                    document_id: "d".into(),
                    text: "storage".into(),
                    embedding: vec![0.0, 1.0],
                },
            ])
            .await
            .unwrap();
        let results =
            retriever(Arc::new(Fixed(vec![0.9, 0.1])), index).retrieve("q", 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].fragment.text, "compute");
    }
}
