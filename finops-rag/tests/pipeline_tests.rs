//! End-to-end pipeline behaviour with deterministic test doubles.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use finops_rag::composer::{
    AnswerComposer, GENERATION_FAILED_ANSWER, NO_CONTEXT_ANSWER, RETRIEVAL_FAILED_ANSWER,
};
use finops_rag::{
    AnswerKind, CompletionProvider, Document, EmbeddingProvider, Fragment, InMemoryVectorIndex,
    IngestMode, RagConfig, RagError, RagPipeline, Result, SearchResult, VectorIndex, evaluate,
    evaluation::EvalCase,
};

const VOCABULARY: [&str; 7] =
    ["tagging", "idle", "reserved", "storage", "compute", "budget", "spot"];

/// Embeds text as keyword counts plus a constant bias dimension.
#[derive(Default)]
struct KeywordEmbedder {
    calls: AtomicUsize,
    fail_queries: bool,
}

impl KeywordEmbedder {
    fn failing() -> Self {
        Self { calls: AtomicUsize::new(0), fail_queries: true }
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries {
            return Err(RagError::EmbeddingError {
                provider: "keyword".into(),
                message: "service unreachable".into(),
            });
        }
        let lower = text.to_lowercase();
        let mut vector: Vec<f32> =
            VOCABULARY.iter().map(|word| lower.matches(word).count() as f32).collect();
        vector.push(0.1);
        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            let lower = text.to_lowercase();
            let mut vector: Vec<f32> =
                VOCABULARY.iter().map(|word| lower.matches(word).count() as f32).collect();
            vector.push(0.1);
            out.push(vector);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        VOCABULARY.len() + 1
    }
}

/// Batch embedder whose vectors are all `vector`, regardless of input.
struct ConstantBatchEmbedder {
    vector: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for ConstantBatchEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(self.vector.clone())
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(vec![self.vector.clone(); texts.len()])
    }

    fn dimensions(&self) -> usize {
        VOCABULARY.len() + 1
    }
}

enum Reply {
    Text(&'static str),
    Fail,
    Stall,
}

/// Completion double that counts calls and records the last prompt.
struct CountingCompletion {
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
    last_temperature: Mutex<Option<f32>>,
    reply: Reply,
}

impl CountingCompletion {
    fn new(reply: Reply) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
            last_temperature: Mutex::new(None),
            reply,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for CountingCompletion {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        *self.last_temperature.lock().unwrap() = Some(temperature);
        match self.reply {
            Reply::Text(text) => Ok(text.to_string()),
            Reply::Fail => Err(RagError::CompletionError {
                provider: "counting".into(),
                message: "boom".into(),
            }),
            Reply::Stall => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok("too late".to_string())
            }
        }
    }
}

fn corpus() -> Vec<Document> {
    vec![
        Document::new(
            "tags.md",
            "Tagging lets teams allocate cost. Enforce tagging policies.",
            "docs/tags.md",
        ),
        Document::new(
            "idle.md",
            "Idle compute wastes budget. Stop idle VMs nightly.",
            "docs/idle.md",
        ),
        Document::new(
            "ri.md",
            "Reserved instances and spot capacity cut compute cost.",
            "docs/ri.md",
        ),
    ]
}

fn pipeline(
    embedder: Arc<KeywordEmbedder>,
    completion: Arc<CountingCompletion>,
) -> (RagPipeline, Arc<InMemoryVectorIndex>) {
    let index = Arc::new(InMemoryVectorIndex::new(VOCABULARY.len() + 1));
    let config = RagConfig::builder().top_k(2).build().unwrap();
    let pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(embedder)
        .vector_index(index.clone())
        .completion_provider(completion)
        .build()
        .unwrap();
    (pipeline, index)
}

fn result(text: &str) -> SearchResult {
    SearchResult {
        fragment: Fragment {
            id: format!("{text}#0"),
            document_id: text.to_string(),
            text: text.to_string(),
            embedding: vec![1.0],
        },
        score: 0.9,
    }
}

#[tokio::test]
async fn empty_question_is_rejected_before_any_stage() {
    let embedder = Arc::new(KeywordEmbedder::default());
    let completion = Arc::new(CountingCompletion::new(Reply::Text("unused")));
    let (pipeline, _) = pipeline(embedder.clone(), completion.clone());
    pipeline.ingest(&corpus(), IngestMode::Replace).await.unwrap();

    for blank in ["", "   \n\t"] {
        assert!(matches!(pipeline.ask(blank).await, Err(RagError::EmptyQuestion)));
        assert!(matches!(pipeline.retrieve(blank).await, Err(RagError::EmptyQuestion)));
    }
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(completion.calls(), 0);
}

#[tokio::test]
async fn empty_index_short_circuits() {
    let completion = Arc::new(CountingCompletion::new(Reply::Text("unused")));
    let (pipeline, _) = pipeline(Arc::new(KeywordEmbedder::default()), completion.clone());

    assert!(pipeline.retrieve("idle compute").await.unwrap().is_empty());
    let answer = pipeline.ask("idle compute").await.unwrap();
    assert_eq!(answer.text, NO_CONTEXT_ANSWER);
    assert!(answer.sources.is_empty());
    assert_eq!(answer.kind, AnswerKind::NoContext);
    assert_eq!(completion.calls(), 0);
}

#[tokio::test]
async fn composer_skips_completion_without_fragments() {
    let completion = Arc::new(CountingCompletion::new(Reply::Text("unused")));
    let composer = AnswerComposer::new(completion.clone(), 0.0, Duration::from_secs(1));
    let answer = composer.answer("anything", &Vec::new()).await;
    assert_eq!(answer.text, NO_CONTEXT_ANSWER);
    assert!(answer.sources.is_empty());
    assert_eq!(completion.calls(), 0);
}

#[tokio::test]
async fn completion_failure_keeps_sources() {
    let completion = Arc::new(CountingCompletion::new(Reply::Fail));
    let composer = AnswerComposer::new(completion.clone(), 0.0, Duration::from_secs(1));
    let fragments = vec![result("first"), result("second")];

    let answer = composer.answer("why?", &fragments).await;
    assert_eq!(answer.text, GENERATION_FAILED_ANSWER);
    assert_eq!(answer.sources, vec!["first".to_string(), "second".to_string()]);
    assert_eq!(answer.kind, AnswerKind::GenerationFailed);
    assert_eq!(completion.calls(), 1);
}

#[tokio::test]
async fn blank_completion_counts_as_failure() {
    let completion = Arc::new(CountingCompletion::new(Reply::Text("  \n ")));
    let composer = AnswerComposer::new(completion, 0.0, Duration::from_secs(1));
    let answer = composer.answer("why?", &vec![result("ctx")]).await;
    assert_eq!(answer.text, GENERATION_FAILED_ANSWER);
    assert_eq!(answer.sources, vec!["ctx".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn completion_timeout_counts_as_failure() {
    let completion = Arc::new(CountingCompletion::new(Reply::Stall));
    let composer = AnswerComposer::new(completion, 0.0, Duration::from_secs(5));
    let answer = composer.answer("why?", &vec![result("ctx")]).await;
    assert_eq!(answer.kind, AnswerKind::GenerationFailed);
    assert_eq!(answer.sources, vec!["ctx".to_string()]);
}

#[tokio::test]
async fn grounded_answer_uses_retrieved_context() {
    let completion =
        Arc::new(CountingCompletion::new(Reply::Text("  Tag everything. [tags.md]  ")));
    let (pipeline, _) = pipeline(Arc::new(KeywordEmbedder::default()), completion.clone());
    pipeline.ingest(&corpus(), IngestMode::Replace).await.unwrap();

    let answer = pipeline.ask("Why does tagging matter?").await.unwrap();
    assert_eq!(answer.kind, AnswerKind::Answered);
    assert_eq!(answer.text, "Tag everything. [tags.md]");
    assert!(!answer.sources.is_empty() && answer.sources.len() <= 2);
    assert!(answer.sources[0].contains("Tagging"));
    assert_eq!(completion.calls(), 1);

    let prompt = completion.last_prompt.lock().unwrap().clone().unwrap();
    assert!(prompt.contains(&answer.sources[0]));
    assert!(prompt.ends_with("Question: Why does tagging matter?\nAnswer:"));
    assert_eq!(*completion.last_temperature.lock().unwrap(), Some(0.0));
}

#[tokio::test]
async fn retrieval_failure_becomes_canned_answer() {
    let completion = Arc::new(CountingCompletion::new(Reply::Text("unused")));
    let (pipeline, _) = pipeline(Arc::new(KeywordEmbedder::failing()), completion.clone());

    let answer = pipeline.ask("idle compute").await.unwrap();
    assert_eq!(answer.text, RETRIEVAL_FAILED_ANSWER);
    assert!(answer.sources.is_empty());
    assert_eq!(answer.kind, AnswerKind::RetrievalFailed);
    assert_eq!(completion.calls(), 0);

    assert!(matches!(
        pipeline.retrieve("idle compute").await,
        Err(RagError::EmbeddingError { .. })
    ));
}

#[tokio::test]
async fn replace_and_append_modes() {
    let completion = Arc::new(CountingCompletion::new(Reply::Text("ok")));
    let (pipeline, index) = pipeline(Arc::new(KeywordEmbedder::default()), completion);

    let first = pipeline.ingest(&corpus(), IngestMode::Replace).await.unwrap();
    assert_eq!(first.documents, 3);
    assert_eq!(index.len().await, first.fragments);

    pipeline.ingest(&corpus(), IngestMode::Replace).await.unwrap();
    assert_eq!(index.len().await, first.fragments);

    pipeline.ingest(&corpus(), IngestMode::Append).await.unwrap();
    assert_eq!(index.len().await, first.fragments * 2);
}

#[tokio::test]
async fn long_document_is_chunked_with_defaults() {
    let completion = Arc::new(CountingCompletion::new(Reply::Text("ok")));
    let (pipeline, index) = pipeline(Arc::new(KeywordEmbedder::default()), completion);
    let report = pipeline
        .ingest(&[Document::new("a", "A".repeat(500), "test")], IngestMode::Replace)
        .await
        .unwrap();
    assert_eq!(report.fragments, 4);
    assert_eq!(index.len().await, 4);
}

#[tokio::test]
async fn configured_floor_filters_weak_matches() {
    let build = |config: RagConfig| {
        RagPipeline::builder()
            .config(config)
            .embedding_provider(Arc::new(KeywordEmbedder::default()))
            .vector_index(Arc::new(InMemoryVectorIndex::new(VOCABULARY.len() + 1)))
            .completion_provider(Arc::new(CountingCompletion::new(Reply::Text("ok"))))
            .build()
            .unwrap()
    };

    let open = build(RagConfig::builder().top_k(3).build().unwrap());
    open.ingest(&corpus(), IngestMode::Replace).await.unwrap();
    assert_eq!(open.retrieve("tagging").await.unwrap().len(), 3);

    let strict = build(RagConfig::builder().top_k(3).similarity_floor(0.9).build().unwrap());
    strict.ingest(&corpus(), IngestMode::Replace).await.unwrap();
    let results = strict.retrieve("tagging").await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].fragment.document_id, "tags.md");
    assert!(results[0].score >= 0.9);

    let answer = strict.ask("budget spot").await.unwrap();
    assert_eq!(answer.kind, AnswerKind::NoContext);
}

#[tokio::test]
async fn malformed_batch_embeddings_abort_ingestion() {
    let mut non_finite = vec![0.5; VOCABULARY.len() + 1];
    non_finite[0] = f32::INFINITY;

    for vector in [vec![1.0, 0.0], Vec::new(), non_finite] {
        let index = Arc::new(InMemoryVectorIndex::new(VOCABULARY.len() + 1));
        let pipeline = RagPipeline::builder()
            .embedding_provider(Arc::new(ConstantBatchEmbedder { vector }))
            .vector_index(index.clone())
            .completion_provider(Arc::new(CountingCompletion::new(Reply::Text("ok"))))
            .build()
            .unwrap();

        let err = pipeline.ingest(&corpus(), IngestMode::Append).await.unwrap_err();
        assert!(matches!(err, RagError::EmbeddingError { .. }), "{err}");
        assert!(index.is_empty().await);
    }
}

#[tokio::test]
async fn builder_rejects_mismatched_dimensions() {
    let result = RagPipeline::builder()
        .embedding_provider(Arc::new(KeywordEmbedder::default()))
        .vector_index(Arc::new(InMemoryVectorIndex::new(3)))
        .completion_provider(Arc::new(CountingCompletion::new(Reply::Text("ok"))))
        .build();
    assert!(matches!(result, Err(RagError::ConfigError(_))));

    let missing = RagPipeline::builder()
        .embedding_provider(Arc::new(KeywordEmbedder::default()))
        .build();
    assert!(matches!(missing, Err(RagError::ConfigError(_))));
}

#[tokio::test]
async fn evaluation_scores_each_case() {
    let completion = Arc::new(CountingCompletion::new(Reply::Text(
        "Tagging helps allocate costs and manage resources effectively.",
    )));
    let (pipeline, _) = pipeline(Arc::new(KeywordEmbedder::default()), completion);
    pipeline.ingest(&corpus(), IngestMode::Replace).await.unwrap();

    let cases = vec![
        EvalCase::new(
            "Why is tagging important?",
            "Tagging helps allocate costs and manage resources effectively.",
        ),
        EvalCase::new("Which budget tool?", "quarterly forecasting"),
    ];
    let report = evaluate(&pipeline, &cases, 3).await.unwrap();
    assert_eq!(report.rows.len(), 2);
    assert_eq!(report.rows[0].recall_at_k, 1);
    assert_eq!(report.rows[0].subjective_score, 5);
    assert_eq!(report.rows[1].subjective_score, 1);
    assert!((report.average_score - 3.0).abs() < 1e-9);
}
