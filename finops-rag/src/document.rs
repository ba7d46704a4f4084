//! Data types for documents, fragments, retrieval results, and answers.

use serde::{Deserialize, Serialize};

/// A unit of source material produced by the corpus loader.
///
/// Markdown files become one document each (`source` is the file path);
/// warehouse rows become one document each (`source` is the table name).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The full text content of the document.
    pub content: String,
    /// Where the document came from.
    pub source: String,
}

impl Document {
    /// Create a new document.
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self { id: id.into(), content: content.into(), source: source.into() }
    }
}

/// A bounded slice of a [`Document`] together with its vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fragment {
    /// Unique identifier for the fragment (`{document_id}#{index}`).
    pub id: String,
    /// The ID of the parent [`Document`]. Back-reference only.
    pub document_id: String,
    /// The text content of the fragment.
    pub text: String,
    /// The vector embedding for this fragment's text. Empty until embedded.
    pub embedding: Vec<f32>,
}

/// A retrieved [`Fragment`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved fragment.
    pub fragment: Fragment,
    /// Cosine similarity to the query (higher is more relevant).
    pub score: f32,
}

/// Relevance-ranked fragments for one query. May be empty.
pub type RetrievalResult = Vec<SearchResult>;

/// The terminal state of a question that produced an [`Answer`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKind {
    /// The completion service produced a grounded answer.
    Answered,
    /// Retrieval found nothing; completion was not invoked.
    NoContext,
    /// Retrieval succeeded but completion failed or came back blank.
    GenerationFailed,
    /// The question could not be embedded or the index could not be searched.
    RetrievalFailed,
}

/// The response to a question. Produced fresh per request, never cached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// The answer text shown to the user.
    pub text: String,
    /// Retrieved fragment texts, in rank order.
    pub sources: Vec<String>,
    /// Which terminal state produced this answer.
    pub kind: AnswerKind,
}
