//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`FixedSizeChunker`]: fixed character windows with configurable overlap
//! - [`RecursiveChunker`]: windows that cut at paragraph, sentence, or word boundaries
//!
//! Sizes are counted in characters (Unicode scalar values), never bytes, so
//! multi-byte text is never split inside a code point.

use std::sync::Arc;

use crate::config::{ChunkStrategy, RagConfig};
use crate::document::{Document, Fragment};

/// A strategy for splitting documents into fragments.
///
/// Implementations produce [`Fragment`]s with text but no embeddings.
/// Embeddings are attached later by the pipeline.
pub trait Chunker: Send + Sync {
    /// Split a document into fragments.
    ///
    /// Returns an empty `Vec` if the document has empty content.
    /// Each returned fragment has an empty embedding vector.
    fn chunk(&self, document: &Document) -> Vec<Fragment>;
}

/// Build the chunker selected by `config.chunk_strategy`.
pub fn chunker_for(config: &RagConfig) -> Arc<dyn Chunker> {
    match config.chunk_strategy {
        ChunkStrategy::Fixed => {
            Arc::new(FixedSizeChunker::new(config.chunk_size, config.chunk_overlap))
        }
        ChunkStrategy::Recursive => {
            Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap))
        }
    }
}

/// Splits text into fixed-size windows by character count with configurable overlap.
///
/// Fragment `i` starts at character `i * (chunk_size - chunk_overlap)` and spans
/// `min(chunk_size, remaining)` characters, so a text of length `L` yields
/// `ceil(L / (chunk_size - chunk_overlap))` fragments. Fragment IDs are
/// `{document_id}#{index}`.
///
/// # Example
///
/// ```rust,ignore
/// use finops_rag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(200, 50);
/// let fragments = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per fragment
    /// * `chunk_overlap`: number of overlapping characters between consecutive fragments
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Fragment> {
        let offsets = char_offsets(&document.content);
        let spans = fixed_spans(offsets.len() - 1, self.chunk_size, self.chunk_overlap);
        build_fragments(document, &offsets, spans)
    }
}

/// Splits text into windows that prefer natural boundaries.
///
/// Each window is at most `chunk_size` characters. Within the back half of a
/// window the chunker looks for the last paragraph break (`\n\n`), then the
/// last sentence end (`. `, `! `, `? `, `\n`), then the last space, and cuts
/// there; if none is found it cuts at exactly `chunk_size`. The next window
/// starts `chunk_overlap` characters before the cut.
///
/// # Example
///
/// ```rust,ignore
/// use finops_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(512, 100);
/// let fragments = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per fragment
    /// * `chunk_overlap`: number of overlapping characters between consecutive fragments
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

/// Separators tried in priority order when looking for a cut point.
const SEPARATORS: [&str; 6] = ["\n\n", ". ", "! ", "? ", "\n", " "];

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Fragment> {
        let chars: Vec<char> = document.content.chars().collect();
        let offsets = char_offsets(&document.content);
        let spans = boundary_spans(&chars, self.chunk_size, self.chunk_overlap);
        build_fragments(document, &offsets, spans)
    }
}

/// Byte offset of every character start, plus the total byte length.
fn char_offsets(text: &str) -> Vec<usize> {
    text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect()
}

/// Character spans `[start, end)` for fixed-size windows.
fn fixed_spans(len: usize, chunk_size: usize, chunk_overlap: usize) -> Vec<(usize, usize)> {
    let chunk_size = chunk_size.max(1);
    let step = chunk_size.saturating_sub(chunk_overlap).max(1);
    let mut spans = Vec::new();
    let mut start = 0;
    while start < len {
        spans.push((start, (start + chunk_size).min(len)));
        start += step;
    }
    spans
}

/// Character spans `[start, end)` that end on the best boundary in each window.
fn boundary_spans(chars: &[char], chunk_size: usize, chunk_overlap: usize) -> Vec<(usize, usize)> {
    let len = chars.len();
    let chunk_size = chunk_size.max(1);
    let mut spans = Vec::new();
    let mut start = 0;

    while start < len {
        let hard_end = (start + chunk_size).min(len);
        let end = if hard_end == len {
            len
        } else {
            let earliest = start + (chunk_size / 2).max(1);
            find_cut(chars, earliest, hard_end).unwrap_or(hard_end)
        };
        spans.push((start, end));
        if end == len {
            break;
        }
        start = end.saturating_sub(chunk_overlap).max(start + 1);
    }
    spans
}

/// Last position in `earliest..=latest` directly after a separator, trying
/// separators in priority order.
fn find_cut(chars: &[char], earliest: usize, latest: usize) -> Option<usize> {
    for separator in SEPARATORS {
        let sep: Vec<char> = separator.chars().collect();
        let found = (earliest..=latest)
            .rev()
            .find(|&pos| pos >= sep.len() && chars[pos - sep.len()..pos] == sep[..]);
        if found.is_some() {
            return found;
        }
    }
    None
}

fn build_fragments(
    document: &Document,
    offsets: &[usize],
    spans: Vec<(usize, usize)>,
) -> Vec<Fragment> {
    spans
        .into_iter()
        .enumerate()
        .map(|(i, (start, end))| Fragment {
            id: format!("{}#{i}", document.id),
            document_id: document.id.clone(),
            text: document.content[offsets[start]..offsets[end]].to_string(),
            embedding: Vec::new(),
        })
        .collect()
}
