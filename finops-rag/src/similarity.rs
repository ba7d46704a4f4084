//! Exact cosine search with optional Maximal Marginal Relevance reranking.
//!
//! MMR picks fragments one at a time, maximising
//! `λ × sim(query, candidate) − (1 − λ) × max(sim(candidate, selected))`.
//! `λ = 1.0` is plain relevance ranking, `λ = 0.0` is pure diversity.

use serde::{Deserialize, Serialize};

use crate::config::RagConfig;
use crate::document::{Fragment, SearchResult};

/// Tunables shared by every [`VectorIndex`](crate::VectorIndex) implementation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SearchParams {
    /// Fragments scoring below this cosine similarity are never returned.
    pub similarity_floor: Option<f32>,
    /// MMR relevance/diversity balance.
    pub mmr_lambda: f32,
    /// Candidate pool for MMR, as a multiple of `k`.
    pub mmr_fetch_multiplier: f32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self { similarity_floor: None, mmr_lambda: 0.5, mmr_fetch_multiplier: 2.0 }
    }
}

impl SearchParams {
    /// Size of the candidate pool fetched before MMR reranking.
    pub fn fetch_k(&self, k: usize) -> usize {
        let scaled = (k as f32 * self.mmr_fetch_multiplier).ceil() as usize;
        scaled.max(k)
    }
}

impl From<&RagConfig> for SearchParams {
    fn from(config: &RagConfig) -> Self {
        Self {
            similarity_floor: config.similarity_floor,
            mmr_lambda: config.mmr_lambda,
            mmr_fetch_multiplier: config.mmr_fetch_multiplier,
        }
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Rank `fragments` against `query` and return at most `k` results.
pub(crate) fn rank(
    fragments: &[Fragment],
    query: &[f32],
    k: usize,
    diversify: bool,
    params: &SearchParams,
) -> Vec<SearchResult> {
    if fragments.is_empty() || k == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(usize, f32)> = fragments
        .iter()
        .enumerate()
        .map(|(i, fragment)| (i, cosine_similarity(&fragment.embedding, query)))
        .filter(|(_, score)| params.similarity_floor.is_none_or(|floor| *score >= floor))
        .collect();

    // stable sort keeps insertion order among equal scores
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let picked = if diversify {
        scored.truncate(params.fetch_k(k));
        mmr_select(fragments, scored, k, params.mmr_lambda)
    } else {
        scored.truncate(k);
        scored
    };

    picked
        .into_iter()
        .map(|(i, score)| SearchResult { fragment: fragments[i].clone(), score })
        .collect()
}

/// Greedy MMR selection over relevance-sorted candidates.
fn mmr_select(
    fragments: &[Fragment],
    mut remaining: Vec<(usize, f32)>,
    k: usize,
    lambda: f32,
) -> Vec<(usize, f32)> {
    let k = k.min(remaining.len());
    let mut selected: Vec<(usize, f32)> = Vec::with_capacity(k);

    while selected.len() < k {
        let mut best_pos = 0;
        let mut best_mmr = f32::NEG_INFINITY;
        for (pos, (idx, relevance)) in remaining.iter().enumerate() {
            let redundancy = selected
                .iter()
                .map(|(chosen, _)| {
                    cosine_similarity(&fragments[*idx].embedding, &fragments[*chosen].embedding)
                })
                .fold(0.0f32, f32::max);
            let mmr = lambda * relevance - (1.0 - lambda) * redundancy;
            if mmr > best_mmr {
                best_mmr = mmr;
                best_pos = pos;
            }
        }
        selected.push(remaining.remove(best_pos));
    }

    selected
}
