//! Keyword-based retrieval and answer evaluation.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::pipeline::RagPipeline;

/// A question with its reference answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvalCase {
    pub question: String,
    /// Reference answer used for both recall and scoring.
    pub ground_truth: String,
}

impl EvalCase {
    pub fn new(question: impl Into<String>, ground_truth: impl Into<String>) -> Self {
        Self { question: question.into(), ground_truth: ground_truth.into() }
    }
}

/// Outcome for one [`EvalCase`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvalRow {
    pub question: String,
    pub ground_truth: String,
    /// The pipeline's answer text, canned replies included.
    pub generated_answer: String,
    /// Number of fragments the answer drew on.
    pub retrieved_count: usize,
    /// 1 if a top-k fragment shares a word with the reference, else 0.
    pub recall_at_k: u8,
    /// 5, 3, or 1; see [`subjective_score`].
    pub subjective_score: u8,
}

/// Per-case rows plus averages across the run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvalReport {
    /// Cutoff used for recall.
    pub k: usize,
    /// One row per case, in input order.
    pub rows: Vec<EvalRow>,
    /// Mean of `recall_at_k`, 0.0 for an empty run.
    pub average_recall: f64,
    /// Mean of `subjective_score`, 0.0 for an empty run.
    pub average_score: f64,
}

/// 1 if any of the first `k` retrieved texts contains a word of
/// `ground_truth` (case-insensitive), otherwise 0.
pub fn recall_at_k(retrieved: &[String], ground_truth: &str, k: usize) -> u8 {
    let words: Vec<String> = ground_truth.split_whitespace().map(str::to_lowercase).collect();
    let hit = retrieved.iter().take(k).any(|text| {
        let text = text.to_lowercase();
        words.iter().any(|word| text.contains(word.as_str()))
    });
    u8::from(hit)
}

/// Score an answer 5 (contains the whole reference), 3 (shares a word with
/// it), or 1 (unrelated).
pub fn subjective_score(answer: &str, ground_truth: &str) -> u8 {
    let answer = answer.to_lowercase();
    let truth = ground_truth.to_lowercase();
    if answer.contains(&truth) {
        5
    } else if truth.split_whitespace().any(|word| answer.contains(word)) {
        3
    } else {
        1
    }
}

/// Ask every case through `pipeline` and score the results.
///
/// # Errors
///
/// Only fails if a case has a blank question.
pub async fn evaluate(pipeline: &RagPipeline, cases: &[EvalCase], k: usize) -> Result<EvalReport> {
    let mut rows = Vec::with_capacity(cases.len());
    for case in cases {
        let answer = pipeline.ask(&case.question).await?;
        let recall = recall_at_k(&answer.sources, &case.ground_truth, k);
        let score = subjective_score(&answer.text, &case.ground_truth);
        if recall == 0 {
            warn!(question = %case.question, "no relevant fragment in top-k");
        }
        rows.push(EvalRow {
            question: case.question.clone(),
            ground_truth: case.ground_truth.clone(),
            generated_answer: answer.text,
            retrieved_count: answer.sources.len(),
            recall_at_k: recall,
            subjective_score: score,
        });
    }

    let (average_recall, average_score) = if rows.is_empty() {
        (0.0, 0.0)
    } else {
        let n = rows.len() as f64;
        (
            rows.iter().map(|r| f64::from(r.recall_at_k)).sum::<f64>() / n,
            rows.iter().map(|r| f64::from(r.subjective_score)).sum::<f64>() / n,
        )
    };

    info!(case_count = rows.len(), k, average_recall, average_score, "evaluation complete");
    Ok(EvalReport { k, rows, average_recall, average_score })
}

/// The built-in FinOps question set.
pub fn default_cases() -> Vec<EvalCase> {
    [
        ("What is FinOps?", "FinOps is a set of practices to manage cloud costs."),
        (
            "How can we optimize AWS EC2 usage?",
            "Use rightsizing, reserved instances, and spot instances.",
        ),
        ("What is a common FinOps KPI?", "Cost per workload, cost savings, utilization rate."),
        ("How do you track cloud spend?", "By using tagging, reporting, and dashboards."),
        ("Best way to reduce S3 costs?", "Use lifecycle policies and storage class optimization."),
        (
            "What is a reserved instance?",
            "A reserved instance is a pre-paid compute resource offering discount over \
             on-demand pricing.",
        ),
        (
            "How to monitor cost anomalies?",
            "Use cloud provider alerts and anomaly detection dashboards.",
        ),
        ("What is the role of a FinOps team?", "To manage cloud cost, efficiency, and governance."),
        (
            "How to estimate future cloud spend?",
            "Use historical trends, forecasting, and predictive analytics.",
        ),
        (
            "Why is tagging important?",
            "Tagging helps allocate costs and manage resources effectively.",
        ),
    ]
    .into_iter()
    .map(|(q, a)| EvalCase::new(q, a))
    .collect()
}
