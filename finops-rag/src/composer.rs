//! Grounded prompt assembly and answer generation.
//!
//! The composer never fails: every path through [`AnswerComposer::answer`]
//! ends in an [`Answer`], with canned text standing in when there is nothing
//! to ground on or generation breaks.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::completion::CompletionProvider;
use crate::document::{Answer, AnswerKind, RetrievalResult};
use crate::error::{RagError, Result};

/// Returned when retrieval found nothing to ground on.
pub const NO_CONTEXT_ANSWER: &str = "No relevant information found.";
/// Returned when the completion service fails or replies with blank text.
pub const GENERATION_FAILED_ANSWER: &str = "Error generating answer.";
/// Returned when the question could not be embedded or the index could not be searched.
pub const RETRIEVAL_FAILED_ANSWER: &str = "Internal RAG error.";

/// Fixed instruction placed at the top of every prompt.
pub const SYSTEM_INSTRUCTION: &str = "You are an AI FinOps assistant. \
     Answer questions using ONLY the provided context.\nAlways cite sources.";

/// Example question/answer pairs that set the expected answer style.
pub const FEW_SHOT_EXAMPLES: &[(&str, &str)] = &[
    (
        "What was my monthly cost by service for May 2023?",
        "Use `kpis.monthly_cost_by_service(month='2023-05')`.",
    ),
    (
        "Which resources are idle and how much can I save?",
        "Use `recommendations.find_idle_resources(month)`.",
    ),
    (
        "What is tagging and why is it important?",
        "Tagging categorizes resources by team/project/environment for cost visibility.",
    ),
];

/// Build the full prompt for `question` grounded on `fragments`.
pub fn build_prompt(question: &str, fragments: &RetrievalResult) -> String {
    let context = fragments
        .iter()
        .map(|result| result.fragment.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut prompt = String::with_capacity(context.len() + question.len() + 1024);
    prompt.push_str(SYSTEM_INSTRUCTION);
    prompt.push_str("\n<context>\n");
    prompt.push_str(&context);
    prompt.push_str("\n</context>\n\n### Examples ###\n");
    for (q, a) in FEW_SHOT_EXAMPLES {
        prompt.push_str(&format!("Question: {q}\nAnswer: {a}\n"));
    }
    prompt.push_str(&format!("\nQuestion: {question}\nAnswer:"));
    prompt
}

/// Turns retrieved fragments and a question into an [`Answer`].
pub struct AnswerComposer {
    completion: Arc<dyn CompletionProvider>,
    temperature: f32,
    timeout: Duration,
}

impl AnswerComposer {
    /// Create a composer that samples at `temperature` and bounds each
    /// completion call by `timeout`.
    pub fn new(
        completion: Arc<dyn CompletionProvider>,
        temperature: f32,
        timeout: Duration,
    ) -> Self {
        Self { completion, temperature, timeout }
    }

    /// Answer `question` from `fragments`.
    ///
    /// Empty `fragments` short-circuit to [`NO_CONTEXT_ANSWER`] without
    /// calling the completion service. A failed or blank completion yields
    /// [`GENERATION_FAILED_ANSWER`] with the fragment texts as sources.
    pub async fn answer(&self, question: &str, fragments: &RetrievalResult) -> Answer {
        if fragments.is_empty() {
            info!("no context retrieved, skipping completion");
            return Answer {
                text: NO_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
                kind: AnswerKind::NoContext,
            };
        }

        let sources: Vec<String> = fragments.iter().map(|r| r.fragment.text.clone()).collect();
        let prompt = build_prompt(question, fragments);
        debug!(
            prompt_chars = prompt.chars().count(),
            context_count = sources.len(),
            "composed prompt"
        );

        match self.complete(&prompt).await {
            Ok(text) => {
                info!(source_count = sources.len(), "answer generated");
                Answer { text, sources, kind: AnswerKind::Answered }
            }
            Err(e) => {
                error!(error = %e, "completion failed");
                Answer {
                    text: GENERATION_FAILED_ANSWER.to_string(),
                    sources,
                    kind: AnswerKind::GenerationFailed,
                }
            }
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let provider = self.completion.name().to_string();
        let call = self.completion.complete(prompt, self.temperature);
        let reply = tokio::time::timeout(self.timeout, call).await.map_err(|_| {
            RagError::CompletionError {
                provider: provider.clone(),
                message: format!("timed out after {:?}", self.timeout),
            }
        })??;

        let trimmed = reply.trim();
        if trimmed.is_empty() {
            return Err(RagError::CompletionError {
                provider,
                message: "blank completion".to_string(),
            });
        }
        Ok(trimmed.to_string())
    }
}
