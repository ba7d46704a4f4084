//! Completion provider trait for generating answers from a prompt.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that turns a prompt into generated text.
///
/// This is the `Complete(prompt, temperature) -> text` capability. The
/// answer composer pins `temperature` to the configured value (zero by
/// default) to keep answers as repeatable as the backend allows.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String>;

    /// A short name used in logs and error messages.
    fn name(&self) -> &str {
        "completion"
    }
}
