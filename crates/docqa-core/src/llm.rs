//! Language-model boundary.
//!
//! The question rewriter and the answer composer both call
//! [`LanguageModel::complete`] once per use. Implementations are expected
//! to sample deterministically (temperature 0) and to apply their own
//! request timeout.

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-3.5-turbo"`).
    fn model_name(&self) -> &str;

    /// Single-shot completion of `prompt`. Not retried on failure.
    async fn complete(&self, prompt: &str) -> Result<String>;
}
