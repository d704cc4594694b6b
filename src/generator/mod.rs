pub mod echo;
pub mod mock;
pub mod openai;

use anyhow::Result;
use async_trait::async_trait;

use crate::prompts::RenderedRequest;

/// The text-generation service. Could be a hosted LLM, a dry run, or a
/// test script.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &RenderedRequest) -> Result<String>;
}
