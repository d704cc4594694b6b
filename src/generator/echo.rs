use anyhow::Result;
use async_trait::async_trait;

use super::Generator;
use crate::prompts::RenderedRequest;

/// Hands the rendered request straight back. Useful for checking what a
/// template renders to without calling any service.
pub struct EchoGenerator;

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(&self, request: &RenderedRequest) -> Result<String> {
        Ok(request.as_str().to_string())
    }
}
