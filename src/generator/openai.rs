use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use serde_json::Value;

use super::Generator;
use crate::consts::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::prompts::RenderedRequest;

const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Sends rendered requests to an OpenAI-compatible chat completions API.
///
/// The rendered request is used as the request body as-is, so the prompt
/// template must already be in chat format (`messages`, optional
/// `temperature`, ...). A `model` field is added only when the template does
/// not set one.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    model: String,
    base_url: String,
    api_key: String,
}

impl OpenAiGenerator {
    pub fn new(model: Option<String>, base_url: Option<String>, api_key: String) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            client: reqwest::Client::new(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, COMPLETIONS_PATH)
    }

    fn build_body(&self, request: &RenderedRequest) -> Result<Value> {
        let mut body: Value = serde_json::from_str(request.as_str())
            .context("rendered request is not valid JSON")?;

        let Some(object) = body.as_object_mut() else {
            bail!("rendered request must be a JSON object");
        };
        object
            .entry("model")
            .or_insert_with(|| Value::String(self.model.clone()));

        Ok(body)
    }

    fn parse_response(api_resp: ApiResponse) -> Result<String> {
        let text = api_resp
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        if text.is_empty() {
            bail!("chat completions API returned empty response");
        }

        Ok(text)
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, request: &RenderedRequest) -> Result<String> {
        let body = self.build_body(request)?;

        let resp = self
            .client
            .post(self.endpoint())
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("chat completions API error ({}): {}", status, text);
        }

        let api_resp: ApiResponse = resp.json().await?;

        if let Some(usage) = &api_resp.usage {
            debug!(
                "[tokens] input: {}, output: {}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        Self::parse_response(api_resp)
    }
}

// --- API types ---

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::PromptTemplate;

    fn generator() -> OpenAiGenerator {
        OpenAiGenerator::new(None, None, "sk-test".to_string())
    }

    fn render(text: &str, task: &str) -> RenderedRequest {
        PromptTemplate::from_text(text).unwrap().render(task)
    }

    #[test]
    fn defaults_model_and_base_url() {
        let g = generator();
        assert_eq!(g.model(), DEFAULT_MODEL);
        assert_eq!(
            g.endpoint(),
            format!("{}{}", DEFAULT_BASE_URL, COMPLETIONS_PATH)
        );
    }

    #[test]
    fn trailing_slash_trimmed_from_base_url() {
        let g = OpenAiGenerator::new(None, Some("http://localhost:8080/".into()), String::new());
        assert_eq!(g.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn body_gets_default_model() {
        let request = render(
            r#"{"messages": [{"role": "user", "content": "{{ .task }}"}]}"#,
            "hello",
        );
        let body = generator().build_body(&request).unwrap();
        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["messages"][0]["content"], "hello");
    }

    #[test]
    fn body_keeps_template_model() {
        let request = render(r#"{"model": "custom", "messages": []}"#, "x");
        let body = generator().build_body(&request).unwrap();
        assert_eq!(body["model"], "custom");
    }

    #[test]
    fn body_rejects_broken_json() {
        // A payload with an unescaped quote breaks the JSON around it.
        let request = render(r#"{"task": "{{ .task }}"}"#, r#"say "hi""#);
        let err = generator().build_body(&request).unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn parse_response_takes_first_choice() {
        let resp: ApiResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "first"}},
                            {"message": {"role": "assistant", "content": "second"}}],
                "usage": {"prompt_tokens": 3, "completion_tokens": 1}}"#,
        )
        .unwrap();
        assert_eq!(OpenAiGenerator::parse_response(resp).unwrap(), "first");
    }

    #[test]
    fn parse_response_empty_content_fails() {
        let resp: ApiResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap();
        assert!(OpenAiGenerator::parse_response(resp).is_err());
    }

    #[test]
    fn parse_response_no_choices_fails() {
        let resp: ApiResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        let err = OpenAiGenerator::parse_response(resp).unwrap_err();
        assert!(err.to_string().contains("empty response"));
    }
}
