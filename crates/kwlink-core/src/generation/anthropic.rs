use reqwest::Client;
use serde_json::{json, Value};

use super::{error_for_response, GenerationClient, GenerationError, GenerationResult, RetryPolicy};
use crate::http::HttpConfig;

pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const ANTHROPIC_API_VERSION: &str = "2023-06-01";

const MAX_TOKENS: u32 = 4000;

/// Client for the Anthropic Messages API.
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    retry: RetryPolicy,
}

impl AnthropicClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        http: &HttpConfig,
    ) -> GenerationResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(GenerationError::Config(
                "missing API key (set ANTHROPIC_API_KEY)".into(),
            ));
        }

        Ok(Self {
            client: http.build_client()?,
            api_key,
            model: model.into(),
            base_url: DEFAULT_ANTHROPIC_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn request_body(&self, system_instruction: &str, user_prompt: &str) -> Value {
        json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "system": system_instruction,
            "messages": [{"role": "user", "content": user_prompt}],
        })
    }

    async fn send_once(&self, body: &Value) -> GenerationResult<String> {
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_for_response(response).await);
        }

        let data: Value = response.json().await?;
        extract_reply(&data)
    }
}

#[async_trait::async_trait]
impl GenerationClient for AnthropicClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        system_instruction: &str,
        user_prompt: &str,
    ) -> GenerationResult<String> {
        let body = self.request_body(system_instruction, user_prompt);
        self.retry.run(|| self.send_once(&body)).await
    }
}

/// Text of the first `text` content block.
fn extract_reply(data: &Value) -> GenerationResult<String> {
    let blocks = data
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| GenerationError::Decode("response has no content".into()))?;

    blocks
        .iter()
        .find(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .and_then(|block| block.get("text"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(GenerationError::EmptyReply)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> AnthropicClient {
        AnthropicClient::new("key", "claude-3-5-haiku-latest", &HttpConfig::default()).unwrap()
    }

    #[test]
    fn test_request_body_uses_top_level_system() {
        let body = client().request_body("be terse", "horse?");

        assert_eq!(body["model"], "claude-3-5-haiku-latest");
        assert_eq!(body["max_tokens"], 4000);
        assert_eq!(body["system"], "be terse");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "horse?");
    }

    #[test]
    fn test_extract_reply_first_text_block() {
        let data = json!({
            "content": [
                {"type": "tool_use", "id": "t1", "name": "x", "input": {}},
                {"type": "text", "text": "http://www.wikidata.org/entity/Q726"}
            ],
            "stop_reason": "end_turn"
        });

        assert_eq!(
            extract_reply(&data).unwrap(),
            "http://www.wikidata.org/entity/Q726"
        );
    }

    #[test]
    fn test_extract_reply_without_text() {
        let data = json!({"content": []});

        assert!(matches!(
            extract_reply(&data),
            Err(GenerationError::EmptyReply)
        ));
    }

    #[test]
    fn test_extract_reply_error_shape() {
        let data = json!({"type": "error", "error": {"type": "overloaded_error"}});

        assert!(matches!(
            extract_reply(&data),
            Err(GenerationError::Decode(_))
        ));
    }

    #[test]
    fn test_missing_api_key() {
        let result = AnthropicClient::new("", "claude", &HttpConfig::default());

        assert!(matches!(result, Err(GenerationError::Config(_))));
    }
}
