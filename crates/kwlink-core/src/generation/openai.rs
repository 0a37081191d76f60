use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{error_for_response, GenerationClient, GenerationError, GenerationResult, RetryPolicy};
use crate::http::HttpConfig;

/// OpenAI-compatible chat completion services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatFlavor {
    OpenAi,
    /// OpenAI with the built-in web search tool enabled
    OpenAiWebSearch,
    Groq,
}

impl ChatFlavor {
    #[must_use]
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi | Self::OpenAiWebSearch => "https://api.openai.com/v1",
            Self::Groq => "https://api.groq.com/openai/v1",
        }
    }

    #[must_use]
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::OpenAi | Self::OpenAiWebSearch => "OPENAI_API_KEY",
            Self::Groq => "GROQ_API_KEY",
        }
    }
}

/// Client for `POST {base_url}/chat/completions`.
pub struct ChatCompletionsClient {
    client: Client,
    flavor: ChatFlavor,
    api_key: String,
    model: String,
    base_url: String,
    retry: RetryPolicy,
}

impl ChatCompletionsClient {
    pub fn new(
        flavor: ChatFlavor,
        api_key: impl Into<String>,
        model: impl Into<String>,
        http: &HttpConfig,
    ) -> GenerationResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(GenerationError::Config(format!(
                "missing API key (set {})",
                flavor.api_key_env()
            )));
        }

        Ok(Self {
            client: http.build_client()?,
            flavor,
            api_key,
            model: model.into(),
            base_url: flavor.default_base_url().to_string(),
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

    pub fn flavor(&self) -> ChatFlavor {
        self.flavor
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn request_body(&self, system_instruction: &str, user_prompt: &str) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_instruction},
                {"role": "user", "content": user_prompt},
            ],
        });

        if self.flavor == ChatFlavor::OpenAiWebSearch {
            body["web_search_options"] = json!({});
        }

        body
    }

    async fn send_once(&self, body: &Value) -> GenerationResult<String> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
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
impl GenerationClient for ChatCompletionsClient {
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

/// Text of the first choice.
fn extract_reply(data: &Value) -> GenerationResult<String> {
    let choice = data
        .pointer("/choices/0/message")
        .ok_or_else(|| GenerationError::Decode("response has no choices".into()))?;

    match choice.get("content") {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(Value::Null) | None => Err(GenerationError::EmptyReply),
        Some(other) => Err(GenerationError::Decode(format!(
            "unexpected message content: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(flavor: ChatFlavor) -> ChatCompletionsClient {
        ChatCompletionsClient::new(flavor, "sk-test", "gpt-4o-mini", &HttpConfig::default())
            .unwrap()
    }

    #[test]
    fn test_request_body_has_system_and_user_messages() {
        let body = client(ChatFlavor::OpenAi).request_body("be terse", "horse?");

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "be terse");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "horse?");
        assert!(body.get("web_search_options").is_none());
    }

    #[test]
    fn test_web_search_flavor_enables_tool() {
        let body = client(ChatFlavor::OpenAiWebSearch).request_body("s", "u");

        assert_eq!(body["web_search_options"], json!({}));
    }

    #[test]
    fn test_endpoints_per_flavor() {
        assert_eq!(
            client(ChatFlavor::OpenAi).endpoint(),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            client(ChatFlavor::Groq).endpoint(),
            "https://api.groq.com/openai/v1/chat/completions"
        );
        assert_eq!(
            client(ChatFlavor::OpenAi)
                .with_base_url("http://localhost:8000/v1/")
                .endpoint(),
            "http://localhost:8000/v1/chat/completions"
        );
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let result =
            ChatCompletionsClient::new(ChatFlavor::Groq, "  ", "llama", &HttpConfig::default());

        match result {
            Err(GenerationError::Config(msg)) => assert!(msg.contains("GROQ_API_KEY")),
            _ => panic!("expected config error"),
        }
    }

    #[test]
    fn test_extract_reply() {
        let data = json!({
            "choices": [{"message": {"role": "assistant", "content": "literary life, literature"}}]
        });

        assert_eq!(extract_reply(&data).unwrap(), "literary life, literature");
    }

    #[test]
    fn test_extract_reply_null_content() {
        let data = json!({"choices": [{"message": {"role": "assistant", "content": null}}]});

        assert!(matches!(
            extract_reply(&data),
            Err(GenerationError::EmptyReply)
        ));
    }

    #[test]
    fn test_extract_reply_without_choices() {
        let data = json!({"choices": []});

        assert!(matches!(
            extract_reply(&data),
            Err(GenerationError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_service_fails_after_one_attempt() {
        let client = client(ChatFlavor::OpenAi)
            .with_base_url("http://127.0.0.1:9/v1")
            .with_retry_policy(RetryPolicy::no_retry());

        let result = client.generate("s", "u").await;

        assert!(matches!(
            result,
            Err(GenerationError::RetriesExhausted { attempts: 1, .. })
        ));
    }
}
