mod anthropic;
mod openai;
mod retry;

pub use anthropic::{AnthropicClient, ANTHROPIC_API_VERSION, DEFAULT_ANTHROPIC_BASE_URL};
pub use openai::{ChatCompletionsClient, ChatFlavor};
pub use retry::{Jitter, RetryPolicy};

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Model API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Rate limited")]
    RateLimited { retry_after: Option<Duration> },
    #[error("Model reply carried no text")]
    EmptyReply,
    #[error("Could not decode model reply: {0}")]
    Decode(String),
    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<GenerationError>,
    },
    #[error("Invalid client configuration: {0}")]
    Config(String),
}

impl GenerationError {
    /// Whether another attempt might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => !e.is_builder() && !e.is_decode(),
            Self::Status { status, .. } => *status == 408 || *status >= 500,
            Self::RateLimited { .. } => true,
            Self::EmptyReply
            | Self::Decode(_)
            | Self::RetriesExhausted { .. }
            | Self::Config(_) => false,
        }
    }
}

pub type GenerationResult<T> = Result<T, GenerationError>;

/// A generative model reachable through one request/response round trip.
///
/// Replies are returned as raw text. Transient failures are retried inside
/// the client according to its [`RetryPolicy`].
#[async_trait::async_trait]
pub trait GenerationClient: Send + Sync {
    /// Model identifier sent with each request.
    fn model(&self) -> &str;

    async fn generate(
        &self,
        system_instruction: &str,
        user_prompt: &str,
    ) -> GenerationResult<String>;
}

/// Parse a `Retry-After` header given in whole seconds.
pub(crate) fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Map a non-success response to the matching error.
pub(crate) async fn error_for_response(response: reqwest::Response) -> GenerationError {
    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return GenerationError::RateLimited {
            retry_after: retry_after(response.headers()),
        };
    }

    let body = response.text().await.unwrap_or_default();
    GenerationError::Status {
        status: status.as_u16(),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};

    #[test]
    fn test_transient_classification() {
        assert!(GenerationError::RateLimited { retry_after: None }.is_transient());
        assert!(GenerationError::Status {
            status: 503,
            body: String::new()
        }
        .is_transient());
        assert!(GenerationError::Status {
            status: 529,
            body: "overloaded".into()
        }
        .is_transient());
        assert!(GenerationError::Status {
            status: 408,
            body: String::new()
        }
        .is_transient());

        assert!(!GenerationError::Status {
            status: 401,
            body: "bad key".into()
        }
        .is_transient());
        assert!(!GenerationError::Status {
            status: 400,
            body: String::new()
        }
        .is_transient());
        assert!(!GenerationError::EmptyReply.is_transient());
        assert!(!GenerationError::Decode("eof".into()).is_transient());
    }

    #[test]
    fn test_exhausted_is_not_transient() {
        let err = GenerationError::RetriesExhausted {
            attempts: 6,
            last: Box::new(GenerationError::RateLimited { retry_after: None }),
        };

        assert!(!err.is_transient());
        assert!(err.to_string().contains("6 attempts"));
    }

    #[test]
    fn test_retry_after_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(12)));

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after(&headers), None);
    }
}
