use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::generation::{
    AnthropicClient, ChatCompletionsClient, ChatFlavor, GenerationClient, RetryPolicy,
};
use crate::http::HttpConfig;
use crate::knowledge::{WikidataClient, DEFAULT_WIKIDATA_ENDPOINT};
use crate::pipeline::{EntityExtractionPipeline, SelectionMode, DEFAULT_SEARCH_LIMIT};

/// Generative model service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    OpenAi,
    OpenAiWebSearch,
    Groq,
    Anthropic,
}

impl Provider {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::OpenAiWebSearch => "openai_web_search",
            Self::Groq => "groq",
            Self::Anthropic => "anthropic",
        }
    }

    #[must_use]
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::OpenAi | Self::OpenAiWebSearch => ChatFlavor::OpenAi.api_key_env(),
            Self::Groq => ChatFlavor::Groq.api_key_env(),
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    #[must_use]
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::OpenAiWebSearch => "gpt-4o-mini-search-preview",
            Self::Groq => "llama-3.3-70b-versatile",
            Self::Anthropic => "claude-3-5-haiku-latest",
        }
    }

    const fn chat_flavor(self) -> Option<ChatFlavor> {
        match self {
            Self::OpenAi => Some(ChatFlavor::OpenAi),
            Self::OpenAiWebSearch => Some(ChatFlavor::OpenAiWebSearch),
            Self::Groq => Some(ChatFlavor::Groq),
            Self::Anthropic => None,
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(Self::OpenAi),
            "openai_web_search" => Ok(Self::OpenAiWebSearch),
            "groq" => Ok(Self::Groq),
            "anthropic" => Ok(Self::Anthropic),
            _ => Err(ConfigError::UnknownProvider(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub provider: Provider,
    /// Model identifier (provider default when unset)
    pub model: Option<String>,
    /// API key (read from the provider's environment variable when unset)
    pub api_key: Option<String>,
    /// Override of the provider's API base URL
    pub base_url: Option<String>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            provider: Provider::OpenAi,
            model: None,
            api_key: None,
            base_url: None,
        }
    }
}

impl GenerationSettings {
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    pub fn api_key(&self) -> Result<String, ConfigError> {
        if let Some(ref key) = self.api_key {
            return Ok(key.clone());
        }
        let var = self.provider.api_key_env();
        std::env::var(var).map_err(|_| ConfigError::MissingApiKey(var))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseSettings {
    /// Label-search endpoint
    pub endpoint: String,
    /// Language of the labels searched
    pub language: String,
    /// Candidates kept per searched name
    pub search_limit: usize,
}

impl Default for KnowledgeBaseSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_WIKIDATA_ENDPOINT.to_string(),
            language: "en".to_string(),
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Entities returned per keyword
    pub num_entities: usize,
    /// Upper bound on candidate names asked from the model
    pub num_generated_names: usize,
    /// Structured unless a config asks for delimited URIs
    pub selection_mode: SelectionMode,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            num_entities: 1,
            num_generated_names: 10,
            selection_mode: SelectionMode::Structured,
        }
    }
}

/// Full resolver configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub generation: GenerationSettings,
    pub knowledge_base: KnowledgeBaseSettings,
    pub pipeline: PipelineSettings,
    pub retry: RetryPolicy,
    pub http: HttpConfig,
}

impl ResolverConfig {
    /// `<config dir>/kwlink/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("kwlink").join("config.json"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with `KWLINK_*` environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `KWLINK_PROVIDER`, `KWLINK_MODEL` and `KWLINK_WIKIDATA_URL`.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(provider) = lookup("KWLINK_PROVIDER") {
            self.generation.provider = provider.parse()?;
        }
        if let Some(model) = lookup("KWLINK_MODEL") {
            self.generation.model = Some(model);
        }
        if let Some(endpoint) = lookup("KWLINK_WIKIDATA_URL") {
            self.knowledge_base.endpoint = endpoint;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.knowledge_base.search_limit == 0 {
            return Err(ConfigError::Invalid("knowledge_base.search_limit must be positive".into()));
        }
        if self.pipeline.num_entities == 0 {
            return Err(ConfigError::Invalid("pipeline.num_entities must be positive".into()));
        }
        if self.pipeline.num_generated_names == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.num_generated_names must be positive".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be positive".into()));
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(ConfigError::Invalid(
                "retry.max_delay_ms must not be below retry.base_delay_ms".into(),
            ));
        }
        url::Url::parse(&self.knowledge_base.endpoint)?;
        if let Some(ref base_url) = self.generation.base_url {
            url::Url::parse(base_url)?;
        }
        Ok(())
    }

    /// Construct the configured model client.
    pub fn generation_client(&self) -> crate::Result<Box<dyn GenerationClient>> {
        let settings = &self.generation;
        let api_key = settings.api_key()?;
        let model = settings.model();

        let client: Box<dyn GenerationClient> = match settings.provider.chat_flavor() {
            Some(flavor) => {
                let mut client = ChatCompletionsClient::new(flavor, api_key, model, &self.http)?
                    .with_retry_policy(self.retry.clone());
                if let Some(ref base_url) = settings.base_url {
                    client = client.with_base_url(base_url.as_str());
                }
                Box::new(client)
            }
            None => {
                let mut client = AnthropicClient::new(api_key, model, &self.http)?
                    .with_retry_policy(self.retry.clone());
                if let Some(ref base_url) = settings.base_url {
                    client = client.with_base_url(base_url.as_str());
                }
                Box::new(client)
            }
        };

        Ok(client)
    }

    /// Construct a pipeline wired to the configured services.
    pub fn build_pipeline(&self) -> crate::Result<EntityExtractionPipeline> {
        let knowledge_base = WikidataClient::with_endpoint(&self.http, &self.knowledge_base.endpoint)?;

        Ok(
            EntityExtractionPipeline::new(self.generation_client()?, Box::new(knowledge_base))
                .with_search_language(self.knowledge_base.language.clone())
                .with_search_limit(self.knowledge_base.search_limit)
                .with_selection_mode(self.pipeline.selection_mode),
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown provider: {0} (expected openai, openai_web_search, groq or anthropic)")]
    UnknownProvider(String),
    #[error("No API key configured; set {0}")]
    MissingApiKey(&'static str),
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("{0}")]
    Invalid(String),
}
