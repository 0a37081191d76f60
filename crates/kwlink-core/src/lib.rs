#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod entity;
pub mod error;
pub mod eval;
pub mod generation;
pub mod http;
pub mod knowledge;
pub mod pipeline;
pub mod prompt;
pub mod schema;
pub mod similarity;

pub use config::{
    ConfigError, GenerationSettings, KnowledgeBaseSettings, PipelineSettings, Provider,
    ResolverConfig,
};
pub use entity::{Article, KeywordContext, KeywordResolution, ResolvedEntity};
pub use error::{Error, Result};
pub use generation::{
    AnthropicClient, ChatCompletionsClient, ChatFlavor, GenerationClient, GenerationError,
    GenerationResult, Jitter, RetryPolicy,
};
pub use http::HttpConfig;
pub use knowledge::{KbCandidate, KnowledgeBase, RetrievalError, RetrievalResult, WikidataClient};
pub use pipeline::{EntityExtractionPipeline, SelectionMode};
pub use schema::{parse_candidates, parse_linked_entities, parse_selection, SchemaError};
pub use similarity::similarity;
