use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Generation failed: {0}")]
    Generation(#[from] crate::generation::GenerationError),

    #[error("Knowledge base search failed: {0}")]
    Retrieval(#[from] crate::knowledge::RetrievalError),

    #[error("Model reply did not match the expected schema: {0}")]
    Schema(#[from] crate::schema::SchemaError),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
