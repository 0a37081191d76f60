mod wikidata;

pub use wikidata::{WikidataClient, DEFAULT_WIKIDATA_ENDPOINT};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::similarity::similarity;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Search endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Could not decode search response: {0}")]
    Decode(String),
    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}

pub type RetrievalResult<T> = Result<T, RetrievalError>;

/// A knowledge-base entry proposed for a search term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KbCandidate {
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub uri: String,
    /// Lexical similarity between the search term and `label`
    pub score: f64,
}

/// One hit as returned by a label-search endpoint, before scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub label: String,
    pub description: Option<String>,
    pub uri: String,
}

/// A knowledge base that can be searched by label.
#[async_trait::async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Candidates for `term`, best first, at most `limit` of them.
    async fn search(
        &self,
        term: &str,
        language: &str,
        limit: usize,
    ) -> RetrievalResult<Vec<KbCandidate>>;

    async fn best_match(&self, term: &str, language: &str) -> RetrievalResult<Option<KbCandidate>> {
        Ok(self.search(term, language, 1).await?.into_iter().next())
    }
}

/// Score hits against `term`, order best first and keep `limit`.
///
/// The sort is stable, so equal scores keep the endpoint's ranking.
pub fn rank_hits(term: &str, hits: Vec<SearchHit>, limit: usize) -> Vec<KbCandidate> {
    let mut candidates: Vec<KbCandidate> = hits
        .into_iter()
        .map(|hit| KbCandidate {
            score: similarity(term, &hit.label),
            label: hit.label,
            description: hit.description.unwrap_or_default(),
            uri: hit.uri,
        })
        .collect();

    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    candidates.truncate(limit);
    candidates
}

/// Render a candidate pool as `label; description; uri` lines.
pub fn format_candidates(candidates: &[KbCandidate]) -> String {
    candidates
        .iter()
        .map(|c| format!("{}; {}; {}\n", c.label, c.description, c.uri))
        .collect()
}
