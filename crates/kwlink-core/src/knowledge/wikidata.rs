use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::{rank_hits, KbCandidate, KnowledgeBase, RetrievalError, RetrievalResult, SearchHit};
use crate::http::HttpConfig;

pub const DEFAULT_WIKIDATA_ENDPOINT: &str = "https://www.wikidata.org/w/api.php";

/// Largest page `wbsearchentities` serves to anonymous clients.
const MAX_API_LIMIT: usize = 50;

/// Label search against the Wikidata `wbsearchentities` action.
pub struct WikidataClient {
    client: Client,
    endpoint: Url,
}

impl WikidataClient {
    pub fn new(http: &HttpConfig) -> RetrievalResult<Self> {
        Self::with_endpoint(http, DEFAULT_WIKIDATA_ENDPOINT)
    }

    pub fn with_endpoint(http: &HttpConfig, endpoint: &str) -> RetrievalResult<Self> {
        Ok(Self {
            client: http.build_client()?,
            endpoint: Url::parse(endpoint)?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl KnowledgeBase for WikidataClient {
    async fn search(
        &self,
        term: &str,
        language: &str,
        limit: usize,
    ) -> RetrievalResult<Vec<KbCandidate>> {
        let api_limit = limit.clamp(1, MAX_API_LIMIT).to_string();

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("action", "wbsearchentities"),
                ("search", term),
                ("language", language),
                ("format", "json"),
                ("limit", api_limit.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let candidates = parse_search_response(term, &body, limit)?;

        tracing::debug!(
            "Wikidata search for {:?} returned {} candidates",
            term,
            candidates.len()
        );

        Ok(candidates)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    search: Vec<RawHit>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    id: Option<String>,
    label: Option<String>,
    concepturi: Option<String>,
    description: Option<String>,
}

impl RawHit {
    fn into_search_hit(self) -> Option<SearchHit> {
        let uri = match (self.concepturi, self.id.as_deref()) {
            (Some(uri), _) => uri,
            (None, Some(id)) => format!("http://www.wikidata.org/entity/{id}"),
            (None, None) => return None,
        };
        let label = self.label.or(self.id)?;

        Some(SearchHit {
            label,
            description: self.description,
            uri,
        })
    }
}

/// Turn a `wbsearchentities` JSON body into ranked candidates for `term`.
pub(crate) fn parse_search_response(
    term: &str,
    body: &str,
    limit: usize,
) -> RetrievalResult<Vec<KbCandidate>> {
    let parsed: SearchResponse =
        serde_json::from_str(body).map_err(|e| RetrievalError::Decode(e.to_string()))?;

    if let Some(error) = parsed.error {
        return Err(RetrievalError::Decode(format!(
            "API error {}: {}",
            error.code, error.info
        )));
    }

    let hits = parsed
        .search
        .into_iter()
        .filter_map(RawHit::into_search_hit)
        .collect();

    Ok(rank_hits(term, hits, limit))
}
