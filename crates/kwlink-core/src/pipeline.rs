use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::entity::{Article, KeywordContext, KeywordResolution, ResolvedEntity};
use crate::generation::GenerationClient;
use crate::knowledge::{format_candidates, KbCandidate, KnowledgeBase};
use crate::prompt::{
    CandidateNamesPrompt, DirectLinkingPrompt, SelectionPrompt, SYSTEM_INSTRUCTION,
};
use crate::schema::{parse_candidates, parse_linked_entities, parse_selection};

/// How the selection reply is requested and validated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Delimited URIs, parsed leniently
    #[default]
    Delimited,
    /// A strict JSON list of entities
    Structured,
}

pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Resolves keywords in four stages: generate candidate names, retrieve
/// knowledge-base candidates per name, format the pool, select from it.
///
/// Failures in the first two stages end the run with an empty result. A
/// failed selection also yields an empty result.
pub struct EntityExtractionPipeline {
    generator: Box<dyn GenerationClient>,
    knowledge_base: Box<dyn KnowledgeBase>,
    search_language: String,
    search_limit: usize,
    selection_mode: SelectionMode,
}

impl EntityExtractionPipeline {
    #[must_use]
    pub fn new(
        generator: Box<dyn GenerationClient>,
        knowledge_base: Box<dyn KnowledgeBase>,
    ) -> Self {
        Self {
            generator,
            knowledge_base,
            search_language: "en".to_string(),
            search_limit: DEFAULT_SEARCH_LIMIT,
            selection_mode: SelectionMode::default(),
        }
    }

    #[must_use]
    pub fn with_search_language(mut self, language: impl Into<String>) -> Self {
        self.search_language = language.into();
        self
    }

    #[must_use]
    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }

    #[must_use]
    pub fn with_selection_mode(mut self, mode: SelectionMode) -> Self {
        self.selection_mode = mode;
        self
    }

    pub fn selection_mode(&self) -> SelectionMode {
        self.selection_mode
    }

    /// Resolve one keyword to at most `num_entities` knowledge-base entities.
    ///
    /// Returns an empty list whenever no entity could be resolved. The reason
    /// is logged.
    pub async fn extract_entities(
        &self,
        context: &KeywordContext,
        num_entities: usize,
        num_generated_names: usize,
    ) -> Vec<ResolvedEntity> {
        let Some(names) = self.generate_candidate_names(context, num_generated_names).await else {
            return Vec::new();
        };

        let Some(pool) = self.retrieve_candidates(&context.keyword, &names).await else {
            return Vec::new();
        };

        let formatted = format_candidates(&pool);

        let selected = self
            .select_entities(context, &pool, &formatted, num_entities)
            .await;

        if selected.is_empty() {
            tracing::warn!("No entity selected for keyword {:?}", context.keyword);
        } else {
            tracing::info!(
                "Resolved keyword {:?} to {} entities",
                context.keyword,
                selected.len()
            );
        }
        selected
    }

    /// Resolve every keyword of `article` in turn.
    pub async fn resolve_article(
        &self,
        article: &Article,
        num_entities: usize,
        num_generated_names: usize,
    ) -> Vec<KeywordResolution> {
        let mut resolutions = Vec::with_capacity(article.keywords.len());

        for context in article.keyword_contexts() {
            let entities = self
                .extract_entities(&context, num_entities, num_generated_names)
                .await;
            resolutions.push(KeywordResolution {
                keyword: context.keyword,
                entities,
            });
        }

        resolutions
    }

    /// Link all keywords of `article` with a single model call.
    ///
    /// The model answers with entities directly, so the URIs are not checked
    /// against the knowledge base.
    pub async fn link_directly(&self, article: &Article) -> Vec<ResolvedEntity> {
        let prompt = DirectLinkingPrompt { article }.render();

        let reply = match self.generator.generate(SYSTEM_INSTRUCTION, &prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("Direct linking failed: {}", e);
                return Vec::new();
            }
        };

        match parse_linked_entities(&reply) {
            Ok(entities) => entities,
            Err(e) => {
                tracing::warn!("Direct linking reply rejected: {}", e);
                Vec::new()
            }
        }
    }

    async fn generate_candidate_names(
        &self,
        context: &KeywordContext,
        max_names: usize,
    ) -> Option<Vec<String>> {
        let prompt = CandidateNamesPrompt {
            context,
            max_names,
        }
        .render();

        let reply = match self.generator.generate(SYSTEM_INSTRUCTION, &prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(
                    "Candidate generation failed for keyword {:?}: {}",
                    context.keyword,
                    e
                );
                return None;
            }
        };

        match parse_candidates(&reply) {
            Ok(names) => {
                tracing::debug!(
                    "Generated {} candidate names for {:?}: {:?}",
                    names.len(),
                    context.keyword,
                    names
                );
                Some(names)
            }
            Err(e) => {
                tracing::warn!(
                    "Candidate names for keyword {:?} rejected: {}",
                    context.keyword,
                    e
                );
                None
            }
        }
    }

    /// Concatenated search results for every name, in name order.
    ///
    /// Names are not deduplicated: a repeated name is searched once per
    /// occurrence and its candidates appear that many times in the pool.
    async fn retrieve_candidates(
        &self,
        keyword: &str,
        names: &[String],
    ) -> Option<Vec<KbCandidate>> {
        let mut pool = Vec::new();

        for name in names {
            match self
                .knowledge_base
                .search(name, &self.search_language, self.search_limit)
                .await
            {
                Ok(candidates) => pool.extend(candidates),
                Err(e) => {
                    tracing::warn!("Knowledge base search for {:?} failed: {}", name, e);
                    return None;
                }
            }
        }

        if pool.is_empty() {
            tracing::warn!("No knowledge base matches for keyword {:?}", keyword);
            return None;
        }

        tracing::debug!("Candidate pool for {:?} has {} entries", keyword, pool.len());
        Some(pool)
    }

    async fn select_entities(
        &self,
        context: &KeywordContext,
        pool: &[KbCandidate],
        formatted: &str,
        num_entities: usize,
    ) -> Vec<ResolvedEntity> {
        let prompt = SelectionPrompt {
            context,
            candidates: formatted,
            num_entities,
            structured: self.selection_mode == SelectionMode::Structured,
        }
        .render();

        let reply = match self.generator.generate(SYSTEM_INSTRUCTION, &prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(
                    "Entity selection failed for keyword {:?}: {}",
                    context.keyword,
                    e
                );
                return Vec::new();
            }
        };

        let mut selected = match self.selection_mode {
            SelectionMode::Delimited => {
                select_from_uris(&context.keyword, pool, &parse_selection(&reply))
            }
            SelectionMode::Structured => match parse_linked_entities(&reply) {
                Ok(entities) => keep_pooled(&context.keyword, pool, entities),
                Err(e) => {
                    tracing::warn!(
                        "Selection reply for keyword {:?} rejected: {}",
                        context.keyword,
                        e
                    );
                    Vec::new()
                }
            },
        };

        selected.truncate(num_entities);
        selected
    }
}

/// Entities for the selected URIs, in selection order.
///
/// URIs missing from the pool are dropped and repeated URIs collapse to their
/// first occurrence.
fn select_from_uris(keyword: &str, pool: &[KbCandidate], uris: &[String]) -> Vec<ResolvedEntity> {
    let mut seen = HashSet::new();

    uris.iter()
        .filter(|uri| seen.insert(uri.as_str()))
        .filter_map(|uri| pool.iter().find(|c| &c.uri == uri))
        .map(|candidate| ResolvedEntity {
            keyword: keyword.to_string(),
            label: candidate.label.clone(),
            description: candidate.description.clone(),
            uri: candidate.uri.clone(),
        })
        .collect()
}

/// Pool entities for the URIs of a structured selection.
///
/// Only the URI of each selected entry is trusted; keyword, label and
/// description come from the run and the pool.
fn keep_pooled(
    keyword: &str,
    pool: &[KbCandidate],
    entities: Vec<ResolvedEntity>,
) -> Vec<ResolvedEntity> {
    let uris: Vec<String> = entities.into_iter().map(|entity| entity.uri).collect();
    select_from_uris(keyword, pool, &uris)
}
