use serde::{Deserialize, Serialize};

/// Everything the resolver knows about one keyword of one article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordContext {
    pub original_language: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub abstract_text: String,
    pub keyword: String,
}

impl KeywordContext {
    #[must_use]
    pub fn new(original_language: impl Into<String>, keyword: impl Into<String>) -> Self {
        Self {
            original_language: original_language.into(),
            title: String::new(),
            abstract_text: String::new(),
            keyword: keyword.into(),
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_abstract(mut self, abstract_text: impl Into<String>) -> Self {
        self.abstract_text = abstract_text.into();
        self
    }
}

/// A keyword linked to a knowledge-base entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedEntity {
    pub keyword: String,
    pub label: String,
    pub description: String,
    pub uri: String,
}

/// Article metadata with all of its author-supplied keywords.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub language: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub abstract_text: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Article {
    #[must_use]
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            title: String::new(),
            abstract_text: String::new(),
            keywords: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_abstract(mut self, abstract_text: impl Into<String>) -> Self {
        self.abstract_text = abstract_text.into();
        self
    }

    #[must_use]
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keywords.push(keyword.into());
        self
    }

    /// One resolver input per keyword, sharing the article's context.
    pub fn keyword_contexts(&self) -> impl Iterator<Item = KeywordContext> + '_ {
        self.keywords.iter().map(|keyword| {
            KeywordContext::new(self.language.clone(), keyword.clone())
                .with_title(self.title.clone())
                .with_abstract(self.abstract_text.clone())
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordResolution {
    pub keyword: String,
    pub entities: Vec<ResolvedEntity>,
}

impl KeywordResolution {
    pub fn is_resolved(&self) -> bool {
        !self.entities.is_empty()
    }
}
