pub mod link;
pub mod resolve;
pub mod search;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use kwlink_core::{Article, ResolverConfig};

#[derive(Parser)]
#[command(
    name = "kwlink",
    about = "Link article keywords to Wikidata entities",
    version
)]
pub struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve each keyword through candidate generation, search and selection
    Resolve {
        #[command(flatten)]
        article: ArticleArgs,
        /// Entities to keep per keyword
        #[arg(long = "entities")]
        num_entities: Option<usize>,
        /// Upper bound on candidate names generated per keyword
        #[arg(long = "names")]
        num_generated_names: Option<usize>,
        /// Ask for comma-separated URIs instead of a JSON selection
        #[arg(long)]
        delimited: bool,
    },
    /// Ask the model for all keyword entities in a single request
    Link {
        #[command(flatten)]
        article: ArticleArgs,
    },
    /// Search Wikidata labels and rank them by similarity
    Search {
        /// Search term
        term: String,
        /// Label language
        #[arg(long)]
        language: Option<String>,
        /// Maximum number of candidates
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the similarity ratio of two strings
    Similarity {
        a: String,
        b: String,
    },
}

#[derive(Args)]
pub struct ArticleArgs {
    /// Author keyword (repeatable)
    #[arg(short = 'k', long = "keyword", required = true)]
    pub keywords: Vec<String>,
    /// Original language of the article
    #[arg(short = 'l', long, default_value = "en")]
    pub language: String,
    /// Article title
    #[arg(long, default_value = "")]
    pub title: String,
    /// Article abstract
    #[arg(long = "abstract", default_value = "")]
    pub abstract_text: String,
}

impl ArticleArgs {
    pub fn to_article(&self) -> Article {
        let article = Article::new(self.language.as_str())
            .with_title(self.title.as_str())
            .with_abstract(self.abstract_text.as_str());
        self.keywords
            .iter()
            .fold(article, |article, keyword| article.with_keyword(keyword.as_str()))
    }
}

/// Load the config file, then apply `KWLINK_*` environment overrides.
///
/// An explicit path must exist. The default path is optional; without a
/// file the built-in defaults are used.
pub fn load_config(path: Option<&Path>) -> Result<ResolverConfig> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(|| ResolverConfig::default_path().filter(|p| p.exists()));

    let Some(path) = path else {
        return Ok(ResolverConfig::from_env()?);
    };

    tracing::debug!("Using config file {}", path.display());
    let mut config = ResolverConfig::load(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    config.apply_env()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_resolve_selection_flag() {
        let cli = Cli::parse_from(["kwlink", "resolve", "-k", "horse", "--delimited"]);
        assert!(matches!(cli.command, Commands::Resolve { delimited: true, .. }));

        let cli = Cli::parse_from(["kwlink", "resolve", "-k", "horse"]);
        assert!(matches!(cli.command, Commands::Resolve { delimited: false, .. }));
    }

    #[test]
    fn test_article_args_keep_keyword_order() {
        let cli = Cli::parse_from([
            "kwlink", "link", "-k", "saudade", "-k", "fado", "-l", "pt", "--title", "Lisboa",
        ]);

        let Commands::Link { article } = cli.command else {
            panic!("expected link");
        };
        let article = article.to_article();

        assert_eq!(article.language, "pt");
        assert_eq!(article.title, "Lisboa");
        assert_eq!(article.abstract_text, "");
        assert_eq!(article.keywords, vec!["saudade", "fado"]);
    }
}
