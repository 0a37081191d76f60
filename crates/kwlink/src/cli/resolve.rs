use std::sync::Arc;

use anyhow::Result;
use console::style;
use tokio::task::JoinSet;

use kwlink_core::{KeywordResolution, ResolverConfig, SelectionMode};

use super::ArticleArgs;

pub struct ResolveOptions {
    pub num_entities: Option<usize>,
    pub num_generated_names: Option<usize>,
    pub delimited: bool,
}

/// Resolve all keywords concurrently and print one JSON line per keyword,
/// in the order the keywords were given.
pub async fn run(
    mut config: ResolverConfig,
    article: &ArticleArgs,
    options: ResolveOptions,
) -> Result<()> {
    if let Some(n) = options.num_entities {
        config.pipeline.num_entities = n;
    }
    if let Some(n) = options.num_generated_names {
        config.pipeline.num_generated_names = n;
    }
    if options.delimited {
        config.pipeline.selection_mode = SelectionMode::Delimited;
    }
    config.validate()?;

    let pipeline = Arc::new(config.build_pipeline()?);
    let num_entities = config.pipeline.num_entities;
    let num_generated_names = config.pipeline.num_generated_names;

    let mut tasks = JoinSet::new();
    for (index, context) in article.to_article().keyword_contexts().enumerate() {
        let pipeline = Arc::clone(&pipeline);
        tasks.spawn(async move {
            let entities = pipeline
                .extract_entities(&context, num_entities, num_generated_names)
                .await;
            (
                index,
                KeywordResolution {
                    keyword: context.keyword,
                    entities,
                },
            )
        });
    }

    let mut resolutions = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        resolutions.push(joined?);
    }
    resolutions.sort_by_key(|(index, _)| *index);

    let total = resolutions.len();
    let mut resolved = 0;
    for (_, resolution) in &resolutions {
        if resolution.is_resolved() {
            resolved += 1;
        }
        println!("{}", serde_json::to_string(resolution)?);
    }

    eprintln!(
        "{} Resolved {resolved}/{total} keywords",
        if resolved == total {
            style("✓").green()
        } else {
            style("!").yellow()
        }
    );

    Ok(())
}
