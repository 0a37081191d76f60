use anyhow::Result;
use console::style;

use kwlink_core::{similarity, KnowledgeBase, ResolverConfig, WikidataClient};

pub async fn run(
    config: &ResolverConfig,
    term: &str,
    language: Option<&str>,
    limit: Option<usize>,
) -> Result<()> {
    let language = language.unwrap_or(&config.knowledge_base.language);
    let limit = limit.unwrap_or(config.knowledge_base.search_limit);
    if limit == 0 {
        anyhow::bail!("--limit must be positive");
    }

    let client = WikidataClient::with_endpoint(&config.http, &config.knowledge_base.endpoint)?;
    let candidates = client.search(term, language, limit).await?;

    if candidates.is_empty() {
        eprintln!("{} No matches for {term:?}", style("○").dim());
    }
    for candidate in &candidates {
        println!("{}", serde_json::to_string(candidate)?);
    }

    Ok(())
}

pub fn run_similarity(a: &str, b: &str) {
    println!("{}", similarity(a, b));
}
