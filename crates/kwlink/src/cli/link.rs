use anyhow::Result;
use console::style;

use kwlink_core::ResolverConfig;

use super::ArticleArgs;

pub async fn run(config: &ResolverConfig, article: &ArticleArgs) -> Result<()> {
    let pipeline = config.build_pipeline()?;
    let article = article.to_article();

    let entities = pipeline.link_directly(&article).await;
    for entity in &entities {
        println!("{}", serde_json::to_string(entity)?);
    }

    if entities.is_empty() {
        eprintln!("{} No entities linked", style("!").yellow());
    }

    Ok(())
}
