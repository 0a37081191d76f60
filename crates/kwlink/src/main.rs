mod cli;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    dispatch(Cli::parse()).await
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Resolve {
            article,
            num_entities,
            num_generated_names,
            delimited,
        } => {
            let options = cli::resolve::ResolveOptions {
                num_entities,
                num_generated_names,
                delimited,
            };
            cli::resolve::run(cli::load_config(config_path)?, &article, options).await
        }
        Commands::Link { article } => {
            cli::link::run(&cli::load_config(config_path)?, &article).await
        }
        Commands::Search {
            term,
            language,
            limit,
        } => {
            let config = cli::load_config(config_path)?;
            cli::search::run(&config, &term, language.as_deref(), limit).await
        }
        Commands::Similarity { a, b } => {
            cli::search::run_similarity(&a, &b);
            Ok(())
        }
    }
}
