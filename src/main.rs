use anyhow::Context;
use clap::Parser;
use image_curator::{
    CurrentView, CuratorConfig, ProviderKind, ProviderRegistry, ReviewCursor, SqliteStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Review image-search results term by term and keep the good ones.
#[derive(Parser)]
#[command(name = "image-curator")]
struct Args {
    /// Project name; assets and the database live under assets/<name>/.
    project_name: Option<String>,

    /// Text file with one search term per line; replaces the stored term
    /// list wholesale before the review starts.
    #[arg(long)]
    terms: Option<PathBuf>,

    /// Provider to start reviewing with (pexels, pixabay, unsplash, flickr).
    #[arg(long, default_value = "pexels")]
    provider: ProviderKindArg,
}

#[derive(Clone)]
struct ProviderKindArg(ProviderKind);

impl std::str::FromStr for ProviderKindArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(ProviderKindArg).map_err(|e| e.to_string())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut config = CuratorConfig::from_env();
    if let Some(name) = args.project_name {
        config = config.with_project_name(name);
    }

    info!("Starting image curator for project '{}'", config.project_name);

    if let Some(parent) = config.database_path().parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let store = Arc::new(
        SqliteStore::connect(&config.database_url())
            .await
            .with_context(|| format!("opening {}", config.database_url()))?,
    );

    let registry = ProviderRegistry::from_env(&config);
    let mut cursor =
        ReviewCursor::new(store.clone(), registry, config.clone()).with_provider(args.provider.0);

    if let Some(terms_file) = args.terms {
        let content = tokio::fs::read_to_string(&terms_file)
            .await
            .with_context(|| format!("reading {}", terms_file.display()))?;
        let terms: Vec<String> = content
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        cursor.replace_terms(&terms).await?;
        info!("Loaded {} terms from {}", terms.len(), terms_file.display());
    }

    match cursor.current().await? {
        CurrentView::NoTerms => {
            info!("No search terms configured; pass --terms <file> to load some");
        }
        CurrentView::Finished { total_approved } => {
            info!("Review already finished, {} images approved", total_approved);
        }
        CurrentView::Exhausted { term, approved_for_term } => {
            info!(
                "Term '{}' has no candidates from {} ({} already approved)",
                term.term,
                cursor.provider(),
                approved_for_term
            );
        }
        CurrentView::Candidate {
            term,
            candidate,
            url,
            approved_for_term,
        } => {
            info!(
                "Current position: term '{}' ({} approved), candidate {} from {}",
                term.term,
                approved_for_term,
                candidate.source_id(),
                cursor.provider()
            );
            if let Some(url) = url {
                info!("Display URL: {}", url);
            }
        }
    }

    Ok(())
}
