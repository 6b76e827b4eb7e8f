use anyhow::Result;
use clap::{Parser, Subcommand};
use sakamichi_sync::pipeline::sort_by_published_desc;
use sakamichi_sync::tags::{build_channel_suggestions, delete_suggestions};
use sakamichi_sync::{Config, Dataset, LocalStore, RelevanceFilter};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "tag-checker")]
#[command(about = "Curation helper for the local tag dictionaries and cache")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override the cache directory from the configuration
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List relevant cached videos that have no curated tags
    Untagged,
    /// Get cache statistics
    Stats,
    /// Delete every generated suggestion file
    ClearSuggestions,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(cache_dir) = cli.cache_dir {
        config.paths.cache_dir = cache_dir;
    }
    config.validate()?;

    let store = LocalStore::new(config.paths.cache_dir.clone());

    match cli.command {
        Commands::Untagged => {
            let dataset = Dataset::load(&config.paths).await?;

            let mut videos = Vec::new();
            for channel_id in dataset.valid_channel_ids() {
                videos.extend(store.load_videos(&channel_id).await?);
            }

            let filter = RelevanceFilter::new(
                &config.filter.group_name,
                &dataset.channel_definitions,
                &dataset.roster,
            );
            let mut relevant = filter.filter(videos)?;
            relevant.retain(|v| !dataset.is_excluded(v.channel_id(), &v.id));
            sort_by_published_desc(&mut relevant);

            let groups = build_channel_suggestions(&relevant, &dataset.tags, &dataset.roster)?;
            if groups.is_empty() {
                info!("🎉 Every relevant video is tagged");
                return Ok(());
            }

            for group in groups {
                let name = dataset
                    .definition(&group.channel_id)
                    .map_or(group.channel_id.as_str(), |d| d.name.as_str());
                info!("📺 {} ({} untagged):", name, group.suggestions.len());
                for (video_id, suggestion) in group.suggestions.iter() {
                    info!(
                        "  {} - {} [{}]",
                        video_id,
                        suggestion.title.as_deref().unwrap_or_default(),
                        suggestion.tags.join(", ")
                    );
                }
            }
        }

        Commands::Stats => {
            let dataset = Dataset::load(&config.paths).await?;
            let stats = store.get_cache_stats(&dataset.valid_channel_ids()).await?;

            info!("📊 Cache Statistics:");
            info!("  Total videos: {}", stats.total_videos);
            for channel in &stats.channels {
                let name = dataset
                    .definition(&channel.channel_id)
                    .map_or(channel.channel_id.as_str(), |d| d.name.as_str());
                info!(
                    "  {}: {} videos, {} upcoming",
                    name, channel.videos, channel.upcoming
                );
            }
        }

        Commands::ClearSuggestions => {
            let count = delete_suggestions(&config.paths.tags_dir)?;
            info!("🧹 Cleared {} suggestion files", count);
        }
    }

    Ok(())
}
