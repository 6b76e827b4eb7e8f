use anyhow::Result;
use clap::{Arg, Command};
use sakamichi_sync::{Config, Pipeline, Source, SyncError, YoutubeApi};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("Sakamichi Sync")
        .version("0.1.0")
        .author("TigreRoll")
        .about("Sync YouTube channel and video metadata into the viewer's JSON dictionaries")
        .arg(
            Arg::new("skip-fetch")
                .long("skip-fetch")
                .help("Rebuild outputs from the local snapshot without calling the API")
                .action(clap::ArgAction::SetTrue)
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue)
        )
        .get_matches();

    let skip_fetch = matches.get_flag("skip-fetch");
    let verbose = matches.get_flag("verbose");

    // Initialize logging
    let default_filter = if verbose {
        "sakamichi_sync=debug,warn"
    } else {
        "sakamichi_sync=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let config = Config::load()?;
    config.validate()?;
    debug!("{}", config.summary());

    // The key is checked before anything on disk is touched, even when not fetching
    let api_key = config.require_api_key().map_err(report)?.to_string();
    let api = if skip_fetch {
        None
    } else {
        Some(YoutubeApi::new(api_key, &config.youtube)?)
    };

    info!("🚀 Sakamichi Sync starting...");
    if skip_fetch {
        info!("⏭️ Skipping fetch, using local snapshot");
    }

    let pipeline = Pipeline::new(config);
    let source = match &api {
        Some(api) => Source::Remote(api),
        None => Source::LocalSnapshot,
    };
    let summary = pipeline.run(source).await.map_err(report)?;

    info!("🎉 Sync completed in {:.2}s", summary.elapsed.as_secs_f64());
    info!("📺 Channels: {}", summary.channels);
    info!("⬇️ Fetched: {}", summary.fetched_videos);
    info!(
        "✅ Relevant: {} of {} ({} excluded)",
        summary.relevant_videos, summary.total_videos, summary.excluded_videos
    );
    info!(
        "🏷️ Tagged: {}, untagged: {}",
        summary.tagged_videos, summary.untagged_videos
    );

    Ok(())
}

/// Log which class of failure aborted the run
fn report(err: SyncError) -> SyncError {
    if err.is_fatal_config() {
        error!("❌ Configuration error, nothing was touched: {}", err);
    } else if err.is_data_integrity() {
        error!("❌ Curated data needs fixing, outputs left as they were: {}", err);
    } else {
        error!("❌ Sync failed, outputs left as they were: {}", err);
    }
    err
}
