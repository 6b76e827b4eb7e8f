/// Sync orchestrator
///
/// One run walks these stages in order and aborts on the first error:
///
/// `DeleteStaleSuggestions → LoadLocalInputs → (FetchRemote | LoadLocalSnapshot)
///  → FilterRelevant → SortDescByPublished → DiffAgainstTagDict → BuildSuggestions
///  → WriteAllOutputs`
///
/// Nothing under the public directory is touched before `WriteAllOutputs`. The
/// per-channel video caches are the exception: they are saved as soon as each
/// channel is fetched so a retried run does not pay for the same requests again.
use crate::cache::{merge_videos, LocalStore};
use crate::config::Config;
use crate::dataset::{Dataset, VideoTags};
use crate::dict::Dict;
use crate::filter::RelevanceFilter;
use crate::output::{channel_for_save, video_for_save, video_tags_for_save, OutputSet};
use crate::tags::{build_channel_suggestions, delete_suggestions, sort_tag_dict};
use crate::youtube::{
    fetch_channels, fetch_playlist_items, fetch_videos, Channel, MetadataClient, PageControl,
    Video,
};
use crate::Result;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Stages of a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    DeleteStaleSuggestions,
    LoadLocalInputs,
    FetchRemote,
    LoadLocalSnapshot,
    FilterRelevant,
    SortDescByPublished,
    DiffAgainstTagDict,
    BuildSuggestions,
    WriteAllOutputs,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::DeleteStaleSuggestions => "Deleting stale suggestions",
            PipelineStage::LoadLocalInputs => "Loading local inputs",
            PipelineStage::FetchRemote => "Fetching from YouTube API",
            PipelineStage::LoadLocalSnapshot => "Loading local snapshot",
            PipelineStage::FilterRelevant => "Filtering relevant videos",
            PipelineStage::SortDescByPublished => "Sorting videos",
            PipelineStage::DiffAgainstTagDict => "Diffing against tag dictionary",
            PipelineStage::BuildSuggestions => "Building untagged suggestions",
            PipelineStage::WriteAllOutputs => "Saving files",
        };
        f.write_str(name)
    }
}

/// Where channel and video data comes from
#[derive(Clone, Copy)]
pub enum Source<'a> {
    Remote(&'a dyn MetadataClient),
    LocalSnapshot,
}

/// Counts reported at the end of a run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub channels: usize,
    pub fetched_videos: usize,
    pub total_videos: usize,
    pub relevant_videos: usize,
    pub excluded_videos: usize,
    pub tagged_videos: usize,
    pub untagged_videos: usize,
    pub elapsed: Duration,
}

struct Collected {
    channels: Vec<Channel>,
    videos: Vec<Video>,
    fetched: usize,
}

pub struct Pipeline {
    config: Config,
    store: LocalStore,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        let store = LocalStore::new(config.paths.cache_dir.clone());
        Self { config, store }
    }

    pub async fn run(&self, source: Source<'_>) -> Result<RunSummary> {
        let start = Instant::now();
        let paths = &self.config.paths;

        // A missing key aborts every run, snapshot rebuilds included, before any I/O
        self.config.require_api_key()?;

        enter(PipelineStage::DeleteStaleSuggestions);
        delete_suggestions(&paths.tags_dir)?;

        enter(PipelineStage::LoadLocalInputs);
        let dataset = Dataset::load(paths).await?;
        self.store.initialize().await?;

        let collected = match source {
            Source::Remote(client) => {
                enter(PipelineStage::FetchRemote);
                self.fetch_remote(client, &dataset).await?
            }
            Source::LocalSnapshot => {
                enter(PipelineStage::LoadLocalSnapshot);
                self.load_snapshot(&dataset).await?
            }
        };

        let (outputs, mut summary) = self.build_outputs(&dataset, &collected)?;
        summary.fetched_videos = collected.fetched;

        enter(PipelineStage::WriteAllOutputs);
        if let Source::Remote(_) = source {
            self.store.save_channels(&collected.channels)?;
        }
        outputs.write(paths)?;

        summary.elapsed = start.elapsed();
        Ok(summary)
    }

    async fn fetch_remote(&self, client: &dyn MetadataClient, dataset: &Dataset) -> Result<Collected> {
        let channel_ids = dataset.valid_channel_ids();
        let fetched = fetch_channels(client, &channel_ids).await?;
        let channels = order_channels(fetched, &channel_ids);
        info!("📺 Got {} channels", channels.len());

        let mut videos = Vec::new();
        let mut fetched_count = 0;
        for channel in &channels {
            let (channel_videos, count) = self.sync_channel(client, channel, dataset).await?;
            fetched_count += count;
            videos.extend(channel_videos);
        }

        Ok(Collected {
            channels,
            videos,
            fetched: fetched_count,
        })
    }

    /// Fetch what the channel cache lacks, then save the merged cache
    async fn sync_channel(
        &self,
        client: &dyn MetadataClient,
        channel: &Channel,
        dataset: &Dataset,
    ) -> Result<(Vec<Video>, usize)> {
        let cached = self.store.load_videos(&channel.id).await?;
        let known: HashSet<&str> = cached.iter().map(|v| v.id.as_str()).collect();
        let skip = |id: &str| known.contains(id) || dataset.is_excluded(&channel.id, id);

        // Uploads are newest first, so a page with nothing new means the rest is cached
        let items = fetch_playlist_items(client, channel.uploads_playlist_id(), |page| {
            if page.iter().any(|item| !skip(item.video_id())) {
                PageControl::Continue
            } else {
                PageControl::Stop
            }
        })
        .await?;

        let mut requested: HashSet<String> = HashSet::new();
        let mut to_fetch: Vec<String> = Vec::new();
        for item in &items {
            let id = item.video_id();
            if !skip(id) && requested.insert(id.to_string()) {
                to_fetch.push(id.to_string());
            }
        }
        let new_count = to_fetch.len();

        for video in cached.iter().filter(|v| v.is_upcoming()) {
            if !dataset.is_excluded(&channel.id, &video.id) && requested.insert(video.id.clone()) {
                to_fetch.push(video.id.clone());
            }
        }

        info!(
            "🔍 {}: {} cached, {} new, {} upcoming to refresh",
            channel.snippet.title,
            cached.len(),
            new_count,
            to_fetch.len() - new_count
        );

        let fresh = fetch_videos(client, &to_fetch).await?;
        let fetched = fresh.len();
        let merged = merge_videos(fresh, cached);
        self.store.save_videos(&channel.id, &merged)?;

        Ok((merged, fetched))
    }

    async fn load_snapshot(&self, dataset: &Dataset) -> Result<Collected> {
        let channel_ids = dataset.valid_channel_ids();
        let channels = order_channels(self.store.load_channels().await?, &channel_ids);

        let mut videos = Vec::new();
        for channel_id in &channel_ids {
            videos.extend(self.store.load_videos(channel_id).await?);
        }
        info!(
            "📚 Loaded {} channels and {} videos from snapshot",
            channels.len(),
            videos.len()
        );

        Ok(Collected {
            channels,
            videos,
            fetched: 0,
        })
    }

    fn build_outputs(&self, dataset: &Dataset, collected: &Collected) -> Result<(OutputSet, RunSummary)> {
        let mut summary = RunSummary {
            channels: collected.channels.len(),
            total_videos: collected.videos.len(),
            ..RunSummary::default()
        };
        warn_on_unsortable_timestamps(&collected.videos);

        enter(PipelineStage::FilterRelevant);
        let filter = RelevanceFilter::new(
            &self.config.filter.group_name,
            &dataset.channel_definitions,
            &dataset.roster,
        );
        let mut relevant = filter.filter(collected.videos.clone())?;

        // Exclusion runs after relevance and always wins, official channels included
        let before = relevant.len();
        relevant.retain(|v| !dataset.is_excluded(v.channel_id(), &v.id));
        summary.excluded_videos = before - relevant.len();
        summary.relevant_videos = relevant.len();

        enter(PipelineStage::SortDescByPublished);
        sort_by_published_desc(&mut relevant);

        enter(PipelineStage::DiffAgainstTagDict);
        let mut tags = dataset.tags.clone();
        tags.retain(|video_id, _| !dataset.is_excluded_anywhere(video_id));
        let tags = sort_tag_dict(tags, &dataset.roster)?;
        let tags: Dict<VideoTags> = tags.try_map_values(|_, entry| Ok(video_tags_for_save(&entry)))?;
        summary.tagged_videos = relevant
            .iter()
            .filter(|v| dataset.tags.contains_key(&v.id))
            .count();

        enter(PipelineStage::BuildSuggestions);
        let suggestions = build_channel_suggestions(&relevant, &dataset.tags, &dataset.roster)?;

        let outputs = OutputSet {
            members: dataset.roster.as_dict().clone(),
            channels: Dict::from_items(collected.channels.iter().map(channel_for_save), |c| &c.id)?,
            videos: Dict::from_items(relevant.iter().map(video_for_save), |v| &v.id)?,
            tags,
            suggestions,
        };
        summary.untagged_videos = outputs.untagged_count();

        Ok((outputs, summary))
    }
}

fn enter(stage: PipelineStage) {
    info!("▶️ {}", stage);
}

/// Newest first. `publishedAt` is fixed-width ISO 8601, so string order is time
/// order; the sort is stable and ties keep their input order.
pub fn sort_by_published_desc(videos: &mut [Video]) {
    videos.sort_by(|a, b| b.published_at().cmp(a.published_at()));
}

/// Put channels in definition order, dropping any that were not asked for
fn order_channels(channels: Vec<Channel>, channel_ids: &[String]) -> Vec<Channel> {
    let mut by_id: HashMap<String, Channel> =
        channels.into_iter().map(|c| (c.id.clone(), c)).collect();

    let ordered: Vec<Channel> = channel_ids
        .iter()
        .filter_map(|id| {
            let channel = by_id.remove(id);
            if channel.is_none() {
                warn!("⚠️ Channel {} was not returned", id);
            }
            channel
        })
        .collect();

    for id in by_id.keys() {
        debug!("Ignoring channel {} with no valid definition", id);
    }
    ordered
}

fn warn_on_unsortable_timestamps(videos: &[Video]) {
    for video in videos {
        if chrono::DateTime::parse_from_rfc3339(video.published_at()).is_err() {
            warn!(
                "⚠️ Video {} has publishedAt {:?} which is not RFC 3339; sort order may be wrong",
                video.id,
                video.published_at()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::youtube::{
        ChannelContentDetails, ChannelSnippet, RelatedPlaylists, Thumbnails, VideoContentDetails,
        VideoSnippet,
    };

    fn video(id: &str, published_at: &str) -> Video {
        Video {
            id: id.to_string(),
            snippet: VideoSnippet {
                published_at: published_at.to_string(),
                channel_id: "C1".to_string(),
                title: id.to_string(),
                description: String::new(),
                thumbnails: Thumbnails::default(),
            },
            content_details: VideoContentDetails::default(),
        }
    }

    fn channel(id: &str) -> Channel {
        Channel {
            id: id.to_string(),
            snippet: ChannelSnippet {
                title: id.to_string(),
                description: String::new(),
                thumbnails: Thumbnails::default(),
            },
            content_details: ChannelContentDetails {
                related_playlists: RelatedPlaylists {
                    uploads: format!("UU{}", id),
                },
            },
        }
    }

    #[test]
    fn test_sort_newest_first() {
        let mut videos = vec![
            video("jan", "2024-01-01T00:00:00Z"),
            video("jun", "2024-06-01T00:00:00Z"),
            video("mar", "2024-03-01T00:00:00Z"),
        ];
        sort_by_published_desc(&mut videos);

        let ids: Vec<&str> = videos.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["jun", "mar", "jan"]);
    }

    #[test]
    fn test_order_channels_follows_definitions() {
        let ordered = order_channels(
            vec![channel("C2"), channel("C9"), channel("C1")],
            &["C1".to_string(), "C2".to_string(), "C3".to_string()],
        );

        let ids: Vec<&str> = ordered.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["C1", "C2"]);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(PipelineStage::WriteAllOutputs.to_string(), "Saving files");
    }
}
