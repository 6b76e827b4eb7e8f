/// Local snapshot store for fetched channels and per-channel videos
use crate::dict::{load_json, save_json};
use crate::youtube::{Channel, Video};
use crate::Result;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Reads and writes the JSON snapshots under the cache directory.
///
/// Layout:
/// - `channels.json`: channels from the last remote run
/// - `videos/<channelId>.json`: every video ever fetched for that channel, newest first
#[derive(Debug, Clone)]
pub struct LocalStore {
    cache_dir: PathBuf,
}

impl LocalStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Initialize cache directory
    pub async fn initialize(&self) -> Result<()> {
        let videos_dir = self.videos_dir();
        tokio::fs::create_dir_all(&videos_dir)
            .await
            .map_err(|e| crate::SyncError::io(&videos_dir, e))?;
        debug!("📁 Cache directory initialized: {}", self.cache_dir.display());
        Ok(())
    }

    fn channels_path(&self) -> PathBuf {
        self.cache_dir.join("channels.json")
    }

    fn videos_dir(&self) -> PathBuf {
        self.cache_dir.join("videos")
    }

    fn videos_path(&self, channel_id: &str) -> PathBuf {
        self.videos_dir().join(format!("{}.json", channel_id))
    }

    /// Channels from the last remote run; empty when no snapshot exists
    pub async fn load_channels(&self) -> Result<Vec<Channel>> {
        let path = self.channels_path();
        if !path.exists() {
            warn!("No channel snapshot at {}", path.display());
            return Ok(Vec::new());
        }
        let channels: Vec<Channel> = load_json(&path).await?;
        debug!("📚 Cache hit: {} channels", channels.len());
        Ok(channels)
    }

    pub fn save_channels(&self, channels: &[Channel]) -> Result<()> {
        save_json(&self.channels_path(), channels)?;
        info!("💾 Saved {} channels to cache", channels.len());
        Ok(())
    }

    /// Cached videos of one channel; empty on a cache miss
    pub async fn load_videos(&self, channel_id: &str) -> Result<Vec<Video>> {
        let path = self.videos_path(channel_id);
        if !path.exists() {
            debug!("Cache miss: no videos for {}", channel_id);
            return Ok(Vec::new());
        }
        load_json(&path).await
    }

    pub fn save_videos(&self, channel_id: &str, videos: &[Video]) -> Result<()> {
        save_json(&self.videos_path(channel_id), videos)?;
        info!("💾 Saved {} videos to cache: {}", videos.len(), channel_id);
        Ok(())
    }

    /// Get cache statistics for the given channels
    pub async fn get_cache_stats(&self, channel_ids: &[String]) -> Result<CacheStats> {
        let mut stats = CacheStats::default();
        for channel_id in channel_ids {
            let videos = self.load_videos(channel_id).await?;
            let upcoming = videos.iter().filter(|v| v.is_upcoming()).count();
            stats.total_videos += videos.len();
            stats.channels.push(ChannelCacheStats {
                channel_id: channel_id.clone(),
                videos: videos.len(),
                upcoming,
            });
        }
        Ok(stats)
    }
}

/// Union of freshly fetched and cached videos.
///
/// Fresh videos come first and replace cached entries with the same id; every
/// other cached video is kept, so a channel's cache never shrinks.
pub fn merge_videos(fresh: Vec<Video>, cached: Vec<Video>) -> Vec<Video> {
    let mut seen: HashSet<String> = HashSet::with_capacity(fresh.len() + cached.len());
    let mut merged = Vec::with_capacity(fresh.len() + cached.len());
    for video in fresh.into_iter().chain(cached) {
        if seen.insert(video.id.clone()) {
            merged.push(video);
        }
    }
    merged
}

/// Cache statistics
#[derive(Debug, Default)]
pub struct CacheStats {
    pub total_videos: usize,
    pub channels: Vec<ChannelCacheStats>,
}

#[derive(Debug, Clone)]
pub struct ChannelCacheStats {
    pub channel_id: String,
    pub videos: usize,
    pub upcoming: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::youtube::{Thumbnails, VideoContentDetails, VideoSnippet};
    use tempfile::TempDir;

    fn video(id: &str, duration: Option<&str>) -> Video {
        Video {
            id: id.to_string(),
            snippet: VideoSnippet {
                published_at: "2024-01-01T00:00:00Z".to_string(),
                channel_id: "C1".to_string(),
                title: id.to_string(),
                description: String::new(),
                thumbnails: Thumbnails::default(),
            },
            content_details: VideoContentDetails {
                duration: duration.map(String::from),
            },
        }
    }

    #[test]
    fn test_merge_prepends_fresh_and_keeps_cached() {
        let merged = merge_videos(
            vec![video("v3", Some("PT1M")), video("v2", Some("PT2M"))],
            vec![video("v2", None), video("v1", Some("PT1M"))],
        );

        let ids: Vec<&str> = merged.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["v3", "v2", "v1"]);
        assert!(!merged[1].is_upcoming());
    }

    #[tokio::test]
    async fn test_videos_round_trip_through_cache() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(temp_dir.path().join("cache"));
        store.initialize().await.unwrap();

        assert!(store.load_videos("C1").await.unwrap().is_empty());

        store
            .save_videos("C1", &[video("v1", Some("PT1M")), video("v2", None)])
            .unwrap();

        let loaded = store.load_videos("C1").await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded[1].is_upcoming());

        let stats = store.get_cache_stats(&["C1".to_string()]).await.unwrap();
        assert_eq!(stats.total_videos, 2);
        assert_eq!(stats.channels[0].upcoming, 1);
    }

    #[tokio::test]
    async fn test_missing_channel_snapshot_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(temp_dir.path().to_path_buf());

        assert!(store.load_channels().await.unwrap().is_empty());
    }
}
