/// YouTube Data API access
///
/// Wire types for the three read-only endpoints the sync uses, the
/// `MetadataClient` seam (one method call = one HTTP request) and the drivers
/// that turn single requests into whole-collection fetches: id batching for
/// channels/videos and cursor pagination for playlist items.

pub mod client;

pub use client::YoutubeApi;

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Maximum number of ids (and page size) accepted by a single API request
pub const MAX_RESULTS_PER_REQUEST: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// All thumbnail sizes the API may return; absent sizes are omitted on save
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thumbnails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Thumbnail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medium: Option<Thumbnail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<Thumbnail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard: Option<Thumbnail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxres: Option<Thumbnail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: String,
    pub snippet: ChannelSnippet,
    pub content_details: ChannelContentDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSnippet {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnails: Thumbnails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelContentDetails {
    pub related_playlists: RelatedPlaylists,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedPlaylists {
    pub uploads: String,
}

impl Channel {
    pub fn uploads_playlist_id(&self) -> &str {
        &self.content_details.related_playlists.uploads
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItem {
    pub id: String,
    pub content_details: PlaylistItemContentDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemContentDetails {
    pub video_id: String,
}

impl PlaylistItem {
    pub fn video_id(&self) -> &str {
        &self.content_details.video_id
    }
}

/// One page of a playlist listing
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemsPage {
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub snippet: VideoSnippet,
    #[serde(default)]
    pub content_details: VideoContentDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    pub published_at: String,
    pub channel_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnails: Thumbnails,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoContentDetails {
    /// Missing while the video is scheduled but not yet published
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl Video {
    pub fn channel_id(&self) -> &str {
        &self.snippet.channel_id
    }

    pub fn published_at(&self) -> &str {
        &self.snippet.published_at
    }

    pub fn title(&self) -> &str {
        &self.snippet.title
    }

    pub fn description(&self) -> &str {
        &self.snippet.description
    }

    pub fn is_upcoming(&self) -> bool {
        self.content_details.duration.is_none()
    }
}

/// Raw access to the remote API, one request per call
#[async_trait]
pub trait MetadataClient: Send + Sync {
    /// List channels by id; at most `MAX_RESULTS_PER_REQUEST` ids
    async fn list_channels(&self, ids: &[String]) -> Result<Vec<Channel>>;

    /// Fetch one page of a playlist, `page_token` is the previous page's cursor
    async fn list_playlist_items(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemsPage>;

    /// List videos by id; at most `MAX_RESULTS_PER_REQUEST` ids
    async fn list_videos(&self, ids: &[String]) -> Result<Vec<Video>>;
}

/// Returned by the per-page callback of `fetch_playlist_items`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageControl {
    Continue,
    Stop,
}

/// Fetch all requested channels, batching ids into chunks of 50
pub async fn fetch_channels<C>(client: &C, ids: &[String]) -> Result<Vec<Channel>>
where
    C: MetadataClient + ?Sized,
{
    let mut channels = Vec::with_capacity(ids.len());
    for chunk in ids.chunks(MAX_RESULTS_PER_REQUEST) {
        debug!("Requesting {} channels", chunk.len());
        channels.extend(client.list_channels(chunk).await?);
    }
    Ok(channels)
}

/// Fetch all requested videos, batching ids into chunks of 50
pub async fn fetch_videos<C>(client: &C, ids: &[String]) -> Result<Vec<Video>>
where
    C: MetadataClient + ?Sized,
{
    let mut videos = Vec::with_capacity(ids.len());
    for chunk in ids.chunks(MAX_RESULTS_PER_REQUEST) {
        debug!("Requesting {} videos", chunk.len());
        videos.extend(client.list_videos(chunk).await?);
    }
    Ok(videos)
}

/// Follow a playlist's page cursor until it runs out or `on_page` says stop.
///
/// `on_page` sees each page before the next one is requested. Items of the
/// page that triggered the stop are still returned.
pub async fn fetch_playlist_items<C, F>(
    client: &C,
    playlist_id: &str,
    mut on_page: F,
) -> Result<Vec<PlaylistItem>>
where
    C: MetadataClient + ?Sized,
    F: FnMut(&[PlaylistItem]) -> PageControl,
{
    let mut items = Vec::new();
    let mut page_token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = client
            .list_playlist_items(playlist_id, page_token.as_deref())
            .await?;
        pages += 1;

        let control = on_page(&page.items);
        items.extend(page.items);

        if control == PageControl::Stop {
            debug!("Stopping pagination of {} after {} pages", playlist_id, pages);
            break;
        }
        match page.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn video(id: &str) -> Video {
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
                duration: Some("PT1M".to_string()),
            },
        }
    }

    fn playlist_item(video_id: &str) -> PlaylistItem {
        PlaylistItem {
            id: format!("item-{}", video_id),
            content_details: PlaylistItemContentDetails {
                video_id: video_id.to_string(),
            },
        }
    }

    /// Serves `pages` in order and records every request
    struct PagedClient {
        pages: Vec<Vec<&'static str>>,
        page_requests: Mutex<Vec<Option<String>>>,
        video_batches: Mutex<Vec<usize>>,
    }

    impl PagedClient {
        fn new(pages: Vec<Vec<&'static str>>) -> Self {
            Self {
                pages,
                page_requests: Mutex::new(Vec::new()),
                video_batches: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MetadataClient for PagedClient {
        async fn list_channels(&self, _ids: &[String]) -> Result<Vec<Channel>> {
            Ok(Vec::new())
        }

        async fn list_playlist_items(
            &self,
            _playlist_id: &str,
            page_token: Option<&str>,
        ) -> Result<PlaylistItemsPage> {
            self.page_requests
                .lock()
                .unwrap()
                .push(page_token.map(String::from));
            let index: usize = page_token.map(|t| t.parse().unwrap()).unwrap_or(0);
            let next_page_token = if index + 1 < self.pages.len() {
                Some((index + 1).to_string())
            } else {
                None
            };
            Ok(PlaylistItemsPage {
                next_page_token,
                items: self.pages[index].iter().map(|id| playlist_item(id)).collect(),
            })
        }

        async fn list_videos(&self, ids: &[String]) -> Result<Vec<Video>> {
            self.video_batches.lock().unwrap().push(ids.len());
            Ok(ids.iter().map(|id| video(id)).collect())
        }
    }

    #[test]
    fn test_fetch_videos_batches_by_fifty() {
        let client = PagedClient::new(vec![vec![]]);
        let ids: Vec<String> = (0..120).map(|i| format!("v{}", i)).collect();

        let videos = tokio_test::block_on(fetch_videos(&client, &ids)).unwrap();

        assert_eq!(videos.len(), 120);
        assert_eq!(*client.video_batches.lock().unwrap(), vec![50, 50, 20]);
    }

    #[test]
    fn test_fetch_videos_with_no_ids_makes_no_request() {
        let client = PagedClient::new(vec![vec![]]);

        let videos = tokio_test::block_on(fetch_videos(&client, &[])).unwrap();

        assert!(videos.is_empty());
        assert!(client.video_batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pagination_follows_cursor_to_the_end() {
        let client = PagedClient::new(vec![vec!["v1", "v2"], vec!["v3"], vec!["v4"]]);

        let items = fetch_playlist_items(&client, "UU1", |_| PageControl::Continue)
            .await
            .unwrap();

        let ids: Vec<&str> = items.iter().map(|i| i.video_id()).collect();
        assert_eq!(ids, vec!["v1", "v2", "v3", "v4"]);
        assert_eq!(
            *client.page_requests.lock().unwrap(),
            vec![None, Some("1".to_string()), Some("2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_pagination_stops_when_callback_says_so() {
        let client = PagedClient::new(vec![vec!["v1"], vec!["v2"], vec!["v3"]]);

        let items = fetch_playlist_items(&client, "UU1", |page| {
            if page.iter().any(|i| i.video_id() == "v2") {
                PageControl::Stop
            } else {
                PageControl::Continue
            }
        })
        .await
        .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(client.page_requests.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_video_deserializes_without_duration() {
        let json = r#"{
            "id": "abc",
            "snippet": {
                "publishedAt": "2024-06-01T00:00:00Z",
                "channelId": "C1",
                "title": "Upcoming",
                "description": "",
                "thumbnails": {"medium": {"url": "https://i.ytimg.com/m.jpg", "width": 320, "height": 180}}
            },
            "contentDetails": {}
        }"#;
        let video: Video = serde_json::from_str(json).unwrap();

        assert!(video.is_upcoming());
        assert_eq!(video.channel_id(), "C1");
        assert!(video.snippet.thumbnails.medium.is_some());
        assert!(video.snippet.thumbnails.default.is_none());
    }
}
