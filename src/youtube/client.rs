use super::{Channel, MetadataClient, PlaylistItemsPage, Video};
use crate::config::YoutubeConfig;
use crate::error::SyncError;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const PART: &str = "snippet,contentDetails";

/// YouTube Data API v3 client
#[derive(Clone)]
pub struct YoutubeApi {
    client: Client,
    api_key: String,
    base_url: String,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

impl YoutubeApi {
    pub fn new(api_key: String, config: &YoutubeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            max_results: config.max_results,
        })
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("GET {} {:?}", url, params);

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Api {
                endpoint: endpoint.to_string(),
                status,
                body,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl MetadataClient for YoutubeApi {
    async fn list_channels(&self, ids: &[String]) -> Result<Vec<Channel>> {
        let id = ids.join(",");
        let response: ListResponse<Channel> = self
            .get("channels", &[("part", PART), ("id", id.as_str())])
            .await?;
        Ok(response.items)
    }

    async fn list_playlist_items(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemsPage> {
        let max_results = self.max_results.to_string();
        let mut params = vec![
            ("part", "contentDetails"),
            ("playlistId", playlist_id),
            ("maxResults", max_results.as_str()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }
        self.get("playlistItems", &params).await
    }

    async fn list_videos(&self, ids: &[String]) -> Result<Vec<Video>> {
        let id = ids.join(",");
        let response: ListResponse<Video> = self
            .get("videos", &[("part", PART), ("id", id.as_str())])
            .await?;
        Ok(response.items)
    }
}
