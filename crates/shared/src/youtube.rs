//! YouTube Data API v3 client.
//!
//! One method per resource the endpoint needs. Every method takes the API key explicitly,
//! checks the status before decoding, and reports 403 as `UpstreamError::QuotaExceeded`.
//! Upstream JSON is modelled with optional fields; defaults are substituted when the
//! records are built, never in the request path.
//!
//! See: <https://developers.google.com/youtube/v3/docs>

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::error::UpstreamError;

pub const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Largest page the playlist-items endpoint accepts.
pub const MAX_PAGE_SIZE: u32 = 50;

/// A `search.list` response.
///
/// See: <https://developers.google.com/youtube/v3/docs/search/list>
#[derive(Debug, Default, Deserialize)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub id: SearchResultId,
    #[serde(default)]
    pub snippet: Snippet,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResultId {
    #[serde(rename = "videoId")]
    pub video_id: Option<String>,
}

/// Snippet fields shared by search results and playlist items.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Snippet {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<String>,
    #[serde(rename = "channelTitle")]
    pub channel_title: Option<String>,
    pub position: Option<u64>,
    #[serde(default)]
    pub thumbnails: Thumbnails,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnails {
    pub maxres: Option<Thumbnail>,
    pub high: Option<Thumbnail>,
    pub medium: Option<Thumbnail>,
    pub default: Option<Thumbnail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
    pub url: Option<String>,
}

impl Thumbnails {
    /// Highest resolution available: maxres, then high, medium and default.
    pub fn best(&self) -> Option<String> {
        [&self.maxres, &self.high, &self.medium, &self.default]
            .into_iter()
            .flatten()
            .find_map(|t| t.url.clone())
    }
}

/// A `videos.list` response restricted to `statistics,contentDetails`.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos/list>
#[derive(Debug, Default, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoResource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoResource {
    /// Items without an id cannot be matched to a video and are skipped.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub statistics: VideoStatistics,
    #[serde(rename = "contentDetails", default)]
    pub content_details: VideoContentDetails,
}

/// Counts arrive as decimal strings; anything that does not parse becomes `None`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoStatistics {
    #[serde(rename = "viewCount", default, deserialize_with = "count")]
    pub view_count: Option<u64>,
    #[serde(rename = "likeCount", default, deserialize_with = "count")]
    pub like_count: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoContentDetails {
    pub duration: Option<String>,
}

/// A `channels.list` response restricted to `statistics`.
///
/// See: <https://developers.google.com/youtube/v3/docs/channels/list>
#[derive(Debug, Default, Deserialize)]
struct ChannelListResponse {
    #[serde(default)]
    items: Vec<ChannelResource>,
}

#[derive(Debug, Deserialize)]
struct ChannelResource {
    #[serde(default)]
    statistics: ChannelStatistics,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelStatistics {
    #[serde(rename = "subscriberCount", default, deserialize_with = "count")]
    pub subscriber_count: Option<u64>,
    #[serde(rename = "videoCount", default, deserialize_with = "count")]
    pub video_count: Option<u64>,
}

/// One page of a `playlistItems.list` response.
///
/// See: <https://developers.google.com/youtube/v3/docs/playlistItems/list>
#[derive(Debug, Default, Deserialize)]
pub struct PlaylistItemPage {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaylistItem {
    #[serde(default)]
    pub snippet: Snippet,
    #[serde(rename = "contentDetails", default)]
    pub content_details: PlaylistItemContentDetails,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaylistItemContentDetails {
    /// Absent for deleted or private videos.
    #[serde(rename = "videoId")]
    pub video_id: Option<String>,
    #[serde(rename = "videoPublishedAt")]
    pub video_published_at: Option<String>,
}

fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(s)) => s.parse().ok(),
        Some(Raw::Number(n)) => Some(n),
        Some(Raw::Other(_)) | None => None,
    })
}

/// HTTP client for the YouTube Data API.
///
/// Cheap to clone; the inner `reqwest::Client` pools connections. Each call has a 30s
/// timeout so a hung upstream cannot hold a request forever.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    client: Client,
    base_url: String,
}

impl YouTubeClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, UpstreamError> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(30)).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Most recent upload of a channel (`order=date`, one result).
    pub async fn search_latest_video(
        &self,
        key: &str,
        channel_id: &str,
    ) -> Result<Option<SearchResult>, UpstreamError> {
        let resp: SearchListResponse = self
            .get(
                "search",
                &[
                    ("key", key),
                    ("channelId", channel_id),
                    ("part", "snippet"),
                    ("order", "date"),
                    ("maxResults", "1"),
                    ("type", "video"),
                ],
            )
            .await?;
        Ok(resp.items.into_iter().next())
    }

    /// Id of the channel's ongoing live broadcast, if any.
    pub async fn search_live(
        &self,
        key: &str,
        channel_id: &str,
    ) -> Result<Option<String>, UpstreamError> {
        let resp: SearchListResponse = self
            .get(
                "search",
                &[
                    ("key", key),
                    ("channelId", channel_id),
                    ("part", "snippet"),
                    ("eventType", "live"),
                    ("type", "video"),
                    ("maxResults", "1"),
                ],
            )
            .await?;
        Ok(resp.items.into_iter().next().and_then(|item| item.id.video_id))
    }

    /// Statistics for up to 50 videos in one call, keyed by video id.
    pub async fn video_statistics(
        &self,
        key: &str,
        video_ids: &[String],
    ) -> Result<HashMap<String, VideoResource>, UpstreamError> {
        let ids = video_ids.join(",");
        let resp: VideoListResponse = self
            .get(
                "videos",
                &[
                    ("key", key),
                    ("id", ids.as_str()),
                    ("part", "statistics,contentDetails"),
                ],
            )
            .await?;
        Ok(resp
            .items
            .into_iter()
            .filter_map(|video| Some((video.id.clone()?, video)))
            .collect())
    }

    pub async fn channel_statistics(
        &self,
        key: &str,
        channel_id: &str,
    ) -> Result<Option<ChannelStatistics>, UpstreamError> {
        let resp: ChannelListResponse = self
            .get(
                "channels",
                &[("key", key), ("id", channel_id), ("part", "statistics")],
            )
            .await?;
        Ok(resp.items.into_iter().next().map(|c| c.statistics))
    }

    /// One page of playlist items. `page_token` is the continuation token of the
    /// previous page, `None` for the first one.
    pub async fn playlist_page(
        &self,
        key: &str,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemPage, UpstreamError> {
        let page_size = MAX_PAGE_SIZE.to_string();
        let mut query = vec![
            ("key", key),
            ("playlistId", playlist_id),
            ("part", "snippet,contentDetails"),
            ("maxResults", page_size.as_str()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }
        self.get("playlistItems", &query).await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &[(&str, &str)],
    ) -> Result<T, UpstreamError> {
        let url = format!("{}/{resource}", self.base_url);
        let resp = self.client.get(&url).query(query).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(UpstreamError::from_status(status.as_u16(), body));
        }

        let text = resp.text().await?;
        serde_json::from_str(&text).map_err(|e| UpstreamError::Malformed(e.to_string()))
    }
}
