//! Response types served by the endpoint, with serde serialization and OpenAPI schemas.
//!
//! All response types use `camelCase` field names for the JSON wire format. Every field
//! has a default so the payload keeps its shape when upstream lookups fail.

use serde::{Serialize, Serializer};
use utoipa::ToSchema;

/// Aggregated payload consumed by the gallery and stats pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedPayload {
    /// Most recent upload of the channel, if one was found.
    pub video_data: Option<VideoData>,
    pub live_data: LiveData,
    pub channel_data: ChannelData,
    /// Every video of the configured playlist, in playlist order.
    pub playlist_videos: Vec<PlaylistVideoRecord>,
}

impl AggregatedPayload {
    /// The fixed empty-shape payload served while the quota breaker is armed.
    pub fn fallback() -> Self {
        Self::default()
    }
}

/// Latest upload of the channel, enriched with its statistics.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoData {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail: Option<String>,
    pub published_at: Option<String>,
    pub view_count: Option<u64>,
    /// ISO-8601 duration as reported upstream (e.g. `PT4M13S`).
    pub duration: Option<String>,
    pub like_count: Option<u64>,
}

/// Whether the channel is currently broadcasting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LiveData {
    pub is_live: bool,
    /// Watch URL of the broadcast, or `false` when not live.
    #[serde(serialize_with = "url_or_false")]
    #[schema(value_type = Object)]
    pub url: Option<String>,
}

impl LiveData {
    pub fn live(video_id: &str) -> Self {
        Self {
            is_live: true,
            url: Some(format!("https://www.youtube.com/watch?v={video_id}")),
        }
    }
}

fn url_or_false<S: Serializer>(url: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    match url {
        Some(url) => serializer.serialize_str(url),
        None => serializer.serialize_bool(false),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChannelData {
    pub subscriber_count: Option<u64>,
    pub video_count: Option<u64>,
}

/// One video of the playlist. Items without a video id never become records.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistVideoRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail: Option<String>,
    pub published_at: Option<String>,
    pub channel_title: String,
    /// Index of the video inside the playlist.
    pub position: u64,
    pub view_count: Option<u64>,
    pub duration: Option<String>,
    pub like_count: Option<u64>,
}

/// Error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable error description.
    pub error: String,
    /// HTTP status returned by the upstream, when it answered.
    pub status: Option<u16>,
    /// Raw upstream response body.
    pub body: Option<String>,
    pub details: Option<String>,
}

/// Operational view of the cache and quota breaker.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatusResponse {
    pub has_data: bool,
    /// When the cached payload was captured.
    pub cached_at: Option<chrono::DateTime<chrono::Utc>>,
    pub cache_age_secs: Option<u64>,
    /// Whether the cached payload is still served without calling upstream.
    pub fresh: bool,
    pub quota_exceeded: bool,
    pub quota_exceeded_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Seconds until upstream calls resume, when the breaker is armed.
    pub quota_cooldown_remaining_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn fallback_shape() {
        let value = serde_json::to_value(AggregatedPayload::fallback()).unwrap();
        assert_eq!(
            value,
            json!({
                "videoData": null,
                "liveData": { "isLive": false, "url": false },
                "channelData": { "subscriberCount": null, "videoCount": null },
                "playlistVideos": [],
            })
        );
    }

    #[test]
    fn live_url_serializes_as_string() {
        let value = serde_json::to_value(LiveData::live("abc123")).unwrap();
        assert_eq!(value["isLive"], true);
        assert_eq!(value["url"], "https://www.youtube.com/watch?v=abc123");
    }
}
