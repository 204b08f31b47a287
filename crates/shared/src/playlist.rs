//! Full playlist retrieval.
//!
//! Walks a playlist page by page with the continuation token and enriches every page with
//! one batched statistics lookup. A failed statistics lookup only strips the counts of
//! that page; a failed page lookup ends the walk with an error.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::UpstreamError;
use crate::models::PlaylistVideoRecord;
use crate::youtube::{PlaylistItem, VideoResource, YouTubeClient};

/// Upper bound on page requests for one playlist.
pub const MAX_PAGES: usize = 10;

/// Pause between two page requests.
pub const PAGE_DELAY: Duration = Duration::from_millis(100);

pub const UNTITLED: &str = "Titre non disponible";

/// Records of a playlist, in playlist order.
#[derive(Debug, Default)]
pub struct PlaylistVideos {
    pub videos: Vec<PlaylistVideoRecord>,
    /// A statistics lookup hit the quota. Pagination went on, but the caller must arm
    /// the breaker.
    pub quota_exceeded: bool,
    pub pages_fetched: usize,
}

/// Fetches every video of `playlist_id`, up to `MAX_PAGES` pages.
///
/// Fails with `UpstreamError::QuotaExceeded` when a page lookup hits the quota and with
/// the page's error otherwise.
pub async fn fetch_all_playlist_videos(
    client: &YouTubeClient,
    key: &str,
    playlist_id: &str,
) -> Result<PlaylistVideos, UpstreamError> {
    let mut out = PlaylistVideos::default();
    let mut page_token: Option<String> = None;

    loop {
        let page = client
            .playlist_page(key, playlist_id, page_token.as_deref())
            .await?;
        out.pages_fetched += 1;

        let ids: Vec<String> = page
            .items
            .iter()
            .filter_map(|item| item.content_details.video_id.clone())
            .filter(|id| !id.is_empty())
            .collect();

        let stats = if ids.is_empty() {
            HashMap::new()
        } else {
            match client.video_statistics(key, &ids).await {
                Ok(stats) => stats,
                Err(e) => {
                    out.quota_exceeded |= e.is_quota();
                    tracing::warn!(
                        playlist_id,
                        page = out.pages_fetched,
                        quota = e.is_quota(),
                        error = %e,
                        "statistics lookup failed, page emitted without counts"
                    );
                    HashMap::new()
                }
            }
        };

        for item in page.items {
            let position = out.videos.len() as u64;
            if let Some(record) = to_record(item, &stats, position) {
                out.videos.push(record);
            }
        }

        tracing::info!(
            playlist_id,
            page = out.pages_fetched,
            videos_total = out.videos.len(),
            "playlist page fetched"
        );

        page_token = page.next_page_token.filter(|token| !token.is_empty());
        match page_token {
            Some(_) if out.pages_fetched < MAX_PAGES => tokio::time::sleep(PAGE_DELAY).await,
            Some(_) => {
                tracing::warn!(
                    playlist_id,
                    max_pages = MAX_PAGES,
                    "page limit reached, remaining playlist items skipped"
                );
                break;
            }
            None => break,
        }
    }

    Ok(out)
}

/// Builds a record from a playlist item, or `None` for deleted/private videos
/// (missing or empty video id).
/// `fallback_position` is used when the item does not carry its own position.
fn to_record(
    item: PlaylistItem,
    stats: &HashMap<String, VideoResource>,
    fallback_position: u64,
) -> Option<PlaylistVideoRecord> {
    let id = item
        .content_details
        .video_id
        .filter(|id| !id.is_empty())?;
    let snippet = item.snippet;
    let stats = stats.get(&id);

    Some(PlaylistVideoRecord {
        title: snippet
            .title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string()),
        description: snippet.description.unwrap_or_default(),
        thumbnail: snippet.thumbnails.best(),
        published_at: snippet
            .published_at
            .or(item.content_details.video_published_at),
        channel_title: snippet.channel_title.unwrap_or_default(),
        position: snippet.position.unwrap_or(fallback_position),
        view_count: stats.and_then(|s| s.statistics.view_count),
        duration: stats.and_then(|s| s.content_details.duration.clone()),
        like_count: stats.and_then(|s| s.statistics.like_count),
        id,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::testing::{playlist_item, FakeYouTube, Reply};

    use super::*;

    fn pages(count: usize, per_page: usize) -> Vec<Vec<serde_json::Value>> {
        (0..count)
            .map(|p| {
                (0..per_page)
                    .map(|i| {
                        let id = format!("v{p}-{i}");
                        playlist_item(Some(&id), Some(&format!("Video {p}-{i}")))
                    })
                    .collect()
            })
            .collect()
    }

    async fn client_for(fake: &FakeYouTube) -> YouTubeClient {
        YouTubeClient::new(fake.spawn().await).unwrap()
    }

    #[tokio::test]
    async fn stops_after_max_pages() {
        let fake = FakeYouTube::new();
        fake.set_playlist_pages(pages(12, 2));
        let client = client_for(&fake).await;

        let result = fetch_all_playlist_videos(&client, "k", "pl").await.unwrap();

        assert_eq!(result.pages_fetched, MAX_PAGES);
        assert_eq!(fake.hits("playlistItems"), MAX_PAGES);
        assert_eq!(result.videos.len(), MAX_PAGES * 2);
        assert_eq!(result.videos.last().unwrap().id, "v9-1");
    }

    #[tokio::test]
    async fn follows_continuation_tokens_in_order() {
        let fake = FakeYouTube::new();
        fake.set_playlist_pages(pages(3, 2));
        let client = client_for(&fake).await;

        let result = fetch_all_playlist_videos(&client, "k", "pl").await.unwrap();
        let ids: Vec<&str> = result.videos.iter().map(|v| v.id.as_str()).collect();

        assert_eq!(ids, ["v0-0", "v0-1", "v1-0", "v1-1", "v2-0", "v2-1"]);
        assert_eq!(fake.hits("playlistItems"), 3);
        assert_eq!(fake.hits("videos"), 3);
        assert!(!result.quota_exceeded);
    }

    #[tokio::test]
    async fn items_without_id_are_dropped() {
        let fake = FakeYouTube::new();
        fake.set_playlist_pages(vec![vec![
            playlist_item(Some("a"), Some("A")),
            playlist_item(None, Some("Deleted video")),
            playlist_item(Some("b"), None),
        ]]);
        let client = client_for(&fake).await;

        let result = fetch_all_playlist_videos(&client, "k", "pl").await.unwrap();

        assert_eq!(result.videos.len(), 2);
        assert!(result.videos.iter().all(|v| v.title != "Deleted video"));
        assert_eq!(result.videos[1].title, UNTITLED);
        assert_eq!(fake.stats_requests(), vec!["a,b".to_string()]);
    }

    #[tokio::test]
    async fn stats_failure_keeps_page_without_counts() {
        let fake = FakeYouTube::new();
        fake.set_playlist_pages(pages(2, 2));
        fake.fail_stats_for("v0-0", 500);
        let client = client_for(&fake).await;

        let result = fetch_all_playlist_videos(&client, "k", "pl").await.unwrap();

        assert_eq!(result.videos.len(), 4);
        for video in &result.videos[..2] {
            assert_eq!(video.view_count, None);
            assert_eq!(video.duration, None);
            assert_eq!(video.like_count, None);
        }
        assert!(result.videos[2].view_count.is_some());
        assert!(!result.quota_exceeded);
    }

    #[tokio::test]
    async fn stats_quota_is_signalled_without_aborting() {
        let fake = FakeYouTube::new();
        fake.set_playlist_pages(pages(2, 1));
        fake.fail_stats_for("v1-0", 403);
        let client = client_for(&fake).await;

        let result = fetch_all_playlist_videos(&client, "k", "pl").await.unwrap();

        assert_eq!(result.videos.len(), 2);
        assert!(result.quota_exceeded);
        assert!(result.videos[0].view_count.is_some());
        assert_eq!(result.videos[1].view_count, None);
    }

    #[tokio::test]
    async fn page_quota_aborts() {
        let fake = FakeYouTube::new();
        fake.set_playlist(Reply::Status(403, "quotaExceeded".into()));
        let client = client_for(&fake).await;

        let err = fetch_all_playlist_videos(&client, "k", "pl").await.unwrap_err();
        assert!(err.is_quota());
    }

    #[tokio::test]
    async fn page_error_aborts() {
        let fake = FakeYouTube::new();
        fake.set_playlist(Reply::Status(404, "playlistNotFound".into()));
        let client = client_for(&fake).await;

        let err = fetch_all_playlist_videos(&client, "k", "pl").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn repeated_fetches_are_identical() {
        let fake = FakeYouTube::new();
        fake.set_playlist_pages(pages(2, 3));
        let client = client_for(&fake).await;

        let first = fetch_all_playlist_videos(&client, "k", "pl").await.unwrap();
        let second = fetch_all_playlist_videos(&client, "k", "pl").await.unwrap();

        assert_eq!(first.videos, second.videos);
    }

    #[tokio::test]
    async fn empty_video_ids_are_dropped() {
        let fake = FakeYouTube::new();
        fake.set_playlist_pages(vec![vec![
            playlist_item(Some("b"), Some("B")),
            playlist_item(Some(""), Some("Private video")),
        ]]);
        let client = client_for(&fake).await;

        let result = fetch_all_playlist_videos(&client, "k", "pl").await.unwrap();
        let ids: Vec<&str> = result.videos.iter().map(|v| v.id.as_str()).collect();

        assert_eq!(ids, ["b"]);
        assert_eq!(fake.stats_requests(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn pauses_between_pages() {
        let fake = FakeYouTube::new();
        fake.set_playlist_pages(pages(3, 1));
        let client = client_for(&fake).await;

        let start = std::time::Instant::now();
        let result = fetch_all_playlist_videos(&client, "k", "pl").await.unwrap();

        assert_eq!(result.pages_fetched, 3);
        // two pauses: none after the last page
        assert!(start.elapsed() >= PAGE_DELAY * 2);
    }

    #[test]
    fn record_defaults() {
        let item: PlaylistItem = serde_json::from_value(json!({
            "snippet": {
                "thumbnails": { "medium": { "url": "m" }, "default": { "url": "d" } }
            },
            "contentDetails": { "videoId": "x", "videoPublishedAt": "2024-01-01T00:00:00Z" }
        }))
        .unwrap();

        let record = to_record(item, &HashMap::new(), 7).unwrap();

        assert_eq!(record.title, UNTITLED);
        assert_eq!(record.description, "");
        assert_eq!(record.channel_title, "");
        assert_eq!(record.thumbnail.as_deref(), Some("m"));
        assert_eq!(record.published_at.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(record.position, 7);
        assert_eq!(record.view_count, None);
    }
}
