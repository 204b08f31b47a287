//! Builds the aggregated payload and decides when the upstream may be called at all.
//!
//! `serve` is the whole request path: breaker fallback, then fresh cache, then a live
//! fetch whose outcome is committed to the cache once at the end. `assemble` is the
//! fetch itself. Only the latest-video search can fail a request; every other lookup
//! degrades to its default value, and any quota error arms the breaker.

use std::sync::Arc;
use std::time::Instant;

use crate::cache::SharedCache;
use crate::error::{AppError, UpstreamError};
use crate::models::{AggregatedPayload, ChannelData, LiveData, VideoData};
use crate::playlist;
use crate::youtube::{SearchResult, YouTubeClient};

/// Upstream identifiers. Only the key is mandatory.
#[derive(Debug, Clone, Default)]
pub struct Sources {
    pub api_key: Option<String>,
    pub channel_id: Option<String>,
    pub playlist_id: Option<String>,
}

/// Result of one fetch against the upstream.
#[derive(Debug)]
pub enum Assembly {
    /// The latest-video search hit the quota; nothing else was fetched.
    QuotaShortCircuit,
    /// A payload was built. `quota_exceeded` is set when a secondary lookup hit the quota.
    Built {
        payload: AggregatedPayload,
        quota_exceeded: bool,
    },
}

/// What the endpoint answers with, and how long clients may cache it.
#[derive(Debug, Clone)]
pub enum Served {
    /// Breaker armed, no upstream call made.
    Fallback(Arc<AggregatedPayload>),
    /// Fresh cached payload, no upstream call made.
    Cached(Arc<AggregatedPayload>),
    /// Latest-video search hit the quota during this request.
    QuotaShortCircuit(Arc<AggregatedPayload>),
    Fetched(Arc<AggregatedPayload>),
}

impl Served {
    pub fn payload(&self) -> &Arc<AggregatedPayload> {
        match self {
            Self::Fallback(p) | Self::Cached(p) | Self::QuotaShortCircuit(p) | Self::Fetched(p) => {
                p
            }
        }
    }

    /// `Cache-Control` max-age, in seconds.
    pub fn max_age(&self) -> u32 {
        match self {
            Self::Fallback(_) => 3600,
            Self::QuotaShortCircuit(_) => 86400,
            Self::Cached(_) | Self::Fetched(_) => 300,
        }
    }

    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Fallback(_) => "fallback",
            Self::Cached(_) => "cache",
            Self::QuotaShortCircuit(_) => "quota_short_circuit",
            Self::Fetched(_) => "fetched",
        }
    }
}

/// Answers one request: serves from the breaker or the cache when allowed, fetches
/// otherwise and commits the result.
pub async fn serve(
    client: &YouTubeClient,
    sources: &Sources,
    cache: &SharedCache,
) -> Result<Served, AppError> {
    let now = Instant::now();
    {
        let state = cache.read().await;
        if state.should_serve_fallback(now) {
            return Ok(Served::Fallback(Arc::new(AggregatedPayload::fallback())));
        }
        if state.should_serve_cache(now) {
            if let Some(data) = state.data() {
                return Ok(Served::Cached(data));
            }
        }
    }

    let key = sources.api_key.as_deref().ok_or(AppError::MissingApiKey)?;
    let assembly = assemble(client, key, sources).await?;

    let mut state = cache.write().await;
    let served = match assembly {
        Assembly::QuotaShortCircuit => {
            let payload = Arc::new(AggregatedPayload::fallback());
            state.record_snapshot(payload.clone(), now);
            state.record_quota_exceeded(now);
            Served::QuotaShortCircuit(payload)
        }
        Assembly::Built {
            payload,
            quota_exceeded,
        } => {
            let payload = Arc::new(payload);
            if quota_exceeded {
                state.record_snapshot(payload.clone(), now);
                state.record_quota_exceeded(now);
            } else {
                state.record_success(payload.clone(), now);
            }
            Served::Fetched(payload)
        }
    };
    Ok(served)
}

/// Fetches and merges every configured source.
///
/// The latest-video and live searches run concurrently; the remaining lookups run one
/// after the other.
pub async fn assemble(
    client: &YouTubeClient,
    key: &str,
    sources: &Sources,
) -> Result<Assembly, AppError> {
    let channel_id = sources.channel_id.as_deref();

    let (latest, live) = tokio::join!(
        async {
            match channel_id {
                Some(id) => client.search_latest_video(key, id).await.map(Some),
                None => Ok(None),
            }
        },
        async {
            match channel_id {
                Some(id) => client.search_live(key, id).await.map(Some),
                None => Ok(None),
            }
        },
    );

    let latest = match latest {
        Ok(found) => found.flatten(),
        Err(e) if e.is_quota() => {
            tracing::error!(source = "latest", error = %e, "quota exceeded, arming breaker");
            return Ok(Assembly::QuotaShortCircuit);
        }
        Err(UpstreamError::Malformed(e)) => {
            tracing::warn!(source = "latest", error = %e, "unreadable search response");
            None
        }
        Err(e) => {
            tracing::error!(source = "latest", error = %e, "latest video search failed");
            return Err(AppError::LatestVideo(e));
        }
    };

    let mut quota_exceeded = false;

    let video_data = match latest {
        Some(result) => video_data(client, key, result, &mut quota_exceeded).await,
        None => None,
    };

    let live_data = match live {
        Ok(Some(Some(video_id))) => LiveData::live(&video_id),
        Ok(_) => LiveData::default(),
        Err(e) => {
            quota_exceeded |= degrade("live", &e);
            LiveData::default()
        }
    };

    let channel_data = match channel_id {
        Some(id) => match client.channel_statistics(key, id).await {
            Ok(stats) => stats
                .map(|s| ChannelData {
                    subscriber_count: s.subscriber_count,
                    video_count: s.video_count,
                })
                .unwrap_or_default(),
            Err(e) => {
                quota_exceeded |= degrade("channel", &e);
                ChannelData::default()
            }
        },
        None => ChannelData::default(),
    };

    let playlist_videos = match sources.playlist_id.as_deref() {
        Some(id) => match playlist::fetch_all_playlist_videos(client, key, id).await {
            Ok(fetched) => {
                quota_exceeded |= fetched.quota_exceeded;
                tracing::info!(
                    playlist_id = id,
                    videos = fetched.videos.len(),
                    pages = fetched.pages_fetched,
                    "playlist fetched"
                );
                fetched.videos
            }
            Err(e) => {
                quota_exceeded |= degrade("playlist", &e);
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    Ok(Assembly::Built {
        payload: AggregatedPayload {
            video_data,
            live_data,
            channel_data,
            playlist_videos,
        },
        quota_exceeded,
    })
}

async fn video_data(
    client: &YouTubeClient,
    key: &str,
    result: SearchResult,
    quota_exceeded: &mut bool,
) -> Option<VideoData> {
    let id = result.id.video_id?;
    let stats = match client.video_statistics(key, std::slice::from_ref(&id)).await {
        Ok(mut stats) => stats.remove(&id),
        Err(e) => {
            *quota_exceeded |= degrade("video_stats", &e);
            None
        }
    };

    let snippet = result.snippet;
    Some(VideoData {
        title: snippet.title.unwrap_or_default(),
        description: snippet.description.unwrap_or_default(),
        thumbnail: snippet.thumbnails.best(),
        published_at: snippet.published_at,
        view_count: stats.as_ref().and_then(|s| s.statistics.view_count),
        duration: stats.as_ref().and_then(|s| s.content_details.duration.clone()),
        like_count: stats.as_ref().and_then(|s| s.statistics.like_count),
        id,
    })
}

/// Logs a failed secondary lookup and reports whether it must arm the breaker.
fn degrade(source: &'static str, err: &UpstreamError) -> bool {
    tracing::warn!(
        source,
        quota = err.is_quota(),
        error = %err,
        "secondary lookup failed, using default"
    );
    err.is_quota()
}
