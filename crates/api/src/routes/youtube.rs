//! Aggregated YouTube endpoint.
//!
//! Serves the latest upload, live status, channel counts and the full playlist in one
//! payload. Upstream calls only happen when neither the quota breaker nor the fresh
//! cache can answer; the `Cache-Control` max-age depends on which path answered.

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;

use vitrine_shared::error::AppError;
use vitrine_shared::feed;
use vitrine_shared::models::AggregatedPayload;

use crate::state::AppState;

/// Returns the aggregated channel and playlist data.
#[utoipa::path(
    get,
    path = "/api/youtube",
    tag = "YouTube",
    summary = "Aggregated channel data",
    description = "Latest video, live status, channel statistics and every playlist video. \
        Served from cache for 5 minutes after a fetch, and as an empty fallback for 24 hours \
        after the upstream reports an exhausted quota.",
    responses(
        (status = 200, description = "Aggregated data, possibly cached or fallback", body = AggregatedPayload,
            headers(("Cache-Control" = String, description = "public, max-age=300 | 3600 | 86400"))),
        (status = 500, description = "Missing API key or latest video search failure", body = vitrine_shared::models::ErrorBody)
    )
)]
pub async fn youtube_feed(State(state): State<AppState>) -> Result<Response, AppError> {
    let served = feed::serve(&state.client, &state.sources, &state.cache)
        .await
        .inspect_err(|e| tracing::error!(code = e.code(), error = %e, "youtube feed failed"))?;

    let payload = served.payload();
    tracing::info!(
        outcome = served.outcome(),
        playlist_videos = payload.playlist_videos.len(),
        is_live = payload.live_data.is_live,
        "youtube feed served"
    );

    Ok((
        [(
            header::CACHE_CONTROL,
            format!("public, max-age={}", served.max_age()),
        )],
        Json(payload.as_ref()),
    )
        .into_response())
}
