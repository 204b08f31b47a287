//! Cache status endpoint.
//!
//! Reports the age of the cached payload and the state of the quota breaker. Reads the
//! in-memory cache only; it never calls upstream.

use std::time::Instant;

use axum::extract::State;
use axum::Json;

use vitrine_shared::models::CacheStatusResponse;

use crate::state::AppState;

/// Returns the state of the response cache and of the quota breaker.
#[utoipa::path(
    get,
    path = "/api/status",
    tag = "Status",
    summary = "Cache and quota breaker status",
    responses(
        (status = 200, description = "Current cache state", body = CacheStatusResponse)
    )
)]
pub async fn cache_status(State(state): State<AppState>) -> Json<CacheStatusResponse> {
    let cache = state.cache.read().await;
    Json(cache.status(Instant::now()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use vitrine_shared::feed::Sources;
    use vitrine_shared::models::AggregatedPayload;
    use vitrine_shared::youtube::YouTubeClient;

    use super::*;

    fn test_state() -> AppState {
        let client = YouTubeClient::new("http://127.0.0.1:9").unwrap();
        AppState::new(client, Sources::default())
    }

    #[tokio::test]
    async fn empty_cache() {
        let Json(status) = cache_status(State(test_state())).await;

        assert!(!status.has_data);
        assert!(!status.fresh);
        assert!(!status.quota_exceeded);
        assert_eq!(status.cache_age_secs, None);
    }

    #[tokio::test]
    async fn reports_armed_breaker() {
        let state = test_state();
        {
            let mut cache = state.cache.write().await;
            let now = Instant::now();
            cache.record_snapshot(Arc::new(AggregatedPayload::fallback()), now);
            cache.record_quota_exceeded(now);
        }

        let Json(status) = cache_status(State(state)).await;

        assert!(status.has_data);
        assert!(status.fresh);
        assert!(status.quota_exceeded);
        assert!(status.quota_cooldown_remaining_secs.unwrap() > 23 * 60 * 60);
    }
}
