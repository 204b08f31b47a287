//! Shared application state for the axum server.
//!
//! Holds the upstream client, the configured sources and the process-lifetime cache.
//! The cache lives only as long as the process; a restart begins with an empty cache
//! and a disarmed quota breaker.

use std::sync::Arc;

use vitrine_shared::cache::{CacheState, SharedCache};
use vitrine_shared::feed::Sources;
use vitrine_shared::youtube::YouTubeClient;

/// Shared state passed to all axum handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub client: YouTubeClient,
    pub sources: Arc<Sources>,
    /// Last aggregated payload plus the quota breaker. Never locked across upstream calls.
    pub cache: SharedCache,
}

impl AppState {
    pub fn new(client: YouTubeClient, sources: Sources) -> Self {
        Self {
            client,
            sources: Arc::new(sources),
            cache: CacheState::shared(),
        }
    }
}
