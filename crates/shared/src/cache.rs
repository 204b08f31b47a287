//! Process-lifetime response cache and quota circuit breaker.
//!
//! Holds the last aggregated payload and whether the upstream recently reported quota
//! exhaustion. Nothing is persisted: a restart starts empty. Expiry decisions take a
//! monotonic `now` from the caller; wall-clock times are only kept for reporting.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::models::{AggregatedPayload, CacheStatusResponse};

/// How long a successful payload is served without calling upstream.
pub const FRESH_DURATION: Duration = Duration::from_secs(5 * 60);

/// How long a quota error suppresses every upstream call.
pub const QUOTA_COOLDOWN: Duration = Duration::from_secs(24 * 60 * 60);

/// Cache shared by all request handlers.
pub type SharedCache = Arc<RwLock<CacheState>>;

#[derive(Debug, Clone)]
struct Stamp {
    at: Instant,
    wall: DateTime<Utc>,
}

impl Stamp {
    fn new(at: Instant) -> Self {
        Self {
            at,
            wall: Utc::now(),
        }
    }

    /// Whether `now` lies within `window` of this stamp.
    fn within(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.at) < window
    }
}

#[derive(Debug)]
pub struct CacheState {
    data: Option<(Arc<AggregatedPayload>, Stamp)>,
    /// Set when the upstream reported quota exhaustion. Flag and time live in one field.
    quota_exceeded: Option<Stamp>,
    fresh_duration: Duration,
    quota_cooldown: Duration,
}

impl Default for CacheState {
    fn default() -> Self {
        Self::new(FRESH_DURATION, QUOTA_COOLDOWN)
    }
}

impl CacheState {
    pub fn new(fresh_duration: Duration, quota_cooldown: Duration) -> Self {
        Self {
            data: None,
            quota_exceeded: None,
            fresh_duration,
            quota_cooldown,
        }
    }

    pub fn shared() -> SharedCache {
        Arc::new(RwLock::new(Self::default()))
    }

    /// True while the quota breaker is armed; callers then serve the empty fallback.
    pub fn should_serve_fallback(&self, now: Instant) -> bool {
        self.quota_exceeded
            .as_ref()
            .is_some_and(|stamp| stamp.within(now, self.quota_cooldown))
    }

    /// True while the stored payload is fresh enough to be served verbatim.
    pub fn should_serve_cache(&self, now: Instant) -> bool {
        self.data
            .as_ref()
            .is_some_and(|(_, stamp)| stamp.within(now, self.fresh_duration))
    }

    /// The stored payload, if any, regardless of freshness.
    pub fn data(&self) -> Option<Arc<AggregatedPayload>> {
        self.data.as_ref().map(|(payload, _)| payload.clone())
    }

    /// Stores a payload assembled without quota errors and disarms the breaker.
    pub fn record_success(&mut self, payload: Arc<AggregatedPayload>, now: Instant) {
        self.record_snapshot(payload, now);
        self.quota_exceeded = None;
    }

    /// Stores the best payload available while leaving the breaker as it is.
    pub fn record_snapshot(&mut self, payload: Arc<AggregatedPayload>, now: Instant) {
        self.data = Some((payload, Stamp::new(now)));
    }

    /// Arms the breaker for the full cooldown starting at `now`.
    pub fn record_quota_exceeded(&mut self, now: Instant) {
        self.quota_exceeded = Some(Stamp::new(now));
    }

    pub fn status(&self, now: Instant) -> CacheStatusResponse {
        let armed = self.should_serve_fallback(now);
        CacheStatusResponse {
            has_data: self.data.is_some(),
            cached_at: self.data.as_ref().map(|(_, stamp)| stamp.wall),
            cache_age_secs: self
                .data
                .as_ref()
                .map(|(_, stamp)| now.saturating_duration_since(stamp.at).as_secs()),
            fresh: self.should_serve_cache(now),
            quota_exceeded: armed,
            quota_exceeded_at: self.quota_exceeded.as_ref().map(|stamp| stamp.wall),
            quota_cooldown_remaining_secs: self.quota_exceeded.as_ref().filter(|_| armed).map(
                |stamp| {
                    self.quota_cooldown
                        .saturating_sub(now.saturating_duration_since(stamp.at))
                        .as_secs()
                },
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> Arc<AggregatedPayload> {
        Arc::new(AggregatedPayload::fallback())
    }

    #[test]
    fn empty_cache_serves_nothing() {
        let cache = CacheState::default();
        let now = Instant::now();

        assert!(!cache.should_serve_cache(now));
        assert!(!cache.should_serve_fallback(now));
        assert!(cache.data().is_none());
    }

    #[test]
    fn fresh_window_expires() {
        let mut cache = CacheState::default();
        let t0 = Instant::now();
        cache.record_success(payload(), t0);

        assert!(cache.should_serve_cache(t0 + Duration::from_secs(299)));
        assert!(!cache.should_serve_cache(t0 + FRESH_DURATION));
        // stale data stays stored even though it is no longer served
        assert!(cache.data().is_some());
    }

    #[test]
    fn breaker_lasts_for_cooldown() {
        let mut cache = CacheState::default();
        let t0 = Instant::now();
        cache.record_quota_exceeded(t0);

        assert!(cache.should_serve_fallback(t0 + Duration::from_secs(23 * 60 * 60)));
        assert!(!cache.should_serve_fallback(t0 + QUOTA_COOLDOWN));
    }

    #[test]
    fn success_disarms_breaker() {
        let mut cache = CacheState::default();
        let t0 = Instant::now();
        cache.record_quota_exceeded(t0);
        cache.record_success(payload(), t0 + Duration::from_secs(1));

        assert!(!cache.should_serve_fallback(t0 + Duration::from_secs(2)));
    }

    #[test]
    fn snapshot_keeps_breaker_armed() {
        let mut cache = CacheState::default();
        let t0 = Instant::now();
        cache.record_quota_exceeded(t0);
        cache.record_snapshot(payload(), t0);

        assert!(cache.should_serve_fallback(t0 + Duration::from_secs(60)));
        assert!(cache.should_serve_cache(t0 + Duration::from_secs(60)));
    }

    #[test]
    fn status_reports_cooldown() {
        let mut cache = CacheState::new(Duration::from_secs(10), Duration::from_secs(100));
        let t0 = Instant::now();
        cache.record_snapshot(payload(), t0);
        cache.record_quota_exceeded(t0);

        let status = cache.status(t0 + Duration::from_secs(30));
        assert!(status.has_data);
        assert!(!status.fresh);
        assert_eq!(status.cache_age_secs, Some(30));
        assert!(status.quota_exceeded);
        assert_eq!(status.quota_cooldown_remaining_secs, Some(70));

        let later = cache.status(t0 + Duration::from_secs(100));
        assert!(!later.quota_exceeded);
        assert_eq!(later.quota_cooldown_remaining_secs, None);
        assert!(later.quota_exceeded_at.is_some());
    }
}
