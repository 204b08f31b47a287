//! Environment configuration.
//!
//! Environment variables:
//! - `YOUTUBE_API_KEY`: upstream credential (absence is reported per request)
//! - `YOUTUBE_CHANNEL_ID`: channel for latest video, live status and channel stats
//! - `YOUTUBE_PLAYLIST_ID`: playlist listed in the gallery
//! - `YOUTUBE_API_BASE`: upstream base URL (default: the public Data API v3)
//! - `ALLOWED_ORIGINS`: comma-separated CORS allow-list (default: none)
//! - `PORT`: HTTP listen port (default: 8080)

use std::env;

use crate::feed::Sources;
use crate::youtube::YOUTUBE_API_BASE;

#[derive(Debug, Clone)]
pub struct Config {
    pub sources: Sources,
    pub api_base: String,
    pub allowed_origins: Vec<String>,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            sources: Sources {
                api_key: var("YOUTUBE_API_KEY"),
                channel_id: var("YOUTUBE_CHANNEL_ID"),
                playlist_id: var("YOUTUBE_PLAYLIST_ID"),
            },
            api_base: var("YOUTUBE_API_BASE").unwrap_or_else(|| YOUTUBE_API_BASE.to_string()),
            allowed_origins: var("ALLOWED_ORIGINS")
                .map(|list| {
                    list.split(',')
                        .map(|origin| origin.trim().to_string())
                        .filter(|origin| !origin.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            port: var("PORT").and_then(|p| p.parse().ok()).unwrap_or(8080),
        }
    }
}
