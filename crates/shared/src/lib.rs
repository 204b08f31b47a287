//! Core of the creator-site YouTube endpoint: upstream client, playlist pagination,
//! response assembly and the in-process cache with its quota circuit breaker.

pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
pub mod models;
pub mod playlist;
pub mod youtube;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
