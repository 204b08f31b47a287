//! Error types for upstream calls and for the endpoint itself.
//!
//! `UpstreamError` is produced per call to the video platform and keeps the HTTP status as
//! data, so quota exhaustion (HTTP 403) can be matched on instead of sniffed from text.
//! `AppError` is what the endpoint surfaces; only configuration problems and failures of
//! the primary latest-video search ever reach it.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// HTTP status the video platform uses to report an exhausted daily quota.
pub const QUOTA_EXCEEDED_STATUS: u16 = 403;

/// Failure of a single call to the video platform.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("quota exceeded (HTTP {status})")]
    QuotaExceeded { status: u16 },

    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl UpstreamError {
    /// Builds the error for a non-2xx response.
    pub fn from_status(status: u16, body: String) -> Self {
        if status == QUOTA_EXCEEDED_STATUS {
            Self::QuotaExceeded { status }
        } else {
            Self::Status { status, body }
        }
    }

    /// True when this failure must arm the quota circuit breaker.
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

/// Unified error type for the endpoint.
///
/// Implements `IntoResponse` so handlers can return `Result<_, AppError>` directly.
/// The JSON response shape is `{ "error": "...", "status"?, "body"?, "details"? }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("API key manquante")]
    MissingApiKey,

    #[error("failed to fetch the latest video")]
    LatestVideo(#[source] UpstreamError),
}

impl AppError {
    /// Returns the machine-readable error code (e.g. "MISSING_API_KEY").
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingApiKey => "MISSING_API_KEY",
            Self::LatestVideo(_) => "LATEST_VIDEO_FAILED",
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingApiKey | Self::LatestVideo(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::MissingApiKey => json!({ "error": self.to_string() }),
            Self::LatestVideo(UpstreamError::Status { status, body }) => json!({
                "error": self.to_string(),
                "status": status,
                "body": body,
            }),
            Self::LatestVideo(source) => json!({
                "error": self.to_string(),
                "details": source.to_string(),
            }),
        };
        (status, axum::Json(body)).into_response()
    }
}
