//! Vitrine API server.
//!
//! Single aggregation endpoint behind the creator site: latest upload, live status,
//! channel counts and the full gallery playlist, fetched from the YouTube Data API and
//! kept in an in-memory cache guarded by a quota circuit breaker.
//!
//! Configuration comes from the environment, see `vitrine_shared::config`.
//! `RUST_LOG` sets the tracing env filter.

mod routes;
mod state;

use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;
use utoipa_swagger_ui::SwaggerUi;

use vitrine_shared::config::Config;
use vitrine_shared::youtube::YouTubeClient;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vitrine API",
        description = "Aggregated YouTube channel data for the creator site",
        version = "1.0.0",
        license(name = "MIT")
    ),
    tags(
        (name = "YouTube", description = "Aggregated channel and playlist data"),
        (name = "Status", description = "Cache and quota breaker status")
    )
)]
struct ApiDoc;

/// CORS for the browser pages: configured origins only, `GET` and pre-flight.
/// `CorsLayer` adds `Vary: Origin` to every response.
fn cors(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "ignoring invalid origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

fn app(state: AppState, allowed_origins: &[String]) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .routes(routes!(routes::youtube::youtube_feed))
        .routes(routes!(routes::status::cache_status))
        .with_state(state)
        .split_for_parts();

    router
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", api))
        .route("/health", get(|| async { "ok" }))
        .layer(cors(allowed_origins))
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let config = Config::from_env();
    if config.sources.api_key.is_none() {
        tracing::warn!("YOUTUBE_API_KEY is not set, fetches will fail until it is");
    }

    let client = YouTubeClient::new(config.api_base.clone()).expect("failed to build HTTP client");
    let state = AppState::new(client, config.sources.clone());

    tracing::info!(
        api_base = %config.api_base,
        channel_configured = config.sources.channel_id.is_some(),
        playlist_configured = config.sources.playlist_id.is_some(),
        allowed_origins = config.allowed_origins.len(),
        "configuration loaded"
    );

    let app = app(state, &config.allowed_origins);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await
        .expect("server error");
}
