//! In-process fake of the YouTube Data API for tests.
//!
//! An axum router bound to an ephemeral localhost port. Replies are scripted per
//! resource and every request is counted, so tests can assert that a path made no
//! upstream calls at all.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

/// A scripted upstream reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Status(u16, String),
    /// 200 with this exact body, for malformed-JSON cases.
    Raw(String),
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Self::Json(value) => Json(value).into_response(),
            Self::Status(code, body) => (
                StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                body,
            )
                .into_response(),
            Self::Raw(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        }
    }
}

fn empty_list() -> Reply {
    Reply::Json(json!({ "items": [] }))
}

#[derive(Debug)]
struct FakeState {
    latest: Reply,
    live: Reply,
    channel: Reply,
    /// Overrides the paged playlist when set.
    playlist: Option<Reply>,
    playlist_pages: Vec<Vec<Value>>,
    /// Statistics calls containing one of these ids fail with the given status.
    stats_failures: HashMap<String, u16>,
    stats_requests: Vec<String>,
    hits: HashMap<&'static str, usize>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            latest: empty_list(),
            live: empty_list(),
            channel: empty_list(),
            playlist: None,
            playlist_pages: Vec::new(),
            stats_failures: HashMap::new(),
            stats_requests: Vec::new(),
            hits: HashMap::new(),
        }
    }
}

impl FakeState {
    fn hit(&mut self, resource: &'static str) {
        *self.hits.entry(resource).or_default() += 1;
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeYouTube {
    state: Arc<Mutex<FakeState>>,
}

impl FakeYouTube {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn set_latest(&self, reply: Reply) {
        self.with(|s| s.latest = reply);
    }

    pub fn set_live(&self, reply: Reply) {
        self.with(|s| s.live = reply);
    }

    pub fn set_channel(&self, reply: Reply) {
        self.with(|s| s.channel = reply);
    }

    pub fn set_playlist(&self, reply: Reply) {
        self.with(|s| s.playlist = Some(reply));
    }

    /// Serves these pages, linked by `page-N` continuation tokens.
    pub fn set_playlist_pages(&self, pages: Vec<Vec<Value>>) {
        self.with(|s| s.playlist_pages = pages);
    }

    pub fn fail_stats_for(&self, video_id: &str, status: u16) {
        self.with(|s| s.stats_failures.insert(video_id.to_string(), status));
    }

    /// Requests received for `resource`: `latest`, `live`, `videos`, `channels` or
    /// `playlistItems`.
    pub fn hits(&self, resource: &str) -> usize {
        self.with(|s| s.hits.get(resource).copied().unwrap_or(0))
    }

    pub fn total_hits(&self) -> usize {
        self.with(|s| s.hits.values().sum())
    }

    /// The `id` parameter of every statistics request, in arrival order.
    pub fn stats_requests(&self) -> Vec<String> {
        self.with(|s| s.stats_requests.clone())
    }

    /// Starts serving on an ephemeral port and returns the base URL.
    pub async fn spawn(&self) -> String {
        let app = Router::new()
            .route("/search", get(search))
            .route("/videos", get(videos))
            .route("/channels", get(channels))
            .route("/playlistItems", get(playlist_items))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind fake upstream");
        let addr = listener.local_addr().expect("fake upstream has no address");
        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("fake upstream stopped");
        });
        format!("http://{addr}")
    }
}

type Params = Query<HashMap<String, String>>;

fn missing_key(params: &HashMap<String, String>) -> Option<Response> {
    (!params.contains_key("key")).then(|| (StatusCode::BAD_REQUEST, "missing key").into_response())
}

async fn search(State(fake): State<FakeYouTube>, Query(params): Params) -> Response {
    let live = params.get("eventType").is_some_and(|e| e == "live");
    let reply = fake.with(|s| {
        if live {
            s.hit("live");
            s.live.clone()
        } else {
            s.hit("latest");
            s.latest.clone()
        }
    });
    missing_key(&params).unwrap_or_else(|| reply.into_response())
}

async fn videos(State(fake): State<FakeYouTube>, Query(params): Params) -> Response {
    let ids = params.get("id").cloned().unwrap_or_default();
    let failure = fake.with(|s| {
        s.hit("videos");
        s.stats_requests.push(ids.clone());
        ids.split(',').find_map(|id| s.stats_failures.get(id).copied())
    });
    if let Some(resp) = missing_key(&params) {
        return resp;
    }
    if let Some(status) = failure {
        return Reply::Status(status, "statistics unavailable".into()).into_response();
    }

    let items: Vec<Value> = ids
        .split(',')
        .filter(|id| !id.is_empty())
        .map(|id| {
            json!({
                "id": id,
                "statistics": { "viewCount": "100", "likeCount": "10" },
                "contentDetails": { "duration": "PT3M20S" },
            })
        })
        .collect();
    Json(json!({ "items": items })).into_response()
}

async fn channels(State(fake): State<FakeYouTube>, Query(params): Params) -> Response {
    let reply = fake.with(|s| {
        s.hit("channels");
        s.channel.clone()
    });
    missing_key(&params).unwrap_or_else(|| reply.into_response())
}

async fn playlist_items(State(fake): State<FakeYouTube>, Query(params): Params) -> Response {
    let reply = fake.with(|s| {
        s.hit("playlistItems");
        if let Some(reply) = &s.playlist {
            return reply.clone();
        }
        let index = params
            .get("pageToken")
            .and_then(|t| t.strip_prefix("page-"))
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(0);
        let items = s.playlist_pages.get(index).cloned().unwrap_or_default();
        let mut page = json!({ "items": items });
        if index + 1 < s.playlist_pages.len() {
            page["nextPageToken"] = json!(format!("page-{}", index + 1));
        }
        Reply::Json(page)
    });
    missing_key(&params).unwrap_or_else(|| reply.into_response())
}

/// A `search.list` item for a video.
pub fn search_item(video_id: &str, title: &str) -> Value {
    json!({
        "id": { "kind": "youtube#video", "videoId": video_id },
        "snippet": {
            "title": title,
            "description": format!("About {title}"),
            "publishedAt": "2025-03-01T18:00:00Z",
            "thumbnails": {
                "default": { "url": format!("https://i.ytimg.com/vi/{video_id}/default.jpg") },
                "high": { "url": format!("https://i.ytimg.com/vi/{video_id}/hqdefault.jpg") },
            },
        },
    })
}

/// A `playlistItems.list` item. `video_id: None` models a deleted or private video.
pub fn playlist_item(video_id: Option<&str>, title: Option<&str>) -> Value {
    let mut item = json!({
        "snippet": {
            "description": "",
            "channelTitle": "Vitrine",
            "publishedAt": "2025-01-15T12:00:00Z",
            "thumbnails": {},
        },
        "contentDetails": {},
    });
    if let Some(title) = title {
        item["snippet"]["title"] = json!(title);
    }
    if let Some(id) = video_id {
        item["contentDetails"]["videoId"] = json!(id);
        item["snippet"]["thumbnails"]["medium"] =
            json!({ "url": format!("https://i.ytimg.com/vi/{id}/mqdefault.jpg") });
    }
    item
}
