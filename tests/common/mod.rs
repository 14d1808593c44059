//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which boots a wiremock upstream, builds a full
//! [`AppContext`] pointed at it, and (via [`with_server`]) starts Axum on a
//! random port for HTTP-level testing. Also carries JSON builders for
//! upstream catalog payloads and an SSE frame reader.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::{json, Value};
use wiremock::MockServer;

use cinefeed::config::Config;
use cinefeed::recommend::MemoryProfileStore;
use cinefeed::server::{create_router, AppContext};

/// Test harness wrapping a mock upstream catalog and a fully-constructed
/// [`AppContext`].
pub struct TestHarness {
    pub upstream: MockServer,
    pub profiles: Arc<MemoryProfileStore>,
    pub ctx: AppContext,
}

impl TestHarness {
    /// Create a new harness with default configuration.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a new harness, letting the test adjust configuration before the
    /// context is built.
    pub async fn with_config(mutate: impl FnOnce(&mut Config)) -> Self {
        let upstream = MockServer::start().await;

        let mut config = Config::default();
        config.catalog.base_url = upstream.uri();
        config.catalog.api_key = "test-key".to_string();
        // Tests hammer a local mock; the production pace would only slow them.
        config.catalog.rate_limit_per_sec = 1000;
        mutate(&mut config);

        let profiles = Arc::new(MemoryProfileStore::new());
        let ctx = AppContext::new(config, profiles.clone());

        Self {
            upstream,
            profiles,
            ctx,
        }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::with_server_config(|_| {}).await
    }

    /// Start an Axum server with adjusted config on a random port.
    pub async fn with_server_config(mutate: impl FnOnce(&mut Config)) -> (Self, SocketAddr) {
        let harness = Self::with_config(mutate).await;
        let app = create_router(harness.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    /// Number of requests the mock upstream has received so far.
    pub async fn upstream_request_count(&self) -> usize {
        self.upstream
            .received_requests()
            .await
            .map(|r| r.len())
            .unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Upstream payload builders
// ---------------------------------------------------------------------------

/// A raw upstream movie object with sensible defaults.
pub fn movie(id: u64, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "overview": format!("Overview of {title}"),
        "genre_ids": [18],
        "release_date": "2020-01-01",
        "popularity": 10.0,
        "vote_average": 7.5,
        "poster_path": format!("/poster-{id}.jpg"),
        "backdrop_path": format!("/backdrop-{id}.jpg"),
    })
}

/// A run of raw movies with consecutive ids.
pub fn movies(ids: std::ops::Range<u64>) -> Vec<Value> {
    ids.map(|id| movie(id, &format!("Movie {id}"))).collect()
}

/// A paginated upstream response body.
pub fn movie_page(page: u32, total_pages: u32, total_results: u64, results: Vec<Value>) -> Value {
    json!({
        "page": page,
        "results": results,
        "total_pages": total_pages,
        "total_results": total_results,
    })
}

// ---------------------------------------------------------------------------
// SSE consumption
// ---------------------------------------------------------------------------

/// Read the next data frame from an SSE response. Keep-alive comments are
/// skipped; `None` means the transport closed. `buf` carries partial events
/// across calls.
pub async fn next_frame(resp: &mut reqwest::Response, buf: &mut String) -> Option<Value> {
    loop {
        if let Some(pos) = buf.find("\n\n") {
            let event: String = buf.drain(..pos + 2).collect();
            for line in event.lines() {
                if let Some(data) = line.strip_prefix("data: ") {
                    return Some(
                        serde_json::from_str(data).expect("SSE data is not valid JSON"),
                    );
                }
            }
            continue;
        }
        match resp.chunk().await.expect("failed to read SSE chunk") {
            Some(chunk) => buf.push_str(&String::from_utf8_lossy(&chunk)),
            None => return None,
        }
    }
}

/// Read SSE frames until the terminal frame (`is_complete=true`) arrives.
pub async fn collect_frames(mut resp: reqwest::Response) -> Vec<Value> {
    let mut frames = Vec::new();
    let mut buf = String::new();

    while let Some(frame) = next_frame(&mut resp, &mut buf).await {
        let terminal = frame.get("is_complete").and_then(Value::as_bool) == Some(true);
        frames.push(frame);
        if terminal {
            break;
        }
    }

    frames
}

/// Ids of every record across all batches, in emission order.
pub fn emitted_ids(frames: &[Value]) -> Vec<u64> {
    frames
        .iter()
        .flat_map(|f| {
            f.get("batch")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default()
        })
        .filter_map(|r| r.get("id").and_then(Value::as_u64))
        .collect()
}
