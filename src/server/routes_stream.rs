//! SSE transport for progressive aggregation sessions.
//!
//! Each request gets its own aggregator, emitter task, and capacity-1
//! channel. Frames are sent as unnamed SSE events so a browser's
//! `EventSource.onmessage` handler receives everything; the terminal frame's
//! `is_complete` field tells the client no further frames will arrive, after
//! which the channel drops and the transport closes.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tracing::debug;
use uuid::Uuid;

use crate::aggregate::{BatchSource, BrowseAggregator, SearchAggregator};
use crate::catalog::BrowseCategory;
use crate::server::{ApiError, AppContext};
use crate::stream::ProgressiveEmitter;

pub fn stream_routes() -> Router<AppContext> {
    Router::new()
        .route("/browse/:category/events", get(browse_events))
        .route("/search/events", get(search_events))
}

#[derive(Debug, Deserialize)]
struct BrowseStreamParams {
    target: Option<usize>,
}

async fn browse_events(
    State(ctx): State<AppContext>,
    Path(category): Path<String>,
    Query(params): Query<BrowseStreamParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let category: BrowseCategory = category.parse().map_err(ApiError::bad_request)?;
    let target = params
        .target
        .unwrap_or(ctx.config.aggregation.default_target_count);

    let aggregator = BrowseAggregator::new(
        ctx.catalog.clone(),
        category,
        target,
        &ctx.config.aggregation,
    );
    Ok(spawn_session(aggregator, &ctx))
}

#[derive(Debug, Deserialize)]
struct SearchStreamParams {
    query: String,
}

async fn search_events(
    State(ctx): State<AppContext>,
    Query(params): Query<SearchStreamParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let query = params.query.trim();
    if query.is_empty() {
        return Err(ApiError::bad_request("query must not be empty"));
    }

    let aggregator = SearchAggregator::new(ctx.catalog.clone(), query, &ctx.config.aggregation);
    Ok(spawn_session(aggregator, &ctx))
}

/// Wire an aggregator to a fresh emitter task and adapt its frames to SSE.
fn spawn_session<S: BatchSource + 'static>(
    source: S,
    ctx: &AppContext,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = Uuid::new_v4();
    let budget = Duration::from_secs(ctx.config.aggregation.session_budget_secs);
    let (tx, rx) = mpsc::channel(ProgressiveEmitter::<S>::CHANNEL_CAPACITY);

    let label = source.source_label().to_string();
    debug!(%session_id, source = %label, "streaming session started");

    let emitter = ProgressiveEmitter::new(source, tx, budget);
    tokio::spawn(async move {
        let state = emitter.run().await;
        debug!(%session_id, source = %label, ?state, "streaming session finished");
    });

    let stream = ReceiverStream::new(rx).map(|frame| {
        let data = serde_json::to_string(&frame).unwrap_or_else(|e| {
            format!(r#"{{"error":"serialization failed: {e}","is_complete":true}}"#)
        });
        Ok(Event::default().data(data))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
