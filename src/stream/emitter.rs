//! Streaming session controller.
//!
//! [`ProgressiveEmitter`] pulls batches from a [`BatchSource`] and pushes
//! typed frames into a bounded channel, finishing with exactly one terminal
//! frame. The channel has capacity 1, so the emitter never requests the next
//! page until the previous frame has been handed to the transport: the
//! transport's own flow control becomes the fetch pace, and nothing unbounded
//! is buffered.
//!
//! State machine:
//!
//! ```text
//! Started -> Fetching -> Emitting -> (Fetching | Complete | Errored)
//! ```
//!
//! A producer error mid-run becomes a single terminal error frame, never a
//! silent abort. A closed channel means the client went away; the loop stops
//! before issuing another upstream call. Exceeding the soft session budget
//! completes with whatever was accumulated.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::aggregate::BatchSource;
use crate::catalog::MovieRecord;

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterState {
    Started,
    Fetching,
    Emitting,
    Complete,
    Errored,
}

/// One wire message. Data frames carry a non-empty batch and
/// `is_complete=false`; the terminal frame carries `is_complete=true` and,
/// for aborted runs, an `error` description.
#[derive(Debug, Clone, Serialize)]
pub struct StreamFrame {
    pub batch: Vec<MovieRecord>,
    pub running_total: u64,
    pub source_label: String,
    pub page_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_available: Option<u64>,
    pub is_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Pull-based streaming session over any [`BatchSource`].
pub struct ProgressiveEmitter<S: BatchSource> {
    source: S,
    tx: mpsc::Sender<StreamFrame>,
    session_budget: Duration,
    state: EmitterState,
}

impl<S: BatchSource> ProgressiveEmitter<S> {
    /// Channel capacity used between emitter and transport. Capacity 1 is
    /// load-bearing: it is what makes the emitter wait for the transport.
    pub const CHANNEL_CAPACITY: usize = 1;

    pub fn new(source: S, tx: mpsc::Sender<StreamFrame>, session_budget: Duration) -> Self {
        Self {
            source,
            tx,
            session_budget,
            state: EmitterState::Started,
        }
    }

    fn frame(
        &self,
        batch: Vec<MovieRecord>,
        running_total: u64,
        page_number: u32,
        is_complete: bool,
        error: Option<String>,
    ) -> StreamFrame {
        StreamFrame {
            batch,
            running_total,
            source_label: self.source.source_label().to_string(),
            page_number,
            total_available: self.source.total_available(),
            is_complete,
            error,
        }
    }

    /// Drive the session to its terminal state, returning it.
    ///
    /// Every run ends in exactly one of `Complete` (with full or partial
    /// data) or `Errored`; the channel is dropped afterwards so the transport
    /// knows no further frames will arrive.
    pub async fn run(mut self) -> EmitterState {
        let deadline = Instant::now() + self.session_budget;
        let mut running_total = 0u64;
        let mut last_page = 0u32;

        loop {
            if Instant::now() >= deadline {
                info!(
                    source = self.source.source_label(),
                    running_total, "session budget exceeded, completing with partial results"
                );
                let frame = self.frame(Vec::new(), running_total, last_page, true, None);
                let _ = self.tx.send(frame).await;
                self.state = EmitterState::Complete;
                break;
            }

            self.state = EmitterState::Fetching;
            match self.source.next_batch().await {
                Ok(Some(batch)) => {
                    self.state = EmitterState::Emitting;
                    running_total += batch.records.len() as u64;
                    last_page = batch.page_number;
                    let frame =
                        self.frame(batch.records, running_total, batch.page_number, false, None);
                    if self.tx.send(frame).await.is_err() {
                        debug!(
                            source = self.source.source_label(),
                            running_total, "client disconnected, stopping session"
                        );
                        self.state = EmitterState::Complete;
                        break;
                    }
                }
                Ok(None) => {
                    let frame = self.frame(Vec::new(), running_total, last_page, true, None);
                    let _ = self.tx.send(frame).await;
                    self.state = EmitterState::Complete;
                    break;
                }
                Err(e) => {
                    warn!(
                        source = self.source.source_label(),
                        error = %e,
                        "aggregation aborted, emitting terminal error frame"
                    );
                    let frame =
                        self.frame(Vec::new(), running_total, last_page, true, Some(e.to_string()));
                    let _ = self.tx.send(frame).await;
                    self.state = EmitterState::Errored;
                    break;
                }
            }
        }

        self.state
    }
}
