//! Progressive delivery.
//!
//! Converts aggregator output into discrete, ordered, terminated messages a
//! client can render incrementally. The transport adapter lives in
//! [`crate::server::routes_stream`]; this module is transport-agnostic and
//! speaks through a bounded channel.

mod emitter;

pub use emitter::{EmitterState, ProgressiveEmitter, StreamFrame};
