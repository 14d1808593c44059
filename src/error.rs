//! Error taxonomy for the aggregation core.
//!
//! Per-page and per-record failures are recovered locally by the aggregators;
//! only sustained upstream unavailability surfaces to the caller, where the
//! streaming layer converts it into a single terminal error frame.

/// Failure modes when talking to the upstream catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// A single page fetch failed. Aggregators skip the page and continue.
    #[error("page {page} fetch failed: {reason}")]
    TransientFetch {
        /// The page that could not be fetched.
        page: u32,
        /// Human-readable failure description.
        reason: String,
    },

    /// The upstream is unreachable, returned a non-success status, or produced
    /// an undecodable body. Repeated consecutive page failures also collapse
    /// into this variant and abort the run.
    #[error("catalog unavailable: {reason}")]
    Unavailable {
        /// Human-readable failure description.
        reason: String,
    },

    /// An individual record failed normalization. The record is dropped; the
    /// page it came from is still used.
    #[error("malformed record: {reason}")]
    MalformedRecord {
        /// Human-readable failure description.
        reason: String,
    },
}

impl CatalogError {
    /// Convenience constructor for [`CatalogError::Unavailable`].
    pub fn unavailable(reason: impl Into<String>) -> Self {
        CatalogError::Unavailable {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for [`CatalogError::MalformedRecord`].
    pub fn malformed(reason: impl Into<String>) -> Self {
        CatalogError::MalformedRecord {
            reason: reason.into(),
        }
    }

    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            CatalogError::TransientFetch { .. } => 502,
            CatalogError::Unavailable { .. } => 502,
            CatalogError::MalformedRecord { .. } => 422,
        }
    }
}

/// Result alias using [`CatalogError`].
pub type Result<T> = std::result::Result<T, CatalogError>;
