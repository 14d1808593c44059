//! Query-driven aggregation over the search endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::aggregate::{Batch, BatchSource, Deduplicator};
use crate::catalog::CatalogClient;
use crate::config::AggregationConfig;
use crate::error::CatalogError;

/// Same loop shape as [`BrowseAggregator`](crate::aggregate::BrowseAggregator)
/// but driven by a free-text query.
///
/// The first successful page captures the upstream-reported result total,
/// clamped to the configured hard cap; the loop then runs until that many
/// records have been admitted or pages run out. The captured total is exposed
/// through [`BatchSource::total_available`] so every emitted frame can carry
/// it for client-side progress rendering.
pub struct SearchAggregator {
    client: Arc<CatalogClient>,
    query: String,
    label: String,
    hard_cap: usize,
    max_pages: u32,
    failure_threshold: u32,
    dedup: Deduplicator,
    next_page: u32,
    total_pages: Option<u32>,
    total_available: Option<u64>,
    consecutive_failures: u32,
    emitted: usize,
    finished: bool,
}

impl SearchAggregator {
    pub fn new(client: Arc<CatalogClient>, query: impl Into<String>, config: &AggregationConfig) -> Self {
        let query = query.into();
        Self {
            label: format!("search:{query}"),
            client,
            query,
            hard_cap: config.search_hard_cap,
            max_pages: config.max_pages,
            failure_threshold: config.max_consecutive_failures,
            dedup: Deduplicator::new(),
            next_page: 1,
            total_pages: None,
            total_available: None,
            consecutive_failures: 0,
            emitted: 0,
            finished: false,
        }
    }

    fn target(&self) -> Option<usize> {
        self.total_available.map(|t| t as usize)
    }
}

#[async_trait]
impl BatchSource for SearchAggregator {
    fn source_label(&self) -> &str {
        &self.label
    }

    fn total_available(&self) -> Option<u64> {
        self.total_available
    }

    async fn next_batch(&mut self) -> Result<Option<Batch>, CatalogError> {
        if self.finished {
            return Ok(None);
        }

        loop {
            if self.next_page > self.max_pages {
                self.finished = true;
                return Ok(None);
            }
            if let Some(target) = self.target() {
                if self.emitted >= target {
                    self.finished = true;
                    return Ok(None);
                }
            }
            if let Some(total) = self.total_pages {
                if self.next_page > total {
                    self.finished = true;
                    return Ok(None);
                }
            }

            let page_number = self.next_page;
            self.next_page += 1;

            let page = match self.client.search_page(&self.query, page_number).await {
                Ok(page) => {
                    self.consecutive_failures = 0;
                    page
                }
                Err(e) => {
                    self.consecutive_failures += 1;
                    let transient = CatalogError::TransientFetch {
                        page: page_number,
                        reason: e.to_string(),
                    };
                    warn!(
                        source = %self.label,
                        failures = self.consecutive_failures,
                        error = %transient,
                        "skipping failed page"
                    );
                    if self.consecutive_failures >= self.failure_threshold {
                        self.finished = true;
                        return Err(CatalogError::unavailable(format!(
                            "{} consecutive page failures",
                            self.consecutive_failures
                        )));
                    }
                    continue;
                }
            };

            if page.total_pages > 0 {
                self.total_pages = Some(page.total_pages);
            }
            if self.total_available.is_none() {
                // Clamp so clients can render progress against a reachable goal.
                let capped = page.total_results.min(self.hard_cap as u64);
                self.total_available = Some(capped);
                debug!(source = %self.label, total_available = capped, "captured result total");
            }

            let target = self.target().unwrap_or(self.hard_cap);
            let mut records = Vec::new();
            for record in page.records {
                if self.emitted >= target {
                    break;
                }
                if self.dedup.admit(record.id) {
                    records.push(record);
                    self.emitted += 1;
                }
            }

            if records.is_empty() {
                debug!(source = %self.label, page = page_number, "page contributed no new records");
                continue;
            }

            return Ok(Some(Batch {
                records,
                page_number,
            }));
        }
    }
}
