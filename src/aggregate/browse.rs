//! Bounded multi-page aggregation for browse collections.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::aggregate::{sort_records, Batch, BatchSource, Deduplicator, SortKey};
use crate::catalog::{BrowseCategory, CatalogClient, MovieRecord};
use crate::config::AggregationConfig;
use crate::error::CatalogError;

/// Drives a bounded fetch loop over one browse collection.
///
/// The loop stops when `target_count` records have been admitted, the page
/// cap is exhausted, or the upstream reports no more pages. A failed page is
/// skipped and logged; after `max_consecutive_failures` consecutive failures
/// the run aborts with [`CatalogError::Unavailable`]. A successful page
/// resets the failure counter.
pub struct BrowseAggregator {
    client: Arc<CatalogClient>,
    category: BrowseCategory,
    target_count: usize,
    max_pages: u32,
    failure_threshold: u32,
    dedup: Deduplicator,
    next_page: u32,
    total_pages: Option<u32>,
    consecutive_failures: u32,
    emitted: usize,
    finished: bool,
}

impl BrowseAggregator {
    pub fn new(
        client: Arc<CatalogClient>,
        category: BrowseCategory,
        target_count: usize,
        config: &AggregationConfig,
    ) -> Self {
        Self {
            client,
            category,
            target_count,
            max_pages: config.max_pages,
            failure_threshold: config.max_consecutive_failures,
            dedup: Deduplicator::new(),
            next_page: 1,
            total_pages: None,
            consecutive_failures: 0,
            emitted: 0,
            finished: false,
        }
    }

    /// Drain the whole run into a `Vec`, optionally applying a final stable
    /// sort. Output order without a sort key is page order, then intra-page
    /// order.
    pub async fn collect(mut self, sort: Option<SortKey>) -> Result<Vec<MovieRecord>, CatalogError> {
        let mut out = Vec::new();
        while let Some(batch) = self.next_batch().await? {
            out.extend(batch.records);
        }
        if let Some(key) = sort {
            sort_records(&mut out, key);
        }
        Ok(out)
    }
}

#[async_trait]
impl BatchSource for BrowseAggregator {
    fn source_label(&self) -> &str {
        self.category.label()
    }

    async fn next_batch(&mut self) -> Result<Option<Batch>, CatalogError> {
        if self.finished {
            return Ok(None);
        }

        loop {
            if self.emitted >= self.target_count || self.next_page > self.max_pages {
                self.finished = true;
                return Ok(None);
            }
            if let Some(total) = self.total_pages {
                if self.next_page > total {
                    self.finished = true;
                    return Ok(None);
                }
            }

            let page_number = self.next_page;
            self.next_page += 1;

            let page = match self.client.fetch_page(self.category, page_number).await {
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
                        source = self.category.label(),
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

            let mut records = Vec::new();
            for record in page.records {
                if self.emitted >= self.target_count {
                    break;
                }
                if self.dedup.admit(record.id) {
                    records.push(record);
                    self.emitted += 1;
                }
            }

            if records.is_empty() {
                debug!(
                    source = self.category.label(),
                    page = page_number,
                    "page contributed no new records"
                );
                continue;
            }

            return Ok(Some(Batch {
                records,
                page_number,
            }));
        }
    }
}
