//! Recommendation selection.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::aggregate::Deduplicator;
use crate::catalog::{BrowseCategory, CatalogClient, MovieRecord};
use crate::config::RecommendConfig;
use crate::error::CatalogError;

/// How many ranked genres are considered a user's "top" set.
const TOP_GENRE_COUNT: usize = 5;

/// Stateless recommendation selector.
///
/// Safe for concurrent invocation: all per-call state lives on the stack, and
/// the shared [`CatalogClient`] is internally synchronized.
pub struct RecommendationEngine {
    client: Arc<CatalogClient>,
    page_limit: u32,
}

impl RecommendationEngine {
    pub fn new(client: Arc<CatalogClient>, config: &RecommendConfig) -> Self {
        Self {
            client,
            page_limit: config.discover_page_limit,
        }
    }

    /// Select up to `limit` records for a user.
    ///
    /// With no favorite signal the result is the popularity ranking. With
    /// favorites, items tagged with the sampling genre come first, backfilled
    /// from the popularity ranking when the genre runs dry. The result never
    /// contains a duplicate id or an id from `exclude`.
    pub async fn recommend(
        &self,
        favorites: &[String],
        exclude: &HashSet<u64>,
        limit: usize,
    ) -> Result<Vec<MovieRecord>, CatalogError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        // Pre-admitting the exclusions means they can never be selected, by
        // the same mechanism that prevents duplicates.
        let mut dedup = Deduplicator::new();
        for &id in exclude {
            dedup.admit(id);
        }

        let mut selected = Vec::with_capacity(limit);

        if let Some(genre_name) = sampling_genre(favorites) {
            match self.client.genre_table().id(&genre_name) {
                Some(genre_id) => {
                    self.fill_from_genre(genre_id, &mut dedup, &mut selected, limit)
                        .await;
                }
                None => {
                    warn!(genre = %genre_name, "sampling genre missing from table, using popularity only");
                }
            }
        }

        if selected.len() < limit {
            self.backfill_popular(&mut dedup, &mut selected, limit)
                .await?;
        }

        Ok(selected)
    }

    /// Scan popularity-ranked pages of the sampling genre. Failures here
    /// degrade to backfill rather than failing the request.
    async fn fill_from_genre(
        &self,
        genre_id: u32,
        dedup: &mut Deduplicator,
        selected: &mut Vec<MovieRecord>,
        limit: usize,
    ) {
        let mut page = 1;
        while selected.len() < limit && page <= self.page_limit {
            match self.client.discover_by_genre(genre_id, page).await {
                Ok(result) => {
                    for record in result.records {
                        if selected.len() >= limit {
                            break;
                        }
                        if dedup.admit(record.id) {
                            selected.push(record);
                        }
                    }
                    if result.total_pages > 0 && page >= result.total_pages {
                        break;
                    }
                }
                Err(e) => {
                    warn!(genre_id, page, error = %e, "genre scan failed, degrading to popularity backfill");
                    break;
                }
            }
            page += 1;
        }
        debug!(genre_id, selected = selected.len(), "genre scan done");
    }

    /// Top up from the popularity ranking. Also the whole selection when
    /// there is no favorite signal. An upstream failure here only surfaces
    /// when nothing at all was selected.
    async fn backfill_popular(
        &self,
        dedup: &mut Deduplicator,
        selected: &mut Vec<MovieRecord>,
        limit: usize,
    ) -> Result<(), CatalogError> {
        let mut page = 1;
        while selected.len() < limit && page <= self.page_limit {
            match self.client.fetch_page(BrowseCategory::Popular, page).await {
                Ok(result) => {
                    for record in result.records {
                        if selected.len() >= limit {
                            break;
                        }
                        if dedup.admit(record.id) {
                            selected.push(record);
                        }
                    }
                    if result.total_pages > 0 && page >= result.total_pages {
                        break;
                    }
                }
                Err(e) if selected.is_empty() => return Err(e),
                Err(e) => {
                    warn!(page, error = %e, "popularity backfill cut short");
                    break;
                }
            }
            page += 1;
        }
        Ok(())
    }
}

/// Rank the favorite multiset by descending frequency, ties broken by
/// first-seen order, and keep the top five.
fn rank_genres(favorites: &[String]) -> Vec<String> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for name in favorites {
        match counts.iter_mut().find(|(n, _)| n == name) {
            Some((_, count)) => *count += 1,
            None => counts.push((name.clone(), 1)),
        }
    }
    // Stable sort: equal counts keep first-seen order.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(TOP_GENRE_COUNT);
    counts.into_iter().map(|(name, _)| name).collect()
}

/// The genre recommendations sample from: the top-ranked entry.
fn sampling_genre(favorites: &[String]) -> Option<String> {
    rank_genres(favorites).into_iter().next()
}
