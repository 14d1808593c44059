//! Multi-page aggregation.
//!
//! Aggregators drive bounded fetch loops against the [`CatalogClient`],
//! admitting records through a run-scoped [`Deduplicator`] and handing out
//! per-page batches. Both aggregators implement [`BatchSource`], the pull
//! interface consumed by the streaming emitter: nothing is fetched until the
//! consumer asks for the next batch.

mod browse;
mod dedup;
mod search;

pub use browse::BrowseAggregator;
pub use dedup::Deduplicator;
pub use search::SearchAggregator;

use std::str::FromStr;

use async_trait::async_trait;

use crate::catalog::MovieRecord;
use crate::error::CatalogError;

/// One emitted batch: the surviving records of a single upstream page.
#[derive(Debug, Clone)]
pub struct Batch {
    pub records: Vec<MovieRecord>,
    /// Upstream page the records came from.
    pub page_number: u32,
}

/// Pull-based producer of record batches.
///
/// `next_batch` returns `Ok(None)` when the run is over (target reached,
/// pages exhausted, or upstream signalled no more results) and `Err` only for
/// sustained unavailability. Implementations own all per-run state; a value
/// is used by exactly one session and never shared.
#[async_trait]
pub trait BatchSource: Send {
    /// Label identifying what is being aggregated (e.g. `"popular"`,
    /// `"search:dune"`).
    fn source_label(&self) -> &str;

    /// Upstream-reported total for this run, when known. Search runs learn it
    /// from the first successful page; browse runs have no meaningful total.
    fn total_available(&self) -> Option<u64> {
        None
    }

    /// Fetch until the next non-empty batch is available, the run completes,
    /// or the run aborts.
    async fn next_batch(&mut self) -> Result<Option<Batch>, CatalogError>;
}

/// Sort keys a caller may request for a collected browse run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Newest first; records without a year sort last.
    Year,
    /// Lexicographic title order.
    Title,
    /// Highest rating first.
    Rating,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "year" => Ok(SortKey::Year),
            "title" => Ok(SortKey::Title),
            "rating" => Ok(SortKey::Rating),
            other => Err(format!("unknown sort key: {other}")),
        }
    }
}

/// Stable sort: ties keep aggregation order (page order, then intra-page).
pub fn sort_records(records: &mut [MovieRecord], key: SortKey) {
    match key {
        SortKey::Year => records.sort_by(|a, b| match (a.release_year, b.release_year) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }),
        SortKey::Title => records.sort_by(|a, b| a.title.cmp(&b.title)),
        SortKey::Rating => records.sort_by(|a, b| {
            b.vote_average
                .partial_cmp(&a.vote_average)
                .unwrap_or(std::cmp::Ordering::Equal)
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, title: &str, year: Option<u16>, rating: f64) -> MovieRecord {
        MovieRecord {
            id,
            title: title.to_string(),
            description: String::new(),
            genre_tags: Vec::new(),
            release_year: year,
            popularity_score: 0.0,
            vote_average: rating,
            poster_url: String::new(),
            backdrop_url: String::new(),
        }
    }

    #[test]
    fn sort_key_parsing() {
        assert_eq!("year".parse::<SortKey>().unwrap(), SortKey::Year);
        assert_eq!("rating".parse::<SortKey>().unwrap(), SortKey::Rating);
        assert!("popularity".parse::<SortKey>().is_err());
    }

    #[test]
    fn year_sort_is_newest_first_with_missing_years_last() {
        let mut records = vec![
            record(1, "a", Some(1999), 0.0),
            record(2, "b", None, 0.0),
            record(3, "c", Some(2021), 0.0),
        ];
        sort_records(&mut records, SortKey::Year);
        let ids: Vec<u64> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn rating_sort_keeps_tie_order() {
        let mut records = vec![
            record(1, "a", None, 7.0),
            record(2, "b", None, 9.0),
            record(3, "c", None, 7.0),
        ];
        sort_records(&mut records, SortKey::Rating);
        let ids: Vec<u64> = records.iter().map(|r| r.id).collect();
        // 1 and 3 tie on rating and keep their aggregation order.
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn title_sort_is_lexicographic() {
        let mut records = vec![
            record(1, "Zodiac", None, 0.0),
            record(2, "Alien", None, 0.0),
            record(3, "Moon", None, 0.0),
        ];
        sort_records(&mut records, SortKey::Title);
        let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Alien", "Moon", "Zodiac"]);
    }
}
