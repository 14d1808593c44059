//! Normalized catalog records and the raw-to-internal transform.
//!
//! Raw upstream shapes stay private to this module. Normalization rules:
//! genre ids are mapped through the configured [`GenreTable`] and unmapped
//! ids are dropped; ratings are rounded to one decimal; image paths resolve
//! against two fixed size variants with a deterministic placeholder when the
//! upstream has no artwork.

use serde::{Deserialize, Serialize};

use crate::config::GenreTable;
use crate::error::CatalogError;

/// Poster size variant requested from the image CDN.
const POSTER_SIZE: &str = "w342";
/// Backdrop size variant requested from the image CDN.
const BACKDROP_SIZE: &str = "w780";

const POSTER_PLACEHOLDER: &str = "https://static.cinefeed.dev/placeholder/poster-w342.png";
const BACKDROP_PLACEHOLDER: &str = "https://static.cinefeed.dev/placeholder/backdrop-w780.png";

// ---------------------------------------------------------------------------
// Raw upstream shapes (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct RawPage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub results: Vec<RawMovie>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawMovie {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub overview: Option<String>,
    /// List endpoints carry bare genre ids.
    pub genre_ids: Option<Vec<u32>>,
    /// The details endpoint carries expanded genre objects instead.
    pub genres: Option<Vec<RawGenre>>,
    pub release_date: Option<String>,
    pub popularity: Option<f64>,
    pub vote_average: Option<f64>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawGenre {
    pub id: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawCredits {
    #[serde(default)]
    pub cast: Vec<RawCastMember>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawCastMember {
    pub name: Option<String>,
    pub character: Option<String>,
    pub order: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawProviders {
    #[serde(default)]
    pub results: std::collections::HashMap<String, RawRegionProviders>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawRegionProviders {
    #[serde(default)]
    pub flatrate: Vec<RawProvider>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawProvider {
    pub provider_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Normalized records
// ---------------------------------------------------------------------------

/// Normalized representation of one catalog item.
///
/// Ephemeral: records live for the duration of one aggregation run and are
/// never persisted by this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieRecord {
    /// Stable upstream identifier; unique within one aggregation run.
    pub id: u64,
    pub title: String,
    pub description: String,
    /// Ordered set of display names; unmapped upstream ids are dropped.
    pub genre_tags: Vec<String>,
    pub release_year: Option<u16>,
    pub popularity_score: f64,
    /// Community rating rounded to one decimal.
    pub vote_average: f64,
    pub poster_url: String,
    pub backdrop_url: String,
}

/// One page of normalized records plus upstream pagination metadata.
#[derive(Debug, Clone)]
pub struct CatalogPage {
    pub records: Vec<MovieRecord>,
    pub page: u32,
    pub total_pages: u32,
    pub total_results: u64,
}

/// A record enriched with credits and watch providers.
#[derive(Debug, Clone, Serialize)]
pub struct MovieDetails {
    #[serde(flatten)]
    pub record: MovieRecord,
    /// Top-billed cast, ascending billing order.
    pub cast: Vec<CastMember>,
    /// Streaming provider names for the configured region. Empty when the
    /// providers endpoint is unavailable; never fails the whole call.
    pub watch_providers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastMember {
    pub name: String,
    pub character: Option<String>,
}

/// Resolves upstream image path fragments against fixed size variants.
#[derive(Debug, Clone)]
pub struct ImageResolver {
    base_url: String,
}

impl ImageResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    /// Full poster URL, or the deterministic placeholder when absent.
    pub fn poster(&self, path: Option<&str>) -> String {
        match path {
            Some(p) if !p.is_empty() => format!("{}/{POSTER_SIZE}{p}", self.base_url),
            _ => POSTER_PLACEHOLDER.to_string(),
        }
    }

    /// Full backdrop URL, or the deterministic placeholder when absent.
    pub fn backdrop(&self, path: Option<&str>) -> String {
        match path {
            Some(p) if !p.is_empty() => format!("{}/{BACKDROP_SIZE}{p}", self.base_url),
            _ => BACKDROP_PLACEHOLDER.to_string(),
        }
    }
}

/// Extract a four-digit year from a date string like `"2023-04-15"`.
fn parse_year(date: &Option<String>) -> Option<u16> {
    date.as_deref()
        .and_then(|d| d.get(..4))
        .and_then(|y| y.parse::<u16>().ok())
}

/// Round a community rating to one decimal place.
fn round_rating(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Map genre ids to display names, keeping first-seen order and dropping
/// unmapped ids and duplicates.
fn map_genres(ids: &[u32], table: &GenreTable) -> Vec<String> {
    let mut tags: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(name) = table.name(*id) {
            if !tags.iter().any(|t| t == name) {
                tags.push(name.to_string());
            }
        }
    }
    tags
}

impl MovieRecord {
    /// Normalize one raw upstream record.
    ///
    /// A record with no id or title cannot be tracked or rendered and fails
    /// as [`CatalogError::MalformedRecord`]; callers drop it and continue.
    pub(crate) fn from_raw(
        raw: RawMovie,
        genres: &GenreTable,
        images: &ImageResolver,
    ) -> Result<Self, CatalogError> {
        let id = raw
            .id
            .ok_or_else(|| CatalogError::malformed("record has no id"))?;
        let title = match raw.title {
            Some(t) if !t.is_empty() => t,
            _ => {
                return Err(CatalogError::malformed(format!(
                    "record {id} has no title"
                )))
            }
        };

        let genre_ids: Vec<u32> = match (&raw.genre_ids, &raw.genres) {
            (Some(ids), _) => ids.clone(),
            (None, Some(objs)) => objs.iter().map(|g| g.id).collect(),
            (None, None) => Vec::new(),
        };

        Ok(MovieRecord {
            id,
            title,
            description: raw.overview.unwrap_or_default(),
            genre_tags: map_genres(&genre_ids, genres),
            release_year: parse_year(&raw.release_date),
            popularity_score: raw.popularity.unwrap_or(0.0),
            vote_average: round_rating(raw.vote_average.unwrap_or(0.0)),
            poster_url: images.poster(raw.poster_path.as_deref()),
            backdrop_url: images.backdrop(raw.backdrop_path.as_deref()),
        })
    }
}

impl RawCredits {
    /// Top-billed cast in ascending billing order, capped at ten entries.
    pub(crate) fn top_billed(mut self) -> Vec<CastMember> {
        self.cast
            .sort_by_key(|c| c.order.unwrap_or(u32::MAX));
        self.cast
            .into_iter()
            .filter_map(|c| {
                c.name.map(|name| CastMember {
                    name,
                    character: c.character,
                })
            })
            .take(10)
            .collect()
    }
}

impl RawProviders {
    /// Flatrate provider names for `region`, empty when the region is absent.
    pub(crate) fn for_region(mut self, region: &str) -> Vec<String> {
        self.results
            .remove(region)
            .map(|r| {
                r.flatrate
                    .into_iter()
                    .filter_map(|p| p.provider_name)
                    .collect()
            })
            .unwrap_or_default()
    }
}
