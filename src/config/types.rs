use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub aggregation: AggregationConfig,

    #[serde(default)]
    pub recommend: RecommendConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// Base URL of the upstream catalog API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Base URL images are resolved against.
    #[serde(default = "default_image_base_url")]
    pub image_base_url: String,

    /// API key passed to every upstream request.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_language")]
    pub language: String,

    /// Region used when picking watch providers (ISO-3166-1).
    #[serde(default = "default_region")]
    pub region: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Token-bucket refill rate for upstream requests.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_sec: u32,

    /// Genre id to display name table. Versioned upstream; overridable here.
    #[serde(default = "default_genres")]
    pub genres: Vec<GenreEntry>,
}

fn default_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}
fn default_image_base_url() -> String {
    "https://image.tmdb.org/t/p".to_string()
}
fn default_language() -> String {
    "en-US".to_string()
}
fn default_region() -> String {
    "US".to_string()
}
fn default_request_timeout() -> u64 {
    10
}
fn default_rate_limit() -> u32 {
    4
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            image_base_url: default_image_base_url(),
            api_key: String::new(),
            language: default_language(),
            region: default_region(),
            request_timeout_secs: default_request_timeout(),
            rate_limit_per_sec: default_rate_limit(),
            genres: default_genres(),
        }
    }
}

/// One row of the external genre id to display name mapping.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenreEntry {
    pub id: u32,
    pub name: String,
}

fn default_genres() -> Vec<GenreEntry> {
    [
        (28, "Action"),
        (12, "Adventure"),
        (16, "Animation"),
        (35, "Comedy"),
        (80, "Crime"),
        (99, "Documentary"),
        (18, "Drama"),
        (10751, "Family"),
        (14, "Fantasy"),
        (36, "History"),
        (27, "Horror"),
        (10402, "Music"),
        (9648, "Mystery"),
        (10749, "Romance"),
        (878, "Science Fiction"),
        (10770, "TV Movie"),
        (53, "Thriller"),
        (10752, "War"),
        (37, "Western"),
    ]
    .into_iter()
    .map(|(id, name)| GenreEntry {
        id,
        name: name.to_string(),
    })
    .collect()
}

/// Bidirectional genre lookup built from the configured [`GenreEntry`] rows.
#[derive(Debug, Clone, Default)]
pub struct GenreTable {
    by_id: HashMap<u32, String>,
    by_name: HashMap<String, u32>,
}

impl GenreTable {
    pub fn from_entries(entries: &[GenreEntry]) -> Self {
        let mut by_id = HashMap::new();
        let mut by_name = HashMap::new();
        for entry in entries {
            by_id.insert(entry.id, entry.name.clone());
            by_name.insert(entry.name.clone(), entry.id);
        }
        Self { by_id, by_name }
    }

    /// Display name for an external genre id. Unmapped ids yield `None` and
    /// are dropped by the record transform, not replaced with a placeholder.
    pub fn name(&self, id: u32) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    /// External id for a display name.
    pub fn id(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AggregationConfig {
    /// Record-count goal for browse collections when the caller does not
    /// specify one.
    #[serde(default = "default_target_count")]
    pub default_target_count: usize,

    /// Upper bound on pages fetched in a single run.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Consecutive page failures tolerated before the run aborts.
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// Ceiling on accumulated search results regardless of what the upstream
    /// reports as available.
    #[serde(default = "default_search_hard_cap")]
    pub search_hard_cap: usize,

    /// Soft wall-clock budget for one streaming session, in seconds. When
    /// exceeded the session completes with partial results.
    #[serde(default = "default_session_budget")]
    pub session_budget_secs: u64,
}

fn default_target_count() -> usize {
    60
}
fn default_max_pages() -> u32 {
    20
}
fn default_max_consecutive_failures() -> u32 {
    3
}
fn default_search_hard_cap() -> usize {
    200
}
fn default_session_budget() -> u64 {
    45
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            default_target_count: default_target_count(),
            max_pages: default_max_pages(),
            max_consecutive_failures: default_max_consecutive_failures(),
            search_hard_cap: default_search_hard_cap(),
            session_budget_secs: default_session_budget(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecommendConfig {
    /// Result count when the caller does not specify one.
    #[serde(default = "default_recommend_limit")]
    pub default_limit: usize,

    /// Pages of genre-tagged results scanned before falling back to
    /// popularity backfill.
    #[serde(default = "default_discover_page_limit")]
    pub discover_page_limit: u32,
}

fn default_recommend_limit() -> usize {
    10
}
fn default_discover_page_limit() -> u32 {
    3
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            default_limit: default_recommend_limit(),
            discover_page_limit: default_discover_page_limit(),
        }
    }
}
