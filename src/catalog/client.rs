//! HTTP client for the upstream catalog API.
//!
//! Features:
//! - Token-bucket rate limiting via [`governor`] (configurable, 4 req/s default).
//! - Automatic retry on HTTP 429 with `Retry-After` header support (max 3 retries).
//! - Bounded per-request timeout.
//! - Normalization of every response into [`MovieRecord`]s before it leaves
//!   this module; malformed records are dropped and logged, never fatal.

use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use governor::{Quota, RateLimiter};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::catalog::types::{RawCredits, RawMovie, RawPage, RawProviders};
use crate::catalog::{CatalogPage, ImageResolver, MovieDetails, MovieRecord};
use crate::config::{CatalogConfig, GenreTable};
use crate::error::CatalogError;

const MAX_RETRIES: u32 = 3;

/// Browse collections the upstream exposes as dedicated list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseCategory {
    Popular,
    TopRated,
    NowPlaying,
    Upcoming,
}

impl BrowseCategory {
    /// Upstream path segment for this collection.
    fn as_path(&self) -> &'static str {
        match self {
            BrowseCategory::Popular => "/movie/popular",
            BrowseCategory::TopRated => "/movie/top_rated",
            BrowseCategory::NowPlaying => "/movie/now_playing",
            BrowseCategory::Upcoming => "/movie/upcoming",
        }
    }

    /// Label carried in stream frames so clients know what they are rendering.
    pub fn label(&self) -> &'static str {
        match self {
            BrowseCategory::Popular => "popular",
            BrowseCategory::TopRated => "top_rated",
            BrowseCategory::NowPlaying => "now_playing",
            BrowseCategory::Upcoming => "upcoming",
        }
    }
}

impl FromStr for BrowseCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "popular" => Ok(BrowseCategory::Popular),
            "top_rated" => Ok(BrowseCategory::TopRated),
            "now_playing" => Ok(BrowseCategory::NowPlaying),
            "upcoming" => Ok(BrowseCategory::Upcoming),
            other => Err(format!("unknown browse category: {other}")),
        }
    }
}

/// Client for the upstream catalog API.
///
/// One instance is constructed at startup and shared across all streaming
/// sessions; the pooled [`reqwest::Client`] is safe for concurrent reuse.
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    language: String,
    region: String,
    images: ImageResolver,
    genres: Arc<GenreTable>,
    rate_limiter: RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl CatalogClient {
    /// Create a new catalog client from configuration.
    pub fn new(config: &CatalogConfig, genres: Arc<GenreTable>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("failed to build reqwest client");

        let rate = NonZeroU32::new(config.rate_limit_per_sec.max(1)).expect("nonzero rate");
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        let mut base_url = config.base_url.clone();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            language: config.language.clone(),
            region: config.region.clone(),
            images: ImageResolver::new(config.image_base_url.clone()),
            genres,
            rate_limiter,
        }
    }

    /// Execute a GET request with rate limiting and 429-retry logic, decoding
    /// the JSON body into `T`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, CatalogError> {
        let url = format!("{}{path}", self.base_url);
        let mut retries = 0u32;
        loop {
            self.rate_limiter.until_ready().await;

            let resp = self
                .client
                .get(&url)
                .query(&[
                    ("api_key", self.api_key.as_str()),
                    ("language", self.language.as_str()),
                ])
                .query(params)
                .send()
                .await
                .map_err(|e| CatalogError::unavailable(format!("request failed: {e}")))?;

            if resp.status() == StatusCode::TOO_MANY_REQUESTS && retries < MAX_RETRIES {
                retries += 1;
                let wait = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1);
                warn!(retry = retries, wait_secs = wait, "upstream returned 429, backing off");
                tokio::time::sleep(Duration::from_secs(wait)).await;
                continue;
            }

            let status = resp.status();
            if !status.is_success() {
                return Err(CatalogError::unavailable(format!(
                    "{path} returned {status}"
                )));
            }

            return resp
                .json::<T>()
                .await
                .map_err(|e| CatalogError::unavailable(format!("undecodable body: {e}")));
        }
    }

    /// Normalize a raw page, dropping malformed records.
    fn transform_page(&self, raw: RawPage) -> CatalogPage {
        let records = raw
            .results
            .into_iter()
            .filter_map(|r| match MovieRecord::from_raw(r, &self.genres, &self.images) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(page = raw.page, error = %e, "dropping malformed record");
                    None
                }
            })
            .collect();

        CatalogPage {
            records,
            page: raw.page,
            total_pages: raw.total_pages,
            total_results: raw.total_results,
        }
    }

    /// Fetch one page of a browse collection.
    pub async fn fetch_page(
        &self,
        category: BrowseCategory,
        page: u32,
    ) -> Result<CatalogPage, CatalogError> {
        debug!(category = category.label(), page, "fetching browse page");
        let page_param = page.to_string();
        let raw: RawPage = self
            .get_json(category.as_path(), &[("page", page_param.as_str())])
            .await?;
        Ok(self.transform_page(raw))
    }

    /// Fetch one page of free-text search results.
    pub async fn search_page(&self, query: &str, page: u32) -> Result<CatalogPage, CatalogError> {
        debug!(query, page, "fetching search page");
        let page_param = page.to_string();
        let raw: RawPage = self
            .get_json(
                "/search/movie",
                &[("query", query), ("page", page_param.as_str())],
            )
            .await?;
        Ok(self.transform_page(raw))
    }

    /// Fetch one page of items tagged with a genre, popularity-ranked.
    pub async fn discover_by_genre(
        &self,
        genre_id: u32,
        page: u32,
    ) -> Result<CatalogPage, CatalogError> {
        debug!(genre_id, page, "fetching discover page");
        let genre_param = genre_id.to_string();
        let page_param = page.to_string();
        let raw: RawPage = self
            .get_json(
                "/discover/movie",
                &[
                    ("with_genres", genre_param.as_str()),
                    ("sort_by", "popularity.desc"),
                    ("page", page_param.as_str()),
                ],
            )
            .await?;
        Ok(self.transform_page(raw))
    }

    /// Fetch an enriched record for one item.
    ///
    /// Core details, credits, and watch providers are requested concurrently.
    /// A providers failure degrades to an empty list; a details or credits
    /// failure propagates.
    pub async fn fetch_details(&self, id: u64) -> Result<MovieDetails, CatalogError> {
        debug!(id, "fetching details");

        let details_path = format!("/movie/{id}");
        let credits_path = format!("/movie/{id}/credits");
        let providers_path = format!("/movie/{id}/watch/providers");

        let details = self.get_json::<RawMovie>(&details_path, &[]);
        let credits = self.get_json::<RawCredits>(&credits_path, &[]);
        let providers = self.get_json::<RawProviders>(&providers_path, &[]);

        let (details, credits, providers) = tokio::join!(details, credits, providers);

        let record = MovieRecord::from_raw(details?, &self.genres, &self.images)?;
        let cast = credits?.top_billed();
        let watch_providers = match providers {
            Ok(p) => p.for_region(&self.region),
            Err(e) => {
                warn!(id, error = %e, "watch providers unavailable, degrading to empty list");
                Vec::new()
            }
        };

        Ok(MovieDetails {
            record,
            cast,
            watch_providers,
        })
    }

    /// The genre table this client normalizes against.
    pub fn genre_table(&self) -> &GenreTable {
        &self.genres
    }
}
