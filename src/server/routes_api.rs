//! One-shot JSON endpoints: collections, details, recommendations.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::aggregate::{BrowseAggregator, SortKey};
use crate::catalog::{BrowseCategory, MovieDetails, MovieRecord};
use crate::server::{ApiError, AppContext};

pub fn api_routes() -> Router<AppContext> {
    Router::new()
        .route("/browse/:category", get(browse_collection))
        .route("/movies/:id", get(movie_details))
        .route("/users/:user_id/recommendations", get(recommendations))
}

#[derive(Debug, Deserialize)]
struct BrowseParams {
    target: Option<usize>,
    sort: Option<String>,
}

#[derive(Debug, Serialize)]
struct CollectionResponse {
    source_label: String,
    count: usize,
    records: Vec<MovieRecord>,
}

async fn browse_collection(
    State(ctx): State<AppContext>,
    Path(category): Path<String>,
    Query(params): Query<BrowseParams>,
) -> Result<Json<CollectionResponse>, ApiError> {
    let category: BrowseCategory = category.parse().map_err(ApiError::bad_request)?;
    let sort = params
        .sort
        .as_deref()
        .map(str::parse::<SortKey>)
        .transpose()
        .map_err(ApiError::bad_request)?;
    let target = params
        .target
        .unwrap_or(ctx.config.aggregation.default_target_count);

    let aggregator = BrowseAggregator::new(
        ctx.catalog.clone(),
        category,
        target,
        &ctx.config.aggregation,
    );
    let records = aggregator.collect(sort).await?;

    Ok(Json(CollectionResponse {
        source_label: category.label().to_string(),
        count: records.len(),
        records,
    }))
}

async fn movie_details(
    State(ctx): State<AppContext>,
    Path(id): Path<u64>,
) -> Result<Json<MovieDetails>, ApiError> {
    let details = ctx.catalog.fetch_details(id).await?;
    Ok(Json(details))
}

#[derive(Debug, Deserialize)]
struct RecommendParams {
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct RecommendationResponse {
    user_id: String,
    count: usize,
    records: Vec<MovieRecord>,
}

async fn recommendations(
    State(ctx): State<AppContext>,
    Path(user_id): Path<String>,
    Query(params): Query<RecommendParams>,
) -> Result<Json<RecommendationResponse>, ApiError> {
    let favorites = ctx.profiles.favorite_genres(&user_id).await;
    let exclude = ctx.profiles.excluded_ids(&user_id).await;
    let limit = params.limit.unwrap_or(ctx.config.recommend.default_limit);

    let records = ctx.engine.recommend(&favorites, &exclude, limit).await?;

    Ok(Json(RecommendationResponse {
        user_id,
        count: records.len(),
        records,
    }))
}
