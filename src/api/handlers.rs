use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::{BearerToken, RequestId},
    models::{AggregationResult, RecommendationRequest, Track},
    services::catalog::{CatalogContext, SearchRequest},
};

use super::AppState;

const DEFAULT_SEARCH_LIMIT: u32 = 20;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BatchParams {
    /// Comma-separated track ids
    pub ids: String,
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegionParams {
    #[serde(default)]
    pub region: Option<String>,
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
}

/// Keyword search over catalog tracks
pub async fn search_tracks(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<Track>>> {
    if params.q.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Query parameter 'q' cannot be empty".to_string(),
        ));
    }

    let ctx = CatalogContext::new(token, state.region_or_default(params.region));
    let request = SearchRequest::tracks(params.q, params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT));

    let tracks = state.search.search_items(&ctx, &request).await?;
    Ok(Json(tracks))
}

/// Single track lookup
pub async fn get_track(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    Path(id): Path<String>,
    Query(params): Query<RegionParams>,
) -> AppResult<Json<Track>> {
    let ctx = CatalogContext::new(token, state.region_or_default(params.region));
    let track = state.lookup.get_track(&ctx, &id).await?;
    Ok(Json(track))
}

/// Batch track lookup; unknown ids are left out of the response
pub async fn get_tracks(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    Query(params): Query<BatchParams>,
) -> AppResult<Json<Vec<Track>>> {
    let ids: Vec<String> = params
        .ids
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();

    if ids.is_empty() {
        return Err(AppError::InvalidInput(
            "Query parameter 'ids' must name at least one track".to_string(),
        ));
    }

    let ctx = CatalogContext::new(token, state.region_or_default(params.region));
    let tracks = state.lookup.get_tracks(&ctx, &ids).await?;
    Ok(Json(tracks))
}

/// Recommendations seeded by up to two tracks
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    BearerToken(token): BearerToken,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<AggregationResult>> {
    let limit = request.limit.unwrap_or(state.defaults.limit);

    tracing::info!(
        request_id = %request_id,
        seeds = request.seed_ids.len(),
        limit,
        "Processing recommendation request"
    );

    let ctx = CatalogContext::new(token, state.region_or_default(request.region));
    let result = state
        .engine
        .get_recommendations(&ctx, &request.seed_ids, limit)
        .await?;

    tracing::info!(
        request_id = %request_id,
        returned = result.tracks.len(),
        "Recommendations completed"
    );

    Ok(Json(result))
}
