use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppResult,
    models::{Boardgame, UserAction},
    search::{QueryLogic, SearchQueryBuilder},
    services::{scoring::top_by_popularity, ScoredBoardgame},
};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct RecommendationsRequest {
    pub user_id: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Caller-supplied action history; fetched from the backend when absent
    pub user_actions: Option<Vec<UserAction>>,
    /// Caller-supplied category override for the preference profile
    pub user_categories: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct BoardgamesRequest {
    pub boardgames: Vec<Boardgame>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct BoardgamesResponse {
    pub boardgames: Vec<Boardgame>,
}

#[derive(Debug, Serialize)]
pub struct ActionsResponse {
    pub actions: Vec<UserAction>,
}

#[derive(Debug, Deserialize)]
pub struct PopularParams {
    #[serde(default = "default_popular_limit")]
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub search_query: Option<String>,
    pub player_count: Option<i64>,
    pub play_time: Option<i64>,
    /// Comma-separated labels, as the gateway sends them
    pub categories: Option<String>,
    #[serde(default = "default_limit_i64")]
    pub limit: i64,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_search_logic")]
    pub search_logic: QueryLogic,
    #[serde(default = "default_category_logic")]
    pub category_logic: QueryLogic,
}

fn default_limit() -> usize {
    10
}

fn default_limit_i64() -> i64 {
    10
}

fn default_popular_limit() -> i64 {
    5
}

fn default_page() -> i64 {
    1
}

fn default_search_logic() -> QueryLogic {
    QueryLogic::Or
}

fn default_category_logic() -> QueryLogic {
    QueryLogic::And
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Records one user interaction event
///
/// Validation failures and backend write failures both surface as
/// errors; a recorded action is never silently dropped.
pub async fn record_action(
    State(state): State<AppState>,
    Json(action): Json<UserAction>,
) -> AppResult<Json<StatusResponse>> {
    state.recommendations.add_user_action(&action).await?;

    Ok(Json(StatusResponse {
        success: true,
        message: "Action recorded successfully".to_string(),
    }))
}

/// Personalized recommendations for a user
///
/// When the backend is unreachable the handler recomputes against the
/// in-memory catalog snapshot instead of failing the request.
pub async fn recommendations(
    State(state): State<AppState>,
    Json(request): Json<RecommendationsRequest>,
) -> AppResult<Json<BoardgamesResponse>> {
    let service = &state.recommendations;

    let result = service
        .get_recommendations(
            &request.user_id,
            request.limit,
            request.user_actions.clone(),
            request.user_categories.clone(),
        )
        .await;

    let boardgames = match result {
        Ok(boardgames) => boardgames,
        Err(e) if e.is_backend_failure() => {
            tracing::warn!(error = %e, "Recommendations degraded to catalog snapshot");
            let snapshot = service.snapshot().await;
            let actions = request.user_actions.unwrap_or_default();
            service.recommend_within(
                snapshot,
                &actions,
                request.user_categories.as_deref(),
                request.limit,
            )
        }
        Err(e) => return Err(e),
    };

    Ok(Json(BoardgamesResponse { boardgames }))
}

/// Bulk catalog upsert
pub async fn upsert_boardgames(
    State(state): State<AppState>,
    Json(request): Json<BoardgamesRequest>,
) -> AppResult<Json<StatusResponse>> {
    state
        .recommendations
        .update_boardgames(&request.boardgames)
        .await?;

    Ok(Json(StatusResponse {
        success: true,
        message: "Boardgames updated successfully".to_string(),
    }))
}

/// Full catalog listing, snapshot fallback on backend failure
pub async fn list_boardgames(
    State(state): State<AppState>,
) -> AppResult<Json<BoardgamesResponse>> {
    let service = &state.recommendations;

    let boardgames = match service.all_boardgames().await {
        Ok(boardgames) => boardgames,
        Err(e) if e.is_backend_failure() => {
            tracing::warn!(error = %e, "Catalog listing degraded to snapshot");
            service.snapshot().await
        }
        Err(e) => return Err(e),
    };

    Ok(Json(BoardgamesResponse { boardgames }))
}

/// Most popular boardgames, snapshot fallback on backend failure
pub async fn popular_boardgames(
    State(state): State<AppState>,
    Query(params): Query<PopularParams>,
) -> AppResult<Json<BoardgamesResponse>> {
    let service = &state.recommendations;

    let boardgames = match service.get_popular_boardgames(params.limit).await {
        Ok(boardgames) => boardgames,
        Err(e) if e.is_backend_failure() => {
            tracing::warn!(error = %e, "Popular listing degraded to snapshot");
            top_by_popularity(&service.snapshot().await, params.limit.max(0) as usize)
        }
        Err(e) => return Err(e),
    };

    Ok(Json(BoardgamesResponse { boardgames }))
}

/// Newest-first action history of one user; empty on backend failure
pub async fn get_user_actions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<ActionsResponse>> {
    let actions = match state.recommendations.get_user_actions(&user_id).await {
        Ok(actions) => actions,
        Err(e) if e.is_backend_failure() => {
            tracing::warn!(error = %e, user_id = %user_id, "Action listing degraded to empty");
            Vec::new()
        }
        Err(e) => return Err(e),
    };

    Ok(Json(ActionsResponse { actions }))
}

/// Newest-first actions recorded against one boardgame; empty on
/// backend failure
pub async fn get_boardgame_actions(
    State(state): State<AppState>,
    Path(boardgame_id): Path<String>,
) -> AppResult<Json<ActionsResponse>> {
    let actions = match state
        .recommendations
        .get_boardgame_actions(&boardgame_id)
        .await
    {
        Ok(actions) => actions,
        Err(e) if e.is_backend_failure() => {
            tracing::warn!(
                error = %e,
                boardgame_id = %boardgame_id,
                "Action listing degraded to empty"
            );
            Vec::new()
        }
        Err(e) => return Err(e),
    };

    Ok(Json(ActionsResponse { actions }))
}

/// Rebuilds popularity scores from the full action log
pub async fn recompute_popularity(
    State(state): State<AppState>,
) -> AppResult<Json<StatusResponse>> {
    let updated = state.recommendations.recompute_popularity().await?;

    Ok(Json(StatusResponse {
        success: true,
        message: format!("Recomputed popularity for {} boardgames", updated),
    }))
}

/// Catalog search; backend failures degrade to an empty result list
pub async fn search_boardgames(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<ScoredBoardgame>>> {
    let mut query = SearchQueryBuilder::new()
        .with_limit(params.limit)
        .with_page(params.page)
        .with_search_logic(params.search_logic)
        .with_category_logic(params.category_logic);

    if let Some(text) = params.search_query {
        query = query.with_text(text);
    }
    if let Some(count) = params.player_count {
        query = query.with_player_count(count);
    }
    if let Some(minutes) = params.play_time {
        query = query.with_play_time(minutes);
    }
    if let Some(categories) = params.categories {
        query = query.with_categories(categories.split(','));
    }

    let results = match state.recommendations.search_boardgames(&query).await {
        Ok(results) => results,
        Err(e) if e.is_backend_failure() => {
            tracing::warn!(error = %e, "Search degraded to empty result list");
            Vec::new()
        }
        Err(e) => return Err(e),
    };

    Ok(Json(results))
}
