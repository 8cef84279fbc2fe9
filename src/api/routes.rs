use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // User actions
        .route("/api/actions", post(handlers::record_action))
        .route("/api/actions/user/:user_id", get(handlers::get_user_actions))
        .route(
            "/api/actions/boardgame/:boardgame_id",
            get(handlers::get_boardgame_actions),
        )
        // Catalog
        .route("/api/boardgames", post(handlers::upsert_boardgames))
        .route("/api/boardgames", get(handlers::list_boardgames))
        .route("/api/boardgames/popular", get(handlers::popular_boardgames))
        .route(
            "/api/boardgames/popularity/recompute",
            post(handlers::recompute_popularity),
        )
        // Recommendations and search
        .route("/api/recommendations", post(handlers::recommendations))
        .route("/api/search", get(handlers::search_boardgames))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
