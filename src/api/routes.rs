use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;
use crate::middleware::{make_span_with_request_id, request_id_middleware};

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Catalog
        .route("/movies", get(handlers::list_movies))
        .route("/movies/search", get(handlers::search_movies))
        .route("/movies/:movie_id", get(handlers::get_movie))
        .route(
            "/movies/:movie_id/recommendations",
            get(handlers::recommend_by_id),
        )
        // Recommendations
        .route("/recommendations", get(handlers::recommend))
        .route("/recommendations/batch", post(handlers::recommend_batch))
        .route("/discover", get(handlers::discover))
        .route("/stats", get(handlers::stats))
}
