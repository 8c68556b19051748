use axum::{extract::State, http::StatusCode, Extension, Json};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::RequestId,
    models::{CatalogStats, MetadataLookup, Movie, MovieId, Recommendation},
    services::providers::{fetch_details_batch, MetadataProvider},
};

use super::{
    extract::{Json as JsonBody, Path, Query},
    AppState,
};

const DEFAULT_RECOMMENDATIONS: usize = 5;
const DEFAULT_PAGE_SIZE: usize = 50;
const DEFAULT_SEARCH_LIMIT: usize = 20;

fn default_k() -> usize {
    DEFAULT_RECOMMENDATIONS
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_search_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_page_size")]
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct RecommendQuery {
    pub title: String,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default)]
    pub min_similarity: f64,
    #[serde(default)]
    pub enrich: bool,
}

#[derive(Debug, Deserialize)]
pub struct RecommendByIdQuery {
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default)]
    pub min_similarity: f64,
    #[serde(default)]
    pub enrich: bool,
}

#[derive(Debug, Deserialize)]
pub struct BatchRecommendRequest {
    pub titles: Vec<String>,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default)]
    pub enrich: bool,
}

#[derive(Debug, Deserialize)]
pub struct DiscoverQuery {
    #[serde(default = "default_k")]
    pub n: usize,
    /// Fixes the random sample for reproducible results
    pub seed: Option<u64>,
    #[serde(default)]
    pub enrich: bool,
}

#[derive(Debug, Serialize)]
pub struct MoviePage {
    pub total: usize,
    pub offset: usize,
    pub movies: Vec<Movie>,
}

/// A result item with optional metadata attached
#[derive(Debug, Serialize)]
pub struct Enriched<T> {
    #[serde(flatten)]
    pub item: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataLookup>,
}

trait HasMovieId {
    fn movie_id(&self) -> MovieId;
}

impl HasMovieId for Movie {
    fn movie_id(&self) -> MovieId {
        self.movie_id
    }
}

impl HasMovieId for Recommendation {
    fn movie_id(&self) -> MovieId {
        self.movie_id
    }
}

/// Attaches metadata to every item when requested
///
/// Runs after the core query has already succeeded; lookups can only degrade
/// to `Unavailable`, never fail the response.
async fn attach_metadata<T: HasMovieId>(
    provider: &Arc<dyn MetadataProvider>,
    items: Vec<T>,
    enrich: bool,
) -> Vec<Enriched<T>> {
    if !enrich {
        return items
            .into_iter()
            .map(|item| Enriched { item, metadata: None })
            .collect();
    }

    let movie_ids = items.iter().map(HasMovieId::movie_id).collect();
    let lookups = fetch_details_batch(Arc::clone(provider), movie_ids).await;

    items
        .into_iter()
        .zip(lookups)
        .map(|(item, lookup)| Enriched {
            item,
            metadata: Some(lookup),
        })
        .collect()
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Page through the catalog
pub async fn list_movies(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Json<MoviePage> {
    let movies = state.recommender.movies(page.offset, page.limit).to_vec();
    Json(MoviePage {
        total: state.recommender.len(),
        offset: page.offset,
        movies,
    })
}

/// Search titles by case-insensitive substring
pub async fn search_movies(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<Movie>>> {
    let movies = state
        .recommender
        .search(&params.q, params.limit)?
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(movies))
}

/// Get a single movie with its metadata
pub async fn get_movie(
    State(state): State<AppState>,
    Path(movie_id): Path<MovieId>,
) -> AppResult<Json<Enriched<Movie>>> {
    let movie = state.recommender.movie(movie_id)?.clone();
    let metadata = state.metadata.fetch_details(movie_id).await;

    Ok(Json(Enriched {
        item: movie,
        metadata: Some(metadata),
    }))
}

/// Recommend movies similar to a title
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<RecommendQuery>,
) -> AppResult<Json<Vec<Enriched<Recommendation>>>> {
    tracing::info!(
        request_id = %request_id,
        title = %params.title,
        k = params.k,
        min_similarity = params.min_similarity,
        "Processing recommendation request"
    );

    let recommendations =
        state
            .recommender
            .recommend_single(&params.title, params.k, params.min_similarity)?;

    tracing::info!(
        request_id = %request_id,
        results = recommendations.len(),
        "Recommendation completed"
    );

    Ok(Json(
        attach_metadata(&state.metadata, recommendations, params.enrich).await,
    ))
}

/// Recommend movies similar to a movie ID
pub async fn recommend_by_id(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(movie_id): Path<MovieId>,
    Query(params): Query<RecommendByIdQuery>,
) -> AppResult<Json<Vec<Enriched<Recommendation>>>> {
    tracing::info!(
        request_id = %request_id,
        movie_id = %movie_id,
        k = params.k,
        min_similarity = params.min_similarity,
        "Processing recommendation request"
    );

    let recommendations =
        state
            .recommender
            .recommend_by_id(movie_id, params.k, params.min_similarity)?;

    Ok(Json(
        attach_metadata(&state.metadata, recommendations, params.enrich).await,
    ))
}

/// Recommend movies matching several titles at once
pub async fn recommend_batch(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    JsonBody(request): JsonBody<BatchRecommendRequest>,
) -> AppResult<Json<Vec<Enriched<Recommendation>>>> {
    tracing::info!(
        request_id = %request_id,
        seed_count = request.titles.len(),
        k = request.k,
        "Processing batch recommendation request"
    );

    let recommendations = state
        .recommender
        .recommend_batch(&request.titles, request.k)?;

    tracing::info!(
        request_id = %request_id,
        results = recommendations.len(),
        "Batch recommendation completed"
    );

    Ok(Json(
        attach_metadata(&state.metadata, recommendations, request.enrich).await,
    ))
}

/// Random movies for discovery
pub async fn discover(
    State(state): State<AppState>,
    Query(params): Query<DiscoverQuery>,
) -> Json<Vec<Enriched<Movie>>> {
    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let movies: Vec<Movie> = state
        .recommender
        .sample_random(&mut rng, params.n)
        .into_iter()
        .cloned()
        .collect();

    Json(attach_metadata(&state.metadata, movies, params.enrich).await)
}

/// Catalog statistics
pub async fn stats(State(state): State<AppState>) -> Json<CatalogStats> {
    Json(state.recommender.stats().clone())
}
