//! Movie metadata provider abstraction
//!
//! Recommendations only carry a title and an external ID. Providers enrich a
//! movie with rating, release year, overview, genres and poster from an
//! external movie database. A lookup never fails: problems are reported as
//! [`MetadataLookup::Unavailable`] so they cannot leak into a recommendation
//! query.

use std::sync::Arc;

use crate::models::{MetadataLookup, MovieId, UnavailableReason};

pub mod tmdb;

pub use tmdb::TmdbProvider;

/// Trait for movie metadata providers
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fetch details for a single movie
    async fn fetch_details(&self, movie_id: MovieId) -> MetadataLookup;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Fetch details for several movies in parallel
///
/// Spawns one task per ID. Results come back in input order; a task that
/// panics yields `Unavailable(Internal)` for its movie only.
pub async fn fetch_details_batch(
    provider: Arc<dyn MetadataProvider>,
    movie_ids: Vec<MovieId>,
) -> Vec<MetadataLookup> {
    let mut tasks = Vec::with_capacity(movie_ids.len());

    for movie_id in movie_ids {
        let provider = Arc::clone(&provider);
        let task = tokio::spawn(async move { provider.fetch_details(movie_id).await });
        tasks.push(task);
    }

    let mut results = Vec::with_capacity(tasks.len());
    for task in tasks {
        match task.await {
            Ok(lookup) => results.push(lookup),
            Err(e) => {
                tracing::error!(error = %e, "Metadata task join error");
                results.push(MetadataLookup::unavailable(UnavailableReason::Internal));
            }
        }
    }

    let unavailable = results
        .iter()
        .filter(|lookup| lookup.details().is_none())
        .count();
    if unavailable > 0 {
        tracing::warn!(
            provider = provider.name(),
            success_count = results.len() - unavailable,
            unavailable_count = unavailable,
            "Partial metadata fetch failure"
        );
    }

    results
}

/// Provider used when no metadata API key is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledProvider;

#[async_trait::async_trait]
impl MetadataProvider for DisabledProvider {
    async fn fetch_details(&self, _movie_id: MovieId) -> MetadataLookup {
        MetadataLookup::unavailable(UnavailableReason::Disabled)
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}
