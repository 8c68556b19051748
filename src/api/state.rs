use std::sync::Arc;

use crate::services::{providers::MetadataProvider, recommendations::Recommender};

/// Shared application state
///
/// The recommender is read-only after load, so handlers share it without locking.
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
    pub metadata: Arc<dyn MetadataProvider>,
}

impl AppState {
    /// Creates the application state from loaded recommendation data
    pub fn new(recommender: Recommender, metadata: Arc<dyn MetadataProvider>) -> Self {
        Self {
            recommender: Arc::new(recommender),
            metadata,
        }
    }
}
