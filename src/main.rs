use anyhow::Context;
use std::{sync::Arc, time::Duration};
use tracing_subscriber::EnvFilter;

use cinesuggest_api::{
    api::{create_router, AppState},
    cache::{create_redis_client, Cache, CacheWriterHandle},
    config::Config,
    data::load_recommender,
    services::{DisabledProvider, MetadataProvider, TmdbProvider},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    // Recommendation data is all-or-nothing: refuse to serve without it
    let catalog_path = config.catalog_path.clone();
    let similarity_path = config.similarity_path.clone();
    let recommender =
        tokio::task::spawn_blocking(move || load_recommender(&catalog_path, &similarity_path))
            .await
            .context("Loader task panicked")?
            .context("Failed to load recommendation data")?;

    let (cache, cache_handle) = create_cache(&config).await?;
    let metadata = create_metadata_provider(&config, cache)?;

    let app = create_router(AppState::new(recommender, metadata));

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!(address = %address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(handle) = cache_handle {
        handle.shutdown().await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn create_cache(config: &Config) -> anyhow::Result<(Cache, Option<CacheWriterHandle>)> {
    match config.redis_url() {
        Some(redis_url) => {
            let client = create_redis_client(redis_url)?;
            let (cache, handle) = Cache::new(client).await;
            tracing::info!("Metadata cache enabled");
            Ok((cache, Some(handle)))
        }
        None => {
            tracing::info!("REDIS_URL not set, metadata cache disabled");
            Ok((Cache::disabled(), None))
        }
    }
}

fn create_metadata_provider(
    config: &Config,
    cache: Cache,
) -> anyhow::Result<Arc<dyn MetadataProvider>> {
    match config.tmdb_api_key() {
        Some(api_key) => {
            let provider = TmdbProvider::new(
                cache,
                api_key.to_string(),
                config.tmdb_api_url.clone(),
                Duration::from_secs(config.tmdb_timeout_secs),
            )?;
            Ok(Arc::new(provider))
        }
        None => {
            tracing::warn!("TMDB_API_KEY not set, metadata enrichment disabled");
            Ok(Arc::new(DisabledProvider))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
