//! TMDB movie metadata provider
//!
//! Fetches `GET /3/movie/{id}` and converts the response into
//! [`MovieDetails`]. Successful lookups are cached in Redis when a cache is
//! configured.

use crate::{
    cache::{Cache, CacheKey},
    cached,
    error::AppResult,
    models::{MetadataLookup, MovieDetails, MovieId, TmdbMovie, UnavailableReason},
    services::providers::MetadataProvider,
};
use reqwest::Client as HttpClient;
use std::time::Duration;

const DETAILS_CACHE_TTL: u64 = 86400; // 1 day

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Cache,
}

impl TmdbProvider {
    /// Creates a TMDB provider whose requests give up after `timeout`
    pub fn new(cache: Cache, api_key: String, api_url: String, timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            cache,
        })
    }

    async fn cached_details(&self, movie_id: MovieId) -> Result<MovieDetails, UnavailableReason> {
        let key = CacheKey::MovieDetails(movie_id);
        cached!(self.cache, key, DETAILS_CACHE_TTL, self.request_details(movie_id))
    }

    async fn request_details(&self, movie_id: MovieId) -> Result<MovieDetails, UnavailableReason> {
        let url = format!("{}/3/movie/{}", self.api_url, movie_id);

        let response = self
            .http_client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str()), ("language", "en-US")])
            .send()
            .await
            .map_err(UnavailableReason::from_transport)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                movie_id = %movie_id,
                status = %status,
                body = %body,
                "TMDB API returned an error status"
            );
            return Err(UnavailableReason::UpstreamStatus(status.as_u16()));
        }

        let raw: TmdbMovie = response
            .json()
            .await
            .map_err(UnavailableReason::from_transport)?;

        Ok(raw.into_details(movie_id))
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbProvider {
    async fn fetch_details(&self, movie_id: MovieId) -> MetadataLookup {
        match self.cached_details(movie_id).await {
            Ok(details) => {
                tracing::info!(
                    movie_id = %movie_id,
                    genres = details.genres.len(),
                    has_poster = details.poster_url.is_some(),
                    provider = "tmdb",
                    "Movie details fetched"
                );
                MetadataLookup::Available(details)
            }
            Err(reason) => {
                tracing::warn!(
                    movie_id = %movie_id,
                    reason = %reason,
                    provider = "tmdb",
                    "Movie details unavailable"
                );
                MetadataLookup::unavailable(reason)
            }
        }
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_provider(api_url: &str, timeout: Duration) -> TmdbProvider {
        TmdbProvider::new(
            Cache::disabled(),
            "test_key".to_string(),
            api_url.to_string(),
            timeout,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_details_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/3/movie/27205"))
            .and(query_param("api_key", "test_key"))
            .and(query_param("language", "en-US"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 27205,
                "title": "Inception",
                "vote_average": 8.4,
                "release_date": "2010-07-15",
                "overview": "Cobb, a skilled thief who commits corporate espionage...",
                "genres": [{"id": 28, "name": "Action"}, {"id": 878, "name": "Science Fiction"}],
                "poster_path": "/oYuLEt3zVCKq57qu2F8dT7NIa6f.jpg"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = create_test_provider(&server.uri(), Duration::from_secs(5));
        let lookup = provider.fetch_details(MovieId(27205)).await;

        let details = lookup.details().expect("details should be available");
        assert_eq!(details.movie_id, MovieId(27205));
        assert_eq!(details.rating, Some(8.4));
        assert_eq!(details.release_year, Some(2010));
        assert_eq!(details.genres, vec!["Action", "Science Fiction"]);
        assert_eq!(
            details.poster_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w500/oYuLEt3zVCKq57qu2F8dT7NIa6f.jpg")
        );
    }

    #[tokio::test]
    async fn test_fetch_details_without_poster_is_still_available() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/3/movie/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "vote_average": 5.0,
                "poster_path": null
            })))
            .mount(&server)
            .await;

        let provider = create_test_provider(&server.uri(), Duration::from_secs(5));
        let lookup = provider.fetch_details(MovieId(1)).await;

        let details = lookup.details().expect("details should be available");
        assert_eq!(details.poster_url, None);
    }

    #[tokio::test]
    async fn test_fetch_details_upstream_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/3/movie/404404"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "status_code": 34,
                "status_message": "The resource you requested could not be found."
            })))
            .mount(&server)
            .await;

        let provider = create_test_provider(&server.uri(), Duration::from_secs(5));
        let lookup = provider.fetch_details(MovieId(404404)).await;

        assert_eq!(
            lookup,
            MetadataLookup::unavailable(UnavailableReason::UpstreamStatus(404))
        );
    }

    #[tokio::test]
    async fn test_fetch_details_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/3/movie/2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let provider = create_test_provider(&server.uri(), Duration::from_secs(5));
        let lookup = provider.fetch_details(MovieId(2)).await;

        assert_eq!(
            lookup,
            MetadataLookup::unavailable(UnavailableReason::Malformed)
        );
    }

    #[tokio::test]
    async fn test_fetch_details_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/3/movie/3"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"vote_average": 7.0}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let provider = create_test_provider(&server.uri(), Duration::from_millis(100));
        let lookup = provider.fetch_details(MovieId(3)).await;

        assert_eq!(
            lookup,
            MetadataLookup::unavailable(UnavailableReason::Timeout)
        );
    }

    #[tokio::test]
    async fn test_fetch_details_unreachable_host() {
        // Nothing listens on port 9 (discard) on a test machine
        let provider = create_test_provider("http://127.0.0.1:9", Duration::from_secs(1));
        let lookup = provider.fetch_details(MovieId(4)).await;

        assert!(matches!(
            lookup,
            MetadataLookup::Unavailable {
                reason: UnavailableReason::Network | UnavailableReason::Timeout
            }
        ));
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let provider = create_test_provider("https://api.themoviedb.org/", Duration::from_secs(5));
        assert_eq!(provider.api_url, "https://api.themoviedb.org");
        assert_eq!(provider.name(), "tmdb");
    }
}
