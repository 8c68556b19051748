use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Base URL for TMDB poster images at w500 resolution
pub const POSTER_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";

/// External (TMDB) identifier for a movie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovieId(pub u64);

impl Display for MovieId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A catalog entry. Position in the catalog aligns with the similarity matrix.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    #[serde(alias = "id")]
    pub movie_id: MovieId,
    #[serde(alias = "title_x")]
    pub title: String,
}

impl Movie {
    pub fn new(movie_id: u64, title: impl Into<String>) -> Self {
        Self {
            movie_id: MovieId(movie_id),
            title: title.into(),
        }
    }
}

/// A single ranked recommendation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub title: String,
    pub movie_id: MovieId,
    /// Similarity as a percentage rounded to one decimal
    pub similarity: f64,
}

/// Summary statistics over the loaded catalog
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CatalogStats {
    pub total_movies: usize,
    /// Mean off-diagonal similarity as a percentage; `None` for a single-movie catalog
    pub average_similarity: Option<f64>,
}

/// Converts a raw score to a percentage rounded to one decimal place
pub fn to_percentage(score: f64) -> f64 {
    (score * 1000.0).round() / 10.0
}

// ============================================================================
// Metadata Types
// ============================================================================

/// Movie metadata from the external movie database
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieDetails {
    pub movie_id: MovieId,
    pub rating: Option<f64>,
    pub release_year: Option<i32>,
    pub overview: Option<String>,
    pub genres: Vec<String>,
    /// `None` when the movie has no poster
    pub poster_url: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

/// Outcome of a metadata lookup. Failures are values, never errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MetadataLookup {
    Available(MovieDetails),
    Unavailable { reason: UnavailableReason },
}

impl MetadataLookup {
    pub fn unavailable(reason: UnavailableReason) -> Self {
        MetadataLookup::Unavailable { reason }
    }

    pub fn details(&self) -> Option<&MovieDetails> {
        match self {
            MetadataLookup::Available(details) => Some(details),
            MetadataLookup::Unavailable { .. } => None,
        }
    }
}

/// Why metadata could not be produced for a movie
#[derive(thiserror::Error, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    #[error("metadata request timed out")]
    Timeout,

    #[error("metadata service unreachable")]
    Network,

    #[error("metadata service returned status {0}")]
    UpstreamStatus(u16),

    #[error("metadata response could not be parsed")]
    Malformed,

    #[error("metadata enrichment is disabled")]
    Disabled,

    #[error("metadata lookup task failed")]
    Internal,
}

impl UnavailableReason {
    /// Classifies a transport-level failure from the HTTP client
    pub fn from_transport(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            UnavailableReason::Timeout
        } else if error.is_decode() {
            UnavailableReason::Malformed
        } else {
            UnavailableReason::Network
        }
    }
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// Raw API response from TMDB GET /3/movie/{id}
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovie {
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub poster_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbGenre {
    pub name: String,
}

impl TmdbMovie {
    pub fn into_details(self, movie_id: MovieId) -> MovieDetails {
        let release_year = self
            .release_date
            .as_deref()
            .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
            .map(|date| date.year());

        let poster_url = self
            .poster_path
            .as_deref()
            .map(|path| path.trim_start_matches('/'))
            .filter(|path| !path.is_empty())
            .map(|path| format!("{}/{}", POSTER_BASE_URL, path));

        MovieDetails {
            movie_id,
            rating: self.vote_average,
            release_year,
            overview: self.overview.filter(|text| !text.trim().is_empty()),
            genres: self.genres.into_iter().map(|g| g.name).collect(),
            poster_url,
            fetched_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movie_id_display() {
        assert_eq!(format!("{}", MovieId(19995)), "19995");
    }

    #[test]
    fn test_movie_deserializes_column_aliases() {
        let movie: Movie =
            serde_json::from_str(r#"{"id": 285, "title_x": "Pirates of the Caribbean"}"#).unwrap();
        assert_eq!(movie, Movie::new(285, "Pirates of the Caribbean"));
    }

    #[test]
    fn test_movie_ignores_extra_columns() {
        let movie: Movie =
            serde_json::from_str(r#"{"movie_id": 19995, "title": "Avatar", "tags": "culture clash"}"#)
                .unwrap();
        assert_eq!(movie.movie_id, MovieId(19995));
    }

    #[test]
    fn test_to_percentage_rounds_to_one_decimal() {
        assert_eq!(to_percentage(0.9), 90.0);
        assert_eq!(to_percentage(0.12345), 12.3);
        assert_eq!(to_percentage(0.0), 0.0);
    }

    #[test]
    fn test_tmdb_movie_into_details() {
        let json = r#"{
            "vote_average": 7.2,
            "release_date": "2009-12-10",
            "overview": "In the 22nd century, a paraplegic Marine...",
            "genres": [{"id": 28, "name": "Action"}, {"id": 12, "name": "Adventure"}],
            "poster_path": "/kyeqWdyUXW608qlYkRqosgbbJyK.jpg"
        }"#;

        let raw: TmdbMovie = serde_json::from_str(json).unwrap();
        let details = raw.into_details(MovieId(19995));

        assert_eq!(details.rating, Some(7.2));
        assert_eq!(details.release_year, Some(2009));
        assert_eq!(details.genres, vec!["Action", "Adventure"]);
        assert_eq!(
            details.poster_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w500/kyeqWdyUXW608qlYkRqosgbbJyK.jpg")
        );
    }

    #[test]
    fn test_tmdb_movie_missing_fields() {
        let raw: TmdbMovie =
            serde_json::from_str(r#"{"release_date": "", "overview": "", "poster_path": null}"#).unwrap();
        let details = raw.into_details(MovieId(1));

        assert_eq!(details.rating, None);
        assert_eq!(details.release_year, None);
        assert_eq!(details.overview, None);
        assert!(details.genres.is_empty());
        assert_eq!(details.poster_url, None);
    }

    #[test]
    fn test_metadata_lookup_serialization() {
        let lookup = MetadataLookup::unavailable(UnavailableReason::UpstreamStatus(404));
        let json = serde_json::to_value(&lookup).unwrap();
        assert_eq!(json["status"], "unavailable");
        assert_eq!(json["reason"]["upstream_status"], 404);

        let lookup = MetadataLookup::unavailable(UnavailableReason::Timeout);
        let json = serde_json::to_value(&lookup).unwrap();
        assert_eq!(json["reason"], "timeout");
    }

    #[test]
    fn test_available_lookup_flattens_details() {
        let raw: TmdbMovie = serde_json::from_str(r#"{"vote_average": 8.0}"#).unwrap();
        let lookup = MetadataLookup::Available(raw.into_details(MovieId(27205)));
        let json = serde_json::to_value(&lookup).unwrap();

        assert_eq!(json["status"], "available");
        assert_eq!(json["movie_id"], 27205);
        assert_eq!(json["rating"], 8.0);
        assert!(lookup.details().is_some());
    }
}
