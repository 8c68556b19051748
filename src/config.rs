use serde::Deserialize;
use std::path::PathBuf;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Path to the movie catalog JSON file
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    /// Path to the similarity matrix JSON file
    #[serde(default = "default_similarity_path")]
    pub similarity_path: PathBuf,

    /// TMDB API key. Metadata enrichment is disabled when absent.
    #[serde(default)]
    pub tmdb_api_key: Option<String>,

    /// TMDB API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// Per-request timeout for metadata lookups
    #[serde(default = "default_tmdb_timeout_secs")]
    pub tmdb_timeout_secs: u64,

    /// Redis connection URL for the metadata cache
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("data/movies.json")
}

fn default_similarity_path() -> PathBuf {
    PathBuf::from("data/similarity.json")
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org".to_string()
}

fn default_tmdb_timeout_secs() -> u64 {
    5
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from an explicit set of variables
    pub fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(vars).map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// TMDB API key, treating an empty value as unset
    pub fn tmdb_api_key(&self) -> Option<&str> {
        non_empty(self.tmdb_api_key.as_deref())
    }

    /// Redis URL, treating an empty value as unset
    pub fn redis_url(&self) -> Option<&str> {
        non_empty(self.redis_url.as_deref())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
