use serde::Deserialize;
use std::time::Duration;

use crate::services::catalog::TOKEN_MARKET;
use crate::services::recommendations::{EngineConfig, KeywordPicker};

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Spotify Web API base URL
    #[serde(default = "default_spotify_api_url")]
    pub spotify_api_url: String,

    /// Redis connection URL; caching is disabled when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Market used when a request does not name one
    #[serde(default = "default_region")]
    pub default_region: String,

    /// Upper bound for every outbound catalog call
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    /// How many seed identifiers a recommendation request consumes
    #[serde(default = "default_max_seeds")]
    pub max_seeds: usize,

    /// Absolute floor that triggers the last-resort query
    #[serde(default = "default_min_results")]
    pub min_results: usize,

    /// Extra items requested by cascade queries to absorb duplicates
    #[serde(default = "default_overfetch")]
    pub overfetch: usize,

    #[serde(default = "default_limit")]
    pub default_limit: usize,

    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Query used to back-fill a result below the requested limit
    #[serde(default = "default_fill_query")]
    pub default_query_fill: String,

    /// Query used when the result is still below `min_results`
    #[serde(default = "default_floor_query")]
    pub floor_query: String,

    /// Seeds the title-keyword RNG; keywords are ranked deterministically when unset
    #[serde(default)]
    pub keyword_seed: Option<u64>,
}

fn default_spotify_api_url() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_region() -> String {
    TOKEN_MARKET.to_string()
}

fn default_call_timeout_ms() -> u64 {
    5000
}

fn default_max_seeds() -> usize {
    2
}

fn default_min_results() -> usize {
    5
}

fn default_overfetch() -> usize {
    5
}

fn default_limit() -> usize {
    20
}

fn default_max_limit() -> usize {
    100
}

fn default_fill_query() -> String {
    "popularity:50-100".to_string()
}

fn default_floor_query() -> String {
    "year:2000-2024".to_string()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Engine tuning derived from this configuration
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_seeds: self.max_seeds,
            min_results: self.min_results,
            overfetch: self.overfetch,
            max_limit: self.max_limit,
            call_timeout: self.call_timeout(),
            fill_query: self.default_query_fill.clone(),
            floor_query: self.floor_query.clone(),
        }
    }

    pub fn keyword_picker(&self) -> KeywordPicker {
        match self.keyword_seed {
            Some(seed) => KeywordPicker::seeded(seed),
            None => KeywordPicker::Ranked,
        }
    }
}
