use serde::{Deserialize, Serialize};
use std::fmt::Display;

mod seed;

pub use seed::SeedDescriptor;

/// Kind of catalog item a search targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Track,
}

impl Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemType::Track => write!(f, "track"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalUrls {
    #[serde(default)]
    pub spotify: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
}

/// Contributor of a track
///
/// Search results carry simplified artists without genres; the full artist
/// object returned by `/artists/{id}` fills them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Option<Vec<String>>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    #[serde(default)]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
    /// `YYYY`, `YYYY-MM` or `YYYY-MM-DD` depending on precision
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

/// Catalog item summary returned by searches and lookups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artists: Vec<Artist>,
    pub album: Album,
    pub duration_ms: u64,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    pub uri: String,
}

impl Track {
    pub fn primary_artist(&self) -> Option<&Artist> {
        self.artists.first()
    }
}

// ============================================================================
// Spotify Web API Types
// ============================================================================

/// Raw response from GET /search
#[derive(Debug, Deserialize)]
pub struct SpotifySearchResponse {
    #[serde(default)]
    pub tracks: Option<SpotifyPage<Track>>,
}

/// Paging object; the API occasionally returns `null` entries in `items`
#[derive(Debug, Deserialize)]
pub struct SpotifyPage<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<Option<T>>,
}

/// Raw response from GET /tracks?ids=; unknown ids come back as `null`
#[derive(Debug, Deserialize)]
pub struct SpotifyTracksResponse {
    #[serde(default = "Vec::new")]
    pub tracks: Vec<Option<Track>>,
}

/// Error body returned by the Web API on non-2xx responses
#[derive(Debug, Deserialize)]
pub struct SpotifyErrorResponse {
    pub error: SpotifyErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct SpotifyErrorBody {
    pub status: u16,
    #[serde(default)]
    pub message: String,
}

// ============================================================================
// Recommendation API Types
// ============================================================================

/// Request body for POST /api/v1/recommendations
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationRequest {
    pub seed_ids: Vec<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub region: Option<String>,
}

/// Ordered, deduplicated recommendations for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub tracks: Vec<Track>,
    /// Seeds whose descriptor could be resolved and drove the strategies
    pub resolved_seeds: Vec<String>,
}
