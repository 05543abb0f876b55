//! Catalog ports
//!
//! The recommendation engine only sees these two traits. Every call carries an explicit
//! `CatalogContext`, so no implementation reads credentials from ambient state.
use crate::{
    error::{AppError, AppResult},
    models::{ItemType, Track},
};

pub mod spotify;

pub use spotify::SpotifyCatalog;

/// Credentials and market for one request
#[derive(Clone)]
pub struct CatalogContext {
    pub access_token: String,
    /// Market code, e.g. `US`, or `from_token` for the token owner's country
    pub region: String,
}

/// Region value asking the catalog to use the token owner's market
pub const TOKEN_MARKET: &str = "from_token";

impl CatalogContext {
    pub fn new(access_token: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            region: region.into(),
        }
    }

    /// Whether responses depend only on the region, not on whose token made the call
    pub fn has_concrete_market(&self) -> bool {
        !self.region.trim().eq_ignore_ascii_case(TOKEN_MARKET)
    }
}

impl std::fmt::Debug for CatalogContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogContext")
            .field("access_token", &"<redacted>")
            .field("region", &self.region)
            .finish()
    }
}

/// One keyword search call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub item_type: ItemType,
    pub limit: u32,
}

impl SearchRequest {
    pub fn tracks(query: impl Into<String>, limit: u32) -> Self {
        Self {
            query: query.into(),
            item_type: ItemType::Track,
            limit,
        }
    }
}

/// Keyword search over the catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogSearch: Send + Sync {
    /// Returns matching item summaries in catalog relevance order
    async fn search_items(
        &self,
        ctx: &CatalogContext,
        request: &SearchRequest,
    ) -> AppResult<Vec<Track>>;
}

/// Lookup of catalog items by id
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogLookup: Send + Sync {
    /// Fetches a track whose primary artist carries genre tags when the catalog has them
    async fn get_track(&self, ctx: &CatalogContext, id: &str) -> AppResult<Track>;

    /// Fetches several tracks in request order; ids the catalog does not know are omitted
    async fn get_tracks(&self, ctx: &CatalogContext, ids: &[String]) -> AppResult<Vec<Track>> {
        let mut tracks = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get_track(ctx, id).await {
                Ok(track) => tracks.push(track),
                Err(AppError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(tracks)
    }
}
