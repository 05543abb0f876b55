use std::sync::Arc;

use crate::services::{CatalogLookup, CatalogSearch, RecommendationEngine};

/// Values applied when a request leaves them out
#[derive(Debug, Clone)]
pub struct RequestDefaults {
    pub region: String,
    pub limit: usize,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            region: "from_token".to_string(),
            limit: 20,
        }
    }
}

/// Shared application state
///
/// Holds no per-user data; credentials arrive with each request.
#[derive(Clone)]
pub struct AppState {
    pub search: Arc<dyn CatalogSearch>,
    pub lookup: Arc<dyn CatalogLookup>,
    pub engine: Arc<RecommendationEngine>,
    pub defaults: RequestDefaults,
}

impl AppState {
    pub fn new(
        search: Arc<dyn CatalogSearch>,
        lookup: Arc<dyn CatalogLookup>,
        engine: RecommendationEngine,
        defaults: RequestDefaults,
    ) -> Self {
        Self {
            search,
            lookup,
            engine: Arc::new(engine),
            defaults,
        }
    }

    /// Region from the request, or the configured default
    pub fn region_or_default(&self, region: Option<String>) -> String {
        region
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| self.defaults.region.clone())
    }
}
