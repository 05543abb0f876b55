pub mod catalog;
pub mod recommendations;

pub use catalog::{CatalogContext, CatalogLookup, CatalogSearch, SpotifyCatalog};
pub use recommendations::RecommendationEngine;
