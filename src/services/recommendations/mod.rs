//! Recommendation aggregation
//!
//! Turns up to two seed tracks into an ordered, deduplicated list of similar tracks by
//! running a table of keyword-search strategies per seed and back-filling with broader
//! queries when the strategies under-deliver.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::{
    error::{AppError, AppResult},
    models::{AggregationResult, Track},
    services::catalog::{CatalogContext, CatalogLookup, CatalogSearch},
};

mod cascade;
pub mod observer;
pub mod processed;
mod runner;
mod seeds;
pub mod strategy;

pub use observer::{
    AggregationObserver, CallEvent, CallOutcome, CallStage, CascadeStage, TracingObserver,
};
pub use processed::ProcessedSet;
pub use strategy::{KeywordPicker, QueryTemplate, Strategy};

/// Tuning for one engine instance
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Seed identifiers consumed per request
    pub max_seeds: usize,
    /// Floor below which the last-resort query runs
    pub min_results: usize,
    /// Extra items requested by cascade queries
    pub overfetch: usize,
    pub max_limit: usize,
    /// Bound on every outbound call
    pub call_timeout: Duration,
    pub fill_query: String,
    pub floor_query: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_seeds: 2,
            min_results: 5,
            overfetch: 5,
            max_limit: 100,
            call_timeout: Duration::from_secs(5),
            fill_query: "popularity:50-100".to_string(),
            floor_query: "year:2000-2024".to_string(),
        }
    }
}

/// Stateless between calls: every run builds its own processed set and keyword picker
pub struct RecommendationEngine {
    search: Arc<dyn CatalogSearch>,
    lookup: Arc<dyn CatalogLookup>,
    strategies: Vec<Strategy>,
    keyword_picker: KeywordPicker,
    observer: Arc<dyn AggregationObserver>,
    config: EngineConfig,
}

impl RecommendationEngine {
    pub fn new(
        search: Arc<dyn CatalogSearch>,
        lookup: Arc<dyn CatalogLookup>,
        config: EngineConfig,
    ) -> Self {
        Self {
            search,
            lookup,
            strategies: Strategy::default_table(),
            keyword_picker: KeywordPicker::default(),
            observer: Arc::new(TracingObserver),
            config,
        }
    }

    pub fn with_strategies(mut self, strategies: Vec<Strategy>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Picker template; each run starts from a fresh clone of it
    pub fn with_keyword_picker(mut self, picker: KeywordPicker) -> Self {
        self.keyword_picker = picker;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn AggregationObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Recommends up to `limit` tracks similar to the given seeds
    ///
    /// Only the first `max_seeds` distinct seed ids are used. Individual lookup and search
    /// failures are reported to the observer and absorbed; the call fails only on invalid
    /// input or when no seed resolves. A result shorter than `limit` is not an error.
    #[tracing::instrument(skip_all, fields(seeds = seed_ids.len(), limit = limit, region = %ctx.region))]
    pub async fn get_recommendations(
        &self,
        ctx: &CatalogContext,
        seed_ids: &[String],
        limit: usize,
    ) -> AppResult<AggregationResult> {
        let start = Instant::now();
        self.validate(seed_ids, limit)?;

        let requested = seeds::consumed_seeds(seed_ids, seed_ids.len());
        let consumed = &requested[..requested.len().min(self.config.max_seeds)];
        let seeds = self.resolve_seeds(ctx, consumed).await?;

        // Every requested id is excluded, including ones past the seed cap, and a lookup
        // may answer with a relinked id
        let excluded: HashSet<String> = requested
            .iter()
            .cloned()
            .chain(seeds.iter().map(|s| s.id.clone()))
            .collect();
        let mut processed = ProcessedSet::with_excluded(excluded.iter().cloned());

        let mut picker = self.keyword_picker.clone();
        let mut accumulated = Vec::new();

        for seed in &seeds {
            let accepted = self
                .run_strategies(ctx, seed, &mut picker, &mut processed)
                .await;
            accumulated.extend(accepted);
        }

        let from_strategies = accumulated.len();
        self.run_cascade(ctx, limit, &mut processed, &mut accumulated)
            .await;

        let tracks = assemble(accumulated, &excluded, limit);

        tracing::info!(
            resolved_seeds = seeds.len(),
            from_strategies,
            returned = tracks.len(),
            processing_time_ms = start.elapsed().as_millis(),
            "Recommendations aggregated"
        );

        Ok(AggregationResult {
            tracks,
            resolved_seeds: seeds.into_iter().map(|s| s.id).collect(),
        })
    }

    fn validate(&self, seed_ids: &[String], limit: usize) -> AppResult<()> {
        if seed_ids.is_empty() {
            return Err(AppError::InvalidInput(
                "At least one seed track is required for recommendations".to_string(),
            ));
        }
        if seed_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(AppError::InvalidInput(
                "Seed track ids cannot be blank".to_string(),
            ));
        }
        if limit == 0 || limit > self.config.max_limit {
            return Err(AppError::InvalidInput(format!(
                "Limit must be between 1 and {}",
                self.config.max_limit
            )));
        }
        Ok(())
    }
}

/// Bounds a catalog call; an elapsed timeout becomes `AppError::Timeout`
pub(crate) async fn with_timeout<T>(
    timeout: Duration,
    call: impl Future<Output = AppResult<T>>,
) -> AppResult<T> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout(timeout.as_millis() as u64)),
    }
}

/// Final shaping: first occurrence wins, excluded ids dropped, truncated to `limit`
fn assemble(candidates: Vec<Track>, excluded: &HashSet<String>, limit: usize) -> Vec<Track> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|track| !excluded.contains(&track.id) && seen.insert(track.id.clone()))
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests;
