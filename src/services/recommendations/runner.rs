use std::sync::Arc;

use tokio::task::JoinSet;

use super::{
    observer::{CallEvent, CallOutcome, CallStage},
    processed::ProcessedSet,
    strategy::KeywordPicker,
    with_timeout, RecommendationEngine,
};
use crate::{
    error::{AppError, AppResult},
    models::{SeedDescriptor, Track},
    services::catalog::{CatalogContext, SearchRequest},
};

impl RecommendationEngine {
    /// Runs the strategy table for one seed and returns the candidates it accepted
    ///
    /// Searches run concurrently, but their results are filtered and merged strictly in
    /// table order, so the outcome does not depend on which call finishes first.
    pub(super) async fn run_strategies(
        &self,
        ctx: &CatalogContext,
        seed: &SeedDescriptor,
        picker: &mut KeywordPicker,
        processed: &mut ProcessedSet,
    ) -> Vec<Track> {
        // Built up front so the keyword picker is consumed in table order
        let queries: Vec<Option<String>> = self
            .strategies
            .iter()
            .map(|strategy| strategy.template.build(seed, picker))
            .collect();

        let mut results = self.spawn_searches(ctx, &queries).await;
        let mut accepted = Vec::new();

        for (index, (strategy, query)) in self.strategies.iter().zip(queries).enumerate() {
            let stage = CallStage::Strategy {
                name: strategy.name,
                seed_id: seed.id.clone(),
            };

            let Some(query) = query else {
                self.observer.on_call(&CallEvent {
                    stage,
                    query: None,
                    outcome: CallOutcome::Skipped,
                });
                continue;
            };

            let result = results[index].take().unwrap_or_else(|| {
                Err(AppError::Internal("Strategy search task panicked".to_string()))
            });

            let outcome = match result {
                Ok(candidates) => {
                    let returned = candidates.len();
                    let taken = processed.accept(candidates, strategy.excludes_seed, strategy.take);
                    let outcome = CallOutcome::Succeeded {
                        returned,
                        accepted: taken.len(),
                    };
                    accepted.extend(taken);
                    outcome
                }
                Err(e) => CallOutcome::from_error(&e),
            };

            self.observer.on_call(&CallEvent {
                stage,
                query: Some(query),
                outcome,
            });
        }

        tracing::debug!(
            seed_id = %seed.id,
            accepted = accepted.len(),
            "Strategies completed for seed"
        );

        accepted
    }

    /// Issues one bounded search per built query and collects the results by table index
    ///
    /// The join set aborts outstanding calls if the aggregation is dropped.
    async fn spawn_searches(
        &self,
        ctx: &CatalogContext,
        queries: &[Option<String>],
    ) -> Vec<Option<AppResult<Vec<Track>>>> {
        let mut tasks = JoinSet::new();

        for (index, (strategy, query)) in self.strategies.iter().zip(queries).enumerate() {
            let Some(query) = query else {
                continue;
            };

            let search = Arc::clone(&self.search);
            let ctx = ctx.clone();
            let request = SearchRequest::tracks(query.clone(), strategy.cap);
            let timeout = self.config.call_timeout;

            tasks.spawn(async move {
                let result = with_timeout(timeout, search.search_items(&ctx, &request)).await;
                (index, result)
            });
        }

        let mut results: Vec<Option<AppResult<Vec<Track>>>> =
            (0..queries.len()).map(|_| None).collect();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(e) => tracing::error!(error = %e, "Strategy search task failed to join"),
            }
        }

        results
    }
}
