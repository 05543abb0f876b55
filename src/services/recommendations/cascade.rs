use super::{
    observer::{CallEvent, CallOutcome, CallStage, CascadeStage},
    processed::ProcessedSet,
    with_timeout, RecommendationEngine,
};
use crate::{
    models::Track,
    services::catalog::{spotify::MAX_SEARCH_LIMIT, CatalogContext, SearchRequest},
};

/// Items to request for a deficit, capped at what one search call serves
pub(super) fn request_size(deficit: usize, overfetch: usize) -> u32 {
    deficit
        .saturating_add(overfetch)
        .min(MAX_SEARCH_LIMIT as usize) as u32
}

/// Accumulated candidates that survive assembly
fn usable(processed: &ProcessedSet, accumulated: &[Track]) -> usize {
    accumulated
        .iter()
        .filter(|track| !processed.is_excluded(&track.id))
        .count()
}

impl RecommendationEngine {
    /// Back-fills `accumulated` once the strategy phase has settled
    ///
    /// At most two extra calls: a deficit fill when below `limit`, then a last-resort
    /// query when still below the configured floor.
    pub(super) async fn run_cascade(
        &self,
        ctx: &CatalogContext,
        limit: usize,
        processed: &mut ProcessedSet,
        accumulated: &mut Vec<Track>,
    ) {
        if usable(processed, accumulated) < limit {
            let query = self.config.fill_query.clone();
            self.run_cascade_stage(
                ctx,
                CascadeStage::DeficitFill,
                query,
                limit,
                processed,
                accumulated,
            )
            .await;
        }

        if usable(processed, accumulated) < self.config.min_results.min(limit) {
            let query = self.config.floor_query.clone();
            self.run_cascade_stage(ctx, CascadeStage::Floor, query, limit, processed, accumulated)
                .await;
        }
    }

    async fn run_cascade_stage(
        &self,
        ctx: &CatalogContext,
        stage: CascadeStage,
        query: String,
        limit: usize,
        processed: &mut ProcessedSet,
        accumulated: &mut Vec<Track>,
    ) {
        let deficit = limit.saturating_sub(usable(processed, accumulated));
        let request = SearchRequest::tracks(query, request_size(deficit, self.config.overfetch));

        let outcome = match with_timeout(
            self.config.call_timeout,
            self.search.search_items(ctx, &request),
        )
        .await
        {
            Ok(candidates) => {
                let returned = candidates.len();
                let taken = processed.accept(candidates, true, deficit);
                let outcome = CallOutcome::Succeeded {
                    returned,
                    accepted: taken.len(),
                };
                accumulated.extend(taken);
                outcome
            }
            Err(e) => CallOutcome::from_error(&e),
        };

        self.observer.on_call(&CallEvent {
            stage: CallStage::Cascade(stage),
            query: Some(request.query),
            outcome,
        });
    }
}
