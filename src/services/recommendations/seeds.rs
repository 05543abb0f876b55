use std::collections::HashSet;

use super::{
    observer::{CallEvent, CallOutcome, CallStage},
    with_timeout, RecommendationEngine,
};
use crate::{
    error::{AppError, AppResult, SeedFailure},
    models::SeedDescriptor,
    services::catalog::CatalogContext,
};

/// Seed identifiers a request actually consumes: trimmed, first occurrence only, at most `max`
pub(super) fn consumed_seeds(seed_ids: &[String], max: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    seed_ids
        .iter()
        .map(|id| id.trim())
        .filter(|id| seen.insert(id.to_string()))
        .take(max)
        .map(str::to_string)
        .collect()
}

impl RecommendationEngine {
    /// Resolves seeds in request order, skipping the ones whose lookup fails
    ///
    /// Fails only when no seed resolves, with one cause per seed. When every lookup was
    /// refused for the access token, the failure is `Unauthorized` instead.
    pub(super) async fn resolve_seeds(
        &self,
        ctx: &CatalogContext,
        seed_ids: &[String],
    ) -> AppResult<Vec<SeedDescriptor>> {
        let mut resolved = Vec::with_capacity(seed_ids.len());
        let mut causes = Vec::new();
        let mut token_rejection = None;
        let mut other_failure = false;

        for seed_id in seed_ids {
            let result = with_timeout(
                self.config.call_timeout,
                self.lookup.get_track(ctx, seed_id),
            )
            .await
            .and_then(SeedDescriptor::from_track);

            let outcome = match result {
                Ok(seed) => {
                    resolved.push(seed);
                    CallOutcome::Resolved
                }
                Err(e) => {
                    match &e {
                        AppError::Unauthorized(message) => {
                            token_rejection.get_or_insert_with(|| message.clone());
                        }
                        _ => other_failure = true,
                    }
                    let outcome = CallOutcome::from_error(&e);
                    causes.push(SeedFailure {
                        seed_id: seed_id.clone(),
                        cause: e.to_string(),
                    });
                    outcome
                }
            };

            self.observer.on_call(&CallEvent {
                stage: CallStage::SeedLookup {
                    seed_id: seed_id.clone(),
                },
                query: None,
                outcome,
            });
        }

        if resolved.is_empty() {
            return match token_rejection {
                Some(message) if !other_failure => Err(AppError::Unauthorized(message)),
                _ => Err(AppError::SeedResolutionFailed { causes }),
            };
        }

        if !causes.is_empty() {
            tracing::warn!(
                resolved = resolved.len(),
                failed = causes.len(),
                "Some seeds could not be resolved"
            );
        }

        Ok(resolved)
    }
}
