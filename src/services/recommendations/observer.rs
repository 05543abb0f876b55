use crate::error::AppError;

/// Which part of an aggregation run made a catalog call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallStage {
    SeedLookup { seed_id: String },
    Strategy { name: &'static str, seed_id: String },
    Cascade(CascadeStage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeStage {
    /// Back-fill toward the requested limit
    DeficitFill,
    /// Last-resort query when the result is below the absolute floor
    Floor,
}

impl CascadeStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            CascadeStage::DeficitFill => "deficit_fill",
            CascadeStage::Floor => "floor",
        }
    }
}

/// What one call produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// A seed descriptor was resolved
    Resolved,
    /// A search returned `returned` items of which `accepted` survived filtering
    Succeeded { returned: usize, accepted: usize },
    /// The strategy's template did not apply to the seed; no call was made
    Skipped,
    Failed { cause: String },
    TimedOut,
}

impl CallOutcome {
    pub fn from_error(error: &AppError) -> Self {
        match error {
            AppError::Timeout(_) => CallOutcome::TimedOut,
            other => CallOutcome::Failed {
                cause: other.to_string(),
            },
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, CallOutcome::Failed { .. } | CallOutcome::TimedOut)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallEvent {
    pub stage: CallStage,
    pub query: Option<String>,
    pub outcome: CallOutcome,
}

/// Receives every call outcome of an aggregation run, including absorbed failures
pub trait AggregationObserver: Send + Sync {
    fn on_call(&self, event: &CallEvent);
}

/// Default observer: structured log lines
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl AggregationObserver for TracingObserver {
    fn on_call(&self, event: &CallEvent) {
        let (stage, seed_id) = match &event.stage {
            CallStage::SeedLookup { seed_id } => ("seed_lookup", Some(seed_id.as_str())),
            CallStage::Strategy { name, seed_id } => (*name, Some(seed_id.as_str())),
            CallStage::Cascade(stage) => (stage.as_str(), None),
        };
        let query = event.query.as_deref().unwrap_or("");

        match &event.outcome {
            CallOutcome::Resolved => {
                tracing::debug!(stage, seed_id = ?seed_id, "Seed resolved");
            }
            CallOutcome::Succeeded { returned, accepted } => {
                tracing::debug!(
                    stage,
                    seed_id = ?seed_id,
                    query = %query,
                    returned,
                    accepted,
                    "Catalog call completed"
                );
            }
            CallOutcome::Skipped => {
                tracing::debug!(stage, seed_id = ?seed_id, "Strategy not applicable to seed");
            }
            CallOutcome::Failed { cause } => {
                tracing::warn!(
                    stage,
                    seed_id = ?seed_id,
                    query = %query,
                    error = %cause,
                    "Catalog call failed, continuing"
                );
            }
            CallOutcome::TimedOut => {
                tracing::warn!(
                    stage,
                    seed_id = ?seed_id,
                    query = %query,
                    "Catalog call timed out, continuing"
                );
            }
        }
    }
}
