use std::collections::HashSet;

use crate::models::Track;

/// Identifiers already accepted into the result, plus the request's seed identifiers
///
/// One instance lives for exactly one aggregation run and only grows. Seed identifiers
/// are kept apart from accepted ones so each stage can decide whether to filter them.
#[derive(Debug, Default)]
pub struct ProcessedSet {
    ids: HashSet<String>,
    excluded: HashSet<String>,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set whose `excluded` identifiers are skipped by stages that exclude seeds
    pub fn with_excluded(excluded: impl IntoIterator<Item = String>) -> Self {
        Self {
            ids: HashSet::new(),
            excluded: excluded.into_iter().collect(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn is_excluded(&self, id: &str) -> bool {
        self.excluded.contains(id)
    }

    /// Marks `id` as processed; returns `false` if it already was
    pub fn add(&mut self, id: impl Into<String>) -> bool {
        self.ids.insert(id.into())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Accepts up to `take` unseen candidates in order and marks them processed
    ///
    /// With `exclude_seeds` the excluded identifiers are skipped. Without it they count
    /// toward `take` like any other candidate.
    pub fn accept(
        &mut self,
        candidates: Vec<Track>,
        exclude_seeds: bool,
        take: usize,
    ) -> Vec<Track> {
        let mut accepted = Vec::with_capacity(take.min(candidates.len()));

        for candidate in candidates {
            if accepted.len() >= take {
                break;
            }
            if (exclude_seeds && self.is_excluded(&candidate.id)) || self.contains(&candidate.id) {
                continue;
            }
            self.add(candidate.id.clone());
            accepted.push(candidate);
        }

        accepted
    }
}
