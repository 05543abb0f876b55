use std::collections::HashMap;
use std::sync::Mutex;

use super::observer::recording::RecordingObserver;
use super::*;
use crate::models::fixtures::{track, track_by};
use crate::services::catalog::{MockCatalogLookup, MockCatalogSearch, SearchRequest};

/// Catalog answering from fixed tables and recording every call
#[derive(Default)]
struct ScriptedCatalog {
    seeds: HashMap<String, Track>,
    results: HashMap<String, Result<Vec<Track>, String>>,
    delays: HashMap<String, Duration>,
    searches: Mutex<Vec<SearchRequest>>,
    lookups: Mutex<Vec<String>>,
}

impl ScriptedCatalog {
    fn with_seed(mut self, seed: Track) -> Self {
        self.seeds.insert(seed.id.clone(), seed);
        self
    }

    fn respond(mut self, query: &str, ids: &[&str]) -> Self {
        let tracks = ids.iter().map(|id| track(id)).collect();
        self.results.insert(query.to_string(), Ok(tracks));
        self
    }

    fn fail(mut self, query: &str) -> Self {
        self.results
            .insert(query.to_string(), Err("503 Service Unavailable".to_string()));
        self
    }

    fn delay(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(query.to_string(), delay);
        self
    }

    fn searched(&self, query: &str) -> Vec<SearchRequest> {
        self.searches
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.query == query)
            .cloned()
            .collect()
    }

    fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CatalogSearch for ScriptedCatalog {
    async fn search_items(
        &self,
        _ctx: &CatalogContext,
        request: &SearchRequest,
    ) -> AppResult<Vec<Track>> {
        self.searches.lock().unwrap().push(request.clone());

        if let Some(delay) = self.delays.get(&request.query) {
            tokio::time::sleep(*delay).await;
        }

        match self.results.get(&request.query) {
            Some(Ok(tracks)) => Ok(tracks
                .iter()
                .take(request.limit as usize)
                .cloned()
                .collect()),
            Some(Err(message)) => Err(AppError::ExternalApi(message.clone())),
            None => Ok(vec![]),
        }
    }
}

#[async_trait::async_trait]
impl CatalogLookup for ScriptedCatalog {
    async fn get_track(&self, _ctx: &CatalogContext, id: &str) -> AppResult<Track> {
        self.lookups.lock().unwrap().push(id.to_string());
        self.seeds
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("track {}", id)))
    }
}

fn ctx() -> CatalogContext {
    CatalogContext::new("token", "US")
}

fn seed_ids(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

fn result_ids(result: &AggregationResult) -> Vec<String> {
    result.tracks.iter().map(|t| t.id.clone()).collect()
}

fn numbered(prefix: &str, range: std::ops::RangeInclusive<usize>) -> Vec<String> {
    range.map(|i| format!("{}{}", prefix, i)).collect()
}

/// Seed by artist "Q" titled "Title", tagged rock
fn rock_seed() -> Track {
    let mut seed = track_by("seed", "Title", "Q");
    seed.artists[0].genres = Some(vec!["rock".to_string()]);
    seed
}

fn engine_for(
    catalog: Arc<ScriptedCatalog>,
    observer: Arc<RecordingObserver>,
    config: EngineConfig,
) -> RecommendationEngine {
    RecommendationEngine::new(catalog.clone(), catalog, config).with_observer(observer)
}

#[tokio::test]
async fn test_strategies_then_deficit_fill_reach_limit() {
    let a: Vec<String> = numbered("a", 1..=8);
    let a: Vec<&str> = a.iter().map(String::as_str).collect();
    let mut artist_results = vec!["seed"];
    artist_results.extend(&a);
    artist_results.extend(&a);
    artist_results.extend(["seed", "a1", "a2"]);
    assert_eq!(artist_results.len(), 20);

    let fill: Vec<String> = numbered("c", 1..=15);
    let fill: Vec<&str> = fill.iter().map(String::as_str).collect();

    let catalog = Arc::new(
        ScriptedCatalog::default()
            .with_seed(rock_seed())
            .respond("artist:\"Q\"", &artist_results)
            .respond("Q Title", &["b1", "b2", "b3", "b4"])
            .respond("popularity:50-100", &fill),
    );
    let observer = Arc::new(RecordingObserver::default());
    let engine = engine_for(catalog.clone(), observer.clone(), EngineConfig::default());

    let result = engine
        .get_recommendations(&ctx(), &seed_ids(&["seed"]), 20)
        .await
        .unwrap();

    let mut expected = numbered("a", 1..=6);
    expected.extend(numbered("b", 1..=4));
    expected.extend(numbered("c", 1..=10));
    assert_eq!(result_ids(&result), expected);
    assert_eq!(result.resolved_seeds, vec!["seed".to_string()]);

    let fill_calls = catalog.searched("popularity:50-100");
    assert_eq!(fill_calls.len(), 1);
    assert_eq!(fill_calls[0].limit, 15);
    assert!(catalog.searched("year:2000-2024").is_empty());

    let artist_event = observer
        .events()
        .into_iter()
        .find(|e| {
            e.stage
                == CallStage::Strategy {
                    name: "same_artist",
                    seed_id: "seed".to_string(),
                }
        })
        .unwrap();
    assert_eq!(
        artist_event.outcome,
        CallOutcome::Succeeded {
            returned: 20,
            accepted: 6
        }
    );
}

#[tokio::test]
async fn test_short_result_when_catalog_runs_dry() {
    let catalog = Arc::new(
        ScriptedCatalog::default()
            .with_seed(rock_seed())
            .respond("artist:\"Q\"", &["a1", "a2", "a3", "a4", "a5", "a6"])
            .respond("Q Title", &["b1", "b2", "b3", "b4"])
            .respond("popularity:50-100", &["a1", "c1", "c2", "c3"]),
    );
    let observer = Arc::new(RecordingObserver::default());
    let engine = engine_for(catalog.clone(), observer, EngineConfig::default());

    let result = engine
        .get_recommendations(&ctx(), &seed_ids(&["seed"]), 20)
        .await
        .unwrap();

    assert_eq!(result.tracks.len(), 13);
    assert_eq!(result_ids(&result)[10..], ["c1", "c2", "c3"]);
    // Already above the floor, so no last-resort call
    assert!(catalog.searched("year:2000-2024").is_empty());
}

#[tokio::test]
async fn test_floor_query_runs_when_fill_fails() {
    let floor: Vec<String> = numbered("f", 1..=30);
    let floor: Vec<&str> = floor.iter().map(String::as_str).collect();

    let catalog = Arc::new(
        ScriptedCatalog::default()
            .with_seed(rock_seed())
            .fail("popularity:50-100")
            .respond("year:2000-2024", &floor),
    );
    let observer = Arc::new(RecordingObserver::default());
    let engine = engine_for(catalog.clone(), observer.clone(), EngineConfig::default());

    let result = engine
        .get_recommendations(&ctx(), &seed_ids(&["seed"]), 20)
        .await
        .unwrap();

    assert_eq!(result_ids(&result), numbered("f", 1..=20));
    assert_eq!(catalog.searched("year:2000-2024")[0].limit, 25);

    let failures = observer.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(
        failures[0].stage,
        CallStage::Cascade(CascadeStage::DeficitFill)
    );
}

#[tokio::test]
async fn test_no_cascade_when_strategies_fill_limit() {
    let catalog = Arc::new(
        ScriptedCatalog::default()
            .with_seed(rock_seed())
            .respond("artist:\"Q\"", &["a1", "a2", "a3", "a4"]),
    );
    let observer = Arc::new(RecordingObserver::default());
    let engine = engine_for(catalog.clone(), observer, EngineConfig::default());

    let result = engine
        .get_recommendations(&ctx(), &seed_ids(&["seed"]), 3)
        .await
        .unwrap();

    assert_eq!(result_ids(&result), vec!["a1", "a2", "a3"]);
    assert!(catalog.searched("popularity:50-100").is_empty());
    assert!(catalog.searched("year:2000-2024").is_empty());
}

#[tokio::test]
async fn test_dedup_across_seeds_and_seed_exclusion() {
    let catalog = Arc::new(
        ScriptedCatalog::default()
            .with_seed(track_by("s1", "One", "A"))
            .with_seed(track_by("s2", "Two", "B"))
            .respond("artist:\"A\"", &["x1", "s2", "x2"])
            .respond("artist:\"B\"", &["x2", "x3", "s1"])
            .respond("tag:hipster", &["x1", "x4"]),
    );
    let observer = Arc::new(RecordingObserver::default());
    let engine = engine_for(catalog.clone(), observer, EngineConfig::default());

    let result = engine
        .get_recommendations(&ctx(), &seed_ids(&["s1", "s2"]), 4)
        .await
        .unwrap();

    assert_eq!(result_ids(&result), vec!["x1", "x2", "x4", "x3"]);
    assert_eq!(catalog.searched("tag:hipster").len(), 2);
}

#[tokio::test]
async fn test_seed_returned_by_every_query_never_appears() {
    let mut lookup = MockCatalogLookup::new();
    lookup
        .expect_get_track()
        .returning(|_, _| Ok(rock_seed()));

    let mut search = MockCatalogSearch::new();
    search.expect_search_items().returning(|_, request| {
        Ok(vec![
            track("seed"),
            track(&format!("for {}", request.query)),
            track("seed"),
        ])
    });

    let engine = RecommendationEngine::new(
        Arc::new(search),
        Arc::new(lookup),
        EngineConfig::default(),
    );

    let result = engine
        .get_recommendations(&ctx(), &seed_ids(&["seed"]), 50)
        .await
        .unwrap();

    assert!(result.tracks.iter().all(|t| t.id != "seed"));
    let ids = result_ids(&result);
    let unique: HashSet<&String> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len());
    // 7 strategies plus the deficit fill; the floor is already met
    assert_eq!(ids.len(), 8);
}

#[tokio::test]
async fn test_failing_strategy_does_not_block_others() {
    let catalog = Arc::new(
        ScriptedCatalog::default()
            .with_seed(rock_seed())
            .fail("artist:\"Q\"")
            .respond("Q Title", &["b1", "b2", "b3", "b4"]),
    );
    let observer = Arc::new(RecordingObserver::default());
    let engine = engine_for(catalog, observer.clone(), EngineConfig::default());

    let result = engine
        .get_recommendations(&ctx(), &seed_ids(&["seed"]), 4)
        .await
        .unwrap();

    assert_eq!(result_ids(&result), vec!["b1", "b2", "b3", "b4"]);

    let failures = observer.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(
        failures[0].stage,
        CallStage::Strategy {
            name: "same_artist",
            seed_id: "seed".to_string()
        }
    );
    assert!(matches!(failures[0].outcome, CallOutcome::Failed { .. }));
}

#[tokio::test]
async fn test_timed_out_strategy_counts_as_failure() {
    let catalog = Arc::new(
        ScriptedCatalog::default()
            .with_seed(rock_seed())
            .respond("artist:\"Q\"", &["a1"])
            .delay("artist:\"Q\"", Duration::from_secs(2))
            .respond("Q Title", &["b1", "b2"]),
    );
    let observer = Arc::new(RecordingObserver::default());
    let config = EngineConfig {
        call_timeout: Duration::from_millis(50),
        ..EngineConfig::default()
    };
    let engine = engine_for(catalog, observer.clone(), config);

    let result = engine
        .get_recommendations(&ctx(), &seed_ids(&["seed"]), 2)
        .await
        .unwrap();

    assert_eq!(result_ids(&result), vec!["b1", "b2"]);
    assert_eq!(observer.failures()[0].outcome, CallOutcome::TimedOut);
}

#[tokio::test]
async fn test_merge_order_ignores_completion_order() {
    let catalog = Arc::new(
        ScriptedCatalog::default()
            .with_seed(rock_seed())
            .respond("artist:\"Q\"", &["a1", "a2"])
            .delay("artist:\"Q\"", Duration::from_millis(30))
            .respond("Q Title", &["a2", "b1"]),
    );
    let observer = Arc::new(RecordingObserver::default());
    let engine = engine_for(catalog, observer, EngineConfig::default())
        .with_keyword_picker(KeywordPicker::seeded(11));

    let first = engine
        .get_recommendations(&ctx(), &seed_ids(&["seed"]), 3)
        .await
        .unwrap();
    let second = engine
        .get_recommendations(&ctx(), &seed_ids(&["seed"]), 3)
        .await
        .unwrap();

    assert_eq!(result_ids(&first), vec!["a1", "a2", "b1"]);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_genre_strategy_skipped_without_tags() {
    let catalog = Arc::new(ScriptedCatalog::default().with_seed(track_by("seed", "Title", "Q")));
    let observer = Arc::new(RecordingObserver::default());
    let engine = engine_for(catalog.clone(), observer.clone(), EngineConfig::default());

    engine
        .get_recommendations(&ctx(), &seed_ids(&["seed"]), 10)
        .await
        .unwrap();

    let genre_event = observer
        .events()
        .into_iter()
        .find(|e| matches!(e.stage, CallStage::Strategy { name: "genre", .. }))
        .unwrap();
    assert_eq!(genre_event.outcome, CallOutcome::Skipped);
    assert!(catalog
        .searches
        .lock()
        .unwrap()
        .iter()
        .all(|r| !r.query.starts_with("genre:")));
}

#[tokio::test]
async fn test_unresolvable_seed_is_skipped() {
    let catalog = Arc::new(
        ScriptedCatalog::default()
            .with_seed(track_by("good", "Title", "Q"))
            .respond("artist:\"Q\"", &["a1", "a2"]),
    );
    let observer = Arc::new(RecordingObserver::default());
    let engine = engine_for(catalog, observer.clone(), EngineConfig::default());

    let result = engine
        .get_recommendations(&ctx(), &seed_ids(&["missing", "good"]), 2)
        .await
        .unwrap();

    assert_eq!(result.resolved_seeds, vec!["good".to_string()]);
    assert_eq!(result_ids(&result), vec!["a1", "a2"]);
    assert_eq!(
        observer.failures()[0].stage,
        CallStage::SeedLookup {
            seed_id: "missing".to_string()
        }
    );
}

#[tokio::test]
async fn test_all_seeds_failing_is_fatal_and_skips_search() {
    let mut lookup = MockCatalogLookup::new();
    lookup
        .expect_get_track()
        .times(2)
        .returning(|_, id| Err(AppError::NotFound(format!("track {}", id))));

    let mut search = MockCatalogSearch::new();
    search.expect_search_items().never();

    let engine = RecommendationEngine::new(
        Arc::new(search),
        Arc::new(lookup),
        EngineConfig::default(),
    );

    let err = engine
        .get_recommendations(&ctx(), &seed_ids(&["a", "b"]), 10)
        .await
        .unwrap_err();

    match err {
        AppError::SeedResolutionFailed { causes } => {
            assert_eq!(causes.len(), 2);
            assert_eq!(causes[0].seed_id, "a");
            assert_eq!(causes[0].cause, "Not found: track a");
            assert_eq!(causes[1].seed_id, "b");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_only_first_two_distinct_seeds_are_resolved() {
    let catalog = Arc::new(ScriptedCatalog::default());
    let observer = Arc::new(RecordingObserver::default());
    let engine = engine_for(catalog.clone(), observer, EngineConfig::default());

    let err = engine
        .get_recommendations(&ctx(), &seed_ids(&["a", "a", "b", "c"]), 10)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::SeedResolutionFailed { ref causes } if causes.len() == 2));
    assert_eq!(catalog.lookups(), vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test]
async fn test_invalid_requests_are_rejected_before_any_call() {
    let engine = RecommendationEngine::new(
        Arc::new(MockCatalogSearch::new()),
        Arc::new(MockCatalogLookup::new()),
        EngineConfig::default(),
    );

    for (seeds, limit) in [
        (seed_ids(&[]), 10),
        (seed_ids(&["a", " "]), 10),
        (seed_ids(&["a"]), 0),
        (seed_ids(&["a"]), 101),
    ] {
        let err = engine
            .get_recommendations(&ctx(), &seeds, limit)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}

#[test]
fn test_assemble_dedups_excludes_and_truncates() {
    let excluded: HashSet<String> = ["seed".to_string()].into_iter().collect();
    let candidates = vec![
        track("a"),
        track("seed"),
        track("b"),
        track("a"),
        track("c"),
        track("d"),
    ];

    let ids: Vec<String> = assemble(candidates, &excluded, 3)
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_seed_past_the_cap_is_still_excluded() {
    let catalog = Arc::new(
        ScriptedCatalog::default()
            .with_seed(track_by("s1", "Title", "A"))
            .with_seed(track_by("s2", "Other", "B"))
            .respond("artist:\"A\"", &["s3", "x1"]),
    );
    let observer = Arc::new(RecordingObserver::default());
    let engine = engine_for(catalog.clone(), observer, EngineConfig::default());

    let result = engine
        .get_recommendations(&ctx(), &seed_ids(&["s1", "s2", "s3"]), 2)
        .await
        .unwrap();

    assert_eq!(catalog.lookups(), seed_ids(&["s1", "s2"]));
    assert!(!result_ids(&result).contains(&"s3".to_string()));
    assert_eq!(result_ids(&result), vec!["x1"]);
}

#[tokio::test]
async fn test_strategy_keeping_seed_spends_a_slot_on_it() {
    let catalog = Arc::new(
        ScriptedCatalog::default()
            .with_seed(rock_seed())
            .respond("artist:\"Q\"", &["seed", "a1", "a2"])
            .respond("popularity:50-100", &["seed", "c1", "c2"]),
    );
    let observer = Arc::new(RecordingObserver::default());

    let keeping = engine_for(catalog.clone(), observer.clone(), EngineConfig::default())
        .with_strategies(vec![Strategy::new(
            "same_artist",
            QueryTemplate::Artist,
            10,
            2,
            false,
        )]);
    let excluding = engine_for(catalog, observer, EngineConfig::default()).with_strategies(vec![
        Strategy::new("same_artist", QueryTemplate::Artist, 10, 2, true),
    ]);

    let kept = keeping
        .get_recommendations(&ctx(), &seed_ids(&["seed"]), 3)
        .await
        .unwrap();
    let excluded = excluding
        .get_recommendations(&ctx(), &seed_ids(&["seed"]), 3)
        .await
        .unwrap();

    // The fill stage always filters seeds and tops up what assembly drops
    assert_eq!(result_ids(&kept), vec!["a1", "c1", "c2"]);
    assert_eq!(result_ids(&excluded), vec!["a1", "a2", "c1"]);
}

#[tokio::test]
async fn test_rejected_token_surfaces_as_unauthorized() {
    let mut lookup = MockCatalogLookup::new();
    lookup
        .expect_get_track()
        .times(2)
        .returning(|_, _| Err(AppError::Unauthorized("The access token expired".to_string())));

    let mut search = MockCatalogSearch::new();
    search.expect_search_items().never();

    let engine = RecommendationEngine::new(
        Arc::new(search),
        Arc::new(lookup),
        EngineConfig::default(),
    );

    let err = engine
        .get_recommendations(&ctx(), &seed_ids(&["a", "b"]), 10)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Unauthorized(msg) if msg == "The access token expired"));
}

#[tokio::test]
async fn test_mixed_seed_failures_stay_unprocessable() {
    let mut lookup = MockCatalogLookup::new();
    lookup.expect_get_track().returning(|_, id| {
        if id == "a" {
            Err(AppError::Unauthorized("The access token expired".to_string()))
        } else {
            Err(AppError::NotFound(format!("track {}", id)))
        }
    });

    let engine = RecommendationEngine::new(
        Arc::new(MockCatalogSearch::new()),
        Arc::new(lookup),
        EngineConfig::default(),
    );

    let err = engine
        .get_recommendations(&ctx(), &seed_ids(&["a", "b"]), 10)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::SeedResolutionFailed { causes } if causes.len() == 2));
}
