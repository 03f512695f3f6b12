//! Batch workflow behavior over a temp stage directory and a CSV fixture.
//! The store is lazy and never dialed: these runs stage only.

#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use recipe_feed::{append_events_csv, FeedEvent};
use recipe_jobs::workflows::{load_folder, process_batch_parallel, process_batch_sequential};
use recipe_jobs::{ActivityContext, BatchOptions, BusConfig, RetryPolicy};
use recipe_model::stage;
use recipe_parser::RecipeTextParser;
use recipe_search::{Embedder, SearchIndex, SentenceEncoder};
use recipe_store::RecipeStore;

struct TestEncoder;

impl SentenceEncoder for TestEncoder {
    fn encode(&self, text: &str) -> Result<Vec<f32>, recipe_search::SearchError> {
        let mut v = vec![0.0f32; 384];
        for (i, b) in text.bytes().enumerate() {
            v[i % 384] += f32::from(b) / 255.0;
        }
        Ok(v)
    }
}

fn context(stage_dir: &Path) -> Arc<ActivityContext> {
    Arc::new(ActivityContext {
        parser: RecipeTextParser::new(),
        assist: None,
        store: RecipeStore::connect_lazy("postgres://localhost/unused").unwrap(),
        search: SearchIndex::new("http://localhost:9200", "recipes-test"),
        embedder: Arc::new(Embedder::with_encoder(Box::new(TestEncoder))),
        stage_dir: stage_dir.to_path_buf(),
        bus: BusConfig {
            redis_url: "redis://localhost".to_string(),
            topic: "recipes".to_string(),
            consumer_group: "loaders".to_string(),
            feed_base_url: "http://localhost".to_string(),
        },
    })
}

fn recipe_event(index: usize) -> FeedEvent {
    FeedEvent {
        date: "2024-11-02T09:00:00+00:00".to_string(),
        title: format!("Test Dish {index}"),
        author: format!("author{index}"),
        num_comments: 1,
        text: format!(
            "Test Dish {index}\nIngredients\n- 2 cups flour\n- {index} eggs\nInstructions\n1. Mix well.\n2. Bake.\n"
        ),
        char_count: 0,
        post_id: Some(format!("t3_{index}")),
        score: Some(10),
        url: None,
    }
}

fn non_recipe_event() -> FeedEvent {
    FeedEvent {
        date: "2024-11-02T09:00:00+00:00".to_string(),
        title: "Look at this restaurant".to_string(),
        author: "tourist".to_string(),
        num_comments: 0,
        text: "I visited a wonderful place last week.\nThe pasta was incredible and the staff friendly.\n".to_string(),
        char_count: 0,
        post_id: Some("t3_story".to_string()),
        score: Some(3),
        url: None,
    }
}

fn write_fixture(dir: &Path) -> PathBuf {
    let csv = dir.join("batch.csv");
    let mut events: Vec<FeedEvent> = (0..4).map(recipe_event).collect();
    events.insert(2, non_recipe_event());
    append_events_csv(&csv, &events).unwrap();
    csv
}

fn fast_options() -> BatchOptions {
    BatchOptions {
        load: false,
        pace: Some(std::time::Duration::ZERO),
        ..Default::default()
    }
}

#[tokio::test]
async fn parallel_extract_stages_recipe_entries() {
    let dir = tempfile::tempdir().unwrap();
    let stage_dir = dir.path().join("staged");
    let csv = write_fixture(dir.path());
    let ctx = context(&stage_dir);

    let summary = process_batch_parallel(ctx, csv, 0..5, 5, fast_options()).await;

    assert_eq!(summary.attempted, 5);
    assert_eq!(summary.failed, 0);
    // Every entry stages, including the non-recipe one; the validator
    // rejects that one later, at load time.
    assert_eq!(stage::list_staged(&stage_dir).unwrap().len(), 5);
}

#[tokio::test]
async fn rerun_skips_already_staged_files_and_matches_one_shot_counts() {
    let dir = tempfile::tempdir().unwrap();
    let stage_dir = dir.path().join("staged");
    let csv = write_fixture(dir.path());

    // A "killed" first run that only got through entries 0 and 1.
    let first = process_batch_sequential(
        context(&stage_dir),
        csv.clone(),
        0..2,
        fast_options(),
    )
    .await;
    assert_eq!(first.attempted, 2);
    let staged_after_partial = stage::list_staged(&stage_dir).unwrap();
    assert_eq!(staged_after_partial.len(), 2);
    let mtime = std::fs::metadata(&staged_after_partial[0])
        .unwrap()
        .modified()
        .unwrap();

    // Restart over the full range: already-staged files are skipped
    // in place, the gaps are filled.
    let resumed =
        process_batch_sequential(context(&stage_dir), csv.clone(), 0..5, fast_options()).await;
    assert_eq!(resumed.attempted, 5);
    assert_eq!(resumed.failed, 0);

    let staged = stage::list_staged(&stage_dir).unwrap();
    assert_eq!(staged.len(), 5);
    // The first run's file was not rewritten.
    assert_eq!(
        std::fs::metadata(&staged_after_partial[0]).unwrap().modified().unwrap(),
        mtime
    );

    // And a one-shot run over the same input stages the same set.
    let oneshot_dir = dir.path().join("oneshot");
    process_batch_sequential(context(&oneshot_dir), csv, 0..5, fast_options()).await;
    let mut a: Vec<_> = stage::list_staged(&stage_dir)
        .unwrap()
        .iter()
        .map(|p| p.file_name().unwrap().to_owned())
        .collect();
    let mut b: Vec<_> = stage::list_staged(&oneshot_dir)
        .unwrap()
        .iter()
        .map(|p| p.file_name().unwrap().to_owned())
        .collect();
    a.sort();
    b.sort();
    assert_eq!(a, b);
}

#[tokio::test]
async fn out_of_range_entries_count_as_skips() {
    let dir = tempfile::tempdir().unwrap();
    let stage_dir = dir.path().join("staged");
    let csv = write_fixture(dir.path());

    let summary =
        process_batch_sequential(context(&stage_dir), csv, 3..8, fast_options()).await;
    assert_eq!(summary.attempted, 5);
    // Entries 5..8 do not exist in the fixture.
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.failed, 0);
}

#[tokio::test]
async fn load_folder_counts_validation_skips_without_a_store() {
    // Staged files that fail validation are counted as skips before any
    // database call, so this runs with the lazy (never-dialed) store.
    let dir = tempfile::tempdir().unwrap();
    let stage_dir = dir.path().join("staged");
    let csv = write_fixture(dir.path());
    process_batch_sequential(context(&stage_dir), csv, 2..3, fast_options()).await;

    let paths = stage::list_staged(&stage_dir).unwrap();
    assert_eq!(paths.len(), 1);

    let summary = load_folder(context(&stage_dir), paths, 2, RetryPolicy::default()).await;
    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.inserted, 0);
}
