//! Batch workflows: sequential and fan-out compositions of activities with
//! pacing, per-item outcome counting and resumability by world state.

use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use recipe_search::SyncReport;

use crate::activities::{self, ScrapeReport};
use crate::{ActivityContext, JobError, RetryPolicy};

/// Default pacing between model-assisted extractions; stays under typical
/// provider rate limits.
pub const MODEL_PACE: Duration = Duration::from_millis(1200);
/// Default pacing between pattern-based extractions.
pub const LOCAL_PACE: Duration = Duration::from_millis(50);

#[derive(Clone, Debug)]
pub struct BatchOptions {
    pub use_model: bool,
    /// Delay between items; `None` picks the track default.
    pub pace: Option<Duration>,
    /// Also run `load_one` after each extract.
    pub load: bool,
    pub retry: RetryPolicy,
}

impl Default for BatchOptions {
    fn default() -> Self {
        BatchOptions {
            use_model: false,
            pace: None,
            load: true,
            retry: RetryPolicy::default(),
        }
    }
}

impl BatchOptions {
    fn pace(&self) -> Duration {
        self.pace
            .unwrap_or(if self.use_model { MODEL_PACE } else { LOCAL_PACE })
    }
}

/// Final accounting of a batch run; printed by the CLI verbatim.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BatchSummary {
    pub attempted: usize,
    pub inserted: usize,
    pub already_existed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub elapsed: Duration,
}

impl BatchSummary {
    fn absorb(&mut self, other: BatchSummary) {
        self.attempted += other.attempted;
        self.inserted += other.inserted;
        self.already_existed += other.already_existed;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.elapsed = self.elapsed.max(other.elapsed);
    }
}

/// Process CSV entries `range` one at a time with a pace delay between
/// items. One bad item is a count, never an abort.
#[instrument(name = "process_batch_sequential", skip(ctx, options), fields(start = range.start, end = range.end))]
pub async fn process_batch_sequential(
    ctx: Arc<ActivityContext>,
    csv: PathBuf,
    range: Range<usize>,
    options: BatchOptions,
) -> BatchSummary {
    let started = Instant::now();
    let mut summary = BatchSummary::default();
    let pace = options.pace();

    for index in range {
        summary.attempted += 1;
        let staged = options
            .retry
            .run("extract_one", || {
                activities::extract_one(&ctx, &csv, index, options.use_model)
            })
            .await;

        match staged {
            Ok(path) if options.load => {
                let loaded = options
                    .retry
                    .run("load_one", || activities::load_one(&ctx, &path))
                    .await;
                match loaded {
                    Ok(outcome) if outcome.already_existed => summary.already_existed += 1,
                    Ok(_) => summary.inserted += 1,
                    Err(err) if err.is_skip() => {
                        info!(index, %err, "skipped entry");
                        summary.skipped += 1;
                    }
                    Err(err) => {
                        warn!(index, %err, "entry failed to load");
                        summary.failed += 1;
                    }
                }
            }
            Ok(_) => {}
            Err(err) if err.is_skip() => {
                info!(index, %err, "skipped entry");
                summary.skipped += 1;
            }
            Err(err) => {
                warn!(index, %err, "entry failed to extract");
                summary.failed += 1;
            }
        }

        tokio::time::sleep(pace).await;
    }

    summary.elapsed = started.elapsed();
    summary
}

/// Partition `range` into `fanout` chunks and run them concurrently.
/// A chunk that dies does not cancel its siblings; its items are counted
/// as failed.
#[instrument(name = "process_batch_parallel", skip(ctx, options), fields(start = range.start, end = range.end, fanout))]
pub async fn process_batch_parallel(
    ctx: Arc<ActivityContext>,
    csv: PathBuf,
    range: Range<usize>,
    fanout: usize,
    options: BatchOptions,
) -> BatchSummary {
    let started = Instant::now();
    let mut tasks: JoinSet<BatchSummary> = JoinSet::new();
    let chunks = chunk_range(range, fanout.max(1));

    for chunk in chunks {
        let ctx = ctx.clone();
        let csv = csv.clone();
        let options = options.clone();
        tasks.spawn(async move {
            process_batch_sequential(ctx, csv, chunk, options).await
        });
    }

    let mut summary = BatchSummary::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(chunk_summary) => summary.absorb(chunk_summary),
            Err(err) => {
                warn!(%err, "batch chunk died");
                summary.failed += 1;
            }
        }
    }
    summary.elapsed = started.elapsed();
    info!(?summary, "parallel batch complete");
    summary
}

/// Load a list of staged files, fanned out in chunks.
#[instrument(name = "load_folder", skip_all, fields(files = paths.len(), fanout))]
pub async fn load_folder(
    ctx: Arc<ActivityContext>,
    paths: Vec<PathBuf>,
    fanout: usize,
    retry: RetryPolicy,
) -> BatchSummary {
    let started = Instant::now();
    let mut tasks: JoinSet<BatchSummary> = JoinSet::new();
    let chunk_size = paths.len().div_ceil(fanout.max(1)).max(1);

    for chunk in paths.chunks(chunk_size) {
        let ctx = ctx.clone();
        let chunk: Vec<PathBuf> = chunk.to_vec();
        tasks.spawn(async move {
            let mut summary = BatchSummary::default();
            for path in chunk {
                summary.attempted += 1;
                let loaded = retry
                    .run("load_one", || activities::load_one(&ctx, &path))
                    .await;
                match loaded {
                    Ok(outcome) if outcome.already_existed => summary.already_existed += 1,
                    Ok(_) => summary.inserted += 1,
                    Err(err) if err.is_skip() => {
                        info!(path = %path.display(), %err, "skipped staged file");
                        summary.skipped += 1;
                    }
                    Err(err) => {
                        warn!(path = %path.display(), %err, "staged file failed");
                        summary.failed += 1;
                    }
                }
            }
            summary
        });
    }

    let mut summary = BatchSummary::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(chunk_summary) => summary.absorb(chunk_summary),
            Err(err) => {
                warn!(%err, "load chunk died");
                summary.failed += 1;
            }
        }
    }
    summary.elapsed = started.elapsed();
    summary
}

/// Stream the whole store into the search index in batches.
pub async fn sync_search(
    ctx: Arc<ActivityContext>,
    batch_size: usize,
) -> Result<SyncReport, JobError> {
    Ok(recipe_search::sync_all(&ctx.store, &ctx.search, &ctx.embedder, batch_size).await?)
}

/// Thin, schedulable wrapper over the scrape activity.
pub async fn scrape_feed(
    ctx: Arc<ActivityContext>,
    source_id: &str,
    limit: usize,
    retry: RetryPolicy,
) -> Result<ScrapeReport, JobError> {
    retry
        .run("scrape_feed_once", || {
            activities::scrape_feed_once(&ctx, source_id, limit)
        })
        .await
}

/// Split a range into at most `parts` contiguous chunks of near-equal size.
fn chunk_range(range: Range<usize>, parts: usize) -> Vec<Range<usize>> {
    let len = range.len();
    if len == 0 {
        return Vec::new();
    }
    let chunk = len.div_ceil(parts);
    let mut out = Vec::new();
    let mut start = range.start;
    while start < range.end {
        let end = (start + chunk).min(range.end);
        out.push(start..end);
        start = end;
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ranges_chunk_evenly() {
        assert_eq!(chunk_range(1..6, 5), vec![1..2, 2..3, 3..4, 4..5, 5..6]);
        assert_eq!(chunk_range(0..10, 3), vec![0..4, 4..8, 8..10]);
        assert_eq!(chunk_range(0..2, 8), vec![0..1, 1..2]);
        assert!(chunk_range(3..3, 4).is_empty());
    }

    #[test]
    fn pace_defaults_follow_the_track() {
        assert_eq!(BatchOptions::default().pace(), LOCAL_PACE);
        let model = BatchOptions {
            use_model: true,
            ..Default::default()
        };
        assert_eq!(model.pace(), MODEL_PACE);
        let custom = BatchOptions {
            pace: Some(Duration::from_millis(5)),
            ..Default::default()
        };
        assert_eq!(custom.pace(), Duration::from_millis(5));
    }

    #[test]
    fn summaries_absorb_counts_and_keep_longest_elapsed() {
        let mut a = BatchSummary {
            attempted: 3,
            inserted: 2,
            skipped: 1,
            elapsed: Duration::from_secs(2),
            ..Default::default()
        };
        let b = BatchSummary {
            attempted: 2,
            failed: 1,
            already_existed: 1,
            elapsed: Duration::from_secs(5),
            ..Default::default()
        };
        a.absorb(b);
        assert_eq!(a.attempted, 5);
        assert_eq!(a.inserted, 2);
        assert_eq!(a.failed, 1);
        assert_eq!(a.already_existed, 1);
        assert_eq!(a.elapsed, Duration::from_secs(5));
    }
}
