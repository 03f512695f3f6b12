//! Single-unit activities. Each is independently retriable and leans on
//! world-state idempotence: staged files are keyed by identifier, the store
//! dedups by identifier and title, the index upserts by identifier.

use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};
use uuid::Uuid;

use recipe_feed::{append_events_csv, read_events_csv, BusConsumer, BusProducer, FeedEvent, FeedPoller};
use recipe_model::{stage, validate_for_load, Recipe};
use recipe_search::RecipeDoc;
use recipe_store::CreateOutcome;

use crate::{ActivityContext, JobError};

/// Result of [`load_one`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadOutcome {
    pub primary_key: i64,
    pub already_existed: bool,
    pub identifier: Uuid,
}

/// Result of [`sync_one`]: `skipped` means the document was indexed without
/// an embedding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncOneOutcome {
    pub success: bool,
    pub skipped: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScrapeReport {
    pub items_published: usize,
}

/// Where the bus consumer routes events.
#[derive(Clone, Debug, PartialEq)]
pub enum ConsumeSink {
    /// Archive events to a CSV file only.
    Csv(PathBuf),
    /// Parse and load into the store only.
    Load,
    /// Both: archive, then load.
    CsvAndLoad(PathBuf),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConsumeReport {
    pub processed: usize,
    pub duplicates: usize,
    pub errors: usize,
}

/// Parse one batch entry and write its staged file.
///
/// Safe to retry: if the staged file already exists for the computed
/// identifier, the write is a no-op and the same path comes back.
#[instrument(name = "extract_one", skip(ctx), fields(entry_index, use_model))]
pub async fn extract_one(
    ctx: &ActivityContext,
    source_csv: &Path,
    entry_index: usize,
    use_model: bool,
) -> Result<PathBuf, JobError> {
    let events = read_events_csv(source_csv)?;
    let event = events.get(entry_index).ok_or(JobError::MissingEntry {
        index: entry_index,
        available: events.len(),
    })?;

    let recipe = extract_event(ctx, event, use_model).await?;
    let path = stage::write_staged(&ctx.stage_dir, &recipe)?;
    info!(identifier = %recipe.identifier, path = %path.display(), "staged entry");
    Ok(path)
}

/// Shared extraction of one feed event, model-assisted or local.
pub(crate) async fn extract_event(
    ctx: &ActivityContext,
    event: &FeedEvent,
    use_model: bool,
) -> Result<Recipe, JobError> {
    let hint = event.post_id.as_deref();
    let mut recipe = if use_model {
        let assist = ctx.assist.as_ref().ok_or(JobError::NoModel)?;
        assist.extract(&event.text, hint).await?
    } else {
        ctx.parser.parse_recipe(&event.text, hint)
    };

    // Source attribution comes from the event, not the prose.
    if recipe.title.is_empty() {
        recipe.title = event.title.clone();
    }
    recipe.source_author = Some(event.author.clone());
    recipe.source_score = event.score;
    if recipe.source_url.is_none() {
        recipe.source_url = event.url.clone();
    }
    if recipe.source_post_id.is_none() {
        recipe.source_post_id = event.post_id.clone();
    }
    Ok(recipe)
}

/// Load one staged file into the store. Dedup makes this safe to retry; a
/// replayed call reports `already_existed` instead of failing.
#[instrument(name = "load_one", skip(ctx), fields(path = %staged_path.display()))]
pub async fn load_one(ctx: &ActivityContext, staged_path: &Path) -> Result<LoadOutcome, JobError> {
    let recipe = stage::read_staged(staged_path)?;
    validate_for_load(&recipe)?;
    let outcome = ctx.store.create(&recipe).await?;
    let result = LoadOutcome {
        primary_key: outcome.primary_key(),
        already_existed: outcome.already_existed(),
        identifier: recipe.identifier,
    };
    info!(
        identifier = %result.identifier,
        primary_key = result.primary_key,
        already_existed = result.already_existed,
        "loaded staged recipe"
    );
    Ok(result)
}

/// Project one stored recipe into the search index, generating and caching
/// its embedding when the store has none.
#[instrument(name = "sync_one", skip(ctx), fields(primary_key))]
pub async fn sync_one(ctx: &ActivityContext, primary_key: i64) -> Result<SyncOneOutcome, JobError> {
    let Some(stored) = ctx.store.get(primary_key).await? else {
        return Ok(SyncOneOutcome {
            success: false,
            skipped: true,
        });
    };

    let mut doc = RecipeDoc::from(&stored.recipe);
    let mut skipped = false;
    if doc.embedding.is_none() {
        match embed_blocking(ctx, stored.recipe.clone()).await {
            Ok(vector) => {
                ctx.store.set_embedding(stored.id, &vector).await?;
                doc.embedding = Some(vector);
            }
            Err(err) => {
                warn!(identifier = %stored.recipe.identifier, %err, "indexing without embedding");
                skipped = true;
            }
        }
    }

    ctx.search.ensure_index().await?;
    let report = ctx.search.bulk_upsert(std::slice::from_ref(&doc)).await?;
    Ok(SyncOneOutcome {
        success: report.failed == 0,
        skipped,
    })
}

/// Generate and cache the embedding for one stored recipe.
#[instrument(name = "embed_one", skip(ctx), fields(primary_key))]
pub async fn embed_one(ctx: &ActivityContext, primary_key: i64) -> Result<bool, JobError> {
    let Some(stored) = ctx.store.get(primary_key).await? else {
        return Ok(false);
    };
    if stored.recipe.embedding.is_some() {
        return Ok(true);
    }
    let vector = embed_blocking(ctx, stored.recipe.clone()).await?;
    ctx.store.set_embedding(stored.id, &vector).await?;
    Ok(true)
}

/// Embedding is CPU-bound; keep it off the async worker threads.
async fn embed_blocking(ctx: &ActivityContext, recipe: Recipe) -> Result<Vec<f32>, JobError> {
    let embedder = ctx.embedder.clone();
    tokio::task::spawn_blocking(move || embedder.embed_recipe(&recipe))
        .await
        .map_err(|e| JobError::Search(recipe_search::SearchError::Model(e.to_string())))?
        .map_err(JobError::from)
}

/// Poll the feed source once and publish every fresh item onto the bus.
#[instrument(name = "scrape_feed_once", skip(ctx), fields(source_id, limit))]
pub async fn scrape_feed_once(
    ctx: &ActivityContext,
    source_id: &str,
    limit: usize,
) -> Result<ScrapeReport, JobError> {
    let poller = FeedPoller::new(&ctx.bus.feed_base_url);
    let events = poller.poll(source_id, limit).await?;
    if events.is_empty() {
        return Ok(ScrapeReport::default());
    }
    let mut producer = BusProducer::connect(&ctx.bus.redis_url, &ctx.bus.topic).await?;
    let mut published = 0usize;
    for event in &events {
        producer.publish(event).await?;
        published += 1;
    }
    info!(published, source_id, "published feed items");
    Ok(ScrapeReport {
        items_published: published,
    })
}

/// Drain up to `max_messages` bus events into the configured sink.
///
/// Offsets are acknowledged only after the sink call returns, so a crash
/// replays the batch; the store's dedup absorbs the duplicates.
#[instrument(name = "consume_bus_batch", skip(ctx, sink), fields(max_messages))]
pub async fn consume_bus_batch(
    ctx: &ActivityContext,
    max_messages: usize,
    sink: &ConsumeSink,
) -> Result<ConsumeReport, JobError> {
    let consumer_name = format!("worker-{}", std::process::id());
    let mut consumer = BusConsumer::connect(
        &ctx.bus.redis_url,
        &ctx.bus.topic,
        &ctx.bus.consumer_group,
        &consumer_name,
    )
    .await?;

    let (messages, poisoned) = consumer.poll(max_messages).await?;
    let mut report = ConsumeReport {
        errors: poisoned.len(),
        ..Default::default()
    };
    let mut done: Vec<String> = poisoned;

    if let ConsumeSink::Csv(path) | ConsumeSink::CsvAndLoad(path) = sink {
        let events: Vec<FeedEvent> = messages.iter().map(|m| m.event.clone()).collect();
        append_events_csv(path, &events)?;
    }

    for message in &messages {
        let loaded = matches!(sink, ConsumeSink::Load | ConsumeSink::CsvAndLoad(_));
        if loaded {
            match load_event(ctx, &message.event).await {
                Ok(outcome) if outcome.already_existed => report.duplicates += 1,
                Ok(_) => report.processed += 1,
                Err(err) if err.is_skip() => {
                    info!(title = %message.event.title, %err, "skipping event");
                    report.errors += 1;
                }
                Err(err) => {
                    // Leave the entry unacked for redelivery.
                    warn!(title = %message.event.title, %err, "event failed, will redeliver");
                    report.errors += 1;
                    continue;
                }
            }
        } else {
            report.processed += 1;
        }
        done.push(message.id.clone());
    }

    consumer.ack(&done).await?;
    Ok(report)
}

async fn load_event(ctx: &ActivityContext, event: &FeedEvent) -> Result<LoadOutcome, JobError> {
    let recipe = extract_event(ctx, event, false).await?;
    validate_for_load(&recipe)?;
    let outcome = ctx.store.create(&recipe).await?;
    Ok(LoadOutcome {
        primary_key: outcome.primary_key(),
        already_existed: matches!(outcome, CreateOutcome::AlreadyExists(_)),
        identifier: recipe.identifier,
    })
}
