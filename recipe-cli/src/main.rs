//! Thin command-line front-end over the pipeline crates.
//!
//! Exit codes: 0 success, 1 unrecoverable error, 2 validation failure,
//! 3 external service unavailable.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use uuid::Uuid;

use recipe_assist::{ChatClient, ModelAssistedParser};
use recipe_jobs::workflows::{self, BatchOptions};
use recipe_jobs::{
    ActivityContext, BusConfig, ConsumeSink, RetryPolicy, ScheduleSpec, Scheduler,
};
use recipe_model::stage;
use recipe_parser::RecipeTextParser;
use recipe_search::{Embedder, SearchError, SearchFilters, SearchIndex, SearchMode, SearchRequest, SentenceEncoder};
use recipe_store::{RecipeStore, TextSearchFilters};

mod config;
use config::Config;

const EXIT_VALIDATION: u8 = 2;
const EXIT_UNAVAILABLE: u8 = 3;

#[derive(Parser)]
#[clap(author, version, about = "recipe ingestion pipeline", long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse CSV entries [start, end) into staged files, then load them.
    ProcessBatch {
        csv: PathBuf,
        start: usize,
        end: usize,
        /// Use the model-assisted parser instead of the pattern-based one.
        #[arg(long)]
        model: bool,
        /// Delay between items in milliseconds (defaults per track).
        #[arg(long)]
        pace_ms: Option<u64>,
        /// Concurrent chunks; 1 means strictly sequential.
        #[arg(long, default_value_t = 1)]
        fanout: usize,
        /// Stage only, skip the load step.
        #[arg(long)]
        no_load: bool,
    },
    /// Load every staged .json file in a directory.
    LoadFolder {
        dir: PathBuf,
        #[arg(long, default_value_t = 4)]
        fanout: usize,
    },
    /// Stream the whole store into the search index.
    SyncSearch {
        /// Drop and re-create the index first (destructive).
        #[arg(long)]
        recreate_index: bool,
        #[arg(long, default_value_t = 1000)]
        batch_size: usize,
    },
    /// Re-parse a staged file, load it, and sync the row.
    ReloadRecipe { identifier: Uuid },
    /// Print one stored recipe as JSON.
    GetByIdentifier { identifier: Uuid },
    /// Query the search index.
    Search {
        text: String,
        #[arg(long, default_value = "text")]
        mode: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(short, long)]
        json: bool,
    },
    /// Store counters and per-category counts.
    Stats,
    /// Poll the feed source once and publish items onto the bus.
    ScrapeFeed {
        source: String,
        #[arg(long, default_value_t = 25)]
        limit: usize,
    },
    /// Drain one batch of bus events into the store and/or a CSV archive.
    Consume {
        #[arg(long, default_value_t = 100)]
        max_messages: usize,
        /// Archive events to this CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Skip the load path (with --csv: archive only).
        #[arg(long)]
        no_load: bool,
    },
    /// Host a recurring scrape-feed schedule in the foreground.
    ///
    /// Control verbs are read from stdin while it runs:
    /// pause | unpause | trigger | describe | delete | quit
    Schedule {
        source: String,
        #[arg(long, default_value_t = 25)]
        limit: usize,
        #[arg(long, default_value_t = 300)]
        interval_secs: u64,
    },
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}

/// Encoder used when a command cannot need embeddings; keeps model weights
/// off the startup path. Any accidental use downgrades gracefully.
struct DisabledEncoder;

impl SentenceEncoder for DisabledEncoder {
    fn encode(&self, _text: &str) -> Result<Vec<f32>, SearchError> {
        Err(SearchError::Model("embedding disabled for this command".to_string()))
    }
}

async fn build_context(config: &Config, with_embedder: bool) -> Result<Arc<ActivityContext>> {
    let store = RecipeStore::connect(&config.database_url)
        .await
        .context("store unreachable")?;
    let search = SearchIndex::new(&config.search_url, &config.search_index);
    let embedder = if with_embedder {
        Embedder::from_pretrained(&config.embedding_model).context("embedding model unavailable")?
    } else {
        Embedder::with_encoder(Box::new(DisabledEncoder))
    };
    let assist = match &config.model_api_key {
        Some(key) => Some(ModelAssistedParser::new(Arc::new(ChatClient::new(
            &config.model_base_url,
            key,
            &config.model_name,
        )?))),
        None => None,
    };
    Ok(Arc::new(ActivityContext {
        parser: RecipeTextParser::new(),
        assist,
        store,
        search,
        embedder: Arc::new(embedder),
        stage_dir: config.stage_dir.clone(),
        bus: BusConfig {
            redis_url: config.redis_url.clone(),
            topic: config.bus_topic.clone(),
            consumer_group: config.bus_group.clone(),
            feed_base_url: config.feed_base_url.clone(),
        },
    }))
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            let text = format!("{err:#}");
            if text.contains("unreachable") || text.contains("unavailable") {
                ExitCode::from(EXIT_UNAVAILABLE)
            } else if text.contains("validation") {
                ExitCode::from(EXIT_VALIDATION)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::from_env()?;
    match cli.command {
        Commands::ProcessBatch {
            csv,
            start,
            end,
            model,
            pace_ms,
            fanout,
            no_load,
        } => {
            if end <= start {
                bail!("empty range {start}..{end}");
            }
            let ctx = build_context(&config, false).await?;
            if model && ctx.assist.is_none() {
                bail!("--model requires RECIPE_MODEL_API_KEY");
            }
            let options = BatchOptions {
                use_model: model,
                pace: pace_ms.map(Duration::from_millis),
                load: !no_load,
                retry: RetryPolicy::default(),
            };
            let summary = if fanout > 1 {
                workflows::process_batch_parallel(ctx, csv, start..end, fanout, options).await
            } else {
                workflows::process_batch_sequential(ctx, csv, start..end, options).await
            };
            print_summary(&summary);
            Ok(ExitCode::SUCCESS)
        }
        Commands::LoadFolder { dir, fanout } => {
            let ctx = build_context(&config, false).await?;
            let paths = stage::list_staged(&dir).context("reading staged folder")?;
            info!(files = paths.len(), "loading staged folder");
            let summary = workflows::load_folder(ctx, paths, fanout, RetryPolicy::default()).await;
            print_summary(&summary);
            Ok(ExitCode::SUCCESS)
        }
        Commands::SyncSearch {
            recreate_index,
            batch_size,
        } => {
            let ctx = build_context(&config, true).await?;
            if recreate_index {
                ctx.search.recreate_index().await.context("search unavailable")?;
            }
            let report = workflows::sync_search(ctx, batch_size).await?;
            println!(
                "synced: success={} skipped={} failed={}",
                report.success, report.skipped, report.failed
            );
            Ok(ExitCode::SUCCESS)
        }
        Commands::ReloadRecipe { identifier } => {
            let ctx = build_context(&config, true).await?;
            let path = stage::staged_path(&ctx.stage_dir, &identifier);
            let outcome = recipe_jobs::activities::load_one(&ctx, &path).await?;
            let synced = recipe_jobs::activities::sync_one(&ctx, outcome.primary_key).await?;
            println!(
                "reloaded {} (pk={}, already_existed={}, synced={})",
                outcome.identifier, outcome.primary_key, outcome.already_existed, synced.success
            );
            Ok(ExitCode::SUCCESS)
        }
        Commands::GetByIdentifier { identifier } => {
            let ctx = build_context(&config, false).await?;
            match ctx.store.get_by_identifier(&identifier).await? {
                Some(stored) => {
                    println!("{}", serde_json::to_string_pretty(&stored.recipe)?);
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    println!("no recipe with identifier {identifier}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Commands::Search {
            text,
            mode,
            limit,
            json,
        } => run_search(&config, &text, &mode, limit, json).await,
        Commands::Stats => {
            let ctx = build_context(&config, false).await?;
            let stats = ctx.store.stats().await?;
            println!("recipes: {}", stats.total_recipes);
            println!("with embedding: {}", stats.with_embedding);
            if let Some(avg) = stats.avg_total_minutes {
                println!("avg total minutes: {avg:.1}");
            }
            for (label, counts) in [
                ("meal type", &stats.by_meal_type),
                ("difficulty", &stats.by_difficulty),
                ("cuisine", &stats.by_cuisine),
            ] {
                println!("by {label}:");
                for row in counts {
                    println!("  {}: {}", row.name, row.count);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::ScrapeFeed { source, limit } => {
            let ctx = build_context(&config, false).await?;
            let report =
                workflows::scrape_feed(ctx, &source, limit, RetryPolicy::default()).await?;
            println!("published {} items", report.items_published);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Consume {
            max_messages,
            csv,
            no_load,
        } => {
            let ctx = build_context(&config, false).await?;
            let sink = match (csv, no_load) {
                (Some(path), true) => ConsumeSink::Csv(path),
                (Some(path), false) => ConsumeSink::CsvAndLoad(path),
                (None, false) => ConsumeSink::Load,
                (None, true) => bail!("--no-load without --csv consumes into nothing"),
            };
            let report =
                recipe_jobs::activities::consume_bus_batch(&ctx, max_messages, &sink).await?;
            println!(
                "processed={} duplicates={} errors={}",
                report.processed, report.duplicates, report.errors
            );
            Ok(ExitCode::SUCCESS)
        }
        Commands::Schedule {
            source,
            limit,
            interval_secs,
        } => run_schedule(&config, source, limit, interval_secs).await,
    }
}

async fn run_search(
    config: &Config,
    text: &str,
    mode: &str,
    limit: usize,
    json: bool,
) -> Result<ExitCode> {
    let mode = match mode {
        "text" => SearchMode::Text,
        "semantic" => SearchMode::Semantic,
        "hybrid" => SearchMode::Hybrid,
        other => bail!("unknown search mode {other:?} (text|semantic|hybrid)"),
    };

    // Semantic modes need the query embedded; plain text search does not.
    let needs_vector = matches!(mode, SearchMode::Semantic | SearchMode::Hybrid);
    let search = SearchIndex::new(&config.search_url, &config.search_index);
    let vector = if needs_vector {
        let embedder =
            Embedder::from_pretrained(&config.embedding_model).context("embedding model unavailable")?;
        Some(embedder.embed_text(text)?)
    } else {
        None
    };

    let request = SearchRequest {
        text: Some(text.to_string()),
        filters: SearchFilters::default(),
        vector,
        from: 0,
        size: limit,
        vector_boost: None,
    };
    let hits = search
        .query(mode, &request)
        .await
        .context("search unavailable")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits_json(&hits))?);
    } else if hits.is_empty() {
        println!("no results");
    } else {
        for hit in &hits {
            println!(
                "{:.3}  {}  {}",
                hit.score.unwrap_or_default(),
                hit.identifier,
                hit.title
            );
        }
    }

    // Fall back to the store's text search when the index is empty; keeps
    // the query shim usable before the first sync.
    if hits.is_empty() && mode == SearchMode::Text {
        let store = RecipeStore::connect(&config.database_url)
            .await
            .context("store unreachable")?;
        let rows = store
            .search_text(text, &TextSearchFilters::default(), limit as u32, 0)
            .await?;
        for row in rows {
            println!("store  {}  {}", row.recipe.identifier, row.recipe.title);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn hits_json(hits: &[recipe_search::SearchHit]) -> serde_json::Value {
    serde_json::Value::Array(
        hits.iter()
            .map(|h| {
                serde_json::json!({
                    "identifier": h.identifier,
                    "title": h.title,
                    "score": h.score,
                })
            })
            .collect(),
    )
}

async fn run_schedule(
    config: &Config,
    source: String,
    limit: usize,
    interval_secs: u64,
) -> Result<ExitCode> {
    let ctx = build_context(config, false).await?;
    let scheduler = Scheduler::new();
    let name = format!("scrape-{source}");

    let job_ctx = ctx.clone();
    let job_source = source.clone();
    scheduler.create(
        ScheduleSpec::new(&name, Duration::from_secs(interval_secs)),
        Arc::new(move || {
            let ctx = job_ctx.clone();
            let source = job_source.clone();
            Box::pin(async move {
                match workflows::scrape_feed(ctx, &source, limit, RetryPolicy::default()).await {
                    Ok(report) => info!(published = report.items_published, "scheduled scrape ran"),
                    Err(err) => error!(%err, "scheduled scrape failed"),
                }
            })
        }),
    )?;
    println!("schedule {name} running every {interval_secs}s");
    println!("verbs: pause | unpause | trigger | describe | delete | quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "pause" => scheduler.pause(&name)?,
                    "unpause" => scheduler.unpause(&name)?,
                    "trigger" => scheduler.trigger_now(&name)?,
                    "describe" => {
                        if let Some(status) = scheduler.describe(&name) {
                            println!(
                                "paused={} started={} skipped={} missed={} last={:?}",
                                status.paused,
                                status.runs_started,
                                status.runs_skipped,
                                status.missed_while_paused,
                                status.last_started_at,
                            );
                        }
                    }
                    "delete" | "quit" => break,
                    "" => {}
                    other => println!("unknown verb {other:?}"),
                }
            }
        }
    }
    let _ = scheduler.delete(&name);
    println!("schedule stopped");
    Ok(ExitCode::SUCCESS)
}

fn print_summary(summary: &workflows::BatchSummary) {
    println!(
        "attempted={} inserted={} already_existed={} failed={} skipped={} elapsed={:.1}s",
        summary.attempted,
        summary.inserted,
        summary.already_existed,
        summary.failed,
        summary.skipped,
        summary.elapsed.as_secs_f64()
    );
}
