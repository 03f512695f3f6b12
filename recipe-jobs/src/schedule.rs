//! Recurring workflow execution.
//!
//! A schedule binds a name to `(job, interval, overlap policy)` and runs it
//! on a fixed cadence. Pausing a schedule counts the slots it misses;
//! unpausing executes a bounded number of catch-up runs (one by default),
//! never the whole backlog. The default overlap policy skips a slot whose
//! previous run is still going.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::JobError;

/// A schedulable job: any factory of `'static` futures.
pub type ScheduleJob = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverlapPolicy {
    /// Skip this slot if the previous run is still going (the default).
    #[default]
    Skip,
    /// Start anyway and let runs overlap.
    Allow,
}

#[derive(Clone, Debug)]
pub struct ScheduleSpec {
    pub name: String,
    pub interval: Duration,
    pub overlap: OverlapPolicy,
    /// Missed slots executed on unpause, at most.
    pub max_backfill: u64,
}

impl ScheduleSpec {
    pub fn new(name: &str, interval: Duration) -> Self {
        ScheduleSpec {
            name: name.to_string(),
            interval,
            overlap: OverlapPolicy::default(),
            max_backfill: 1,
        }
    }
}

/// Snapshot returned by [`Scheduler::describe`].
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduleStatus {
    pub name: String,
    pub interval: Duration,
    pub paused: bool,
    pub runs_started: u64,
    pub runs_skipped: u64,
    pub missed_while_paused: u64,
    pub last_started_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct ScheduleState {
    paused: AtomicBool,
    running: AtomicBool,
    runs_started: AtomicU64,
    runs_skipped: AtomicU64,
    missed_while_paused: AtomicU64,
    last_started_at: Mutex<Option<DateTime<Utc>>>,
}

enum Command {
    Pause,
    Unpause,
    Trigger,
}

struct ScheduleHandle {
    spec: ScheduleSpec,
    state: Arc<ScheduleState>,
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

/// Controller for all named schedules of a worker.
#[derive(Default)]
pub struct Scheduler {
    schedules: Mutex<HashMap<String, ScheduleHandle>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler::default()
    }

    /// Create and start a schedule. The first run happens one interval
    /// after creation.
    pub fn create(&self, spec: ScheduleSpec, job: ScheduleJob) -> Result<(), JobError> {
        let mut schedules = lock(&self.schedules);
        if schedules.contains_key(&spec.name) {
            return Err(JobError::ScheduleExists(spec.name));
        }

        let state = Arc::new(ScheduleState::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_schedule(spec.clone(), state.clone(), job, rx));
        info!(schedule = %spec.name, interval_ms = spec.interval.as_millis() as u64, "created schedule");
        schedules.insert(
            spec.name.clone(),
            ScheduleHandle {
                spec,
                state,
                commands: tx,
                task,
            },
        );
        Ok(())
    }

    pub fn pause(&self, name: &str) -> Result<(), JobError> {
        self.send(name, Command::Pause)
    }

    pub fn unpause(&self, name: &str) -> Result<(), JobError> {
        self.send(name, Command::Unpause)
    }

    /// Run the job now, outside the cadence. Works while paused.
    pub fn trigger_now(&self, name: &str) -> Result<(), JobError> {
        self.send(name, Command::Trigger)
    }

    pub fn describe(&self, name: &str) -> Option<ScheduleStatus> {
        let schedules = lock(&self.schedules);
        schedules.get(name).map(|handle| handle.status())
    }

    pub fn list(&self) -> Vec<ScheduleStatus> {
        let schedules = lock(&self.schedules);
        let mut statuses: Vec<ScheduleStatus> =
            schedules.values().map(ScheduleHandle::status).collect();
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }

    /// Stop and remove a schedule.
    pub fn delete(&self, name: &str) -> Result<(), JobError> {
        let mut schedules = lock(&self.schedules);
        let handle = schedules
            .remove(name)
            .ok_or_else(|| JobError::UnknownSchedule(name.to_string()))?;
        handle.task.abort();
        info!(schedule = name, "deleted schedule");
        Ok(())
    }

    fn send(&self, name: &str, command: Command) -> Result<(), JobError> {
        let schedules = lock(&self.schedules);
        let handle = schedules
            .get(name)
            .ok_or_else(|| JobError::UnknownSchedule(name.to_string()))?;
        handle
            .commands
            .send(command)
            .map_err(|_| JobError::UnknownSchedule(name.to_string()))
    }
}

impl ScheduleHandle {
    fn status(&self) -> ScheduleStatus {
        ScheduleStatus {
            name: self.spec.name.clone(),
            interval: self.spec.interval,
            paused: self.state.paused.load(Ordering::SeqCst),
            runs_started: self.state.runs_started.load(Ordering::SeqCst),
            runs_skipped: self.state.runs_skipped.load(Ordering::SeqCst),
            missed_while_paused: self.state.missed_while_paused.load(Ordering::SeqCst),
            last_started_at: *lock(&self.state.last_started_at),
        }
    }
}

async fn run_schedule(
    spec: ScheduleSpec,
    state: Arc<ScheduleState>,
    job: ScheduleJob,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    let start = tokio::time::Instant::now() + spec.interval;
    let mut ticker = tokio::time::interval_at(start, spec.interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if state.paused.load(Ordering::SeqCst) {
                    state.missed_while_paused.fetch_add(1, Ordering::SeqCst);
                    debug!(schedule = %spec.name, "missed slot while paused");
                } else {
                    start_run(&spec, &state, &job);
                }
            }
            command = commands.recv() => {
                let Some(command) = command else { break };
                match command {
                    Command::Pause => {
                        state.paused.store(true, Ordering::SeqCst);
                        info!(schedule = %spec.name, "paused");
                    }
                    Command::Unpause => {
                        state.paused.store(false, Ordering::SeqCst);
                        let missed = state.missed_while_paused.swap(0, Ordering::SeqCst);
                        let backfill = missed.min(spec.max_backfill);
                        info!(schedule = %spec.name, missed, backfill, "unpaused");
                        for _ in 0..backfill {
                            start_run(&spec, &state, &job);
                        }
                    }
                    Command::Trigger => start_run(&spec, &state, &job),
                }
            }
        }
    }
}

fn start_run(spec: &ScheduleSpec, state: &Arc<ScheduleState>, job: &ScheduleJob) {
    if spec.overlap == OverlapPolicy::Skip && state.running.swap(true, Ordering::SeqCst) {
        state.runs_skipped.fetch_add(1, Ordering::SeqCst);
        warn!(schedule = %spec.name, "previous run still going, skipping slot");
        return;
    }
    state.runs_started.fetch_add(1, Ordering::SeqCst);
    *lock(&state.last_started_at) = Some(Utc::now());

    let future = job();
    let state = state.clone();
    let tracks_overlap = spec.overlap == OverlapPolicy::Skip;
    tokio::spawn(async move {
        future.await;
        if tracks_overlap {
            state.running.store(false, Ordering::SeqCst);
        }
    });
}

/// Mutex poisoning only happens after a panicking holder; recover the data.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
