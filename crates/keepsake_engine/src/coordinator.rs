use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex, MutexGuard};

use thiserror::Error;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

use crate::fetch::{FetchError, FetchSettings, Fetcher, ReqwestFetcher};
use crate::persist::{ensure_output_dir, PersistError};
use crate::reconstruct::Reconstructor;
use crate::types::{MemoryRecord, PipelineEvent};
use crate::video::VideoToolchain;

/// Tunables for a coordinator instance.
#[derive(Debug, Clone)]
pub struct DownloadSettings {
    /// Worker-pool bound. Kept small to stay within the origin server's
    /// fair-use expectations and to cap concurrent video re-encodes.
    pub pool_size: usize,
    pub fetch: FetchSettings,
    pub tools: VideoToolchain,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            pool_size: 5,
            fetch: FetchSettings::default(),
            tools: VideoToolchain::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("failed to build async runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("failed to build http client: {0}")]
    Client(#[from] FetchError),
}

/// Synchronous rejections from the control surface. Per-job failures never
/// surface here; they end up in the run's failed list instead.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("a download run is already active")]
    AlreadyRunning,
    #[error(transparent)]
    OutputDir(#[from] PersistError),
}

#[derive(Debug, Default)]
struct CoordinatorState {
    running: bool,
    generation: u64,
    cancel_tx: Option<watch::Sender<bool>>,
    retry: Option<RetrySource>,
}

#[derive(Debug, Clone)]
struct RetrySource {
    records: Vec<MemoryRecord>,
    output_dir: PathBuf,
}

#[derive(Debug, Default)]
struct RunProgress {
    total: usize,
    completed: usize,
    succeeded: usize,
    failed: usize,
    failed_records: Vec<MemoryRecord>,
}

/// Everything a single run's tasks share.
struct RunContext {
    progress: Mutex<RunProgress>,
    output_dir: PathBuf,
    reconstructor: Arc<Reconstructor>,
    event_tx: mpsc::Sender<PipelineEvent>,
    paused_rx: watch::Receiver<bool>,
    cancel_rx: watch::Receiver<bool>,
    coordinator: Arc<Mutex<CoordinatorState>>,
    generation: u64,
    pool_size: usize,
}

enum Gate {
    Proceed,
    Abandon,
}

/// Owns the worker pool, run state, and progress notification for download
/// runs. Constructed once; runs one batch of records at a time.
pub struct Coordinator {
    state: Arc<Mutex<CoordinatorState>>,
    paused_tx: watch::Sender<bool>,
    event_tx: mpsc::Sender<PipelineEvent>,
    reconstructor: Arc<Reconstructor>,
    pool_size: usize,
    runtime: tokio::runtime::Runtime,
}

impl Coordinator {
    /// Builds a coordinator and the event channel the Presentation drains.
    pub fn new(
        settings: DownloadSettings,
    ) -> Result<(Self, mpsc::Receiver<PipelineEvent>), CoordinatorError> {
        let fetcher = Arc::new(ReqwestFetcher::new(&settings.fetch)?);
        Self::with_fetcher(settings, fetcher)
    }

    /// Same as [`Coordinator::new`] with a caller-supplied fetcher.
    pub fn with_fetcher(
        settings: DownloadSettings,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<(Self, mpsc::Receiver<PipelineEvent>), CoordinatorError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        let (event_tx, event_rx) = mpsc::channel();
        let (paused_tx, _) = watch::channel(false);
        let reconstructor = Arc::new(Reconstructor::new(fetcher, settings.tools.clone()));
        Ok((
            Self {
                state: Arc::new(Mutex::new(CoordinatorState::default())),
                paused_tx,
                event_tx,
                reconstructor,
                pool_size: settings.pool_size.max(1),
                runtime,
            },
            event_rx,
        ))
    }

    /// Starts a run over `records` into `output_dir`.
    ///
    /// Rejects synchronously when a run is already active or the output
    /// directory is unusable; after that, per-job failures only ever show up
    /// in the event stream.
    pub fn start(
        &self,
        records: Vec<MemoryRecord>,
        output_dir: impl Into<PathBuf>,
    ) -> Result<(), StartError> {
        let output_dir = output_dir.into();
        let (cancel_tx, generation) = {
            let mut state = lock(&self.state);
            if state.running {
                return Err(StartError::AlreadyRunning);
            }
            state.running = true;
            state.generation += 1;
            let (cancel_tx, _) = watch::channel(false);
            state.cancel_tx = Some(cancel_tx.clone());
            (cancel_tx, state.generation)
        };

        if let Err(err) = ensure_output_dir(&output_dir) {
            let mut state = lock(&self.state);
            state.running = false;
            state.cancel_tx = None;
            return Err(err.into());
        }

        log::info!(
            "starting run: {} records into {}",
            records.len(),
            output_dir.display()
        );

        let ctx = Arc::new(RunContext {
            progress: Mutex::new(RunProgress {
                total: records.len(),
                ..RunProgress::default()
            }),
            output_dir,
            reconstructor: self.reconstructor.clone(),
            event_tx: self.event_tx.clone(),
            paused_rx: self.paused_tx.subscribe(),
            cancel_rx: cancel_tx.subscribe(),
            coordinator: self.state.clone(),
            generation,
            pool_size: self.pool_size,
        });
        self.runtime.spawn(drive_run(ctx, records));
        Ok(())
    }

    /// Pauses new jobs; a job already mid-fetch or mid-composite runs to
    /// completion first. The flag is independent of whether a run is active.
    pub fn pause(&self) {
        log::info!("downloads paused");
        self.paused_tx.send_replace(true);
    }

    pub fn resume(&self) {
        log::info!("downloads resumed");
        self.paused_tx.send_replace(false);
    }

    pub fn is_paused(&self) -> bool {
        *self.paused_tx.borrow()
    }

    /// Stops the current run: queued jobs abandon, in-flight jobs finish, and
    /// already-completed results stand. A new run may start immediately.
    pub fn cancel(&self) {
        let mut state = lock(&self.state);
        if state.running {
            log::info!("run cancelled");
        }
        state.running = false;
        if let Some(cancel_tx) = &state.cancel_tx {
            cancel_tx.send_replace(true);
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.state).running
    }

    /// Re-dispatches exactly the records that failed in the prior run, to the
    /// same output directory. Returns how many jobs were dispatched; zero
    /// failures make this a no-op.
    pub fn retry_failed(&self) -> Result<usize, StartError> {
        let Some(retry) = lock(&self.state).retry.clone() else {
            return Ok(0);
        };
        if retry.records.is_empty() {
            return Ok(0);
        }
        let count = retry.records.len();
        log::info!("retrying {count} failed records");
        self.start(retry.records, retry.output_dir)?;
        Ok(count)
    }
}

async fn drive_run(ctx: Arc<RunContext>, records: Vec<MemoryRecord>) {
    let semaphore = Arc::new(Semaphore::new(ctx.pool_size));
    let mut tasks = JoinSet::new();
    for record in records {
        tasks.spawn(run_job(ctx.clone(), record, semaphore.clone()));
    }
    while tasks.join_next().await.is_some() {}

    let (completed, total, succeeded, failed, failed_records) = {
        let progress = lock(&ctx.progress);
        (
            progress.completed,
            progress.total,
            progress.succeeded,
            progress.failed,
            progress.failed_records.clone(),
        )
    };

    {
        // A newer run may already be active; only a run that still owns the
        // coordinator may clear the flags or record its failures for retry.
        let mut state = lock(&ctx.coordinator);
        if state.generation == ctx.generation {
            state.retry = Some(RetrySource {
                records: failed_records.clone(),
                output_dir: ctx.output_dir.clone(),
            });
            state.running = false;
            state.cancel_tx = None;
        }
    }

    // Abandoned jobs keep `completed` short of `total`; that only happens on
    // a cancelled run, which ends without a terminal notification.
    if completed == total {
        log::info!("run complete: {succeeded} succeeded, {failed} failed");
        let _ = ctx.event_tx.send(PipelineEvent::RunCompleted {
            succeeded,
            failed,
            failed_records,
        });
    } else {
        log::info!("run stopped early: {completed}/{total} jobs finished");
    }
}

async fn run_job(ctx: Arc<RunContext>, record: MemoryRecord, semaphore: Arc<Semaphore>) {
    let Ok(_permit) = semaphore.acquire_owned().await else {
        return;
    };
    // Gate with the permit in hand, so a job that sat queued through a pause
    // or cancel still observes the flags before its network fetch.
    if matches!(wait_until_runnable(&ctx).await, Gate::Abandon) {
        log::debug!("abandoning queued job for {}", record.fetch_url);
        return;
    }

    let result = ctx.reconstructor.process(&record, &ctx.output_dir).await;

    // Counter update and notification happen under one lock, so concurrent
    // finishers can neither drop an update nor reorder the event stream.
    let mut progress = lock(&ctx.progress);
    progress.completed += 1;
    match &result {
        Ok(path) => {
            progress.succeeded += 1;
            log::debug!("job succeeded: {}", path.display());
        }
        Err(err) => {
            progress.failed += 1;
            progress.failed_records.push(record.clone());
            log::warn!("job failed for {}: {err}", record.fetch_url);
        }
    }
    let _ = ctx.event_tx.send(PipelineEvent::Progress {
        completed: progress.completed,
        total: progress.total,
        succeeded: progress.succeeded,
        failed: progress.failed,
    });
}

/// Parks until the run is neither paused nor cancelled. Waiting is purely
/// event-driven on the watch channels; there is no sleep polling.
async fn wait_until_runnable(ctx: &RunContext) -> Gate {
    let mut paused_rx = ctx.paused_rx.clone();
    let mut cancel_rx = ctx.cancel_rx.clone();
    loop {
        if *cancel_rx.borrow_and_update() {
            return Gate::Abandon;
        }
        if !*paused_rx.borrow_and_update() {
            return Gate::Proceed;
        }
        tokio::select! {
            changed = paused_rx.changed() => {
                if changed.is_err() {
                    return Gate::Abandon;
                }
            }
            changed = cancel_rx.changed() => {
                if changed.is_err() {
                    return Gate::Abandon;
                }
            }
        }
    }
}

/// Mutex guard that shrugs off poisoning; counters must stay usable even if
/// a worker panicked mid-update.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
