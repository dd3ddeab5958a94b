use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::{HarvestConfig, LOG_CHANNEL_CAPACITY, PROGRESS_TICK_MS};
use crate::error::{HarvestError, Result};
use crate::fetch::{fetch_record, FetchOutcome, PageSource};
use crate::model::{now, Record};
use crate::store::RecordStore;

/// Run lifecycle. Every transition is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestState {
    Idle,
    Running,
    Draining,
    Done,
}

/// How a successful fetch changed the record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeClass {
    New,
    Updated,
    Unchanged,
}

/// Live run counters, shared with workers and the progress task.
#[derive(Debug, Default)]
pub struct Counters {
    pub success: AtomicU64,
    pub failed: AtomicU64,
    pub skipped: AtomicU64,
    pub new: AtomicU64,
    pub updated: AtomicU64,
    pub unchanged: AtomicU64,
    pub persist_errors: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub success: u64,
    pub failed: u64,
    pub skipped: u64,
    pub new: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub persist_errors: u64,
}

impl CounterSnapshot {
    /// Ids that produced an outcome of any kind.
    pub fn processed(&self) -> u64 {
        self.success + self.failed + self.skipped
    }
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl Counters {
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            success: self.success.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            new: self.new.load(Ordering::Relaxed),
            updated: self.updated.load(Ordering::Relaxed),
            unchanged: self.unchanged.load(Ordering::Relaxed),
            persist_errors: self.persist_errors.load(Ordering::Relaxed),
        }
    }

    fn record_outcome(&self, outcome: &FetchOutcome) {
        match outcome {
            FetchOutcome::Ok(_) => bump(&self.success),
            FetchOutcome::Empty { .. } => bump(&self.skipped),
            FetchOutcome::Failed { .. } => bump(&self.failed),
        }
    }

    fn record_merge(&self, class: MergeClass) {
        match class {
            MergeClass::New => bump(&self.new),
            MergeClass::Updated => bump(&self.updated),
            MergeClass::Unchanged => bump(&self.unchanged),
        }
    }
}

/// What a finished run hands back.
#[derive(Debug)]
pub struct HarvestReport {
    pub counters: CounterSnapshot,
    pub elapsed: Duration,
    pub dispatched: u64,
    pub records: HashMap<String, Record>,
}

/// Messages into the receive loop.
enum Event {
    Outcome(FetchOutcome),
    DispatchDone { dispatched: u64 },
}

// ── Merge ──

/// Fold one fetched record into the set keyed by name. Updated records keep
/// the stored `created_at` and get a fresh `updated_at`.
pub fn merge_record(records: &mut HashMap<String, Record>, mut incoming: Record) -> MergeClass {
    match records.get_mut(&incoming.name) {
        None => {
            records.insert(incoming.name.clone(), incoming);
            MergeClass::New
        }
        Some(existing) if incoming.differs_from(existing) => {
            incoming.created_at = existing.created_at;
            incoming.updated_at = now().max(existing.created_at);
            *existing = incoming;
            MergeClass::Updated
        }
        Some(_) => MergeClass::Unchanged,
    }
}

// ── Run log ──

/// Line log for one run, written by a background task. Senders never wait: a
/// full channel drops the line, and a file that cannot be created swallows
/// everything.
pub struct RunLog {
    tx: mpsc::Sender<String>,
    writer: JoinHandle<()>,
}

impl RunLog {
    pub fn open(dir: &Path) -> Self {
        let path = dir.join(format!("scraper-{}.log", chrono::Local::now().format("%Y%m%d-%H%M%S")));
        let (tx, mut rx) = mpsc::channel::<String>(LOG_CHANNEL_CAPACITY);

        let writer = tokio::spawn(async move {
            let mut file = match tokio::fs::File::create(&path).await {
                Ok(f) => f,
                Err(e) => {
                    warn!("Run log {} unavailable: {}", path.display(), e);
                    while rx.recv().await.is_some() {}
                    return;
                }
            };
            while let Some(line) = rx.recv().await {
                let stamped = format!("{} {}\n", chrono::Local::now().format("%Y/%m/%d %H:%M:%S"), line);
                if file.write_all(stamped.as_bytes()).await.is_err() {
                    while rx.recv().await.is_some() {}
                    return;
                }
            }
            let _ = file.flush().await;
        });

        Self { tx, writer }
    }

    pub fn line(&self, msg: impl Into<String>) {
        let _ = self.tx.try_send(msg.into());
    }

    /// Close the channel and wait for queued lines to hit the file.
    pub async fn close(self) {
        drop(self.tx);
        let _ = self.writer.await;
    }
}

// ── Coordinator ──

pub struct Harvester<S: PageSource> {
    config: HarvestConfig,
    source: Arc<S>,
    stores: Vec<Box<dyn RecordStore + Send>>,
    counters: Arc<Counters>,
    state: HarvestState,
}

impl<S: PageSource> Harvester<S> {
    /// The first store is the primary one incremental runs load from.
    pub fn new(
        config: HarvestConfig,
        source: S,
        stores: Vec<Box<dyn RecordStore + Send>>,
    ) -> Result<Self> {
        config.validate().map_err(HarvestError::init)?;
        Ok(Self {
            config,
            source: Arc::new(source),
            stores,
            counters: Arc::new(Counters::default()),
            state: HarvestState::Idle,
        })
    }

    fn transition(&mut self, next: HarvestState) {
        info!(from = ?self.state, to = ?next, "harvest state");
        self.state = next;
    }

    fn load_prior(&self) -> HashMap<String, Record> {
        let Some(primary) = self.stores.first() else {
            return HashMap::new();
        };
        match primary.load_all() {
            Ok(prior) => {
                info!("Loaded {} prior records from {}", prior.len(), primary.label());
                prior.into_iter().map(|r| (r.name.clone(), r)).collect()
            }
            Err(e) => {
                warn!("Could not load prior records, starting empty: {}", e);
                HashMap::new()
            }
        }
    }

    /// Sweep the configured id range and return the final record set.
    pub async fn run(mut self) -> Result<HarvestReport> {
        let t0 = Instant::now();
        std::fs::create_dir_all(&self.config.data_dir).map_err(|e| {
            HarvestError::Initialization(format!(
                "cannot create {}: {}",
                self.config.data_dir.display(),
                e
            ))
        })?;

        self.transition(HarvestState::Running);
        let mut records = if self.config.incremental {
            self.load_prior()
        } else {
            HashMap::new()
        };

        let log = RunLog::open(&self.config.data_dir);
        log.line(format!(
            "harvest ids {}..={} target {} incremental {}",
            self.config.start_id, self.config.end_id, self.config.target, self.config.incremental
        ));

        let (tx, mut rx) = mpsc::channel::<Event>(self.config.concurrency * 2);
        let dispatcher = tokio::spawn(dispatch(
            self.config.clone(),
            Arc::clone(&self.source),
            Arc::clone(&self.counters),
            tx,
        ));

        let total = u64::from(self.config.end_id - self.config.start_id) + 1;
        let pb = progress_bar(total, self.config.show_progress);
        let ticker = spawn_progress(pb.clone(), Arc::clone(&self.counters));

        let mut dispatched = 0;
        while let Some(event) = rx.recv().await {
            match event {
                Event::DispatchDone { dispatched: n } => {
                    dispatched = n;
                    log.line(format!("dispatch finished after {} ids", n));
                }
                Event::Outcome(FetchOutcome::Ok(record)) => {
                    self.absorb(&mut records, record, &log);
                }
                Event::Outcome(FetchOutcome::Empty { id, error }) => {
                    log.line(format!("skip id {}: {}", id, error));
                }
                Event::Outcome(FetchOutcome::Failed { id, error }) => {
                    debug!(id, %error, "fetch failed");
                    log.line(format!("fail id {}: {}", id, error));
                }
            }
        }

        // Every worker has sent its outcome once the channel closes.
        if let Err(e) = dispatcher.await {
            warn!("Dispatcher task ended abnormally: {}", e);
        }
        self.transition(HarvestState::Draining);
        log.line("draining");
        ticker.abort();
        let counters = self.counters.snapshot();
        pb.set_position(counters.processed());
        pb.finish_and_clear();

        let elapsed = t0.elapsed();
        info!(
            success = counters.success,
            failed = counters.failed,
            skipped = counters.skipped,
            new = counters.new,
            updated = counters.updated,
            unchanged = counters.unchanged,
            persist_errors = counters.persist_errors,
            "harvest finished in {:.1}s",
            elapsed.as_secs_f64()
        );
        log.line(format!("done: {:?}", counters));
        log.close().await;
        self.transition(HarvestState::Done);

        Ok(HarvestReport {
            counters,
            elapsed,
            dispatched,
            records,
        })
    }

    /// Merge one record and persist it when it is new or changed.
    fn absorb(&mut self, records: &mut HashMap<String, Record>, record: Record, log: &RunLog) {
        let name = record.name.clone();
        let class = merge_record(records, record);
        self.counters.record_merge(class);
        log.line(format!("{:?}: {}", class, name));

        if class == MergeClass::Unchanged {
            return;
        }
        let Some(stored) = records.get(&name) else {
            return;
        };
        for store in &mut self.stores {
            if let Err(e) = store.upsert(stored) {
                bump(&self.counters.persist_errors);
                warn!("{} store: {}", store.label(), e);
                log.line(format!("persist {} to {}: {}", name, store.label(), e));
            }
        }
    }
}

/// Issue one worker per id, spaced by the dispatch interval and bounded by
/// the semaphore. Stops early once enough profiles were found.
async fn dispatch<S: PageSource>(
    config: HarvestConfig,
    source: Arc<S>,
    counters: Arc<Counters>,
    tx: mpsc::Sender<Event>,
) {
    let semaphore = Arc::new(Semaphore::new(config.concurrency));
    let mut tick = tokio::time::interval(config.dispatch_interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let base_url: Arc<str> = Arc::from(config.base_url.as_str());

    let mut dispatched = 0u64;
    for id in config.start_id..=config.end_id {
        // 0 = no target.
        if config.target > 0 && counters.success.load(Ordering::Relaxed) >= config.target {
            info!("Target of {} profiles reached, stopping dispatch", config.target);
            break;
        }
        tick.tick().await;
        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };

        let source = Arc::clone(&source);
        let counters = Arc::clone(&counters);
        let base_url = Arc::clone(&base_url);
        let tx = tx.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let outcome = fetch_record(source.as_ref(), &base_url, id).await;
            counters.record_outcome(&outcome);
            let _ = tx.send(Event::Outcome(outcome)).await;
        });
        dispatched += 1;
    }

    let _ = tx.send(Event::DispatchDone { dispatched }).await;
}

fn progress_bar(total: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta}) {msg}")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}

fn spawn_progress(pb: ProgressBar, counters: Arc<Counters>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_millis(PROGRESS_TICK_MS));
        loop {
            tick.tick().await;
            let c = counters.snapshot();
            pb.set_position(c.processed());
            pb.set_message(format!(
                "ok {} new {} upd {} fail {} skip {}",
                c.success, c.new, c.updated, c.failed, c.skipped
            ));
        }
    })
}

// ── Tests ──
