//! Main Tailer struct tying all components together.

use crate::backlog::{Backlog, DEFAULT_BACKLOG_SIZE};
use crate::error::{Result, TailError};
use crate::lines::{read_last_lines_before, DEFAULT_READ_CHUNK_SIZE};
use crate::poller::{open_file, OpenFile, TailPoller, TickOutcome};
use crate::subscriptions::{
    DropReason, SubscriptionConfig, SubscriptionHandle, SubscriptionId, SubscriptionManager,
};
use crate::types::{LogLine, LogPosition};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Default poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Tailer configuration.
#[derive(Clone, Debug)]
pub struct TailerConfig {
    /// File to tail.
    pub path: PathBuf,

    /// Lines kept for replay to new subscribers.
    pub backlog_size: usize,

    /// Time between ticks when running in the background.
    pub poll_interval: Duration,

    /// Chunk size for reads, forward and backward.
    pub read_chunk_size: usize,

    /// Whether to create the file empty if it doesn't exist.
    pub create_if_missing: bool,

    /// Defaults for subscriptions made with [`Tailer::subscribe`].
    pub subscription: SubscriptionConfig,
}

impl Default for TailerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./app.log"),
            backlog_size: DEFAULT_BACKLOG_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            create_if_missing: true,
            subscription: SubscriptionConfig::default(),
        }
    }
}

impl TailerConfig {
    /// Default configuration for `path`.
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.backlog_size == 0 {
            return Err(TailError::InvalidConfig("backlog_size must be at least 1".into()));
        }
        if self.read_chunk_size == 0 {
            return Err(TailError::InvalidConfig("read_chunk_size must be at least 1".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(TailError::InvalidConfig("poll_interval must be non-zero".into()));
        }
        if self.subscription.buffer_size == 0 {
            return Err(TailError::InvalidConfig(
                "subscription buffer_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

struct Inner {
    config: TailerConfig,
    /// Only ever locked for a whole tick, so ticks never overlap.
    poller: Mutex<TailPoller>,
    subscribers: SubscriptionManager,
    running: AtomicBool,
}

impl Inner {
    fn tick(&self) -> Result<TickOutcome> {
        self.poller.lock().tick(&self.subscribers)
    }
}

/// Tails one file and fans its new lines out to subscribers.
///
/// All state lives in the instance: independent tailers share nothing.
/// Clones are cheap handles onto the same tailer.
///
/// The tailer is driven by ticks. Call [`tick`](Self::tick) directly (tests,
/// external schedulers) or [`start`](Self::start) a background thread that
/// ticks on a timer and on [`Notifier::notify`].
#[derive(Clone)]
pub struct Tailer {
    inner: Arc<Inner>,
}

impl Tailer {
    /// Open `config.path` and seed the backlog from its last lines.
    ///
    /// A missing file is created empty when `create_if_missing` is set.
    /// A backlog that cannot be read is logged and starts empty. An
    /// unterminated last line is not part of the backlog; it is published
    /// whole once its newline is written.
    pub fn open(config: TailerConfig) -> Result<Self> {
        Self::open_with(config, open_file)
    }

    pub(crate) fn open_with(config: TailerConfig, open_file: OpenFile) -> Result<Self> {
        config.validate()?;

        let path = config.path.clone();
        let size = match fs::metadata(&path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == ErrorKind::NotFound && config.create_if_missing => {
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .map_err(|e| TailError::storage(&path, e))?;
                info!(path = %path.display(), "created empty log file");
                0
            }
            Err(e) => return Err(TailError::storage(&path, e)),
        };

        let mut backlog = Backlog::new(config.backlog_size);
        let offset = match open_file(&path).and_then(|mut file| {
            read_last_lines_before(&mut file, size, config.backlog_size, config.read_chunk_size)
        }) {
            Ok(scan) => {
                backlog.replace(scan.lines);
                scan.complete_end
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "no backlog available, starting empty");
                size
            }
        };

        info!(
            path = %path.display(),
            offset,
            backlog = backlog.len(),
            "tailer opened"
        );

        let poller = TailPoller::new(&path, offset, config.backlog_size, config.read_chunk_size)
            .with_opener(open_file);

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                poller: Mutex::new(poller),
                subscribers: SubscriptionManager::with_backlog(backlog),
                running: AtomicBool::new(false),
            }),
        })
    }

    pub fn config(&self) -> &TailerConfig {
        &self.inner.config
    }

    pub fn path(&self) -> &Path {
        &self.inner.config.path
    }

    /// Current read position.
    pub fn position(&self) -> LogPosition {
        self.inner.poller.lock().position()
    }

    // --- Ticking ---

    /// Run one poll-and-publish cycle now.
    ///
    /// Errors are per-tick: the offset is left where it was and the next
    /// tick retries.
    pub fn tick(&self) -> Result<TickOutcome> {
        self.inner.tick()
    }

    /// Spawn a background thread that ticks every `poll_interval` and
    /// whenever notified. Only one may run per tailer.
    pub fn start(&self) -> Result<PollerHandle> {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return Err(TailError::AlreadyRunning);
        }

        // One slot: notifications arriving mid-tick collapse into one.
        let (notify_tx, notify_rx) = bounded(1);
        let (stop_tx, stop_rx) = bounded(1);
        let inner = Arc::clone(&self.inner);

        let spawned = std::thread::Builder::new()
            .name("logtail-poller".into())
            .spawn(move || run_poll_loop(inner, notify_rx, stop_rx));

        match spawned {
            Ok(thread) => Ok(PollerHandle {
                stop: Some(stop_tx),
                notifier: Notifier { sender: notify_tx },
                thread: Some(thread),
            }),
            Err(e) => {
                self.inner.running.store(false, Ordering::SeqCst);
                Err(TailError::Io(e))
            }
        }
    }

    /// Whether a background poller is running.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    // --- Subscriptions ---

    /// Subscribe with the configured defaults.
    pub fn subscribe(&self) -> SubscriptionHandle {
        self.subscribe_with(self.inner.config.subscription.clone())
    }

    pub fn subscribe_with(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        self.inner.subscribers.subscribe(config)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.subscribers.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.subscription_count()
    }

    /// Copy of the backlog, oldest first.
    pub fn backlog(&self) -> Vec<LogLine> {
        self.inner.subscribers.backlog()
    }

    /// Drop every subscriber with [`DropReason::Shutdown`].
    pub fn close(&self) {
        self.inner.subscribers.close_all(DropReason::Shutdown);
    }
}

fn run_poll_loop(inner: Arc<Inner>, notify: Receiver<()>, stop: Receiver<()>) {
    let ticker = crossbeam_channel::tick(inner.config.poll_interval);
    debug!(path = %inner.config.path.display(), "poller started");

    loop {
        select! {
            recv(stop) -> _ => break,
            recv(notify) -> msg => {
                if msg.is_err() {
                    break;
                }
            },
            recv(ticker) -> _ => {},
        }

        // Failures are logged by the poller and retried next tick.
        let _ = inner.tick();
    }

    inner.running.store(false, Ordering::SeqCst);
    debug!(path = %inner.config.path.display(), "poller stopped");
}

/// Wakes the background poller for an immediate tick.
///
/// Hand this to a file-change watcher. Extra notifications while a tick is
/// already pending are coalesced.
#[derive(Clone, Debug)]
pub struct Notifier {
    sender: Sender<()>,
}

impl Notifier {
    pub fn notify(&self) {
        let _ = self.sender.try_send(());
    }
}

/// Owns the background poller thread. Dropping it stops the thread.
pub struct PollerHandle {
    stop: Option<Sender<()>>,
    notifier: Notifier,
    thread: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Request an immediate tick.
    pub fn notify(&self) {
        self.notifier.notify();
    }

    pub fn notifier(&self) -> Notifier {
        self.notifier.clone()
    }

    /// Stop the poller and wait for the current tick to finish.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.try_send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("poller thread panicked");
            }
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}
