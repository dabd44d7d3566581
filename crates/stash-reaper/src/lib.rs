//! Background reclamation loop for Stash.
//!
//! A reaper is one long-lived Tokio task that runs a sweep (usually
//! "evict idle sessions") immediately, then again every `interval`, until
//! it is cancelled.
//!
//! # Cancellation
//!
//! Every reaper is paired with a [`ReaperHandle`]. The handle owns a
//! [`CancellationToken`]; cancelling it (explicitly, through
//! [`ReaperHandle::shutdown`], or implicitly when the handle is dropped)
//! wakes the loop out of its sleep and ends the task. Nothing keeps
//! sweeping after its owner is gone.
//!
//! # Integration
//!
//! ```ignore
//! let mut handle = Reaper::spawn(ReaperConfig::every(Duration::from_secs(60)), move || {
//!     provider.gc(max_idle).len()
//! })?;
//! // ...
//! handle.shutdown().await;
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// When a reaper sweeps.
#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// Pause between the end of one sweep and the start of the next.
    pub interval: Duration,
    /// Sweep once as soon as the task starts, before the first pause.
    pub sweep_on_start: bool,
}

impl ReaperConfig {
    /// Sweeps immediately, then every `interval`.
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            sweep_on_start: true,
        }
    }

    /// Checks that the loop can't spin.
    pub fn validate(&self) -> Result<(), ReaperError> {
        if self.interval.is_zero() {
            return Err(ReaperError::ZeroInterval);
        }
        Ok(())
    }
}

/// Errors returned by [`Reaper::spawn`].
#[derive(Debug, thiserror::Error)]
pub enum ReaperError {
    /// A zero interval would sweep in a tight loop.
    #[error("reaper interval must be greater than zero")]
    ZeroInterval,

    /// There is no Tokio runtime to run the loop on.
    #[error("no tokio runtime available to run the reaper")]
    NoRuntime,
}

// ---------------------------------------------------------------------------
// Sweep
// ---------------------------------------------------------------------------

/// One pass of reclamation work.
///
/// Any `Fn() -> usize` closure is a sweep; the return value is how many
/// items were reclaimed and only feeds the statistics.
pub trait Sweep: Send + Sync + 'static {
    fn sweep(&self) -> usize;
}

impl<F> Sweep for F
where
    F: Fn() -> usize + Send + Sync + 'static,
{
    fn sweep(&self) -> usize {
        self()
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Counters updated by the reaper task after every sweep.
#[derive(Debug, Default)]
pub struct ReaperStats {
    sweeps: AtomicU64,
    reclaimed: AtomicU64,
}

impl ReaperStats {
    /// Sweeps completed so far.
    pub fn sweeps(&self) -> u64 {
        self.sweeps.load(Ordering::Relaxed)
    }

    /// Items reclaimed across all sweeps.
    pub fn reclaimed(&self) -> u64 {
        self.reclaimed.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Reaper
// ---------------------------------------------------------------------------

/// Spawns reclamation loops.
pub struct Reaper;

impl Reaper {
    /// Starts a reaper on the current Tokio runtime.
    ///
    /// # Errors
    /// - [`ReaperError::ZeroInterval`] if `config.interval` is zero
    /// - [`ReaperError::NoRuntime`] if called outside a runtime
    pub fn spawn<S: Sweep>(
        config: ReaperConfig,
        sweep: S,
    ) -> Result<ReaperHandle, ReaperError> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| ReaperError::NoRuntime)?;

        let cancel = CancellationToken::new();
        let stats = Arc::new(ReaperStats::default());

        let task = runtime.spawn(run(
            config.clone(),
            sweep,
            cancel.clone(),
            Arc::clone(&stats),
        ));

        debug!(interval_secs = config.interval.as_secs_f64(), "reaper started");

        Ok(ReaperHandle {
            cancel,
            task: Some(task),
            stats,
        })
    }
}

async fn run<S: Sweep>(
    config: ReaperConfig,
    sweep: S,
    cancel: CancellationToken,
    stats: Arc<ReaperStats>,
) {
    let mut next = if config.sweep_on_start {
        Instant::now()
    } else {
        Instant::now() + config.interval
    };

    loop {
        tokio::select! {
            // Check cancellation first so a cancelled reaper never starts
            // another sweep, even if its deadline has also passed.
            biased;
            _ = cancel.cancelled() => break,
            _ = time::sleep_until(next) => {}
        }

        let reclaimed = sweep.sweep();
        let sweeps = stats.sweeps.fetch_add(1, Ordering::Relaxed) + 1;
        stats
            .reclaimed
            .fetch_add(reclaimed as u64, Ordering::Relaxed);
        trace!(sweep = sweeps, reclaimed, "reaper sweep finished");

        // Schedule from the end of the sweep, not from the old deadline:
        // a slow sweep delays the next one instead of causing a burst.
        next = Instant::now() + config.interval;
    }

    debug!(sweeps = stats.sweeps(), "reaper stopped");
}

/// Controls a running reaper. Dropping the handle cancels the loop.
#[derive(Debug)]
pub struct ReaperHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    stats: Arc<ReaperStats>,
}

impl ReaperHandle {
    /// Asks the loop to stop without waiting for it. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Stops the loop and waits for the task to finish.
    ///
    /// A sweep already in progress completes first. Safe to call more
    /// than once.
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "reaper task ended abnormally");
            }
        }
    }

    /// `true` until the loop has been cancelled.
    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Live counters for this reaper.
    pub fn stats(&self) -> &ReaperStats {
        &self.stats
    }
}

impl Drop for ReaperHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
