//! Periodic poll scheduling
//!
//! The pad has no interrupt line, so its state has to be re-sampled on a
//! fixed cadence. [`PollScheduler`] owns one background tokio task that
//! invokes a sampling callback in a trailing-schedule loop: the callback
//! runs, then the worker sleeps the configured interval before the next
//! cycle. Execution time of the callback therefore never causes overlap,
//! and there is exactly one cycle in flight at any instant.
//!
//! The interval can be retuned while the worker runs; an update replaces
//! the pending delay, it never duplicates or skips a cycle. [`PollScheduler::stop`]
//! cancels the pending delay and waits for an in-flight cycle to drain, so
//! once it returns no further callback invocation can happen.

use std::fmt::Display;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Poll cadence configuration.
///
/// The bounds are fixed for the lifetime of a scheduler; only the current
/// interval may move inside them afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    /// Time between the end of one sample cycle and the start of the next.
    pub interval_ms: u64,

    /// Lower bound for runtime interval updates.
    pub interval_min_ms: u64,

    /// Upper bound for runtime interval updates.
    pub interval_max_ms: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_ms: 16, // ~60 Hz, matches the pad's display-synced origins
            interval_min_ms: 0,
            interval_max_ms: 32,
        }
    }
}

impl PollSettings {
    /// Checks that the interval sits inside its bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_min_ms > self.interval_max_ms {
            return Err(ConfigError::InvertedBounds {
                min_ms: self.interval_min_ms,
                max_ms: self.interval_max_ms,
            });
        }
        if self.interval_ms < self.interval_min_ms || self.interval_ms > self.interval_max_ms {
            return Err(ConfigError::IntervalOutOfBounds {
                interval_ms: self.interval_ms,
                min_ms: self.interval_min_ms,
                max_ms: self.interval_max_ms,
            });
        }
        Ok(())
    }
}

// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("poll interval {interval_ms}ms outside bounds [{min_ms}, {max_ms}]ms")]
    IntervalOutOfBounds {
        interval_ms: u64,
        min_ms: u64,
        max_ms: u64,
    },

    #[error("poll interval bounds inverted: min {min_ms}ms exceeds max {max_ms}ms")]
    InvertedBounds { min_ms: u64, max_ms: u64 },
}

// Scheduling errors
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("poll worker already running")]
    AlreadyRunning,
}

/// Lifecycle of the poll worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollState {
    /// No worker running.
    Stopped,
    /// Worker exists and is waiting out the interval.
    Scheduled,
    /// A sample cycle is executing right now.
    Running,
}

/// Single-worker periodic scheduler.
///
/// `start` spawns the worker, `stop` drains it. All interval accessors take
/// `&self` and may be called from any thread while the worker runs.
pub struct PollScheduler {
    interval_tx: watch::Sender<u64>,
    interval_min_ms: u64,
    interval_max_ms: u64,
    state_tx: watch::Sender<PollState>,
    state_rx: watch::Receiver<PollState>,
    cancel: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl PollScheduler {
    /// Creates a stopped scheduler, rejecting settings whose interval falls
    /// outside the bounds. Nothing runs until [`PollScheduler::start`].
    pub fn new(settings: PollSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        debug!("creating poll scheduler with settings: {:?}", settings);

        let (interval_tx, _) = watch::channel(settings.interval_ms);
        let (state_tx, state_rx) = watch::channel(PollState::Stopped);

        Ok(Self {
            interval_tx,
            interval_min_ms: settings.interval_min_ms,
            interval_max_ms: settings.interval_max_ms,
            state_tx,
            state_rx,
            cancel: CancellationToken::new(),
            worker: None,
        })
    }

    /// Starts the periodic worker.
    ///
    /// The first cycle fires immediately; every following cycle is scheduled
    /// one interval after the previous cycle completed. A failing cycle is
    /// logged and the schedule keeps going — the next cycle is the retry.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F, E>(&mut self, mut cycle: F) -> Result<(), SchedulerError>
    where
        F: FnMut() -> Result<(), E> + Send + 'static,
        E: Display + Send + 'static,
    {
        if self.worker.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!(
            "starting poll worker at {}ms interval",
            *self.interval_tx.borrow()
        );

        let cancel = CancellationToken::new();
        self.cancel = cancel.clone();
        let mut interval_rx = self.interval_tx.subscribe();
        let state_tx = self.state_tx.clone();

        self.state_tx.send_replace(PollState::Scheduled);

        self.worker = Some(tokio::spawn(async move {
            'run: loop {
                // A cancel that lands between cycles (or before the first
                // one) kills the pending invocation outright.
                if cancel.is_cancelled() {
                    break;
                }

                state_tx.send_replace(PollState::Running);
                if let Err(e) = cycle() {
                    warn!("poll cycle failed, keeping schedule: {}", e);
                }
                state_tx.send_replace(PollState::Scheduled);

                // Trailing delay before the next cycle. An interval update
                // replaces the pending delay in full, the same way a
                // cancel-and-requeue would.
                loop {
                    let delay = Duration::from_millis(*interval_rx.borrow_and_update());
                    tokio::select! {
                        _ = cancel.cancelled() => break 'run,
                        _ = time::sleep(delay) => continue 'run,
                        changed = interval_rx.changed() => {
                            if changed.is_err() {
                                // Scheduler dropped without stop; nobody is
                                // left to retune or drain us.
                                warn!("poll scheduler dropped, worker exiting");
                                break 'run;
                            }
                            debug!(
                                "poll interval retuned to {}ms",
                                *interval_rx.borrow()
                            );
                        }
                    }
                }
            }
            state_tx.send_replace(PollState::Stopped);
            debug!("poll worker exited");
        }));

        Ok(())
    }

    /// Stops the worker, waiting for an in-flight cycle to finish.
    ///
    /// After this returns no further callback invocation occurs. Calling it
    /// on a stopped scheduler is a no-op.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(worker) = self.worker.take() {
            debug!("draining poll worker");
            if let Err(e) = worker.await {
                error!("poll worker terminated abnormally: {}", e);
            }
            info!("poll worker stopped");
        }
    }

    /// Current interval in milliseconds.
    pub fn interval_ms(&self) -> u64 {
        *self.interval_tx.borrow()
    }

    /// Retunes the interval, effective for the next scheduling decision.
    ///
    /// Values outside the configured bounds are rejected and leave the
    /// current interval untouched.
    pub fn set_interval_ms(&self, interval_ms: u64) -> Result<(), ConfigError> {
        if interval_ms < self.interval_min_ms || interval_ms > self.interval_max_ms {
            return Err(ConfigError::IntervalOutOfBounds {
                interval_ms,
                min_ms: self.interval_min_ms,
                max_ms: self.interval_max_ms,
            });
        }
        self.interval_tx.send_replace(interval_ms);
        Ok(())
    }

    /// Lower interval bound in milliseconds.
    pub fn min_interval_ms(&self) -> u64 {
        self.interval_min_ms
    }

    /// Upper interval bound in milliseconds.
    pub fn max_interval_ms(&self) -> u64 {
        self.interval_max_ms
    }

    /// Current worker lifecycle state.
    pub fn state(&self) -> PollState {
        *self.state_rx.borrow()
    }
}
