//! Pad Handle - unified lifecycle API for one polled controller
//!
//! Wires protocol, translator and sink into the scheduler's poll callback
//! and manages the lifecycle of the whole pipeline. One handle owns one
//! physical pad; multiple pads are simply multiple handles.

use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::gpio::GpioLine;
use crate::scheduler::{ConfigError, PollScheduler, PollSettings, PollState, SchedulerError};
use crate::sink::EventSink;

use super::protocol::{PadProtocol, SampleError};
use super::translator::{EventKind, EventTranslator, PadEvent};

// Pad lifecycle errors
#[derive(Debug, thiserror::Error)]
pub enum PadError {
    #[error("poll configuration rejected: {0}")]
    Config(#[from] ConfigError),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}

// Per-cycle pipeline errors; logged by the scheduler, never fatal
#[derive(Debug, thiserror::Error)]
enum CycleError {
    #[error("{0}")]
    Sample(#[from] SampleError),

    #[error("pad protocol mutex poisoned")]
    Poisoned,
}

/// Handle for one polled pad.
///
/// Spawning starts the poll worker immediately; the handle then exposes the
/// runtime tuning surface (current interval plus its read-only bounds) and
/// the stop path. The protocol is shared with the poll callback behind a
/// mutex that is only touched from the handle side after the worker has
/// drained, so polling itself never contends on it.
pub struct PadHandle<L: GpioLine + 'static> {
    scheduler: PollScheduler,
    protocol: Arc<Mutex<PadProtocol<L>>>,
}

impl<L: GpioLine + 'static> PadHandle<L> {
    /// Starts polling an initialized pad.
    ///
    /// Every cycle samples one frame, translates it and feeds the sink; a
    /// failed sample produces no events at all for that cycle (no partial
    /// batch, no sync) and the schedule carries on.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<S>(
        protocol: PadProtocol<L>,
        translator: EventTranslator,
        mut sink: S,
        settings: PollSettings,
    ) -> Result<Self, PadError>
    where
        S: EventSink + 'static,
    {
        info!("starting pad pipeline with settings: {:?}", settings);

        let mut scheduler = PollScheduler::new(settings)?;
        let protocol = Arc::new(Mutex::new(protocol));

        let shared = protocol.clone();
        scheduler.start(move || -> Result<(), CycleError> {
            let frame = {
                let mut protocol = shared.lock().map_err(|_| CycleError::Poisoned)?;
                protocol.sample()?
            };
            debug!("sampled frame {:#06x}", frame.raw());

            for event in translator.translate(frame) {
                match event {
                    PadEvent::Key { code, value } => sink.emit(EventKind::Key, code, value),
                    PadEvent::Axis { code, value } => sink.emit(EventKind::Axis, code, value),
                    PadEvent::Sync => sink.sync(),
                }
            }
            Ok(())
        })?;

        info!("pad pipeline running");
        Ok(Self {
            scheduler,
            protocol,
        })
    }

    /// Stops polling and quiesces the pad lines.
    ///
    /// Waits for an in-flight cycle to finish; once this returns no further
    /// events reach the sink and both output lines are driven low.
    pub async fn stop(&mut self) {
        self.scheduler.stop().await;

        // The worker is drained, the lock is free by construction.
        match self.protocol.lock() {
            Ok(mut protocol) => protocol.shutdown(),
            Err(poisoned) => {
                warn!("pad protocol mutex poisoned, quiescing anyway");
                poisoned.into_inner().shutdown();
            }
        }
        info!("pad pipeline stopped");
    }

    /// Current poll interval in milliseconds.
    pub fn interval_ms(&self) -> u64 {
        self.scheduler.interval_ms()
    }

    /// Retunes the poll interval; rejected outside the configured bounds
    /// with the current interval left unchanged.
    pub fn set_interval_ms(&self, interval_ms: u64) -> Result<(), ConfigError> {
        self.scheduler.set_interval_ms(interval_ms)
    }

    /// Read-only lower interval bound.
    pub fn min_interval_ms(&self) -> u64 {
        self.scheduler.min_interval_ms()
    }

    /// Read-only upper interval bound.
    pub fn max_interval_ms(&self) -> u64 {
        self.scheduler.max_interval_ms()
    }

    /// Lifecycle state of the poll worker.
    pub fn state(&self) -> PollState {
        self.scheduler.state()
    }
}
