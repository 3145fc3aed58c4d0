//! Event sink boundary
//!
//! The poll pipeline ends at an [`EventSink`]: whatever consumes the
//! translated batches — an evdev/uinput bridge, a recorder, a test
//! collector. [`ChannelSink`] is the shipped implementation and forwards
//! every event over a tokio channel so the consumer runs decoupled from
//! the polling cadence.

use tokio::sync::mpsc;
use tracing::error;

use crate::controller::{EventKind, PadEvent};

/// Consumer of translated pad events.
///
/// `emit` delivers one key or axis event; `sync` closes the batch and marks
/// the snapshot complete. Implementations must not act on a batch before
/// `sync` arrives.
pub trait EventSink: Send {
    fn emit(&mut self, kind: EventKind, code: u16, value: i32);
    fn sync(&mut self);
}

/// Sink that forwards events over a bounded tokio channel.
///
/// Sends never block the poll worker: a full or closed channel drops the
/// event and logs, the next cycle re-emits the full state anyway.
pub struct ChannelSink {
    tx: mpsc::Sender<PadEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<PadEvent>) -> Self {
        Self { tx }
    }

    fn forward(&self, event: PadEvent) {
        if let Err(e) = self.tx.try_send(event) {
            error!("failed to forward pad event: {}", e);
        }
    }
}

impl EventSink for ChannelSink {
    fn emit(&mut self, kind: EventKind, code: u16, value: i32) {
        let event = match kind {
            EventKind::Key => PadEvent::Key { code, value },
            EventKind::Axis => PadEvent::Axis { code, value },
        };
        self.forward(event);
    }

    fn sync(&mut self) {
        self.forward(PadEvent::Sync);
    }
}
