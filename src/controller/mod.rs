//! Controller subsystem for the GPIO-wired pad
//!
//! Implements the sample-to-event pipeline in three stages:
//!
//! 1. [`protocol`] - raw frame acquisition over the latch/clock/data lines
//! 2. [`translator`] - frame bits to key/axis event batches
//! 3. [`pad_handle`] - unified API and lifecycle management
//!
//! # Architecture
//!
//! ```text
//! Pad ──► PadProtocol ──► EventTranslator ──► EventSink
//!         (raw frames)    (event batches)
//! ```
//!
//! The pipeline runs on a single background poll worker; the pad has no
//! interrupt line, so the full state is re-sampled every interval.

pub mod pad_handle;
pub mod protocol;
pub mod translator;

pub use pad_handle::{PadError, PadHandle};
pub use protocol::{ControllerFrame, InitError, PadProtocol, SampleError};
pub use translator::{codes, ButtonMap, EventKind, EventTranslator, PadEvent, SLOT_COUNT};
