//! GPIO-polled SNES controller pipeline
//!
//! Samples a shift-register pad wired to three Raspberry Pi GPIO lines and
//! turns every raw 16-bit frame into a batch of key/axis events for an
//! [`sink::EventSink`]. The pipeline is one background poll worker:
//!
//! ```text
//! PollScheduler ──► PadProtocol.sample() ──► EventTranslator ──► EventSink
//! ```
//!
//! There is no process-wide state; one [`controller::PadHandle`] owns one
//! physical pad.

pub mod config;
pub mod controller;
pub mod gpio;
pub mod scheduler;
pub mod sink;
