//! Digital line access for the pad wiring
//!
//! The protocol engine only needs three single-bit lines: two outputs it
//! drives (latch, clock) and one input it samples (data). [`GpioLine`]
//! captures exactly that capability so the engine stays independent of the
//! concrete pin backend. [`RppalLine`] is the production implementation on
//! top of the Raspberry Pi GPIO header.

use rppal::gpio::{Gpio, IoPin, Level, Mode};
use tracing::debug;

/// Direction a line can be configured for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

// Line errors
#[derive(Debug, thiserror::Error)]
pub enum GpioError {
    #[error("failed to acquire line {0}: {1}")]
    Acquire(u8, String),

    #[error("failed to reconfigure line direction: {0}")]
    Direction(String),

    #[error("failed to drive line: {0}")]
    Write(String),

    #[error("failed to read line: {0}")]
    Read(String),
}

/// Capability for one digital line: configure its direction, drive it,
/// read it. `true` is the high level.
pub trait GpioLine: Send {
    fn set_direction(&mut self, direction: Direction) -> Result<(), GpioError>;
    fn write(&mut self, level: bool) -> Result<(), GpioError>;
    fn read(&mut self) -> Result<bool, GpioError>;
}

/// A BCM-numbered pin on the Raspberry Pi header.
///
/// Wraps an [`rppal::gpio::IoPin`] so the same line can be flipped between
/// input and output. Level access on an acquired pin cannot fail on this
/// hardware, so only acquisition reports an error.
pub struct RppalLine {
    pin: IoPin,
    bcm: u8,
}

impl RppalLine {
    /// Takes ownership of the given BCM pin, initially configured as input.
    pub fn acquire(gpio: &Gpio, bcm: u8) -> Result<Self, GpioError> {
        let pin = gpio
            .get(bcm)
            .map_err(|e| GpioError::Acquire(bcm, e.to_string()))?
            .into_io(Mode::Input);

        debug!("acquired GPIO line {}", bcm);
        Ok(Self { pin, bcm })
    }

    pub fn bcm(&self) -> u8 {
        self.bcm
    }
}

impl GpioLine for RppalLine {
    fn set_direction(&mut self, direction: Direction) -> Result<(), GpioError> {
        let mode = match direction {
            Direction::Input => Mode::Input,
            Direction::Output => Mode::Output,
        };
        self.pin.set_mode(mode);
        debug!("GPIO line {} set to {:?}", self.bcm, direction);
        Ok(())
    }

    fn write(&mut self, level: bool) -> Result<(), GpioError> {
        self.pin.write(if level { Level::High } else { Level::Low });
        Ok(())
    }

    fn read(&mut self) -> Result<bool, GpioError> {
        Ok(self.pin.read() == Level::High)
    }
}
