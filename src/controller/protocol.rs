//! Shift-register read protocol for the pad
//!
//! The controller keeps its button state in an internal shift register.
//! A latch pulse makes it snapshot all buttons at once; every following
//! clock pulse shifts the next position onto the data line. One full read
//! is a latch pulse plus sixteen clock cycles and yields a 16-bit frame.

use std::thread;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::gpio::{Direction, GpioError, GpioLine};

// Controller settle times as (lower, upper) tolerated bounds in µs.
// The pad needs at least the lower bound to react; anything up to the
// upper bound is still fine for the part.
const LATCH_HOLD_US: (u64, u64) = (12, 18);
const POST_LATCH_US: (u64, u64) = (6, 12);
const CLOCK_HALF_US: (u64, u64) = (6, 12);

/// Waits out a controller settle window.
///
/// Sleeps the lower bound; scheduling jitter supplies slack that stays
/// well inside what the part tolerates, so no exact delay is assumed.
fn settle(bounds: (u64, u64)) {
    thread::sleep(Duration::from_micros(bounds.0));
}

/// One complete 16-bit sample.
///
/// Bit *i* holds the *i*-th shifted position, already converted from the
/// active-low line level: bit set means pressed. Positions past the wired
/// buttons always read unpressed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControllerFrame(u16);

impl ControllerFrame {
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Whether the button at the given shift position is pressed.
    pub const fn pressed(self, slot: u8) -> bool {
        self.0 & (1 << slot) != 0
    }
}

// Line setup errors, fatal to initialization
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("failed to configure {line} line: {source}")]
    LineSetup {
        line: &'static str,
        source: GpioError,
    },

    #[error("failed to drive idle line state: {0}")]
    Idle(GpioError),
}

// Per-cycle sampling errors, transient
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("line fault during sample: {0}")]
    Gpio(#[from] GpioError),
}

/// Bit-banging engine over the three pad lines.
///
/// Owns latch and clock as outputs and data as input for its whole
/// lifetime; nothing else may toggle these lines.
pub struct PadProtocol<L: GpioLine> {
    clock: L,
    latch: L,
    data: L,
}

impl<L: GpioLine> PadProtocol<L> {
    /// Configures the three lines and drives the idle state
    /// (clock high, latch low).
    ///
    /// If any step fails, lines that were already configured as outputs are
    /// driven low before the error propagates, so a half-initialized pad
    /// never keeps a line asserted.
    pub fn initialize(mut clock: L, mut latch: L, mut data: L) -> Result<Self, InitError> {
        debug!("configuring pad lines");

        if let Err(source) = clock.set_direction(Direction::Output) {
            return Err(InitError::LineSetup {
                line: "clock",
                source,
            });
        }
        if let Err(source) = latch.set_direction(Direction::Output) {
            let _ = clock.write(false);
            return Err(InitError::LineSetup {
                line: "latch",
                source,
            });
        }
        if let Err(source) = data.set_direction(Direction::Input) {
            let _ = clock.write(false);
            let _ = latch.write(false);
            return Err(InitError::LineSetup {
                line: "data",
                source,
            });
        }

        let mut protocol = Self { clock, latch, data };
        if let Err(source) = protocol.idle_lines() {
            protocol.quiesce();
            return Err(InitError::Idle(source));
        }

        debug!("pad lines configured, idle state driven");
        Ok(protocol)
    }

    /// Reads one frame from the controller.
    ///
    /// On a line fault the idle state is restored on a best-effort basis
    /// and the cycle reports a transient [`SampleError`]; the caller simply
    /// gets no frame this cycle.
    pub fn sample(&mut self) -> Result<ControllerFrame, SampleError> {
        match self.read_frame() {
            Ok(frame) => Ok(frame),
            Err(e) => {
                // Re-assert the idle state per line; a stuck line must not
                // keep its sibling asserted.
                let clock_ok = self.clock.write(true).is_ok();
                let latch_ok = self.latch.write(false).is_ok();
                if !clock_ok || !latch_ok {
                    warn!("could not fully restore idle line state after fault");
                }
                Err(e)
            }
        }
    }

    fn read_frame(&mut self) -> Result<ControllerFrame, SampleError> {
        // Latch pulse: the pad snapshots all buttons into its register.
        self.latch.write(true)?;
        settle(LATCH_HOLD_US);
        self.latch.write(false)?;
        settle(POST_LATCH_US);

        // The first position is already on the data line; each clock pulse
        // shifts out the next one.
        let mut raw = 0u16;
        for slot in 0..16u8 {
            if !self.data.read()? {
                // active-low: a low level is a pressed button
                trace!("position {} reads pressed", slot);
                raw |= 1 << slot;
            }

            self.clock.write(false)?;
            settle(CLOCK_HALF_US);
            self.clock.write(true)?;
            settle(CLOCK_HALF_US);
        }

        Ok(ControllerFrame::from_raw(raw))
    }

    /// Drives both outputs low, the safe state for an unattended pad.
    /// The data line stays an input.
    pub fn shutdown(&mut self) {
        debug!("quiescing pad lines");
        self.quiesce();
    }

    // idle/reset state between samples: clock high, latch low
    fn idle_lines(&mut self) -> Result<(), GpioError> {
        self.clock.write(true)?;
        self.latch.write(false)?;
        Ok(())
    }

    fn quiesce(&mut self) {
        let _ = self.clock.write(false);
        let _ = self.latch.write(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum Op {
        Dir(&'static str, Direction),
        Write(&'static str, bool),
        Read(&'static str, bool),
    }

    /// Scripted line sharing one journal with its siblings so a test can
    /// check the choreography across all three lines.
    struct ScriptedLine {
        name: &'static str,
        journal: Arc<Mutex<Vec<Op>>>,
        read_level: bool,
        fail_direction: bool,
        fail_write_after: Option<usize>,
        writes_seen: usize,
    }

    impl ScriptedLine {
        fn new(name: &'static str, journal: Arc<Mutex<Vec<Op>>>) -> Self {
            Self {
                name,
                journal,
                read_level: true,
                fail_direction: false,
                fail_write_after: None,
                writes_seen: 0,
            }
        }

        fn reading(mut self, level: bool) -> Self {
            self.read_level = level;
            self
        }

        fn failing_direction(mut self) -> Self {
            self.fail_direction = true;
            self
        }

        fn failing_write_after(mut self, writes: usize) -> Self {
            self.fail_write_after = Some(writes);
            self
        }
    }

    impl GpioLine for ScriptedLine {
        fn set_direction(&mut self, direction: Direction) -> Result<(), GpioError> {
            if self.fail_direction {
                return Err(GpioError::Direction(format!("{} line stuck", self.name)));
            }
            self.journal
                .lock()
                .unwrap()
                .push(Op::Dir(self.name, direction));
            Ok(())
        }

        fn write(&mut self, level: bool) -> Result<(), GpioError> {
            if let Some(limit) = self.fail_write_after {
                if self.writes_seen >= limit {
                    return Err(GpioError::Write(format!("{} line stuck", self.name)));
                }
            }
            self.writes_seen += 1;
            self.journal
                .lock()
                .unwrap()
                .push(Op::Write(self.name, level));
            Ok(())
        }

        fn read(&mut self) -> Result<bool, GpioError> {
            self.journal
                .lock()
                .unwrap()
                .push(Op::Read(self.name, self.read_level));
            Ok(self.read_level)
        }
    }

    fn lines() -> (ScriptedLine, ScriptedLine, ScriptedLine, Arc<Mutex<Vec<Op>>>) {
        let journal = Arc::new(Mutex::new(Vec::new()));
        (
            ScriptedLine::new("clock", journal.clone()),
            ScriptedLine::new("latch", journal.clone()),
            ScriptedLine::new("data", journal.clone()),
            journal,
        )
    }

    #[test]
    fn initialize_configures_directions_and_idle_state() {
        let (clock, latch, data, journal) = lines();
        let _protocol = PadProtocol::initialize(clock, latch, data).unwrap();

        let ops = journal.lock().unwrap().clone();
        assert_eq!(
            ops,
            vec![
                Op::Dir("clock", Direction::Output),
                Op::Dir("latch", Direction::Output),
                Op::Dir("data", Direction::Input),
                Op::Write("clock", true),
                Op::Write("latch", false),
            ]
        );
    }

    #[test]
    fn failed_initialization_quiesces_configured_outputs() {
        let (clock, latch, data, journal) = lines();
        let result = PadProtocol::initialize(clock, latch, data.failing_direction());

        assert!(matches!(
            result.err(),
            Some(InitError::LineSetup { line: "data", .. })
        ));

        // Both outputs were already configured and must end up driven low.
        let ops = journal.lock().unwrap().clone();
        assert_eq!(
            ops,
            vec![
                Op::Dir("clock", Direction::Output),
                Op::Dir("latch", Direction::Output),
                Op::Write("clock", false),
                Op::Write("latch", false),
            ]
        );
    }

    #[test]
    fn grounded_data_line_reads_all_pressed() {
        let (clock, latch, data, _journal) = lines();
        let mut protocol = PadProtocol::initialize(clock, latch, data.reading(false)).unwrap();
        assert_eq!(protocol.sample().unwrap().raw(), 0xFFFF);
    }

    #[test]
    fn high_data_line_reads_all_released() {
        let (clock, latch, data, _journal) = lines();
        let mut protocol = PadProtocol::initialize(clock, latch, data).unwrap();
        assert_eq!(protocol.sample().unwrap().raw(), 0x0000);
    }

    #[test]
    fn sample_runs_latch_pulse_then_sixteen_clock_pairs() {
        let (clock, latch, data, journal) = lines();
        let mut protocol = PadProtocol::initialize(clock, latch, data).unwrap();
        journal.lock().unwrap().clear();

        protocol.sample().unwrap();

        let mut expected = VecDeque::from(vec![
            Op::Write("latch", true),
            Op::Write("latch", false),
        ]);
        for _ in 0..16 {
            expected.push_back(Op::Read("data", true));
            expected.push_back(Op::Write("clock", false));
            expected.push_back(Op::Write("clock", true));
        }

        let ops = journal.lock().unwrap().clone();
        assert_eq!(ops, Vec::from(expected));
    }

    #[test]
    fn line_fault_mid_sample_restores_idle_state() {
        let (clock, latch, data, journal) = lines();
        // One init write plus six sample writes succeed, then the clock
        // sticks partway through the frame.
        let clock = clock.failing_write_after(7);
        let mut protocol = PadProtocol::initialize(clock, latch, data).unwrap();
        journal.lock().unwrap().clear();

        assert!(matches!(protocol.sample(), Err(SampleError::Gpio(_))));

        // Last successful writes must re-assert the idle state: the latch
        // is low and the clock was never left mid-pulse.
        let ops = journal.lock().unwrap().clone();
        let last_latch = ops.iter().rev().find_map(|op| match op {
            Op::Write("latch", level) => Some(*level),
            _ => None,
        });
        assert_eq!(last_latch, Some(false));
    }

    #[test]
    fn shutdown_drives_both_outputs_low() {
        let (clock, latch, data, journal) = lines();
        let mut protocol = PadProtocol::initialize(clock, latch, data).unwrap();
        journal.lock().unwrap().clear();

        protocol.shutdown();

        let ops = journal.lock().unwrap().clone();
        assert_eq!(
            ops,
            vec![Op::Write("clock", false), Op::Write("latch", false)]
        );
    }

    #[test]
    fn frame_reports_individual_positions() {
        let frame = ControllerFrame::from_raw(0b0100_0000_0101);
        assert!(frame.pressed(0));
        assert!(!frame.pressed(1));
        assert!(frame.pressed(2));
        assert!(frame.pressed(10));
        assert!(!frame.pressed(15));
    }
}
