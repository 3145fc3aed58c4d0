//! Frame translation into input events
//!
//! Turns one raw [`ControllerFrame`] into the batch of key and axis events
//! a sink consumes. Translation is stateless: every cycle re-emits the full
//! pad state and ends with a sync marker, so a consumer always works from a
//! complete snapshot and a dropped cycle costs nothing.

use super::protocol::ControllerFrame;

/// Event codes the pad reports, mirroring the Linux input subsystem
/// constants so a downstream sink can feed evdev without re-mapping.
pub mod codes {
    pub const BTN_B: u16 = 0x131;
    pub const BTN_Y: u16 = 0x134;
    pub const BTN_TL: u16 = 0x136;
    pub const BTN_TR: u16 = 0x137;
    pub const BTN_SELECT: u16 = 0x13a;
    pub const BTN_START: u16 = 0x13b;
    pub const ABS_HAT0X: u16 = 0x10;
    pub const ABS_HAT0Y: u16 = 0x11;
}

/// Class of an emitted event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    Key,
    Axis,
}

/// One entry of a translated batch.
///
/// `Sync` terminates every batch and marks it as one complete, internally
/// consistent snapshot; consumers must not act on a partial prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PadEvent {
    Key { code: u16, value: i32 },
    Axis { code: u16, value: i32 },
    Sync,
}

/// Number of logical button slots on the pad.
pub const SLOT_COUNT: usize = 11;

/// Fixed slot-to-code table, immutable once constructed.
///
/// Slot layout: 0=B, 1=Select, 2=Start, 3=Up, 4=Down, 5=Left, 6=Right,
/// 7=Y, 8=second B, 9=TL, 10=TR. Slots 3..=6 form the two d-pad axes and
/// carry axis codes; the rest are plain keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ButtonMap {
    codes: [u16; SLOT_COUNT],
}

impl ButtonMap {
    pub const fn new(codes: [u16; SLOT_COUNT]) -> Self {
        Self { codes }
    }

    /// The stock SNES table.
    pub const fn snes() -> Self {
        Self::new([
            codes::BTN_B,      // 0: B
            codes::BTN_SELECT, // 1: Select
            codes::BTN_START,  // 2: Start
            codes::ABS_HAT0Y,  // 3: d-pad up
            codes::ABS_HAT0Y,  // 4: d-pad down
            codes::ABS_HAT0X,  // 5: d-pad left
            codes::ABS_HAT0X,  // 6: d-pad right
            codes::BTN_Y,      // 7: Y
            codes::BTN_B,      // 8: reports B a second time (see DESIGN.md)
            codes::BTN_TL,     // 9: left shoulder
            codes::BTN_TR,     // 10: right shoulder
        ])
    }

    pub const fn code(&self, slot: u8) -> u16 {
        self.codes[slot as usize]
    }
}

impl Default for ButtonMap {
    fn default() -> Self {
        Self::snes()
    }
}

/// Stateless frame-to-batch translator.
pub struct EventTranslator {
    map: ButtonMap,
}

impl EventTranslator {
    pub fn new(map: ButtonMap) -> Self {
        Self { map }
    }

    /// Translates one frame into an ordered event batch.
    ///
    /// Emits the seven key slots and the two d-pad axis decisions in slot
    /// order, then exactly one [`PadEvent::Sync`]. No comparison against a
    /// previous frame happens anywhere; held buttons re-emit value 1 every
    /// cycle.
    pub fn translate(&self, frame: ControllerFrame) -> Vec<PadEvent> {
        let mut batch = Vec::with_capacity(10);

        for slot in [0u8, 1, 2] {
            batch.push(self.key_event(frame, slot));
        }
        batch.push(self.axis_event(frame, 3, 4)); // vertical: up beats down
        batch.push(self.axis_event(frame, 5, 6)); // horizontal: left beats right
        for slot in [7u8, 8, 9, 10] {
            batch.push(self.key_event(frame, slot));
        }

        batch.push(PadEvent::Sync);
        batch
    }

    fn key_event(&self, frame: ControllerFrame, slot: u8) -> PadEvent {
        PadEvent::Key {
            code: self.map.code(slot),
            value: frame.pressed(slot) as i32,
        }
    }

    /// Resolves one axis from its two direction slots.
    ///
    /// When the negative direction is held the positive slot is not
    /// evaluated at all this cycle; both directions asserted at once
    /// (a worn or mashed d-pad) resolve to the negative side as a single
    /// decision.
    fn axis_event(&self, frame: ControllerFrame, negative_slot: u8, positive_slot: u8) -> PadEvent {
        if frame.pressed(negative_slot) {
            PadEvent::Axis {
                code: self.map.code(negative_slot),
                value: -1,
            }
        } else {
            PadEvent::Axis {
                code: self.map.code(positive_slot),
                value: frame.pressed(positive_slot) as i32,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translate(raw: u16) -> Vec<PadEvent> {
        EventTranslator::new(ButtonMap::snes()).translate(ControllerFrame::from_raw(raw))
    }

    fn axis_value(batch: &[PadEvent], code: u16) -> i32 {
        batch
            .iter()
            .find_map(|event| match event {
                PadEvent::Axis { code: c, value } if *c == code => Some(*value),
                _ => None,
            })
            .expect("axis missing from batch")
    }

    #[test]
    fn empty_frame_releases_everything() {
        let batch = translate(0x0000);

        assert_eq!(batch.len(), 10);
        let keys: Vec<_> = batch
            .iter()
            .filter_map(|event| match event {
                PadEvent::Key { value, .. } => Some(*value),
                _ => None,
            })
            .collect();
        assert_eq!(keys, vec![0; 7]);
        assert_eq!(axis_value(&batch, codes::ABS_HAT0X), 0);
        assert_eq!(axis_value(&batch, codes::ABS_HAT0Y), 0);
        assert_eq!(batch.last(), Some(&PadEvent::Sync));
    }

    #[test]
    fn every_batch_ends_with_exactly_one_sync() {
        for raw in [0x0000u16, 0x0FFF, 0b0000_1010_0101, 0xFFFF] {
            let batch = translate(raw);
            let syncs = batch.iter().filter(|e| **e == PadEvent::Sync).count();
            assert_eq!(syncs, 1, "frame {raw:#06x}");
            assert_eq!(batch.last(), Some(&PadEvent::Sync), "frame {raw:#06x}");
        }
    }

    #[test]
    fn batch_follows_slot_order() {
        let batch = translate(0x0000);
        let expected = vec![
            PadEvent::Key { code: codes::BTN_B, value: 0 },
            PadEvent::Key { code: codes::BTN_SELECT, value: 0 },
            PadEvent::Key { code: codes::BTN_START, value: 0 },
            PadEvent::Axis { code: codes::ABS_HAT0Y, value: 0 },
            PadEvent::Axis { code: codes::ABS_HAT0X, value: 0 },
            PadEvent::Key { code: codes::BTN_Y, value: 0 },
            PadEvent::Key { code: codes::BTN_B, value: 0 },
            PadEvent::Key { code: codes::BTN_TL, value: 0 },
            PadEvent::Key { code: codes::BTN_TR, value: 0 },
            PadEvent::Sync,
        ];
        assert_eq!(batch, expected);
    }

    #[test]
    fn up_beats_down_when_both_are_held() {
        let batch = translate((1 << 3) | (1 << 4));
        assert_eq!(axis_value(&batch, codes::ABS_HAT0Y), -1);

        let y_events = batch
            .iter()
            .filter(|e| matches!(e, PadEvent::Axis { code, .. } if *code == codes::ABS_HAT0Y))
            .count();
        assert_eq!(y_events, 1);
    }

    #[test]
    fn left_beats_right_when_both_are_held() {
        let batch = translate((1 << 5) | (1 << 6));
        assert_eq!(axis_value(&batch, codes::ABS_HAT0X), -1);
    }

    #[test]
    fn lone_directions_map_to_signed_axis_values() {
        assert_eq!(axis_value(&translate(1 << 3), codes::ABS_HAT0Y), -1);
        assert_eq!(axis_value(&translate(1 << 4), codes::ABS_HAT0Y), 1);
        assert_eq!(axis_value(&translate(1 << 5), codes::ABS_HAT0X), -1);

        let batch = translate(1 << 6);
        assert_eq!(axis_value(&batch, codes::ABS_HAT0X), 1);
        assert_eq!(axis_value(&batch, codes::ABS_HAT0Y), 0);
        assert!(batch.iter().all(|event| match event {
            PadEvent::Key { value, .. } => *value == 0,
            _ => true,
        }));
    }

    #[test]
    fn held_buttons_re_emit_every_cycle() {
        let translator = EventTranslator::new(ButtonMap::snes());
        let frame = ControllerFrame::from_raw(1 << 0);

        // Stateless by design: the same frame produces the same batch,
        // with no edge suppression between calls.
        let first = translator.translate(frame);
        let second = translator.translate(frame);
        assert_eq!(first, second);
        assert_eq!(
            first[0],
            PadEvent::Key { code: codes::BTN_B, value: 1 }
        );
    }

    #[test]
    fn slot_eight_shares_the_b_code() {
        let batch = translate(1 << 8);
        let pressed: Vec<_> = batch
            .iter()
            .filter_map(|event| match event {
                PadEvent::Key { code, value: 1 } => Some(*code),
                _ => None,
            })
            .collect();
        assert_eq!(pressed, vec![codes::BTN_B]);
        // Slot 0 stays released even though it carries the same code.
        assert_eq!(
            batch[0],
            PadEvent::Key { code: codes::BTN_B, value: 0 }
        );
    }

    #[test]
    fn bits_past_the_wired_buttons_are_ignored() {
        let batch = translate(0xF800); // bits 11..=15
        assert_eq!(batch, translate(0x0000));
    }
}
