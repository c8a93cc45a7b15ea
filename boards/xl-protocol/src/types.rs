use std::fmt;

use deck_core::{layout::KEY_COUNT, KeyIndex, KeyState};

use crate::abi::{command, report, MAX_PACKET_SIZE, PACKET_HEADER_LEN};

/// Length of a key state input report
pub const INPUT_REPORT_LEN: usize = KEY_COUNT + KEY_STATE_OFFSET;
/// Offset of the first key byte in an input report
const KEY_STATE_OFFSET: usize = 4;

/// Borrowed view over a single image output report
#[derive(Clone, Copy, Debug)]
pub struct ImagePacket<'a> {
    raw: &'a [u8],
}

impl<'a> ImagePacket<'a> {
    /// Parse a full 1024 byte image packet, returning `None` for anything else
    pub fn parse(raw: &'a [u8]) -> Option<Self> {
        let valid = raw.len() == MAX_PACKET_SIZE
            && raw[0] == report::IMAGE
            && raw[1] == command::IMAGE_UPLOAD
            && (raw[3] == 0 || raw[3] == 1);
        let this = Self { raw };
        (valid && PACKET_HEADER_LEN + this.body_len() as usize <= MAX_PACKET_SIZE).then_some(this)
    }

    pub fn key(&self) -> u8 {
        self.raw[2]
    }

    pub fn is_last(&self) -> bool {
        self.raw[3] == 1
    }

    pub fn body_len(&self) -> u16 {
        u16::from_le_bytes([self.raw[4], self.raw[5]])
    }

    pub fn part(&self) -> u16 {
        u16::from_le_bytes([self.raw[6], self.raw[7]])
    }

    pub fn payload(&self) -> &'a [u8] {
        &self.raw[PACKET_HEADER_LEN..PACKET_HEADER_LEN + self.body_len() as usize]
    }
}

/// Snapshot of all key states decoded from an input report.
///
/// Equality only compares key states, not validity.
#[derive(Clone, Copy)]
pub struct KeyStateFrame {
    pressed: [bool; KEY_COUNT],
    invalid: bool,
}

impl KeyStateFrame {
    /// Decode a raw input report. Reports with a zero tag or fewer than 36
    /// bytes are invalid.
    pub fn parse(raw: &[u8]) -> Self {
        let mut pressed = [false; KEY_COUNT];
        if raw.len() < INPUT_REPORT_LEN {
            return Self {
                pressed,
                invalid: true,
            };
        }
        for (i, state) in pressed.iter_mut().enumerate() {
            *state = raw[i + KEY_STATE_OFFSET] == 1;
        }
        Self {
            pressed,
            invalid: raw[0] == 0,
        }
    }

    /// Every key released
    pub fn released() -> Self {
        Self {
            pressed: [false; KEY_COUNT],
            invalid: false,
        }
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    pub fn state(&self, key: KeyIndex) -> KeyState {
        KeyState::from_pressed(self.pressed[key.get()])
    }

    pub fn pressed_keys(&self) -> impl Iterator<Item = KeyIndex> + '_ {
        KeyIndex::all().filter(|k| self.pressed[k.get()])
    }
}

impl PartialEq for KeyStateFrame {
    fn eq(&self, other: &Self) -> bool {
        self.pressed == other.pressed
    }
}

impl Eq for KeyStateFrame {}

impl fmt::Debug for KeyStateFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyStateFrame[")?;
        for (i, pressed) in self.pressed.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{i}:{}", if *pressed { "down" } else { "up" })?;
        }
        if self.invalid {
            f.write_str(" invalid")?;
        }
        f.write_str("]")
    }
}

/// Edge detector over consecutive valid frames
#[derive(Debug)]
pub struct KeyTracker {
    prev: KeyStateFrame,
}

impl Default for KeyTracker {
    fn default() -> Self {
        Self {
            prev: KeyStateFrame::released(),
        }
    }
}

impl KeyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last accepted frame
    pub fn current(&self) -> &KeyStateFrame {
        &self.prev
    }

    /// Diff `frame` against the last valid frame, returning the changed keys in
    /// ascending order. Invalid frames are dropped without touching the state.
    pub fn update(&mut self, frame: KeyStateFrame) -> Vec<(KeyIndex, KeyState)> {
        if frame.is_invalid() || frame == self.prev {
            return Vec::new();
        }
        let edges = KeyIndex::all()
            .filter(|&k| frame.pressed[k.get()] != self.prev.pressed[k.get()])
            .map(|k| (k, frame.state(k)))
            .collect();
        self.prev = frame;
        edges
    }
}
