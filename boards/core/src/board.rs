//! Static deck description and key addressing types.

use std::fmt;

use crate::features::{DeckError, Result};

/// Key grid layout of the XL model
pub mod layout {
    pub const ROWS: usize = 4;
    pub const COLS: usize = 8;
    pub const KEY_COUNT: usize = ROWS * COLS;
    /// Width and height of a single key display in pixels
    pub const KEY_SIZE: u32 = 96;
}

/// Static information about a deck model for detection and CLI
#[derive(Debug, Clone, Copy)]
pub struct DeckInfo {
    pub name: &'static str,
    pub vendor_id: u16,
    pub product_id: u16,
    pub rows: usize,
    pub cols: usize,
    pub key_size: u32,
}

impl DeckInfo {
    pub const fn key_count(&self) -> usize {
        self.rows * self.cols
    }
}

/// Index of a physical key, counted left to right, top to bottom.
///
/// Always in `0..KEY_COUNT`; every constructor checks the bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyIndex(u8);

impl KeyIndex {
    pub fn new(key: usize) -> Result<Self> {
        if key < layout::KEY_COUNT {
            Ok(Self(key as u8))
        } else {
            Err(DeckError::KeyOutOfRange { key: key as i64 })
        }
    }

    /// Iterate every key in ascending order
    pub fn all() -> impl Iterator<Item = KeyIndex> {
        (0..layout::KEY_COUNT as u8).map(KeyIndex)
    }

    #[inline(always)]
    pub fn get(self) -> usize {
        self.0 as usize
    }

    #[inline(always)]
    pub fn as_u8(self) -> u8 {
        self.0
    }

    pub fn row(self) -> usize {
        self.get() / layout::COLS
    }

    pub fn col(self) -> usize {
        self.get() % layout::COLS
    }
}

impl TryFrom<i64> for KeyIndex {
    type Error = DeckError;

    fn try_from(key: i64) -> Result<Self> {
        usize::try_from(key)
            .map_err(|_| DeckError::KeyOutOfRange { key })
            .and_then(KeyIndex::new)
    }
}

impl From<KeyIndex> for usize {
    fn from(key: KeyIndex) -> Self {
        key.get()
    }
}

impl fmt::Display for KeyIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Physical state of a key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyState {
    Pressed,
    Released,
}

impl KeyState {
    pub fn from_pressed(pressed: bool) -> Self {
        if pressed {
            KeyState::Pressed
        } else {
            KeyState::Released
        }
    }

    pub fn is_pressed(self) -> bool {
        self == KeyState::Pressed
    }
}

impl fmt::Display for KeyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyState::Pressed => write!(f, "pressed"),
            KeyState::Released => write!(f, "released"),
        }
    }
}
