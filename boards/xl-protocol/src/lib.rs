//! HID protocol implementation for the Stream Deck XL.
//!
//! This crate provides the wire primitives used by the driver:
//! - Feature report payloads (brightness, logo reset) and identity reply parsing
//! - Splitting encoded key images into 1024 byte output reports
//! - Decoding 36 byte key state input reports and detecting edges
//!
//! ## Protocol Overview
//!
//! Commands are 32 byte feature reports on report id 3. Images are JPEG
//! streams sent as output reports on report id 2, each carrying an 8 byte
//! little endian header `02 07 key last len:u16 part:u16`.

pub mod abi;
pub mod buffer;
pub mod types;

pub use abi::*;
pub use buffer::ByteBuffer;
pub use types::*;

use deck_core::{layout, DeckInfo};

pub mod consts {
    pub const VENDOR_ID: u16 = 0x0FD9;
    pub const PRODUCT_ID: u16 = 0x006C;
}

/// Static deck info for detection
pub static INFO: DeckInfo = DeckInfo {
    name: "Stream Deck XL",
    vendor_id: consts::VENDOR_ID,
    product_id: consts::PRODUCT_ID,
    rows: layout::ROWS,
    cols: layout::COLS,
    key_size: layout::KEY_SIZE,
};
