//! Core traits and types for the Stream Deck XL driver.
//!
//! This crate provides:
//! - Capability traits (`HidTransport`, `KeyListener`, `ImageCodec`, ...) the driver is built on
//! - Key addressing (`KeyIndex`, `KeyState`) and the static `DeckInfo`
//! - The shared `DeckError` type

mod board;
pub mod color;
mod features;

pub use board::{layout, DeckInfo, KeyIndex, KeyState};
pub use features::{
    Color, DeckError, FrameSource, HidTransport, ImageCodec, KeyListener, Raster, Result,
    TextRenderer,
};
