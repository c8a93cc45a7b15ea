//! Error type and the capability traits a deck driver is assembled from.
//!
//! The driver only talks to the outside world through these traits, so a
//! scripted transport or a fake codec can stand in for hardware in tests.

use std::time::Duration;

use image::{Rgb, RgbImage};

use crate::{KeyIndex, KeyState};

/// A 96x96 RGB key image
pub type Raster = RgbImage;

/// 24-bit sRGB color
pub type Color = Rgb<u8>;

/// Errors that can occur during deck operations
#[derive(Debug, thiserror::Error)]
pub enum DeckError {
    /// Device was not found
    #[error("device not found")]
    DeviceNotFound,

    /// Operation attempted before a successful connect
    #[error("device is not connected")]
    NotConnected,

    /// Key index outside of the key grid
    #[error("key {key} is out of range, expected 0..32")]
    KeyOutOfRange { key: i64 },

    /// Brightness outside of 0..=100
    #[error("brightness {0} is out of range, expected 0..=100")]
    BrightnessOutOfRange(i64),

    /// Transport reported a failure without a hid error
    #[error("transport error: {0}")]
    Transport(String),

    /// Invalid media data
    #[error("invalid media: {0}")]
    InvalidMedia(&'static str),

    /// Missing collaborator for the requested operation
    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    /// Image encoding or decoding failed
    #[error("codec error: {0}")]
    Codec(#[from] image::ImageError),

    /// HID communication error
    #[error("hid error: {0}")]
    Hid(#[from] hidapi::HidError),

    /// Generic IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DeckError>;

/// Raw HID channel to a single device.
///
/// Methods take `&self`: implementations synchronise internally. Input reads
/// may run concurrently with writes.
pub trait HidTransport: Send + Sync {
    /// Open the device. Opening an open device is a no-op.
    fn open(&self) -> Result<()>;
    fn close(&self);
    fn is_open(&self) -> bool;
    /// Send an output report
    fn write(&self, report_id: u8, payload: &[u8]) -> Result<usize>;
    /// Send a feature report
    fn send_feature(&self, report_id: u8, payload: &[u8]) -> Result<()>;
    /// Read a feature report into `buf`, returning the number of bytes read
    fn read_feature(&self, report_id: u8, buf: &mut [u8]) -> Result<usize>;
    /// Blocking read of an input report. Returns 0 when the timeout expires.
    fn read_input(&self, buf: &mut [u8], timeout: Duration) -> Result<usize>;
}

/// Receiver of key edge events
pub trait KeyListener: Send + Sync {
    fn key_state_changed(&self, key: KeyIndex, state: KeyState);
}

impl<F> KeyListener for F
where
    F: Fn(KeyIndex, KeyState) + Send + Sync,
{
    fn key_state_changed(&self, key: KeyIndex, state: KeyState) {
        self(key, state)
    }
}

/// Turns a key raster into the byte stream the device displays
pub trait ImageCodec: Send + Sync {
    fn encode(&self, raster: &Raster) -> Result<Vec<u8>>;
}

/// Draws a text label onto a key raster
pub trait TextRenderer: Send + Sync {
    fn draw_text(&self, raster: &mut Raster, text: &str, color: Color) -> Result<()>;
}

/// Looping sequence of key rasters paced by frame delays
pub trait FrameSource {
    /// Has the current frame's delay elapsed since the last advance?
    fn tick(&self) -> bool;
    /// Move to the next frame, wrapping at the end, and return it
    fn advance(&mut self) -> &Raster;
}
