//! High level hidapi abstraction for Stream Deck XL key displays and key events

use std::sync::Arc;

use deck_core::color::{text_color_for, BLACK};
use deck_core::{
    layout, Color, DeckError, DeckInfo, FrameSource, HidTransport, ImageCodec, KeyIndex,
    KeyListener, Raster, Result, TextRenderer,
};
use parking_lot::{Mutex, MutexGuard};
use streamdeck_xl_protocol::{abi, report, ByteBuffer, COMMAND_LEN, INFO};
use tracing::{debug, warn};

pub mod codec;
pub mod discovery;
pub mod gif;
pub mod hid;
pub mod imaging;
mod pump;

pub use codec::JpegCodec;
pub use discovery::{find_by_serial, find_first, list_devices, DeckListing};
pub use gif::Gif;
pub use hid::HidapiTransport;
pub use imaging::FontRenderer;
pub use pump::{ListenerId, READ_TIMEOUT};

use pump::Pump;

/// High level abstraction for managing a Stream Deck XL
pub struct StreamDeckXl {
    /// Every device command goes through this lock, held across whole uploads
    device: Mutex<Arc<dyn HidTransport>>,
    pump: Pump,
    codec: Box<dyn ImageCodec>,
    text: Option<Box<dyn TextRenderer>>,
}

impl StreamDeckXl {
    /// Wrap a transport. The device stays closed until [`Self::connect`].
    pub fn new(transport: Arc<dyn HidTransport>) -> Self {
        Self {
            pump: Pump::new(Arc::clone(&transport)),
            device: Mutex::new(transport),
            codec: Box::new(JpegCodec::default()),
            text: None,
        }
    }

    /// Replace the image codec
    pub fn with_codec(mut self, codec: impl ImageCodec + 'static) -> Self {
        self.codec = Box::new(codec);
        self
    }

    /// Provide a renderer for [`Self::set_key_text`]
    pub fn with_text_renderer(mut self, renderer: impl TextRenderer + 'static) -> Self {
        self.text = Some(Box::new(renderer));
        self
    }

    /// Find and open the first attached deck, with the bundled font for labels
    pub fn open() -> Result<Self> {
        Self::open_transport(find_first()?)
    }

    /// Find and open the deck with the given serial number
    pub fn open_serial(serial: &str) -> Result<Self> {
        Self::open_transport(find_by_serial(serial)?)
    }

    fn open_transport(transport: HidapiTransport) -> Result<Self> {
        let this = Self::new(Arc::new(transport)).with_text_renderer(FontRenderer::bundled()?);
        this.try_connect()?;
        Ok(this)
    }

    pub fn info(&self) -> &'static DeckInfo {
        &INFO
    }

    /// Open the device if needed, surfacing the failure
    pub fn try_connect(&self) -> Result<()> {
        let device = self.device.lock();
        if !device.is_open() {
            device.open()?;
        }
        Ok(())
    }

    /// Open the device if needed, returning whether it is open afterwards
    pub fn connect(&self) -> bool {
        if let Err(e) = self.try_connect() {
            warn!("failed to connect: {e}");
        }
        self.is_connected()
    }

    /// Close the device. Listeners stay registered and the input worker idles.
    pub fn disconnect(&self) {
        self.device.lock().close();
    }

    pub fn is_connected(&self) -> bool {
        self.device.lock().is_open()
    }

    /// Lock the transport, rejecting the call if the device is closed
    fn connected(&self) -> Result<MutexGuard<'_, Arc<dyn HidTransport>>> {
        let device = self.device.lock();
        if !device.is_open() {
            return Err(DeckError::NotConnected);
        }
        Ok(device)
    }

    fn read_identity(&self, report_id: u8) -> Result<Vec<u8>> {
        let mut buf = [0u8; COMMAND_LEN];
        let len = self.connected()?.read_feature(report_id, &mut buf)?;
        Ok(buf[..len].to_vec())
    }

    /// Firmware version string, e.g. `1.0.17`
    pub fn get_firmware_version(&self) -> Result<String> {
        Ok(abi::firmware_version(&self.read_identity(report::FIRMWARE_VERSION)?))
    }

    pub fn get_serial_number(&self) -> Result<String> {
        Ok(abi::serial_number(&self.read_identity(report::SERIAL_NUMBER)?))
    }

    fn send_command(&self, payload: ByteBuffer) -> Result<()> {
        self.connected()?
            .send_feature(report::CUSTOM_COMMAND, payload.as_slice())
    }

    /// Show the vendor logo on every key
    #[inline(always)]
    pub fn reset_to_logo(&self) -> Result<()> {
        self.send_command(abi::reset_to_logo())
    }

    /// Set the display brightness in percent, 0..=100
    pub fn set_brightness(&self, percent: u8) -> Result<()> {
        if percent > 100 {
            return Err(DeckError::BrightnessOutOfRange(percent as i64));
        }
        self.send_command(abi::set_brightness(percent))
    }

    /// Encode a raster and write it to a key while the transport lock is held
    fn upload(&self, device: &dyn HidTransport, key: KeyIndex, raster: &Raster) -> Result<()> {
        let jpeg = self.codec.encode(raster).inspect_err(|e| {
            warn!("failed to encode image for key {key}: {e}");
        })?;
        self.write_image(device, key, &jpeg)
    }

    fn write_image(&self, device: &dyn HidTransport, key: KeyIndex, jpeg: &[u8]) -> Result<()> {
        let packets = abi::image_packets(key, jpeg);
        debug!(%key, bytes = jpeg.len(), packets = packets.len(), "uploading key image");
        for mut packet in packets {
            let report_id = packet.get(0);
            packet.slice_front(1);
            device.write(report_id, packet.as_slice())?;
        }
        Ok(())
    }

    /// Upload a 96x96 raster to a key
    pub fn set_key_image(&self, key: usize, raster: &Raster) -> Result<()> {
        let key = KeyIndex::new(key)?;
        check_raster(raster)?;
        let device = self.connected()?;
        self.upload(&**device, key, raster)
    }

    /// Upload rasters to keys `0..rasters.len()` in order
    pub fn set_key_images(&self, rasters: &[Raster]) -> Result<()> {
        if rasters.len() > layout::KEY_COUNT {
            return Err(DeckError::InvalidMedia("more rasters than keys"));
        }
        rasters.iter().try_for_each(check_raster)?;
        let device = self.connected()?;
        for (key, raster) in KeyIndex::all().zip(rasters) {
            self.upload(&**device, key, raster)?;
        }
        Ok(())
    }

    /// Fill a key with a solid color
    pub fn set_key_color(&self, key: usize, color: Color) -> Result<()> {
        self.set_key_image(key, &imaging::solid(color))
    }

    /// Draw a text label on a solid background. Without `fg`, black or white
    /// is picked for contrast with `bg`.
    pub fn set_key_text(&self, key: usize, text: &str, bg: Color, fg: Option<Color>) -> Result<()> {
        KeyIndex::new(key)?;
        let renderer = self
            .text
            .as_ref()
            .ok_or(DeckError::Unsupported("no text renderer configured"))?;
        let mut raster = imaging::solid(bg);
        renderer.draw_text(&mut raster, text, fg.unwrap_or_else(|| text_color_for(bg)))?;
        self.set_key_image(key, &raster)
    }

    /// Show the next frame of an animation once its delay has elapsed.
    /// Returns whether a frame was uploaded.
    pub fn set_key_gif(&self, key: usize, gif: &mut dyn FrameSource) -> Result<bool> {
        KeyIndex::new(key)?;
        // a closed deck must not consume a frame
        if !self.is_connected() {
            return Err(DeckError::NotConnected);
        }
        if !gif.tick() {
            return Ok(false);
        }
        self.set_key_image(key, gif.advance())?;
        Ok(true)
    }

    /// Blank a single key
    #[inline(always)]
    pub fn clear_key(&self, key: usize) -> Result<()> {
        self.set_key_color(key, BLACK)
    }

    /// Blank every key in index order
    pub fn clear_deck(&self) -> Result<()> {
        let device = self.connected()?;
        let jpeg = self
            .codec
            .encode(&imaging::solid(BLACK))
            .inspect_err(|e| warn!("failed to encode blank key: {e}"))?;
        for key in KeyIndex::all() {
            self.write_image(&**device, key, &jpeg)?;
        }
        Ok(())
    }

    /// Start receiving key edges. The first listener starts the input worker.
    pub fn register_listener(&self, listener: Arc<dyn KeyListener>) -> Result<ListenerId> {
        if !self.is_connected() {
            return Err(DeckError::NotConnected);
        }
        self.pump.register(listener)
    }

    /// Stop delivering to a listener. Removing the last one stops the input
    /// worker after its current read. Returns whether the id was registered.
    ///
    /// Listeners are called outside the registry lock, so a dispatch pass
    /// that already started may still deliver its remaining edges to the
    /// removed listener after this returns.
    pub fn unregister_listener(&self, id: ListenerId) -> bool {
        self.pump.unregister(id)
    }

    pub fn listener_count(&self) -> usize {
        self.pump.listener_count()
    }

    /// Whether the input worker is running
    pub fn is_listening(&self) -> bool {
        self.pump.is_listening()
    }
}

impl Drop for StreamDeckXl {
    fn drop(&mut self) {
        self.pump.stop();
        self.device.lock().close();
    }
}

/// Reject rasters that are not exactly key sized
fn check_raster(raster: &Raster) -> Result<()> {
    if raster.dimensions() != (layout::KEY_SIZE, layout::KEY_SIZE) {
        return Err(DeckError::InvalidMedia("raster must be 96x96"));
    }
    Ok(())
}
