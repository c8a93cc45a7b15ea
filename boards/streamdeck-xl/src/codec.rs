//! JPEG encoding of key rasters.

use deck_core::{ImageCodec, Raster, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops;

/// Encodes rasters the way the XL expects them: rotated 180 degrees, JPEG.
#[derive(Clone, Copy, Debug)]
pub struct JpegCodec {
    quality: u8,
}

impl Default for JpegCodec {
    fn default() -> Self {
        Self { quality: 100 }
    }
}

impl JpegCodec {
    /// Quality is clamped to 1..=100
    pub fn with_quality(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl ImageCodec for JpegCodec {
    fn encode(&self, raster: &Raster) -> Result<Vec<u8>> {
        // the panel is mounted upside down
        let rotated = imageops::rotate180(raster);
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, self.quality).encode_image(&rotated)?;
        Ok(out)
    }
}
