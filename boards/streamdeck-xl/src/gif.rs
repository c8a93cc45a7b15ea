//! Looping GIF playback on a single key.

use std::io::Cursor;
use std::path::Path;
use std::time::{Duration, Instant};

use deck_core::{Color, DeckError, FrameSource, Raster, Result};
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage};
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::imaging::fit_to_key;

/// Delays below this are treated as unset, the way browsers do
const MIN_DELAY: Duration = Duration::from_millis(20);
const DEFAULT_DELAY: Duration = Duration::from_millis(100);

/// Decoded animation, pre-scaled to key size
#[derive(Clone, Debug)]
pub struct Gif {
    frames: Vec<(Raster, Duration)>,
    index: usize,
    last: Instant,
}

impl Gif {
    /// Decode a gif, fitting every frame to a key
    pub fn decode(data: &[u8], background: Color, nearest: bool) -> Result<Self> {
        let frames = GifDecoder::new(Cursor::new(data))?
            .into_frames()
            .collect_frames()?;
        let frames = frames
            .into_par_iter()
            .map(|frame| {
                let (numer, denom) = frame.delay().numer_denom_ms();
                let delay = Duration::from_micros(numer as u64 * 1000 / denom.max(1) as u64);
                let image = DynamicImage::ImageRgba8(frame.into_buffer());
                (fit_to_key(&image, background, nearest), delay)
            })
            .collect();
        Self::from_frames(frames)
    }

    /// Read and decode a gif file
    pub fn open(path: impl AsRef<Path>, background: Color, nearest: bool) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::decode(&data, background, nearest)
    }

    /// Build an animation from already rasterised frames
    pub fn from_frames(frames: Vec<(Raster, Duration)>) -> Result<Self> {
        if frames.is_empty() {
            return Err(DeckError::InvalidMedia("animation has no frames"));
        }
        let frames = frames
            .into_iter()
            .map(|(raster, delay)| {
                let delay = if delay < MIN_DELAY { DEFAULT_DELAY } else { delay };
                (raster, delay)
            })
            .collect();
        Ok(Self {
            frames,
            index: 0,
            last: Instant::now(),
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frame currently on display
    pub fn current(&self) -> &Raster {
        &self.frames[self.index].0
    }

    /// Delay of the frame currently on display
    pub fn delay(&self) -> Duration {
        self.frames[self.index].1
    }

    /// Rewind to the first frame
    pub fn restart(&mut self) {
        self.index = 0;
        self.last = Instant::now();
    }
}

impl FrameSource for Gif {
    fn tick(&self) -> bool {
        self.last.elapsed() >= self.delay()
    }

    fn advance(&mut self) -> &Raster {
        self.index = (self.index + 1) % self.frames.len();
        self.last = Instant::now();
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use image::codecs::gif::GifEncoder;
    use image::{Delay, Frame, Rgb, Rgba, RgbaImage};

    use super::*;
    use crate::imaging::solid;

    fn encode(colors: &[[u8; 3]], delay_ms: u32) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut out);
            for &[r, g, b] in colors {
                let buffer = RgbaImage::from_pixel(16, 16, Rgba([r, g, b, 255]));
                let frame = Frame::from_parts(buffer, 0, 0, Delay::from_numer_denom_ms(delay_ms, 1));
                encoder.encode_frame(frame).unwrap();
            }
        }
        out
    }

    #[test]
    fn decodes_frames() {
        let data = encode(&[[255, 0, 0], [0, 0, 255]], 200);
        let gif = Gif::decode(&data, Rgb([0, 0, 0]), true).unwrap();
        assert_eq!(gif.len(), 2);
        assert_eq!(gif.current().dimensions(), (96, 96));
        assert_eq!(gif.delay(), Duration::from_millis(200));
        assert!(gif.current().get_pixel(48, 48).0[0] > 200);
    }

    #[test]
    fn rejects_garbage() {
        assert!(Gif::decode(b"not a gif", Rgb([0, 0, 0]), false).is_err());
        assert!(matches!(
            Gif::from_frames(Vec::new()),
            Err(DeckError::InvalidMedia(_))
        ));
    }

    #[test]
    fn advance_wraps() {
        let frames = vec![
            (solid(Rgb([1, 1, 1])), Duration::from_millis(50)),
            (solid(Rgb([2, 2, 2])), Duration::from_millis(50)),
        ];
        let mut gif = Gif::from_frames(frames).unwrap();
        assert_eq!(gif.advance().get_pixel(0, 0), &Rgb([2, 2, 2]));
        assert_eq!(gif.advance().get_pixel(0, 0), &Rgb([1, 1, 1]));
    }

    #[test]
    fn tick_waits_for_delay() {
        let frames = vec![(solid(Rgb([0, 0, 0])), Duration::from_secs(3600))];
        let gif = Gif::from_frames(frames).unwrap();
        assert!(!gif.tick());

        let frames = vec![(solid(Rgb([0, 0, 0])), Duration::from_millis(20))];
        let gif = Gif::from_frames(frames).unwrap();
        std::thread::sleep(Duration::from_millis(40));
        assert!(gif.tick());
    }

    #[test]
    fn unset_delay_defaults() {
        let gif = Gif::from_frames(vec![(solid(Rgb([0, 0, 0])), Duration::ZERO)]).unwrap();
        assert_eq!(gif.delay(), DEFAULT_DELAY);
    }
}
