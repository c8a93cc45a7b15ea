//! Raster helpers: solid fills, text labels, fitting arbitrary images to keys
//! and splitting one image across the whole grid.

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use deck_core::{layout, Color, DeckError, Raster, Result, TextRenderer};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbaImage};
use imageproc::drawing::draw_text_mut;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

/// DejaVu Sans, see `assets/DejaVuSans.LICENSE`
const BUNDLED_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");
/// Largest label size, one full key
const MAX_TEXT_SIZE: f32 = layout::KEY_SIZE as f32;
const MIN_TEXT_SIZE: f32 = 6.0;

#[inline(always)]
pub fn filter(nearest: bool) -> FilterType {
    if nearest {
        FilterType::Nearest
    } else {
        FilterType::Gaussian
    }
}

/// Key sized raster filled with `color`
pub fn solid(color: Color) -> Raster {
    Raster::from_pixel(layout::KEY_SIZE, layout::KEY_SIZE, color)
}

/// Drop the alpha channel by mixing each pixel against `background`
pub fn flatten(image: &RgbaImage, background: Color) -> Raster {
    let [br, bg, bb] = background.0;
    Raster::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let a = a as f64 / 255.0;
        let ba = 1. - a;
        Rgb([
            ((br as f64 * ba) + (r as f64 * a)) as u8,
            ((bg as f64 * ba) + (g as f64 * a)) as u8,
            ((bb as f64 * ba) + (b as f64 * a)) as u8,
        ])
    })
}

/// Scale and center crop `image` to exactly `width` x `height`
pub fn fit(image: &DynamicImage, background: Color, nearest: bool, width: u32, height: u32) -> Raster {
    let resized = image.resize_to_fill(width, height, filter(nearest)).to_rgba8();
    flatten(&resized, background)
}

/// Scale and center crop `image` to a single key
pub fn fit_to_key(image: &DynamicImage, background: Color, nearest: bool) -> Raster {
    fit(image, background, nearest, layout::KEY_SIZE, layout::KEY_SIZE)
}

/// Fit `image` to a `rows` x `cols` block of keys and cut it into key rasters,
/// row by row.
pub fn split(
    image: &DynamicImage,
    rows: usize,
    cols: usize,
    background: Color,
    nearest: bool,
) -> Vec<Raster> {
    let size = layout::KEY_SIZE;
    let full = fit(image, background, nearest, cols as u32 * size, rows as u32 * size);
    (0..rows * cols)
        .into_par_iter()
        .map(|i| {
            let (row, col) = ((i / cols) as u32, (i % cols) as u32);
            imageops::crop_imm(&full, col * size, row * size, size, size).to_image()
        })
        .collect()
}

/// Split `image` across every key of the deck
pub fn cover(image: &DynamicImage, background: Color, nearest: bool) -> Vec<Raster> {
    split(image, layout::ROWS, layout::COLS, background, nearest)
}

/// Draws single line labels, shrinking the font until the line fits the key
#[derive(Clone)]
pub struct FontRenderer {
    font: FontArc,
}

impl FontRenderer {
    /// Renderer using the font shipped with this crate
    pub fn bundled() -> Result<Self> {
        let font = FontArc::try_from_slice(BUNDLED_FONT)
            .map_err(|_| DeckError::InvalidMedia("bundled font is corrupt"))?;
        Ok(Self { font })
    }

    /// Renderer using a TrueType or OpenType font file's contents
    pub fn from_vec(data: Vec<u8>) -> Result<Self> {
        let font =
            FontArc::try_from_vec(data).map_err(|_| DeckError::InvalidMedia("not a font"))?;
        Ok(Self { font })
    }

    /// Width and line height of `text` at `size` pixels
    pub fn measure(&self, text: &str, size: f32) -> (f32, f32) {
        let font = self.font.as_scaled(PxScale::from(size));
        let mut width = 0.0;
        let mut prev = None;
        for c in text.chars() {
            let id = font.glyph_id(c);
            if let Some(prev) = prev {
                width += font.kern(prev, id);
            }
            width += font.h_advance(id);
            prev = Some(id);
        }
        (width, font.height())
    }

    /// Largest size, stepping down by 2px, at which `text` fits a key
    pub fn fit_size(&self, text: &str) -> f32 {
        let mut size = MAX_TEXT_SIZE;
        while size > MIN_TEXT_SIZE {
            let (width, height) = self.measure(text, size);
            if width <= MAX_TEXT_SIZE && height <= MAX_TEXT_SIZE {
                break;
            }
            size -= 2.0;
        }
        size
    }
}

impl TextRenderer for FontRenderer {
    fn draw_text(&self, raster: &mut Raster, text: &str, color: Color) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let size = self.fit_size(text);
        let (width, height) = self.measure(text, size);
        // centered on the raster, not just the key, so larger canvases work too
        let x = (raster.width() as f32 - width) / 2.0;
        let y = (raster.height() as f32 - height) / 2.0;
        draw_text_mut(
            raster,
            color,
            x.round() as i32,
            y.round() as i32,
            PxScale::from(size),
            &self.font,
            text,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn solid_fill() {
        let raster = solid(Rgb([1, 2, 3]));
        assert_eq!(raster.dimensions(), (96, 96));
        assert!(raster.pixels().all(|p| *p == Rgb([1, 2, 3])));
    }

    #[test]
    fn flatten_against_background() {
        let mut rgba = RgbaImage::new(2, 1);
        rgba.put_pixel(0, 0, Rgba([200, 100, 50, 255]));
        rgba.put_pixel(1, 0, Rgba([200, 100, 50, 0]));
        let flat = flatten(&rgba, Rgb([10, 20, 30]));
        assert_eq!(*flat.get_pixel(0, 0), Rgb([200, 100, 50]));
        assert_eq!(*flat.get_pixel(1, 0), Rgb([10, 20, 30]));
    }

    #[test]
    fn fit_crops_to_key() {
        let image = DynamicImage::ImageRgb8(Raster::from_pixel(300, 100, Rgb([9, 9, 9])));
        let raster = fit_to_key(&image, Rgb([0, 0, 0]), true);
        assert_eq!(raster.dimensions(), (96, 96));
        assert_eq!(*raster.get_pixel(48, 48), Rgb([9, 9, 9]));
    }

    #[test]
    fn cover_tiles_in_row_order() {
        // left half red, right half blue
        let image = Raster::from_fn(8 * 96, 4 * 96, |x, _| {
            if x < 4 * 96 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        });
        let tiles = cover(&DynamicImage::ImageRgb8(image), Rgb([0, 0, 0]), true);
        assert_eq!(tiles.len(), layout::KEY_COUNT);
        assert!(tiles.iter().all(|t| t.dimensions() == (96, 96)));
        assert_eq!(*tiles[0].get_pixel(10, 10), Rgb([255, 0, 0]));
        assert_eq!(*tiles[7].get_pixel(10, 10), Rgb([0, 0, 255]));
        assert_eq!(*tiles[8].get_pixel(10, 10), Rgb([255, 0, 0]));
        assert_eq!(*tiles[31].get_pixel(10, 10), Rgb([0, 0, 255]));
    }

    /// Bounding box of pixels that differ from black
    fn lit_bounds(raster: &Raster) -> Option<(u32, u32, u32, u32)> {
        let lit: Vec<(u32, u32)> = raster
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0 != [0, 0, 0])
            .map(|(x, y, _)| (x, y))
            .collect();
        let min_x = lit.iter().map(|p| p.0).min()?;
        let max_x = lit.iter().map(|p| p.0).max()?;
        let min_y = lit.iter().map(|p| p.1).min()?;
        let max_y = lit.iter().map(|p| p.1).max()?;
        Some((min_x, max_x, min_y, max_y))
    }

    #[test]
    fn label_fits_key() {
        let renderer = FontRenderer::bundled().unwrap();
        for text in ["A", "HELLO", "Conference room 12", "a longer label here"] {
            let size = renderer.fit_size(text);
            let (width, height) = renderer.measure(text, size);
            assert!(width <= 96.0, "{text} is {width}px wide at {size}px");
            assert!(height <= 96.0, "{text} is {height}px tall at {size}px");
            // one step larger would not have fit
            if size < MAX_TEXT_SIZE {
                let (w, h) = renderer.measure(text, size + 2.0);
                assert!(w > 96.0 || h > 96.0);
            }
        }
        // short labels get bigger glyphs than long ones
        assert!(renderer.fit_size("A") > renderer.fit_size("Conference room 12"));
    }

    #[test]
    fn label_is_drawn_centered() {
        let renderer = FontRenderer::bundled().unwrap();
        let mut raster = solid(Rgb([0, 0, 0]));
        renderer.draw_text(&mut raster, "HELLO", Rgb([255, 255, 255])).unwrap();

        let (min_x, max_x, min_y, max_y) = lit_bounds(&raster).unwrap();
        let (left, right) = (min_x as i32, 95 - max_x as i32);
        assert!((left - right).abs() <= 4, "left {left} right {right}");
        assert!(min_y > 0 && max_y < 95);
        // the label sits across the middle row
        assert!(min_y < 48 && max_y > 48);
    }

    #[test]
    fn empty_label_draws_nothing() {
        let renderer = FontRenderer::bundled().unwrap();
        let mut raster = solid(Rgb([0, 0, 0]));
        renderer.draw_text(&mut raster, "", Rgb([255, 255, 255])).unwrap();
        assert!(lit_bounds(&raster).is_none());
        assert!(FontRenderer::from_vec(b"not a font".to_vec()).is_err());
    }
}
