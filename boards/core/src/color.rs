//! Color rules shared by the text and fill helpers.

use image::Rgb;

use crate::Color;

pub const WHITE: Color = Rgb([255, 255, 255]);
pub const BLACK: Color = Rgb([0, 0, 0]);

/// Relative luminance on a 0..=255 scale
pub fn luminance(color: Color) -> f32 {
    let [r, g, b] = color.0;
    0.2126 * r as f32 + 0.7152 * g as f32 + 0.0722 * b as f32
}

/// Pick black or white text for legibility on `bg`
pub fn text_color_for(bg: Color) -> Color {
    if luminance(bg) < 140.0 {
        WHITE
    } else {
        BLACK
    }
}

pub fn invert(color: Color) -> Color {
    let [r, g, b] = color.0;
    Rgb([255 - r, 255 - g, 255 - b])
}
