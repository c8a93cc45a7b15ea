//! Loading media files and playing them on the deck.

use std::error::Error;
use std::io::{stdout, Write};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use deck_core::{layout, Raster};
use image::DynamicImage;
use streamdeck_xl::{imaging, Gif, StreamDeckXl};

use crate::config::MediaConfig;

/// Polling interval of the animation loop
const FRAME_POLL: Duration = Duration::from_millis(5);

fn progress(msg: &str) {
    print!("{msg} ... ");
    let _ = stdout().flush();
}

fn load(path: &Path) -> Result<DynamicImage, Box<dyn Error>> {
    progress("decoding image");
    let image = image::open(path)?;
    println!("done");
    Ok(image)
}

/// Fit an image file to a single key
pub fn key_image(path: &Path, media: &MediaConfig) -> Result<Raster, Box<dyn Error>> {
    let image = load(path)?;
    Ok(imaging::fit_to_key(&image, media.background(), media.nearest))
}

/// Split an image file across every key
pub fn cover_images(path: &Path, media: &MediaConfig) -> Result<Vec<Raster>, Box<dyn Error>> {
    let image = load(path)?;
    progress("splitting image");
    let tiles = imaging::cover(&image, media.background(), media.nearest);
    println!("done");
    Ok(tiles)
}

/// Upload a split image, one key at a time with progress
pub fn upload_cover(deck: &StreamDeckXl, tiles: &[Raster]) -> Result<(), Box<dyn Error>> {
    let total = tiles.len();
    let fmt_width = total.to_string().len();
    for (key, tile) in tiles.iter().enumerate() {
        print!("\ruploading keys ({:fmt_width$}/{total}) ... ", key + 1);
        let _ = stdout().flush();
        deck.set_key_image(key, tile)?;
    }
    println!("done");
    Ok(())
}

/// Play a gif on each key in `keys` until `duration` passes, or forever
pub fn play_gif(
    deck: &StreamDeckXl,
    keys: &[usize],
    path: &Path,
    media: &MediaConfig,
    duration: Option<Duration>,
) -> Result<(), Box<dyn Error>> {
    if let Some(&key) = keys.iter().find(|&&k| k >= layout::KEY_COUNT) {
        return Err(format!("key {key} is out of range").into());
    }

    progress("decoding animation");
    let gif = Gif::open(path, media.background(), media.nearest)?;
    println!("done ({} frames)", gif.len());

    // every key keeps its own clock
    let mut players: Vec<(usize, Gif)> = keys.iter().map(|&k| (k, gif.clone())).collect();
    for (key, gif) in &players {
        deck.set_key_image(*key, gif.current())?;
    }

    println!("playing on {} key(s)", players.len());
    let start = Instant::now();
    while duration.is_none_or(|d| start.elapsed() < d) {
        for (key, gif) in players.iter_mut() {
            deck.set_key_gif(*key, gif)?;
        }
        thread::sleep(FRAME_POLL);
    }
    Ok(())
}
