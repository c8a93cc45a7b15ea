//! Deck selection logic.

use std::error::Error;

use bpaf::Bpaf;
use streamdeck_xl::{list_devices, StreamDeckXl};
use tracing::info;

use crate::config::Config;

/// Deck selection arguments
#[derive(Clone, Debug, Default, Bpaf)]
#[bpaf(group_help("Deck selection:"))]
pub struct DeviceArgs {
    /// Serial number of the deck to use, defaults to the first one found
    #[bpaf(long, argument("SERIAL"))]
    pub serial: Option<String>,
}

/// Open the selected deck and apply the configured brightness
pub fn open_deck(args: &DeviceArgs, config: &Config) -> Result<StreamDeckXl, Box<dyn Error>> {
    let serial = args.serial.as_deref().or(config.device.serial.as_deref());
    let deck = match serial {
        Some(serial) => StreamDeckXl::open_serial(serial)
            .map_err(|e| format!("deck {serial}: {e}"))?,
        None => StreamDeckXl::open()?,
    };
    if let Some(brightness) = config.device.brightness {
        deck.set_brightness(brightness)?;
        info!(brightness, "applied configured brightness");
    }
    Ok(deck)
}

/// Print every attached deck
pub fn print_devices() -> Result<(), Box<dyn Error>> {
    let decks = list_devices()?;
    if decks.is_empty() {
        println!("no decks found");
    }
    for deck in decks {
        println!(
            "{} serial={} path={}",
            deck.product.as_deref().unwrap_or("Stream Deck XL"),
            deck.serial.as_deref().unwrap_or("unknown"),
            deck.path.to_string_lossy(),
        );
    }
    Ok(())
}
