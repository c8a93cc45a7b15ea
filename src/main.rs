use std::error::Error;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::thread;

use bpaf::{Bpaf, Parser};
use deck_core::{KeyIndex, KeyState};
use image::Rgb;
use streamdeck_xl::StreamDeckXl;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, MediaConfig};
use crate::detection::{device_args, open_deck, print_devices, DeviceArgs};

mod config;
mod detection;
mod media;

fn nearest() -> impl Parser<bool> {
    bpaf::short('n')
        .long("nearest")
        .help("Use nearest neighbor interpolation when resizing, otherwise uses gaussian")
        .switch()
}

fn background() -> impl Parser<Option<HexColor>> {
    bpaf::short('b')
        .long("bg")
        .help("Background color for transparent images (hex: #RRGGBB or #RGB)")
        .argument::<HexColor>("COLOR")
        .optional()
}

fn duration() -> impl Parser<Option<humantime::Duration>> {
    bpaf::long("for")
        .help("Stop after this long (e.g. 30s, 5m), otherwise runs until interrupted")
        .argument::<humantime::Duration>("DURATION")
        .optional()
}

#[derive(Clone, Debug, Bpaf)]
enum Command {
    /// List attached decks
    #[bpaf(command)]
    List,
    /// Print firmware version and serial number
    #[bpaf(command)]
    Info,
    /// Set display brightness
    #[bpaf(command, fallback_to_usage)]
    Brightness {
        /// Brightness in percent
        #[bpaf(positional("PERCENT"), guard(|p| *p <= 100, "brightness must be 0-100"))]
        percent: u8,
    },
    /// Reset every key to the vendor logo
    #[bpaf(command)]
    Logo,
    /// Fill a key with a solid color
    #[bpaf(command, fallback_to_usage)]
    Color {
        #[bpaf(positional("KEY"))]
        key: usize,
        /// Fill color (hex: #RRGGBB or #RGB)
        #[bpaf(positional("COLOR"))]
        color: HexColor,
    },
    /// Draw a text label on one key
    #[bpaf(command, fallback_to_usage)]
    Text {
        /// Label background (hex: #RRGGBB or #RGB)
        #[bpaf(short('b'), long("bg"), argument("COLOR"), fallback(HexColor([0; 3])), display_fallback)]
        bg: HexColor,
        /// Label color, picked for contrast with the background if unset
        #[bpaf(short('f'), long("fg"), argument("COLOR"))]
        fg: Option<HexColor>,
        #[bpaf(positional("KEY"))]
        key: usize,
        /// Label, shrunk until it fits the key
        #[bpaf(positional("TEXT"))]
        text: String,
    },
    /// Fit an image file to one key
    #[bpaf(command, fallback_to_usage)]
    Image {
        #[bpaf(external)]
        nearest: bool,
        #[bpaf(external)]
        background: Option<HexColor>,
        #[bpaf(positional("KEY"))]
        key: usize,
        /// Path to image to resize and upload
        #[bpaf(positional("PATH"), guard(|p| p.exists(), "file not found"))]
        path: PathBuf,
    },
    /// Split an image across all keys
    #[bpaf(command, fallback_to_usage)]
    Cover {
        #[bpaf(external)]
        nearest: bool,
        #[bpaf(external)]
        background: Option<HexColor>,
        /// Path to image to split and upload
        #[bpaf(positional("PATH"), guard(|p| p.exists(), "file not found"))]
        path: PathBuf,
    },
    /// Play an animated gif on one or more keys
    #[bpaf(command, fallback_to_usage)]
    Gif {
        #[bpaf(external)]
        nearest: bool,
        #[bpaf(external)]
        background: Option<HexColor>,
        #[bpaf(external)]
        duration: Option<humantime::Duration>,
        /// Key to play on, may be repeated
        #[bpaf(short('k'), long("key"), argument("KEY"), some("at least one key is required"))]
        keys: Vec<usize>,
        /// Path to the gif
        #[bpaf(positional("PATH"), guard(|p| p.exists(), "file not found"))]
        path: PathBuf,
    },
    /// Clear one key, or the whole deck
    #[bpaf(command)]
    Clear {
        #[bpaf(positional("KEY"))]
        key: Option<usize>,
    },
    /// Print key presses and releases
    #[bpaf(command)]
    Listen {
        #[bpaf(external)]
        duration: Option<humantime::Duration>,
    },
    /// Show the effective configuration
    #[bpaf(command)]
    Config {
        /// Write the configuration file if it does not exist yet
        #[bpaf(long)]
        init: bool,
    },
}

/// Utility for easily parsing hex colors from bpaf
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
struct HexColor(pub [u8; 3]);
impl Display for HexColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [r, g, b] = self.0;
        f.write_str(&format!("#{r:02x}{g:02x}{b:02x}"))
    }
}
impl FromStr for HexColor {
    type Err = String;
    fn from_str(code: &str) -> Result<Self, Self::Err> {
        let mut hex = code.trim_start_matches('#').to_string();
        match hex.len() {
            3 => {
                // Extend 3 character hex colors
                hex = hex.chars().flat_map(|a| [a, a]).collect();
            },
            6 => {},
            l => return Err(format!("Invalid hex length for {code}: {l}")),
        }
        match u32::from_str_radix(&hex, 16) {
            Ok(channel_bytes) => {
                let [_, r, g, b] = channel_bytes.to_be_bytes();
                Ok(Self([r, g, b]))
            },
            Err(_) => Err(format!("Invalid hex color: {code}")),
        }
    }
}
impl From<HexColor> for Rgb<u8> {
    fn from(color: HexColor) -> Self {
        Rgb(color.0)
    }
}

#[derive(Clone, Debug, Bpaf)]
#[bpaf(options, version, descr(env!("CARGO_PKG_DESCRIPTION")))]
struct Cli {
    #[bpaf(external(device_args))]
    device: DeviceArgs,
    /// Config file to use instead of the platform default
    #[bpaf(long, argument("PATH"))]
    config: Option<PathBuf>,
    #[bpaf(external(command))]
    command: Command,
}

/// Apply per-command media overrides on top of the config file
fn media_options(config: &Config, nearest: bool, background: Option<HexColor>) -> MediaConfig {
    let mut media = config.media.clone();
    media.nearest |= nearest;
    if let Some(bg) = background {
        media.background = bg.0;
    }
    media
}

fn listen(deck: &StreamDeckXl, duration: Option<humantime::Duration>) -> Result<(), Box<dyn Error>> {
    let id = deck.register_listener(Arc::new(|key: KeyIndex, state: KeyState| {
        println!("key {key:>2} (row {}, col {}) {state}", key.row(), key.col());
    }))?;
    println!("listening for key events");
    match duration {
        Some(duration) => thread::sleep(duration.into()),
        None => loop {
            thread::park();
        },
    }
    deck.unregister_listener(id);
    Ok(())
}

fn run(deck: &StreamDeckXl, command: Command, config: &Config) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Info => {
            let info = deck.info();
            println!("{}", info.name);
            println!("firmware: {}", deck.get_firmware_version()?);
            println!("serial:   {}", deck.get_serial_number()?);
            println!(
                "layout:   {}x{} keys, {}px",
                info.rows, info.cols, info.key_size
            );
        },
        Command::Brightness { percent } => {
            deck.set_brightness(percent)?;
            println!("set brightness to {percent}%");
        },
        Command::Logo => {
            deck.reset_to_logo()?;
            println!("reset to logo");
        },
        Command::Color { key, color } => {
            deck.set_key_color(key, color.into())?;
            println!("set key {key} to {color}");
        },
        Command::Text { bg, fg, key, text } => {
            deck.set_key_text(key, &text, bg.into(), fg.map(Into::into))?;
            println!("set key {key} to {text:?}");
        },
        Command::Image {
            nearest,
            background,
            key,
            path,
        } => {
            let media = media_options(config, nearest, background);
            let raster = media::key_image(&path, &media)?;
            deck.set_key_image(key, &raster)?;
            println!("uploaded {} to key {key}", path.display());
        },
        Command::Cover {
            nearest,
            background,
            path,
        } => {
            let media = media_options(config, nearest, background);
            let tiles = media::cover_images(&path, &media)?;
            media::upload_cover(deck, &tiles)?;
        },
        Command::Gif {
            nearest,
            background,
            duration,
            keys,
            path,
        } => {
            let media = media_options(config, nearest, background);
            media::play_gif(deck, &keys, &path, &media, duration.map(Into::into))?;
        },
        Command::Clear { key: Some(key) } => {
            deck.clear_key(key)?;
            println!("cleared key {key}");
        },
        Command::Clear { key: None } => {
            deck.clear_deck()?;
            println!("cleared deck");
        },
        Command::Listen { duration } => listen(deck, duration)?,
        Command::List | Command::Config { .. } => return Err("command does not use a deck".into()),
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = cli().run();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load(cli.config.as_deref())?;
    match cli.command {
        Command::List => print_devices(),
        Command::Config { init } => {
            let path = cli.config.clone().or_else(Config::path);
            if init {
                match &path {
                    Some(p) if p.exists() => println!("{} already exists", p.display()),
                    _ => {
                        let written = config.save_with_header(cli.config.as_deref())?;
                        println!("created default config at {}", written.display());
                    },
                }
            }
            match path {
                Some(p) => println!("# {}", p.display()),
                None => println!("# no config directory"),
            }
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        },
        command => {
            let deck = open_deck(&cli.device, &config)?;
            run(&deck, command, &config)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors() {
        assert_eq!("#ff8000".parse::<HexColor>().unwrap(), HexColor([255, 128, 0]));
        assert_eq!("f80".parse::<HexColor>().unwrap(), HexColor([255, 136, 0]));
        assert_eq!(HexColor([1, 2, 255]).to_string(), "#0102ff");
        assert!("#12345".parse::<HexColor>().is_err());
        assert!("#gggggg".parse::<HexColor>().is_err());
    }

    #[test]
    fn parses_commands() {
        let cli = cli()
            .run_inner(&["--serial", "CL1", "gif", "-k", "1", "-k", "2", "--for", "10s", "Cargo.toml"])
            .unwrap();
        assert_eq!(cli.device.serial.as_deref(), Some("CL1"));
        match cli.command {
            Command::Gif { keys, duration, .. } => {
                assert_eq!(keys, vec![1, 2]);
                assert_eq!(duration.map(Into::into), Some(std::time::Duration::from_secs(10)));
            },
            other => panic!("unexpected command {other:?}"),
        }

        assert!(super::cli().run_inner(&["brightness", "101"]).is_err());
        let cli = super::cli().run_inner(&["clear"]).unwrap();
        assert!(matches!(cli.command, Command::Clear { key: None }));

        let cli = super::cli().run_inner(&["text", "--fg", "#fff", "4", "Mute"]).unwrap();
        match cli.command {
            Command::Text { bg, fg, key, text } => {
                assert_eq!(bg, HexColor([0, 0, 0]));
                assert_eq!(fg, Some(HexColor([255, 255, 255])));
                assert_eq!((key, text.as_str()), (4, "Mute"));
            },
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn media_overrides() {
        let mut config = Config::default();
        config.media.background = [1, 2, 3];
        let media = media_options(&config, false, None);
        assert_eq!(media, config.media);
        let media = media_options(&config, true, Some(HexColor([9, 9, 9])));
        assert!(media.nearest);
        assert_eq!(media.background, [9, 9, 9]);
    }

    #[test]
    fn generate_docs() {
        let app = env!("CARGO_PKG_NAME");
        let options = cli();

        std::fs::create_dir_all("docs").expect("failed to create docs dir");
        let roff = options.render_manpage(app, bpaf::doc::Section::General, None, None, None);
        std::fs::write("docs/xldeck.1", roff).expect("failed to write manpage");

        let md = options.header("").render_markdown(app);
        std::fs::write("docs/README.md", md).expect("failed to write markdown docs");
    }
}
