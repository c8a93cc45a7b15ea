//! Configuration file handling

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use image::Rgb;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub media: MediaConfig,
}

impl Config {
    /// Get the config file path for this platform
    pub fn path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "xldeck").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load config from `path`, or the platform path. A missing platform file
    /// yields defaults, a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };
        let contents = fs::read_to_string(&path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, Box<dyn Error>> {
        Ok(toml::from_str(contents)?)
    }

    /// Save config with header comments, to `path` or the platform path
    pub fn save_with_header(&self, path: Option<&Path>) -> Result<PathBuf, Box<dyn Error>> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::path().ok_or("could not determine config directory")?,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let header = r#"# xldeck configuration file
# serial selects a deck when several are attached, brightness is applied on connect

"#;
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, format!("{header}{contents}"))?;
        Ok(path)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Serial number of the deck to use
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    /// Brightness to apply on connect
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Use nearest neighbor interpolation
    pub nearest: bool,
    /// Fill for transparent pixels
    pub background: [u8; 3],
}

impl MediaConfig {
    pub fn background(&self) -> Rgb<u8> {
        Rgb(self.background)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_file() {
        let config = Config::parse(
            r#"
            [device]
            serial = "CL12K1A00000"
            brightness = 70
            [media]
            nearest = true
            background = [255, 0, 16]
            "#,
        )
        .unwrap();
        assert_eq!(config.device.serial.as_deref(), Some("CL12K1A00000"));
        assert_eq!(config.device.brightness, Some(70));
        assert!(config.media.nearest);
        assert_eq!(config.media.background(), Rgb([255, 0, 16]));
    }

    #[test]
    fn partial_file_uses_defaults() {
        let config = Config::parse("[device]\nbrightness = 40\n").unwrap();
        assert_eq!(config.device.serial, None);
        assert_eq!(config.media, MediaConfig::default());
        assert!(!config.media.nearest);
        assert_eq!(config.media.background(), Rgb([0, 0, 0]));
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Config::parse("[device]\nbrightness = 300\n").is_err());
        assert!(Config::parse("[media]\nbackground = \"black\"\n").is_err());
    }

    #[test]
    fn missing_explicit_file() {
        assert!(Config::load(Some(Path::new("/nonexistent/xldeck.toml"))).is_err());
    }

    #[test]
    fn written_file_loads_back() {
        let path = std::env::temp_dir().join(format!("xldeck-{}.toml", std::process::id()));
        let mut config = Config::default();
        config.device.brightness = Some(55);
        config.save_with_header(Some(&path)).unwrap();
        let loaded = Config::load(Some(&path)).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
