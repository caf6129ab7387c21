//! Configuration file support for velokeys.
//!
//! Configuration is stored in TOML format at:
//! - Linux: `~/.config/velokeys/config.toml`
//! - macOS: `~/Library/Application Support/velokeys/config.toml`
//! - Windows: `%APPDATA%\velokeys\config.toml`
//!
//! The file is developer convenience for the host-side tools; the engine
//! itself takes the values at construction and never persists anything
//! at runtime.

use crate::error::{Error, Result};
use crate::midi::Shaping;
use crate::scanner::{MatrixGeometry, LANES_PER_COLUMN};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Pitch/velocity shaping
    pub shaping: ShapingSettings,
    /// Matrix wiring
    pub matrix: MatrixSettings,
}

impl Config {
    /// Load configuration from the default config file location
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Err(Error::Config(format!("Config file not found at {:?}", path)))
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration or return default if not found
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Save configuration to the default config file location
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = ProjectDirs::from("", "", "velokeys") {
            Ok(proj_dirs.config_dir().join("config.toml"))
        } else {
            Err(Error::Config("Could not determine config directory".to_string()))
        }
    }

    /// Create a default config file with comments
    pub fn create_default_config_file() -> Result<PathBuf> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = r#"# velokeys configuration file

[shaping]
# MIDI note sent by the first (lowest) key. 36 = C2, which suits a
# 5-octave 61-key bed.
pitch_offset = 36

# Offset the whole bed in octaves or semitones.
octave_offset = 0
transpose = 0

# Send the velocity at which a key was released instead of 0.
# Some synths do cool things with this, others get confused.
send_note_off_velocity = false

# Serialize note-offs as note-on with velocity 0. Some receivers
# expect that convention.
send_note_on_with_zero_velocity = false

# MIDI channel (1-16)
channel = 1

[matrix]
# Key-index offset of each of the four lanes in a column byte.
# The default matches the interleaved wiring (key groups 16 apart).
lane_offsets = [0, 16, 32, 48]
"#;

        fs::write(&path, content)?;
        Ok(path)
    }

    /// Convert to the engine's shaping configuration
    pub fn to_shaping(&self) -> Shaping {
        Shaping {
            pitch_offset: self.shaping.pitch_offset,
            octave_offset: self.shaping.octave_offset,
            transpose: self.shaping.transpose,
            send_note_off_velocity: self.shaping.send_note_off_velocity,
            send_note_on_with_zero_velocity: self.shaping.send_note_on_with_zero_velocity,
            channel: self.shaping.channel.clamp(1, 16),
        }
    }

    /// Convert to the scanner's matrix geometry
    pub fn to_geometry(&self) -> MatrixGeometry {
        MatrixGeometry {
            lane_offsets: self.matrix.lane_offsets,
        }
    }
}

/// Shaping settings as they appear in the TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapingSettings {
    /// MIDI note of key 0
    pub pitch_offset: i16,
    /// Whole-octave offset
    pub octave_offset: i16,
    /// Semitone transpose
    pub transpose: i16,
    /// Shape note-offs with release velocity
    pub send_note_off_velocity: bool,
    /// Send note-offs as zero-velocity note-ons
    pub send_note_on_with_zero_velocity: bool,
    /// MIDI channel (1-16)
    pub channel: u8,
}

impl Default for ShapingSettings {
    fn default() -> Self {
        let shaping = Shaping::default();
        Self {
            pitch_offset: shaping.pitch_offset,
            octave_offset: shaping.octave_offset,
            transpose: shaping.transpose,
            send_note_off_velocity: shaping.send_note_off_velocity,
            send_note_on_with_zero_velocity: shaping.send_note_on_with_zero_velocity,
            channel: shaping.channel,
        }
    }
}

/// Matrix wiring settings as they appear in the TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixSettings {
    /// Key-index offset of each lane within a column byte
    pub lane_offsets: [u8; LANES_PER_COLUMN],
}

impl Default for MatrixSettings {
    fn default() -> Self {
        Self {
            lane_offsets: MatrixGeometry::interleaved().lane_offsets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.shaping.pitch_offset, 36);
        assert_eq!(config.shaping.channel, 1);
        assert!(!config.shaping.send_note_off_velocity);
        assert_eq!(config.matrix.lane_offsets, [0, 16, 32, 48]);
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = Config::default();
        config.shaping.transpose = -2;
        config.matrix.lane_offsets = [48, 32, 16, 0];

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.shaping.transpose, -2);
        assert_eq!(parsed.matrix.lane_offsets, [48, 32, 16, 0]);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str("[shaping]\nchannel = 3\n").unwrap();
        assert_eq!(config.shaping.channel, 3);
        assert_eq!(config.shaping.pitch_offset, 36);
        assert_eq!(config.matrix.lane_offsets, [0, 16, 32, 48]);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[shaping]\npitch_offset = 24\noctave_offset = 1\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        let shaping = config.to_shaping();
        assert_eq!(shaping.pitch_offset, 24);
        assert_eq!(shaping.octave_offset, 1);
        // Key 0 lands on C2 again: 24 + 12.
        assert_eq!(shaping.pitch_for_key(0), 36);
    }

    #[test]
    fn test_channel_clamped() {
        let config: Config = toml::from_str("[shaping]\nchannel = 0\n").unwrap();
        assert_eq!(config.to_shaping().channel, 1);
        let config: Config = toml::from_str("[shaping]\nchannel = 99\n").unwrap();
        assert_eq!(config.to_shaping().channel, 16);
    }
}
