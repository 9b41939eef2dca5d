//! Configuration file support for vibe-piano
//!
//! Configuration is stored in TOML format at:
//! - Linux: `~/.config/vibe-piano/config.toml`
//! - macOS: `~/Library/Application Support/vibe-piano/config.toml`
//! - Windows: `%APPDATA%\vibe-piano\config.toml`

use crate::error::{Error, Result};
use crate::note::{KeyId, DEFAULT_VELOCITY};
use crate::qwerty::{QwertyMode, DEFAULT_KEY_RELEASE_MS};
use crate::widget::KeyboardOptions;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG: &str = r#"# vibe-piano configuration file
# https://github.com/trusch/vibelang

[keyboard]
# Lowest key (note name or MIDI number)
low = "C3"

# Key after the highest key (exclusive)
high = "C5"

# Arrow keys move focus between keys, space plays the focused key
a11y = true

# Computer keyboard emulation: "off", "piano" or "tracker"
qwerty = "piano"

# Velocity for emulated key presses (1-127)
velocity = 127

# MIDI channel (0-15)
channel = 0

# Release emulated keys after this many milliseconds without a repeat
# (only used when key releases cannot be detected)
key_release_ms = 400

[theme]
white_key_color = "white"
black_key_color = "dark_gray"
pressed_key_color = "cyan"
locked_key_color = "magenta"
border_color = "cyan"

# Show note names on keys
show_note_names = true

# Show keyboard shortcuts help
show_help = true
"#;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Keyboard configuration
    pub keyboard: KeyboardSettings,
    /// UI/Theme configuration
    pub theme: Theme,
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

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if not found
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Save configuration to the default config file location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = ProjectDirs::from("", "", "vibe-piano") {
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
        fs::write(&path, DEFAULT_CONFIG)?;
        Ok(path)
    }

    /// Convert to construction options for the keyboard
    pub fn to_keyboard_options(&self) -> KeyboardOptions {
        KeyboardOptions {
            range: (self.keyboard.low.clone(), self.keyboard.high.clone()),
            a11y: self.keyboard.a11y,
            qwerty: self.keyboard.qwerty,
            velocity: self.keyboard.velocity.clamp(1, 127),
            channel: self.keyboard.channel.min(15),
        }
    }

    /// How long an emulated key stays down without a repeat
    pub fn key_release_duration(&self) -> Duration {
        Duration::from_millis(self.keyboard.key_release_ms)
    }
}

/// Keyboard settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardSettings {
    /// Lowest key
    pub low: KeyId,
    /// Key after the highest key
    pub high: KeyId,
    /// Focus navigation
    pub a11y: bool,
    /// Computer keyboard emulation mode
    pub qwerty: QwertyMode,
    /// Velocity for emulated key presses (1-127)
    pub velocity: u8,
    /// MIDI channel (0-15)
    pub channel: u8,
    /// Auto-release timeout in milliseconds
    pub key_release_ms: u64,
}

impl Default for KeyboardSettings {
    fn default() -> Self {
        Self {
            low: KeyId::from("C3"),
            high: KeyId::from("C5"),
            a11y: true,
            qwerty: QwertyMode::Piano,
            velocity: DEFAULT_VELOCITY,
            channel: 0,
            key_release_ms: DEFAULT_KEY_RELEASE_MS,
        }
    }
}

/// Theme/UI settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    /// White key color
    pub white_key_color: String,
    /// Black key color
    pub black_key_color: String,
    /// Pressed key color
    pub pressed_key_color: String,
    /// Color of keys held by the chord lock
    pub locked_key_color: String,
    /// Border color
    pub border_color: String,
    /// Show note names on keys
    pub show_note_names: bool,
    /// Show help text
    pub show_help: bool,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            white_key_color: "white".to_string(),
            black_key_color: "dark_gray".to_string(),
            pressed_key_color: "cyan".to_string(),
            locked_key_color: "magenta".to_string(),
            border_color: "cyan".to_string(),
            show_note_names: true,
            show_help: true,
        }
    }
}

impl Theme {
    /// Parse a color string to ratatui Color
    pub fn parse_color(s: &str) -> ratatui::style::Color {
        use ratatui::style::Color;
        match s.to_lowercase().as_str() {
            "black" => Color::Black,
            "red" => Color::Red,
            "green" => Color::Green,
            "yellow" => Color::Yellow,
            "blue" => Color::Blue,
            "magenta" => Color::Magenta,
            "cyan" => Color::Cyan,
            "gray" | "grey" => Color::Gray,
            "dark_gray" | "dark_grey" | "darkgray" | "darkgrey" => Color::DarkGray,
            "light_red" | "lightred" => Color::LightRed,
            "light_green" | "lightgreen" => Color::LightGreen,
            "light_yellow" | "lightyellow" => Color::LightYellow,
            "light_blue" | "lightblue" => Color::LightBlue,
            "light_magenta" | "lightmagenta" => Color::LightMagenta,
            "light_cyan" | "lightcyan" => Color::LightCyan,
            "white" => Color::White,
            // Try parsing as RGB hex
            s if s.starts_with('#') && s.len() == 7 => {
                let channel = |range| s.get(range).and_then(|hex| u8::from_str_radix(hex, 16).ok());
                match (channel(1..3), channel(3..5), channel(5..7)) {
                    (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
                    _ => Color::White,
                }
            }
            _ => Color::White,
        }
    }

    pub fn white_key(&self) -> ratatui::style::Color {
        Self::parse_color(&self.white_key_color)
    }

    pub fn black_key(&self) -> ratatui::style::Color {
        Self::parse_color(&self.black_key_color)
    }

    pub fn pressed_key(&self) -> ratatui::style::Color {
        Self::parse_color(&self.pressed_key_color)
    }

    pub fn locked_key(&self) -> ratatui::style::Color {
        Self::parse_color(&self.locked_key_color)
    }

    pub fn border(&self) -> ratatui::style::Color {
        Self::parse_color(&self.border_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.keyboard.low, KeyId::from("C3"));
        assert_eq!(config.keyboard.velocity, 127);
        assert_eq!(config.keyboard.qwerty, QwertyMode::Piano);
    }

    #[test]
    fn test_default_config_file_parses() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.keyboard.high, KeyId::from("C5"));
        assert_eq!(config.theme.locked_key_color, "magenta");
    }

    #[test]
    fn test_numeric_range() {
        let config: Config = toml::from_str("[keyboard]\nlow = 36\nhigh = \"C4\"\nqwerty = \"tracker\"").unwrap();
        assert_eq!(config.keyboard.low, KeyId::Number(36));
        let options = config.to_keyboard_options();
        assert_eq!(options.range, (KeyId::Number(36), KeyId::from("C4")));
        assert_eq!(options.qwerty, QwertyMode::Tracker);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.keyboard.channel = 5;
        config.keyboard.low = KeyId::Number(40);
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.keyboard.channel, 5);
        assert_eq!(loaded.keyboard.low, KeyId::Number(40));
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::load_from(&dir.path().join("missing.toml")),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_color_parsing() {
        use ratatui::style::Color;
        assert_eq!(Theme::parse_color("cyan"), Color::Cyan);
        assert_eq!(Theme::parse_color("white"), Color::White);
        assert_eq!(Theme::parse_color("#ff0000"), Color::Rgb(255, 0, 0));
        assert_eq!(Theme::parse_color("#ff00zz"), Color::White);
    }

    #[test]
    fn test_color_with_multibyte_chars() {
        use ratatui::style::Color;
        // Seven bytes, but 'é' straddles the channel boundaries
        assert_eq!(Theme::parse_color("#aéaaa"), Color::White);

        let config: Config = toml::from_str("[theme]\nborder_color = \"#aéaaa\"").unwrap();
        assert_eq!(config.theme.border(), Color::White);
    }
}
