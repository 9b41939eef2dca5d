//! Error types for vibelang-piano

use thiserror::Error;

/// Result type alias for vibelang-piano operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in vibelang-piano
///
/// Routine input problems (unknown notes, keys outside the layout, notes that
/// are already on or off) are not errors; the keyboard ignores them.
#[derive(Debug, Error)]
pub enum Error {
    /// A range endpoint could not be parsed as a note
    #[error("Invalid note: {0}")]
    InvalidNote(String),

    /// The key range is inverted or empty
    #[error("Invalid key range: {low}..{high} (high must be above low)")]
    InvalidRange { low: u8, high: u8 },

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}
