//! Note numbers, note names and note references
//!
//! Note numbers follow the MIDI convention with `octave = note / 12 - 1`,
//! so C3 is 48, C4 is 60 and A4 is 69.

use crate::error::{Error, Result};
use crate::layout::KeyHandle;
use serde::{Deserialize, Serialize};
use std::fmt;

/// MIDI note number for C3
pub const C3_MIDI: u8 = 48;

/// Velocity used when a note is turned on without an explicit value
pub const DEFAULT_VELOCITY: u8 = 127;

/// Highest valid MIDI note / velocity value
pub const MIDI_MAX: u8 = 127;

const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// Convert a MIDI note number to a note name
pub fn note_name(note: u8) -> String {
    let octave = (note / 12) as i8 - 1;
    let name = NOTE_NAMES[(note % 12) as usize];
    format!("{}{}", name, octave)
}

/// Whether a note sits on a black key (C#, D#, F#, G#, A#)
pub fn is_black(note: u8) -> bool {
    matches!(note % 12, 1 | 3 | 6 | 8 | 10)
}

/// Style slug for a key, e.g. `c` or `f-sharp`
pub fn key_slug(note: u8) -> String {
    NOTE_NAMES[(note % 12) as usize].to_lowercase().replace('#', "-sharp")
}

/// Parse a note name like `C3`, `c#3`, `Db4` or `A-1` into a MIDI note number
///
/// Returns `None` for anything that is not a note name or falls outside 0-127.
pub fn parse_note_name(name: &str) -> Option<u8> {
    let mut chars = name.trim().chars();
    let mut pitch: i32 = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest = chars.as_str();
    let octave_start = rest.find(|c: char| c == '-' || c.is_ascii_digit())?;
    let (accidentals, octave) = rest.split_at(octave_start);
    for c in accidentals.chars() {
        match c {
            '#' | '♯' => pitch += 1,
            'b' | '♭' => pitch -= 1,
            _ => return None,
        }
    }

    let octave: i32 = octave.parse().ok()?;
    let note = (octave + 1) * 12 + pitch;
    u8::try_from(note).ok().filter(|n| *n <= MIDI_MAX)
}

/// A key range endpoint, given either as a note name or as a note number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyId {
    /// Absolute MIDI note number
    Number(u8),
    /// Note name such as `C3`
    Name(String),
}

impl KeyId {
    /// Resolve to an absolute note number
    ///
    /// Numbers may go one past 127 so a range can end after the top key.
    pub fn resolve(&self) -> Result<u8> {
        match self {
            KeyId::Number(n) if *n <= MIDI_MAX + 1 => Ok(*n),
            KeyId::Number(n) => Err(Error::InvalidNote(n.to_string())),
            KeyId::Name(name) => parse_note_name(name).ok_or_else(|| Error::InvalidNote(name.clone())),
        }
    }
}

impl From<u8> for KeyId {
    fn from(n: u8) -> Self {
        KeyId::Number(n)
    }
}

impl From<&str> for KeyId {
    fn from(name: &str) -> Self {
        KeyId::Name(name.to_string())
    }
}

impl From<String> for KeyId {
    fn from(name: String) -> Self {
        KeyId::Name(name)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyId::Number(n) => write!(f, "{}", n),
            KeyId::Name(name) => f.write_str(name),
        }
    }
}

/// Anything the keyboard accepts as "a note": a name, a number, or a key element
///
/// References are resolved by [`KeyLayout::resolve`](crate::layout::KeyLayout::resolve);
/// references that do not resolve to a key of the current layout are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteRef {
    /// Note name such as `C3`
    Name(String),
    /// Note number (anything outside 0-127 never resolves)
    Number(i32),
    /// A key element of the layout
    Element(KeyHandle),
}

impl From<&str> for NoteRef {
    fn from(name: &str) -> Self {
        NoteRef::Name(name.to_string())
    }
}

impl From<String> for NoteRef {
    fn from(name: String) -> Self {
        NoteRef::Name(name)
    }
}

impl From<u8> for NoteRef {
    fn from(n: u8) -> Self {
        NoteRef::Number(n as i32)
    }
}

impl From<i32> for NoteRef {
    fn from(n: i32) -> Self {
        NoteRef::Number(n)
    }
}

impl From<KeyHandle> for NoteRef {
    fn from(handle: KeyHandle) -> Self {
        NoteRef::Element(handle)
    }
}

impl From<&NoteRef> for NoteRef {
    fn from(note: &NoteRef) -> Self {
        note.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_name() {
        assert_eq!(note_name(48), "C3");
        assert_eq!(note_name(60), "C4");
        assert_eq!(note_name(69), "A4");
        assert_eq!(note_name(49), "C#3");
        assert_eq!(note_name(0), "C-1");
    }

    #[test]
    fn test_parse_note_name() {
        assert_eq!(parse_note_name("C3"), Some(48));
        assert_eq!(parse_note_name("c4"), Some(60));
        assert_eq!(parse_note_name("C#3"), Some(49));
        assert_eq!(parse_note_name("Db3"), Some(49));
        assert_eq!(parse_note_name("bb3"), Some(58));
        assert_eq!(parse_note_name("C-1"), Some(0));
        assert_eq!(parse_note_name("G9"), Some(127));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_note_name(""), None);
        assert_eq!(parse_note_name("H3"), None);
        assert_eq!(parse_note_name("C"), None);
        assert_eq!(parse_note_name("Cx3"), None);
        assert_eq!(parse_note_name("G#9"), None);
        assert_eq!(parse_note_name("Cb-1"), None);
    }

    #[test]
    fn test_black_keys() {
        let blacks: Vec<u8> = (48..60).filter(|n| is_black(*n)).collect();
        assert_eq!(blacks, vec![49, 51, 54, 56, 58]);
    }

    #[test]
    fn test_key_slug() {
        assert_eq!(key_slug(48), "c");
        assert_eq!(key_slug(54), "f-sharp");
    }

    #[test]
    fn test_key_id_resolve() {
        assert_eq!(KeyId::from("C3").resolve().unwrap(), 48);
        assert_eq!(KeyId::from(60).resolve().unwrap(), 60);
        assert!(KeyId::from("nope").resolve().is_err());
        assert_eq!(KeyId::from(128).resolve().unwrap(), 128);
        assert!(KeyId::from(200).resolve().is_err());
    }
}
