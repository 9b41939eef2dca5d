//! Computer keyboard emulation of a MIDI keyboard
//!
//! Turns character key presses and releases into raw MIDI note messages.
//! Notes are relative to 0; the bridge shifts them onto the layout.

use crate::midi::{MidiMessage, RawMidi};
use crate::note::DEFAULT_VELOCITY;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Default note release timeout in milliseconds
/// Must be longer than the OS key repeat delay (typically 300-500ms)
pub const DEFAULT_KEY_RELEASE_MS: u64 = 400;

/// Which computer keys play which notes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QwertyMode {
    /// No emulation
    #[default]
    Off,
    /// Home row plays white keys, the row above plays black keys
    Piano,
    /// Two tracker-style octaves on the bottom and top rows
    Tracker,
}

/// A key mapping entry: computer key character -> note offset
#[derive(Debug, Clone)]
pub struct KeyMapping {
    /// The character representing this key (lowercase)
    pub key_char: char,
    /// The character to display (for rendering, usually uppercase)
    pub display_char: char,
    /// Note offset from the lowest key
    pub note_offset: u8,
    /// Whether this is a black key (sharp/flat)
    pub is_black_key: bool,
}

impl KeyMapping {
    fn new(key_char: char, note_offset: u8, is_black_key: bool) -> Self {
        Self {
            key_char,
            display_char: key_char.to_ascii_uppercase(),
            note_offset,
            is_black_key,
        }
    }
}

impl QwertyMode {
    /// Key mappings for this mode
    ///
    /// Piano mode:
    /// ```text
    ///     W E   T Y U   O P
    ///    A S D F G H J K L ; '
    ///    C D E F G A B C D E F
    /// ```
    ///
    /// Tracker mode:
    /// ```text
    ///     2 3   5 6 7   9 0          S D   G H J
    ///    Q W E R T Y U I O P        Z X C V B N M
    ///    C D E F G A B C D E        C D E F G A B   (one octave lower)
    /// ```
    pub fn mappings(&self) -> Vec<KeyMapping> {
        let rows: &[(&str, u8)] = match self {
            QwertyMode::Off => &[],
            QwertyMode::Piano => &[("awsedftgyhujkolp;'", 0)],
            QwertyMode::Tracker => &[("zsxdcvgbhnjm", 0), ("q2w3er5t6y7ui9o0p", 12)],
        };

        rows.iter()
            .flat_map(|(row, base)| {
                row.chars().enumerate().map(move |(i, c)| {
                    let offset = base + i as u8;
                    KeyMapping::new(c, offset, crate::note::is_black(offset))
                })
            })
            .collect()
    }
}

/// Emulated MIDI keyboard driven by computer keys
#[derive(Debug, Clone)]
pub struct QwertyKeys {
    mode: QwertyMode,
    mappings: Vec<KeyMapping>,
    velocity: u8,
    channel: u8,
    /// Held keys with the time they were last pressed or repeated
    held: HashMap<char, Instant>,
}

impl QwertyKeys {
    pub fn new(mode: QwertyMode) -> Self {
        Self {
            mode,
            mappings: mode.mappings(),
            velocity: DEFAULT_VELOCITY,
            channel: 0,
            held: HashMap::new(),
        }
    }

    pub fn with_velocity(mut self, velocity: u8) -> Self {
        self.velocity = velocity.min(127);
        self
    }

    pub fn with_channel(mut self, channel: u8) -> Self {
        self.channel = channel.min(15);
        self
    }

    pub fn mode(&self) -> QwertyMode {
        self.mode
    }

    pub fn mappings(&self) -> &[KeyMapping] {
        &self.mappings
    }

    /// Get the mapping for a given key character
    pub fn get_mapping(&self, c: char) -> Option<&KeyMapping> {
        let c = c.to_ascii_lowercase();
        self.mappings.iter().find(|m| m.key_char == c)
    }

    /// Handle a key press
    ///
    /// Returns a note-on message on the first press; repeats only refresh
    /// the key's timestamp.
    pub fn key_down(&mut self, c: char) -> Option<RawMidi> {
        let c = c.to_ascii_lowercase();
        let offset = self.get_mapping(c)?.note_offset;
        let previous = self.held.insert(c, Instant::now());
        if previous.is_some() {
            return None;
        }
        Some(
            MidiMessage::NoteOn {
                channel: self.channel,
                note: offset,
                velocity: self.velocity,
            }
            .to_raw(),
        )
    }

    /// Handle a key release
    pub fn key_up(&mut self, c: char) -> Option<RawMidi> {
        let c = c.to_ascii_lowercase();
        let offset = self.get_mapping(c)?.note_offset;
        self.held.remove(&c)?;
        Some(self.release(offset))
    }

    /// Release every held key
    pub fn release_all(&mut self) -> Vec<RawMidi> {
        let keys: Vec<char> = self.held.keys().copied().collect();
        keys.into_iter().filter_map(|c| self.key_up(c)).collect()
    }

    /// Release keys that have not been pressed or repeated within `timeout`
    ///
    /// For terminals that never report key releases.
    pub fn release_expired(&mut self, timeout: Duration) -> Vec<RawMidi> {
        let now = Instant::now();
        let expired: Vec<char> = self
            .held
            .iter()
            .filter(|(_, pressed)| now.duration_since(**pressed) > timeout)
            .map(|(c, _)| *c)
            .collect();
        expired.into_iter().filter_map(|c| self.key_up(c)).collect()
    }

    pub fn is_held(&self, c: char) -> bool {
        self.held.contains_key(&c.to_ascii_lowercase())
    }

    fn release(&self, offset: u8) -> RawMidi {
        MidiMessage::NoteOff {
            channel: self.channel,
            note: offset,
        }
        .to_raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_piano_layout_notes() {
        let keys = QwertyKeys::new(QwertyMode::Piano);
        assert_eq!(keys.get_mapping('a').unwrap().note_offset, 0);
        assert_eq!(keys.get_mapping('w').unwrap().note_offset, 1);
        assert!(keys.get_mapping('w').unwrap().is_black_key);
        assert_eq!(keys.get_mapping('k').unwrap().note_offset, 12);
        assert_eq!(keys.get_mapping('\'').unwrap().note_offset, 17);
    }

    #[test]
    fn test_tracker_layout_notes() {
        let keys = QwertyKeys::new(QwertyMode::Tracker);
        assert_eq!(keys.get_mapping('z').unwrap().note_offset, 0);
        assert_eq!(keys.get_mapping('m').unwrap().note_offset, 11);
        assert_eq!(keys.get_mapping('q').unwrap().note_offset, 12);
        assert_eq!(keys.get_mapping('2').unwrap().note_offset, 13);
        assert_eq!(keys.get_mapping('p').unwrap().note_offset, 28);
    }

    #[test]
    fn test_off_mode_has_no_keys() {
        let mut keys = QwertyKeys::new(QwertyMode::Off);
        assert!(keys.mappings().is_empty());
        assert_eq!(keys.key_down('a'), None);
    }

    #[test]
    fn test_key_down_up() {
        let mut keys = QwertyKeys::new(QwertyMode::Piano).with_velocity(90);

        assert_eq!(keys.key_down('s'), Some([0x90, 2, 90]));
        assert!(keys.is_held('S'));

        // Key repeat does not retrigger
        assert_eq!(keys.key_down('S'), None);

        assert_eq!(keys.key_up('s'), Some([0x80, 2, 0]));
        assert_eq!(keys.key_up('s'), None);
        assert_eq!(keys.key_down('x'), None);
    }

    #[test]
    fn test_release_all() {
        let mut keys = QwertyKeys::new(QwertyMode::Piano).with_channel(2);
        keys.key_down('a');
        keys.key_down('d');
        let mut released = keys.release_all();
        released.sort();
        assert_eq!(released, vec![[0x82, 0, 0], [0x82, 4, 0]]);
        assert!(keys.release_all().is_empty());
    }

    #[test]
    fn test_release_expired() {
        let mut keys = QwertyKeys::new(QwertyMode::Piano);
        keys.key_down('a');
        assert!(keys.release_expired(Duration::from_secs(60)).is_empty());
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(keys.release_expired(Duration::from_millis(1)), vec![[0x80, 0, 0]]);
        assert!(!keys.is_held('a'));
    }
}
