//! Emulated key bridge
//!
//! Feeds raw note messages from a key emulator into the engine, so computer
//! keys and pointers share one active note set and one event vocabulary.

use crate::engine::NoteEngine;
use crate::event::KeyboardEvent;
use crate::midi::{MidiMessage, RawMidi};
use std::collections::BTreeSet;

/// Adapts emulator messages to engine note-on/note-off calls
#[derive(Debug, Clone, Default)]
pub struct EmulatedKeyBridge {
    /// Lowest key of the layout; emulator notes are relative to it
    offset: u8,
    pressed: BTreeSet<u8>,
}

impl EmulatedKeyBridge {
    pub fn new(offset: u8) -> Self {
        Self {
            offset,
            pressed: BTreeSet::new(),
        }
    }

    pub fn offset(&self) -> u8 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: u8) {
        self.offset = offset;
        self.pressed.clear();
    }

    /// Notes currently held down through the emulator
    pub fn pressed(&self) -> &BTreeSet<u8> {
        &self.pressed
    }

    pub fn clear(&mut self) {
        self.pressed.clear();
    }

    /// Apply one emulator message
    ///
    /// Note-off, or note-on with velocity 0, releases; note-on presses.
    /// Other messages and notes outside the engine's range are ignored.
    pub fn feed(&mut self, raw: RawMidi, engine: &mut NoteEngine) -> Option<KeyboardEvent> {
        let message = MidiMessage::from_raw(raw)?;
        match message {
            MidiMessage::NoteOff { note, .. } => {
                let note = self.absolute(note)?;
                self.pressed.remove(&note);
                engine.note_off(note)
            }
            MidiMessage::NoteOn { note, velocity, .. } => {
                let note = self.absolute(note)?;
                if !engine.range().contains(note) {
                    log::trace!("ignoring emulated note {}: outside {:?}", note, engine.range());
                    return None;
                }
                self.pressed.insert(note);
                engine.note_on(note, velocity)
            }
        }
    }

    fn absolute(&self, relative: u8) -> Option<u8> {
        self.offset.checked_add(relative).filter(|n| *n <= 127)
    }
}
