//! MIDI messages and note outputs
//!
//! The keyboard forwards every emitted event to a [`MidiOutput`]. Device
//! backends live elsewhere; the default output only logs.

/// Raw three-byte MIDI message: status, note, velocity
pub type RawMidi = [u8; 3];

/// Status nibble for note off
pub const NOTE_OFF: u8 = 0x80;

/// Status nibble for note on
pub const NOTE_ON: u8 = 0x90;

/// MIDI message types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note on: channel, note, velocity
    NoteOn { channel: u8, note: u8, velocity: u8 },
    /// Note off: channel, note
    NoteOff { channel: u8, note: u8 },
}

impl MidiMessage {
    /// Convert to raw MIDI bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_raw().to_vec()
    }

    pub fn to_raw(&self) -> RawMidi {
        match self {
            MidiMessage::NoteOn { channel, note, velocity } => {
                [NOTE_ON | (channel & 0x0F), *note & 0x7F, *velocity & 0x7F]
            }
            MidiMessage::NoteOff { channel, note } => [NOTE_OFF | (channel & 0x0F), *note & 0x7F, 0],
        }
    }

    /// Decode a note message
    ///
    /// A note-on with velocity 0 is a note-off. Anything that is not a note
    /// message yields `None`.
    pub fn from_raw([status, note, velocity]: RawMidi) -> Option<Self> {
        let channel = status & 0x0F;
        let note = note & 0x7F;
        match status & 0xF0 {
            NOTE_OFF => Some(MidiMessage::NoteOff { channel, note }),
            NOTE_ON if velocity == 0 => Some(MidiMessage::NoteOff { channel, note }),
            NOTE_ON => Some(MidiMessage::NoteOn {
                channel,
                note,
                velocity: velocity & 0x7F,
            }),
            _ => None,
        }
    }
}

/// Where emitted notes are routed
pub trait MidiOutput {
    /// Send a note on message
    fn note_on(&self, channel: u8, note: u8, velocity: u8);

    /// Send a note off message
    fn note_off(&self, channel: u8, note: u8);

    /// Get the port name
    fn port_name(&self) -> &str;

    /// Check if connected
    fn is_connected(&self) -> bool;
}

/// Dummy MIDI output (used when no output is supplied)
pub struct DummyMidiOutput;

impl MidiOutput for DummyMidiOutput {
    fn note_on(&self, channel: u8, note: u8, velocity: u8) {
        log::debug!("MIDI Note On: ch={} note={} vel={}", channel, note, velocity);
    }

    fn note_off(&self, channel: u8, note: u8) {
        log::debug!("MIDI Note Off: ch={} note={}", channel, note);
    }

    fn port_name(&self) -> &str {
        "dummy"
    }

    fn is_connected(&self) -> bool {
        false
    }
}
