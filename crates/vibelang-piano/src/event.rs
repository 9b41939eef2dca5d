//! Keyboard events and their subscribers
//!
//! Events are delivered to callbacks registered per event kind, and to any
//! number of channel-backed streams.

use crate::midi::MidiMessage;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::fmt;

/// Kinds of events the keyboard emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    NoteOn,
    NoteOff,
}

/// A note transition emitted by the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyboardEvent {
    /// Note started, with velocity 0-127
    NoteOn { which: u8, value: u8 },
    /// Note stopped; value is always 0
    NoteOff { which: u8, value: u8 },
}

impl KeyboardEvent {
    pub fn note_on(which: u8, value: u8) -> Self {
        KeyboardEvent::NoteOn { which, value }
    }

    pub fn note_off(which: u8) -> Self {
        KeyboardEvent::NoteOff { which, value: 0 }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            KeyboardEvent::NoteOn { .. } => EventKind::NoteOn,
            KeyboardEvent::NoteOff { .. } => EventKind::NoteOff,
        }
    }

    /// Note number
    pub fn which(&self) -> u8 {
        match self {
            KeyboardEvent::NoteOn { which, .. } | KeyboardEvent::NoteOff { which, .. } => *which,
        }
    }

    /// Velocity
    pub fn value(&self) -> u8 {
        match self {
            KeyboardEvent::NoteOn { value, .. } | KeyboardEvent::NoteOff { value, .. } => *value,
        }
    }

    /// The equivalent MIDI message on a channel
    pub fn to_midi(&self, channel: u8) -> MidiMessage {
        match *self {
            KeyboardEvent::NoteOn { which, value } => MidiMessage::NoteOn {
                channel,
                note: which,
                velocity: value,
            },
            KeyboardEvent::NoteOff { which, .. } => MidiMessage::NoteOff { channel, note: which },
        }
    }
}

/// Handle returned by [`EventBus::on`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&KeyboardEvent)>;

/// Observer registry for keyboard events
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    listeners: Vec<(SubscriptionId, EventKind, Listener)>,
    streams: Vec<Sender<KeyboardEvent>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .field("streams", &self.streams.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `listener` for every event of `kind`
    pub fn on<F>(&mut self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: FnMut(&KeyboardEvent) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, kind, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _, _)| *l != id);
        self.listeners.len() != before
    }

    /// Open a stream receiving every event from now on
    ///
    /// Dropping the receiver unsubscribes it.
    pub fn stream(&mut self) -> Receiver<KeyboardEvent> {
        let (tx, rx) = unbounded();
        self.streams.push(tx);
        rx
    }

    pub fn emit(&mut self, event: &KeyboardEvent) {
        let kind = event.kind();
        for (_, _, listener) in self.listeners.iter_mut().filter(|(_, k, _)| *k == kind) {
            listener(event);
        }
        self.streams.retain(|tx| tx.send(*event).is_ok());
    }
}
