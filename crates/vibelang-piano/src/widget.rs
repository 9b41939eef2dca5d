//! Keyboard widget
//!
//! The facade tying everything together: it owns the layout, turns input
//! events into engine ticks, runs the chord lock and focus navigation, and
//! delivers every note transition to subscribers and to the output.

use crate::bridge::EmulatedKeyBridge;
use crate::contact::{Contact, ContactTracker};
use crate::engine::NoteEngine;
use crate::error::Result;
use crate::event::{EventBus, EventKind, KeyboardEvent, SubscriptionId};
use crate::input::{InputEvent, NavKey, Touch};
use crate::layout::{Geometry, KeyDescriptor, KeyLayout, KeyRange, PianoGeometry};
use crate::midi::{DummyMidiOutput, MidiOutput, RawMidi};
use crate::note::{key_slug, KeyId, NoteRef, DEFAULT_VELOCITY};
use crate::qwerty::{QwertyKeys, QwertyMode};
use crossbeam_channel::Receiver;
use std::collections::BTreeSet;
use std::time::Duration;

/// Construction options
#[derive(Debug, Clone, PartialEq)]
pub struct KeyboardOptions {
    /// Keys to show, high end exclusive
    pub range: (KeyId, KeyId),
    /// Enable focus navigation with arrow keys and space
    pub a11y: bool,
    /// Computer keyboard emulation
    pub qwerty: QwertyMode,
    /// Velocity for emulated key presses
    pub velocity: u8,
    /// MIDI channel used for the output
    pub channel: u8,
}

impl Default for KeyboardOptions {
    fn default() -> Self {
        Self {
            range: (KeyId::from("C3"), KeyId::from("C4")),
            a11y: false,
            qwerty: QwertyMode::Off,
            velocity: DEFAULT_VELOCITY,
            channel: 0,
        }
    }
}

/// Visual state of one key
#[derive(Debug, Clone, Copy)]
pub struct KeyView<'a> {
    pub key: &'a KeyDescriptor,
    /// The note is in the active set
    pub active: bool,
    /// The chord lock holds the note
    pub locked: bool,
    /// The key has navigation focus
    pub focused: bool,
}

impl KeyView<'_> {
    /// Style slug, e.g. `f-sharp`
    pub fn slug(&self) -> String {
        key_slug(self.key.note)
    }
}

/// An interactive piano keyboard
pub struct Keyboard {
    options: KeyboardOptions,
    layout: KeyLayout,
    geometry: Box<dyn Geometry>,
    output: Box<dyn MidiOutput>,
    engine: NoteEngine,
    tracker: ContactTracker,
    bridge: EmulatedKeyBridge,
    qwerty: Option<QwertyKeys>,
    events: EventBus,
    enabled: bool,
    /// Pointer input is being followed outside of the initial press
    tracking: bool,
    mouse_down: bool,
    /// Contacts of the most recent tick
    last_contacts: Vec<Contact>,
    focused: Option<u8>,
}

impl Keyboard {
    /// Build the keyboard and enable input
    pub fn new(options: KeyboardOptions) -> Result<Self> {
        let range = KeyRange::from_ids(&options.range.0, &options.range.1)?;
        let qwerty = match options.qwerty {
            QwertyMode::Off => None,
            mode => Some(
                QwertyKeys::new(mode)
                    .with_velocity(options.velocity)
                    .with_channel(options.channel),
            ),
        };

        let mut keyboard = Self {
            layout: KeyLayout::build(range),
            geometry: Box::new(PianoGeometry::default()),
            output: Box::new(DummyMidiOutput),
            engine: NoteEngine::new(range),
            tracker: ContactTracker::new(),
            bridge: EmulatedKeyBridge::new(range.low()),
            qwerty,
            events: EventBus::new(),
            enabled: false,
            tracking: false,
            mouse_down: false,
            last_contacts: Vec::new(),
            focused: None,
            options,
        };
        keyboard.enable();
        Ok(keyboard)
    }

    /// Use a different geometry provider
    pub fn with_geometry<G: Geometry + 'static>(mut self, geometry: G) -> Self {
        self.set_geometry(Box::new(geometry));
        self
    }

    /// Route notes to a different output
    pub fn with_output<O: MidiOutput + 'static>(mut self, output: O) -> Self {
        self.output = Box::new(output);
        self
    }

    /// Replace the geometry provider and recompute rectangles
    pub fn set_geometry(&mut self, geometry: Box<dyn Geometry>) -> &mut Self {
        self.geometry = geometry;
        self.update()
    }

    /// Rebuild the layout for a new range, releasing all notes first
    pub fn set_range(&mut self, low: impl Into<KeyId>, high: impl Into<KeyId>) -> Result<&mut Self> {
        let (low, high) = (low.into(), high.into());
        let range = KeyRange::from_ids(&low, &high)?;

        for event in self.engine.set_range(range) {
            self.dispatch(event);
        }
        if let Some(qwerty) = self.qwerty.as_mut() {
            qwerty.release_all();
        }
        self.bridge.set_offset(range.low());
        self.layout = KeyLayout::build(range);
        self.tracker.clear();
        self.last_contacts.clear();
        self.tracking = false;
        self.mouse_down = false;
        self.focused = None;
        self.options.range = (low, high);
        log::debug!("keyboard range set to {:?}", range);
        Ok(self.update())
    }

    pub fn options(&self) -> &KeyboardOptions {
        &self.options
    }

    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    pub fn output(&self) -> &dyn MidiOutput {
        self.output.as_ref()
    }

    /// Subscribe to one kind of event
    pub fn on<F>(&mut self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: FnMut(&KeyboardEvent) + 'static,
    {
        self.events.on(kind, listener)
    }

    /// Unsubscribe a listener
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        self.events.off(id)
    }

    /// Stream of every event emitted from now on
    pub fn stream(&mut self) -> Receiver<KeyboardEvent> {
        self.events.stream()
    }

    /// Turn a note on with the default velocity
    pub fn note_on(&mut self, note: impl Into<NoteRef>) -> &mut Self {
        self.note_on_with_velocity(note, DEFAULT_VELOCITY)
    }

    /// Turn a note on with a velocity
    pub fn note_on_with_velocity(&mut self, note: impl Into<NoteRef>, value: u8) -> &mut Self {
        let note = note.into();
        let Some(n) = self.layout.resolve(&note) else {
            log::trace!("ignoring note on for {:?}", note);
            return self;
        };
        if let Some(event) = self.engine.note_on(n, value) {
            self.dispatch(event);
        }
        self
    }

    /// Turn several notes on; velocities pair up by position and the last
    /// one repeats for any remaining notes
    pub fn note_on_many<I, N>(&mut self, notes: I, values: &[u8]) -> &mut Self
    where
        I: IntoIterator<Item = N>,
        N: Into<NoteRef>,
    {
        for (i, note) in notes.into_iter().enumerate() {
            let value = values.get(i).or(values.last()).copied().unwrap_or(DEFAULT_VELOCITY);
            self.note_on_with_velocity(note, value);
        }
        self
    }

    /// Turn a note off
    pub fn note_off(&mut self, note: impl Into<NoteRef>) -> &mut Self {
        let note = note.into();
        let Some(n) = self.layout.resolve(&note) else {
            log::trace!("ignoring note off for {:?}", note);
            return self;
        };
        if let Some(event) = self.engine.note_off(n) {
            self.dispatch(event);
        }
        self
    }

    /// Turn every active note off, except what the chord lock holds
    pub fn note_off_all(&mut self) -> &mut Self {
        for event in self.engine.release_all() {
            self.dispatch(event);
        }
        self
    }

    /// Feed one message from an external key emulator
    pub fn feed_emulated(&mut self, raw: RawMidi) -> &mut Self {
        if let Some(event) = self.bridge.feed(raw, &mut self.engine) {
            self.dispatch(event);
        }
        self
    }

    /// Recompute key rectangles
    pub fn update(&mut self) -> &mut Self {
        self.layout.refresh_geometry(self.geometry.as_ref());
        self
    }

    /// Start reacting to input
    pub fn enable(&mut self) -> &mut Self {
        if self.enabled {
            return self;
        }
        self.enabled = true;
        self.bridge.clear();
        log::debug!("keyboard enabled");
        self.update()
    }

    /// Stop reacting to input and release every note
    pub fn disable(&mut self) -> &mut Self {
        if !self.enabled {
            return self;
        }
        self.engine.release_lock();
        self.release_emulated_keys();
        self.update_notes(Vec::new(), None);
        self.tracker.clear();
        self.tracking = false;
        self.mouse_down = false;
        self.enabled = false;
        log::debug!("keyboard disabled");
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether pointer moves are currently followed
    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    pub fn is_locked(&self) -> bool {
        self.engine.is_locked()
    }

    pub fn is_active(&self, note: u8) -> bool {
        self.engine.is_active(note)
    }

    /// Active notes in ascending order
    pub fn active_notes(&self) -> impl Iterator<Item = u8> + '_ {
        self.engine.active().iter()
    }

    /// Emulated notes currently held
    pub fn pressed_keys(&self) -> &BTreeSet<u8> {
        self.bridge.pressed()
    }

    pub fn qwerty(&self) -> Option<&QwertyKeys> {
        self.qwerty.as_ref()
    }

    pub fn focused(&self) -> Option<u8> {
        self.focused
    }

    /// Move navigation focus to a key
    pub fn focus(&mut self, note: impl Into<NoteRef>) -> &mut Self {
        if let Some(n) = self.layout.resolve(&note.into()) {
            self.focused = Some(n);
        }
        self
    }

    /// Visual state of a key
    pub fn view<'a>(&self, key: &'a KeyDescriptor) -> KeyView<'a> {
        KeyView {
            key,
            active: self.engine.is_active(key.note),
            locked: self.engine.is_protected(key.note),
            focused: self.focused == Some(key.note),
        }
    }

    /// Visual state of every key, black keys first
    pub fn keys(&self) -> impl Iterator<Item = KeyView<'_>> {
        self.layout.keys().iter().map(|k| self.view(k))
    }

    /// Release emulated keys not refreshed within `timeout`
    ///
    /// Only needed when the input source never reports key releases.
    pub fn release_stale_keys(&mut self, timeout: Duration) -> &mut Self {
        let expired = match self.qwerty.as_mut() {
            Some(qwerty) => qwerty.release_expired(timeout),
            None => Vec::new(),
        };
        for raw in expired {
            self.feed_emulated(raw);
        }
        self
    }

    /// Handle one input event
    pub fn handle(&mut self, event: InputEvent) -> &mut Self {
        if !self.enabled {
            log::trace!("keyboard disabled, dropping {:?}", event);
            return self;
        }

        match event {
            InputEvent::PointerDown { x, y } => {
                self.mouse_down = true;
                self.tracking = true;
                self.update_notes(vec![Contact::mouse(x, y)], None);
            }
            InputEvent::PointerMove { x, y } => {
                if self.tracking && self.mouse_down {
                    self.update_notes(vec![Contact::mouse(x, y)], None);
                }
            }
            InputEvent::PointerUp | InputEvent::PointerLeave => {
                if self.tracking {
                    self.update_notes(Vec::new(), None);
                }
                self.mouse_down = false;
            }
            InputEvent::TouchStart(touches) => {
                self.tracking = true;
                self.update_notes(touch_contacts(&touches), None);
            }
            InputEvent::TouchMove(touches) | InputEvent::TouchEnd(touches) => {
                if self.tracking {
                    self.update_notes(touch_contacts(&touches), None);
                }
            }
            InputEvent::ModifierDown => {
                self.engine.engage_lock();
            }
            InputEvent::ModifierUp => {
                if self.engine.release_lock() {
                    let contacts = self.last_contacts.iter().map(|c| Contact::stale(c.id)).collect();
                    let ignore = self.bridge.pressed().clone();
                    self.update_notes(contacts, Some(ignore));
                }
            }
            InputEvent::Blur => {
                self.engine.release_lock();
                self.mouse_down = false;
                self.release_emulated_keys();
                self.update_notes(Vec::new(), None);
            }
            InputEvent::Resize => {
                self.update();
            }
            InputEvent::NavKeyDown(key) => self.navigate(key, true),
            InputEvent::NavKeyUp(key) => self.navigate(key, false),
            InputEvent::QwertyDown(c) => {
                if let Some(raw) = self.qwerty.as_mut().and_then(|q| q.key_down(c)) {
                    self.feed_emulated(raw);
                }
            }
            InputEvent::QwertyUp(c) => {
                if let Some(raw) = self.qwerty.as_mut().and_then(|q| q.key_up(c)) {
                    self.feed_emulated(raw);
                }
            }
        }
        self
    }

    /// One resolution tick over the given contacts
    fn update_notes(&mut self, contacts: Vec<Contact>, ignore: Option<BTreeSet<u8>>) {
        let resolution = self.tracker.resolve(&contacts, self.layout.keys());
        self.last_contacts = contacts;

        let tick = self.engine.tick(&resolution.notes(), ignore.as_ref());
        for event in tick.events {
            self.dispatch(event);
        }

        if tick.idle && self.tracking {
            log::trace!("no active notes, pointer tracking stopped");
            self.tracking = false;
        }
    }

    fn navigate(&mut self, key: NavKey, down: bool) {
        if !self.options.a11y {
            return;
        }
        let Some(current) = self.focused else {
            if down && key != NavKey::Space {
                self.focused = self.layout.first_element();
            }
            return;
        };

        match (key, down) {
            (NavKey::Space, true) => {
                self.note_on(current);
            }
            (NavKey::Space, false) => {
                self.note_off(current);
            }
            (NavKey::Right | NavKey::Up, true) => {
                if let Some(next) = self.layout.next_element(current) {
                    self.focused = Some(next);
                }
            }
            (NavKey::Left | NavKey::Down, true) => {
                if let Some(prev) = self.layout.prev_element(current) {
                    self.focused = Some(prev);
                }
            }
            _ => {}
        }
    }

    fn release_emulated_keys(&mut self) {
        let released = match self.qwerty.as_mut() {
            Some(qwerty) => qwerty.release_all(),
            None => Vec::new(),
        };
        for raw in released {
            self.feed_emulated(raw);
        }
        self.bridge.clear();
    }

    fn dispatch(&mut self, event: KeyboardEvent) {
        log::debug!("{:?}", event);
        match event {
            KeyboardEvent::NoteOn { which, value } => {
                if self.options.a11y {
                    self.focused = Some(which);
                }
                self.output.note_on(self.options.channel, which, value);
            }
            KeyboardEvent::NoteOff { which, .. } => {
                self.output.note_off(self.options.channel, which);
            }
        }
        self.events.emit(&event);
    }
}

fn touch_contacts(touches: &[Touch]) -> Vec<Contact> {
    touches
        .iter()
        .map(|t| Contact::touch(t.id, t.x, t.y))
        .collect()
}

impl std::fmt::Debug for Keyboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyboard")
            .field("range", &self.layout.range())
            .field("active", &self.engine.active())
            .field("locked", &self.engine.is_locked())
            .field("enabled", &self.enabled)
            .field("tracking", &self.tracking)
            .finish()
    }
}
