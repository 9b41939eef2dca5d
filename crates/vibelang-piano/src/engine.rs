//! Note resolution engine
//!
//! Owns the active note set and the chord lock. Each tick reconciles the
//! notes currently under live contacts with the notes that are on, and
//! produces edge-triggered transitions: notes that lost their contact go
//! off, notes that gained one go on, always offs before ons.
//!
//! While the chord lock is engaged, notes in its snapshot refuse to go off,
//! whichever path asks for it.

use crate::event::KeyboardEvent;
use crate::layout::KeyRange;
use crate::note::{DEFAULT_VELOCITY, MIDI_MAX};
use crate::state::{ActiveNotes, ChordLock};
use std::collections::BTreeSet;

/// Transitions produced by one tick, offs first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tick {
    pub events: Vec<KeyboardEvent>,
    /// Nothing is active anymore, so continuous tracking can stop
    pub idle: bool,
}

impl Tick {
    pub fn turned_on(&self) -> BTreeSet<u8> {
        self.events
            .iter()
            .filter(|e| matches!(e, KeyboardEvent::NoteOn { .. }))
            .map(|e| e.which())
            .collect()
    }

    pub fn turned_off(&self) -> BTreeSet<u8> {
        self.events
            .iter()
            .filter(|e| matches!(e, KeyboardEvent::NoteOff { .. }))
            .map(|e| e.which())
            .collect()
    }
}

/// The note resolution engine
#[derive(Debug, Clone)]
pub struct NoteEngine {
    range: KeyRange,
    active: ActiveNotes,
    lock: ChordLock,
}

impl NoteEngine {
    pub fn new(range: KeyRange) -> Self {
        Self {
            range,
            active: ActiveNotes::new(),
            lock: ChordLock::default(),
        }
    }

    pub fn range(&self) -> KeyRange {
        self.range
    }

    /// Switch to a new key range, releasing everything first
    pub fn set_range(&mut self, range: KeyRange) -> Vec<KeyboardEvent> {
        self.lock.release();
        let released = self.release_all();
        self.range = range;
        released
    }

    pub fn active(&self) -> &ActiveNotes {
        &self.active
    }

    pub fn is_active(&self, note: u8) -> bool {
        self.active.contains(note)
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_engaged()
    }

    /// Whether the chord lock currently protects a note
    pub fn is_protected(&self, note: u8) -> bool {
        self.lock.protects(note)
    }

    /// Turn a note on. Returns `None` if it is outside the range or already on.
    pub fn note_on(&mut self, note: u8, value: u8) -> Option<KeyboardEvent> {
        if !self.range.contains(note) {
            log::trace!("ignoring note on {}: outside {:?}", note, self.range);
            return None;
        }
        if !self.active.insert(note) {
            return None;
        }
        self.lock.extend(note);
        Some(KeyboardEvent::note_on(note, value.min(MIDI_MAX)))
    }

    /// Turn a note off. Returns `None` if it is outside the range, locked,
    /// or not on.
    pub fn note_off(&mut self, note: u8) -> Option<KeyboardEvent> {
        if !self.range.contains(note) {
            log::trace!("ignoring note off {}: outside {:?}", note, self.range);
            return None;
        }
        if self.lock.protects(note) {
            log::trace!("note {} is held by the chord lock", note);
            return None;
        }
        if !self.active.remove(note) {
            return None;
        }
        Some(KeyboardEvent::note_off(note))
    }

    /// Turn several notes on, pairing them with velocities
    ///
    /// When there are fewer velocities than notes, the last velocity is
    /// repeated; with none at all the default velocity is used.
    pub fn note_on_many(&mut self, notes: &[u8], values: &[u8]) -> Vec<KeyboardEvent> {
        notes
            .iter()
            .enumerate()
            .filter_map(|(i, note)| {
                let value = values.get(i).or(values.last()).copied().unwrap_or(DEFAULT_VELOCITY);
                self.note_on(*note, value)
            })
            .collect()
    }

    /// Turn off every active note that the chord lock does not protect
    pub fn release_all(&mut self) -> Vec<KeyboardEvent> {
        self.active
            .snapshot()
            .into_iter()
            .filter_map(|note| self.note_off(note))
            .collect()
    }

    /// Engage the chord lock on the currently active notes
    pub fn engage_lock(&mut self) -> bool {
        let engaged = self.lock.engage(&self.active);
        if engaged {
            log::debug!("chord lock engaged on {:?}", self.active.as_set());
        }
        engaged
    }

    /// Release the chord lock. The caller follows up with a tick so notes
    /// without a contact go off.
    pub fn release_lock(&mut self) -> bool {
        let released = self.lock.release();
        if let Some(notes) = &released {
            log::debug!("chord lock released from {:?}", notes);
        }
        released.is_some()
    }

    /// Reconcile the active set with the notes under live contacts
    ///
    /// Notes in `ignore` are never turned off by this tick; the emulated key
    /// path uses that to keep the notes it holds.
    pub fn tick(&mut self, candidates: &BTreeSet<u8>, ignore: Option<&BTreeSet<u8>>) -> Tick {
        let notes_off: Vec<u8> = self
            .active
            .iter()
            .filter(|n| !candidates.contains(n))
            .filter(|n| ignore.map_or(true, |ignore| !ignore.contains(n)))
            .collect();
        let notes_on: Vec<u8> = candidates.iter().copied().filter(|n| !self.active.contains(*n)).collect();

        let mut events = Vec::with_capacity(notes_off.len() + notes_on.len());
        events.extend(notes_off.into_iter().filter_map(|n| self.note_off(n)));
        events.extend(notes_on.into_iter().filter_map(|n| self.note_on(n, DEFAULT_VELOCITY)));

        Tick {
            events,
            idle: self.active.is_empty(),
        }
    }
}
