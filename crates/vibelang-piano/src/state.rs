//! Active note state and the chord lock

use std::collections::BTreeSet;

/// The set of notes currently sounding
///
/// A note is in here iff a note-on was emitted for it and no note-off since.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveNotes {
    notes: BTreeSet<u8>,
}

impl ActiveNotes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the note was already active
    pub(crate) fn insert(&mut self, note: u8) -> bool {
        self.notes.insert(note)
    }

    /// Returns false if the note was not active
    pub(crate) fn remove(&mut self, note: u8) -> bool {
        self.notes.remove(&note)
    }

    pub fn contains(&self, note: u8) -> bool {
        self.notes.contains(&note)
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    /// Active notes in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.notes.iter().copied()
    }

    /// Copy of the set, safe to iterate while the set changes
    pub fn snapshot(&self) -> Vec<u8> {
        self.iter().collect()
    }

    pub fn as_set(&self) -> &BTreeSet<u8> {
        &self.notes
    }
}

/// Chord lock: while engaged, the captured notes cannot be turned off
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChordLock {
    snapshot: Option<BTreeSet<u8>>,
}

impl ChordLock {
    /// Capture the currently active notes. Returns false if already engaged.
    pub fn engage(&mut self, active: &ActiveNotes) -> bool {
        if self.snapshot.is_some() {
            return false;
        }
        self.snapshot = Some(active.as_set().clone());
        true
    }

    /// Drop the snapshot, returning what it protected
    pub fn release(&mut self) -> Option<BTreeSet<u8>> {
        self.snapshot.take()
    }

    pub fn is_engaged(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Whether a note-off for this note must be refused
    pub fn protects(&self, note: u8) -> bool {
        self.snapshot.as_ref().is_some_and(|s| s.contains(&note))
    }

    /// Add a note turned on while the lock is held
    pub fn extend(&mut self, note: u8) {
        if let Some(snapshot) = self.snapshot.as_mut() {
            snapshot.insert(note);
        }
    }
}
