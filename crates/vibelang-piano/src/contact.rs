//! Contact tracking
//!
//! Resolves live pointer and touch contacts to the keys under them. Every
//! contact claims at most one key and every key is claimed by at most one
//! contact.

use crate::layout::{KeyDescriptor, Point};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Identity of a contact, stable across ticks for the same physical pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerId {
    /// The mouse pointer
    Mouse,
    /// A touch point, by its platform identifier
    Touch(u64),
}

/// One live contact for a single resolution tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub id: PointerId,
    /// Current position; `None` reuses the last position seen for `id`
    pub position: Option<Point>,
}

impl Contact {
    pub fn new(id: PointerId, position: Point) -> Self {
        Self {
            id,
            position: Some(position),
        }
    }

    pub fn mouse(x: f32, y: f32) -> Self {
        Self::new(PointerId::Mouse, Point::new(x, y))
    }

    pub fn touch(id: u64, x: f32, y: f32) -> Self {
        Self::new(PointerId::Touch(id), Point::new(x, y))
    }

    /// The same contact without a fresh position
    pub fn stale(id: PointerId) -> Self {
        Self { id, position: None }
    }
}

/// Outcome of one resolution: which note each contact landed on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    assignments: Vec<(PointerId, Option<u8>)>,
}

impl Resolution {
    /// Note claimed by a contact, if any
    pub fn note_for(&self, id: PointerId) -> Option<u8> {
        self.assignments.iter().find(|(c, _)| *c == id).and_then(|(_, n)| *n)
    }

    /// All claimed notes
    pub fn notes(&self) -> BTreeSet<u8> {
        self.assignments.iter().filter_map(|(_, n)| *n).collect()
    }

    /// Contact assignments in input order
    pub fn assignments(&self) -> &[(PointerId, Option<u8>)] {
        &self.assignments
    }
}

/// Hit-tests contacts against key rectangles
#[derive(Debug, Clone, Default)]
pub struct ContactTracker {
    last_seen: HashMap<PointerId, Point>,
}

impl ContactTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve contacts against keys
    ///
    /// Keys are tested in the order given, which must put black keys first.
    /// A contact is consumed by the first unclaimed key it hits. A key
    /// already claimed by an earlier contact is skipped, so the contact
    /// falls through to the next key under it.
    pub fn resolve(&mut self, contacts: &[Contact], keys: &[KeyDescriptor]) -> Resolution {
        let positions: Vec<Option<Point>> = contacts
            .iter()
            .map(|c| match c.position {
                Some(p) => {
                    self.last_seen.insert(c.id, p);
                    Some(p)
                }
                None => self.last_seen.get(&c.id).copied(),
            })
            .collect();

        let live: HashSet<PointerId> = contacts.iter().map(|c| c.id).collect();
        self.last_seen.retain(|id, _| live.contains(id));

        let mut assigned: Vec<Option<u8>> = vec![None; contacts.len()];

        for key in keys {
            for (i, pos) in positions.iter().enumerate() {
                if assigned[i].is_some() {
                    continue;
                }
                let Some(p) = pos else { continue };
                if key.rect.contains(*p) {
                    assigned[i] = Some(key.note);
                    // One contact per key
                    break;
                }
            }
        }

        Resolution {
            assignments: contacts
                .iter()
                .zip(assigned)
                .map(|(c, a)| (c.id, a))
                .collect(),
        }
    }

    /// Last known position of a contact
    pub fn last_position(&self, id: PointerId) -> Option<Point> {
        self.last_seen.get(&id).copied()
    }

    pub fn clear(&mut self) {
        self.last_seen.clear();
    }
}
