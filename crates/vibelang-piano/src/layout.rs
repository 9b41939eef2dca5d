//! Key layout table
//!
//! Builds the ordered list of keys for a contiguous note range and keeps
//! their screen rectangles. The list is ordered black keys first: black keys
//! sit on top of the white keys, so hit-testing must see them first.

use crate::error::{Error, Result};
use crate::note::{is_black, note_name, parse_note_name, KeyId, NoteRef, MIDI_MAX};
use std::collections::HashMap;

/// A point in surface coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle in surface coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            right: left + width,
            top,
            bottom: top + height,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Point-in-rectangle test, inclusive on all four edges
    pub fn contains(&self, p: Point) -> bool {
        self.left <= p.x && p.x <= self.right && self.top <= p.y && p.y <= self.bottom
    }
}

/// A contiguous, high-exclusive range of note numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRange {
    low: u8,
    high: u8,
}

impl KeyRange {
    /// Create a range covering `low..high`
    pub fn new(low: u8, high: u8) -> Result<Self> {
        if high <= low || high > MIDI_MAX + 1 {
            return Err(Error::InvalidRange { low, high });
        }
        Ok(Self { low, high })
    }

    /// Resolve two endpoints given as names or numbers
    pub fn from_ids(low: &KeyId, high: &KeyId) -> Result<Self> {
        Self::new(low.resolve()?, high.resolve()?)
    }

    pub fn low(&self) -> u8 {
        self.low
    }

    pub fn high(&self) -> u8 {
        self.high
    }

    /// Number of keys in the range
    pub fn len(&self) -> usize {
        (self.high - self.low) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, note: u8) -> bool {
        self.low <= note && note < self.high
    }

    /// Note numbers in ascending order
    pub fn notes(&self) -> impl Iterator<Item = u8> {
        self.low..self.high
    }
}

/// One key of the layout
#[derive(Debug, Clone, PartialEq)]
pub struct KeyDescriptor {
    /// MIDI note number
    pub note: u8,
    /// Display name, e.g. `C#3`
    pub name: String,
    /// Whether this is a black key
    pub is_black: bool,
    /// White key this black key is nested under (`None` for white keys and
    /// for a black key at the very start of the range)
    pub parent: Option<u8>,
    /// Current screen rectangle
    pub rect: Rect,
}

/// Opaque reference to a key element of a layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyHandle(usize);

/// Provides key rectangles for a layout
///
/// This is the boundary to whatever renders the keys: a GUI toolkit, a
/// terminal, or a fixed geometry for tests.
pub trait Geometry {
    /// Return one rectangle per key, in the same order as `keys`
    fn measure(&self, keys: &[KeyDescriptor]) -> Vec<Rect>;
}

/// Classic piano geometry: equal-width white keys, narrower and shorter
/// black keys centered on the right edge of their white key
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PianoGeometry {
    /// Top-left corner of the keyboard
    pub origin: Point,
    /// Width of a white key
    pub white_key_width: f32,
    /// Height of a white key
    pub white_key_height: f32,
    /// Black key width relative to a white key
    pub black_width_ratio: f32,
    /// Black key height relative to a white key
    pub black_height_ratio: f32,
}

impl Default for PianoGeometry {
    fn default() -> Self {
        Self {
            origin: Point::default(),
            white_key_width: 24.0,
            white_key_height: 120.0,
            black_width_ratio: 0.6,
            black_height_ratio: 0.6,
        }
    }
}

impl Geometry for PianoGeometry {
    fn measure(&self, keys: &[KeyDescriptor]) -> Vec<Rect> {
        let mut whites: Vec<u8> = keys.iter().filter(|k| !k.is_black).map(|k| k.note).collect();
        whites.sort_unstable();
        let white_index: HashMap<u8, usize> = whites.iter().enumerate().map(|(i, n)| (*n, i)).collect();

        let w = self.white_key_width;
        let black_w = w * self.black_width_ratio;
        let black_h = self.white_key_height * self.black_height_ratio;

        keys.iter()
            .map(|key| {
                if key.is_black {
                    let center = match key.parent.and_then(|p| white_index.get(&p)) {
                        Some(idx) => self.origin.x + (*idx as f32 + 1.0) * w,
                        None => self.origin.x,
                    };
                    Rect::new(center - black_w / 2.0, self.origin.y, black_w, black_h)
                } else {
                    let idx = white_index.get(&key.note).copied().unwrap_or(0);
                    Rect::new(self.origin.x + idx as f32 * w, self.origin.y, w, self.white_key_height)
                }
            })
            .collect()
    }
}

/// The key layout table
#[derive(Debug, Clone)]
pub struct KeyLayout {
    range: KeyRange,
    /// Black keys first, then white keys; each group ascending
    keys: Vec<KeyDescriptor>,
    /// Top-level elements in note order: white keys and parentless black keys
    elements: Vec<u8>,
}

impl KeyLayout {
    /// Build the key table for a range. Rectangles start out empty until
    /// [`refresh_geometry`](Self::refresh_geometry) runs.
    pub fn build(range: KeyRange) -> Self {
        let mut blacks = Vec::new();
        let mut whites = Vec::new();
        let mut elements = Vec::new();
        let mut prev_white: Option<u8> = None;

        for note in range.notes() {
            let black = is_black(note);
            let parent = if black { prev_white } else { None };
            if !black {
                prev_white = Some(note);
            }
            if parent.is_none() {
                elements.push(note);
            }

            let key = KeyDescriptor {
                note,
                name: note_name(note),
                is_black: black,
                parent,
                rect: Rect::default(),
            };
            if black {
                blacks.push(key);
            } else {
                whites.push(key);
            }
        }

        blacks.extend(whites);
        Self {
            range,
            keys: blacks,
            elements,
        }
    }

    pub fn range(&self) -> KeyRange {
        self.range
    }

    /// All keys, black keys first
    pub fn keys(&self) -> &[KeyDescriptor] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Look up a key by note number
    pub fn get(&self, note: u8) -> Option<&KeyDescriptor> {
        self.index_of(note).map(|i| &self.keys[i])
    }

    /// Handle to the key element for a note
    pub fn handle(&self, note: u8) -> Option<KeyHandle> {
        self.index_of(note).map(KeyHandle)
    }

    fn index_of(&self, note: u8) -> Option<usize> {
        self.keys.iter().position(|k| k.note == note)
    }

    /// White keys in note order
    pub fn white_keys(&self) -> impl Iterator<Item = &KeyDescriptor> {
        self.keys.iter().filter(|k| !k.is_black)
    }

    /// Black keys in note order
    pub fn black_keys(&self) -> impl Iterator<Item = &KeyDescriptor> {
        self.keys.iter().filter(|k| k.is_black)
    }

    /// Normalize a note reference to a note number, without a range check
    pub fn normalize(&self, note: &NoteRef) -> Option<u8> {
        match note {
            NoteRef::Name(name) => parse_note_name(name),
            NoteRef::Number(n) => u8::try_from(*n).ok().filter(|n| *n <= MIDI_MAX),
            NoteRef::Element(KeyHandle(idx)) => self.keys.get(*idx).map(|k| k.note),
        }
    }

    /// Resolve a note reference to a key of this layout
    pub fn resolve(&self, note: &NoteRef) -> Option<u8> {
        self.normalize(note).filter(|n| self.range.contains(*n))
    }

    /// Recompute all key rectangles and return them in key order
    pub fn refresh_geometry(&mut self, geometry: &dyn Geometry) -> Vec<Rect> {
        let rects = geometry.measure(&self.keys);
        for (key, rect) in self.keys.iter_mut().zip(rects.iter()) {
            key.rect = *rect;
        }
        rects
    }

    /// Next key element in traversal order
    ///
    /// A white key steps into its nested black key, a nested black key steps
    /// out to the white key after its parent.
    pub fn next_element(&self, note: u8) -> Option<u8> {
        let key = self.get(note)?;
        if let Some(child) = self.child_of(note) {
            return Some(child);
        }
        let anchor = key.parent.unwrap_or(note);
        let pos = self.elements.iter().position(|n| *n == anchor)?;
        self.elements.get(pos + 1).copied()
    }

    /// Previous key element in traversal order
    pub fn prev_element(&self, note: u8) -> Option<u8> {
        let key = self.get(note)?;
        if let Some(parent) = key.parent {
            return Some(parent);
        }
        let pos = self.elements.iter().position(|n| *n == note)?;
        let prev = *self.elements.get(pos.checked_sub(1)?)?;
        Some(self.child_of(prev).unwrap_or(prev))
    }

    /// First key element in traversal order
    pub fn first_element(&self) -> Option<u8> {
        self.elements.first().copied()
    }

    fn child_of(&self, note: u8) -> Option<u8> {
        self.black_keys().find(|k| k.parent == Some(note)).map(|k| k.note)
    }
}
