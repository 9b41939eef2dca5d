//! vibelang-piano - Playable Piano Keyboard for VibeLang
//!
//! A piano keyboard surface that turns pointer, touch and computer-key input
//! into note-on/note-off events. Features include:
//!
//! - Configurable key range with black keys nested under their white key
//! - Multi-touch and mouse-drag playing, one key per contact
//! - Shift chord lock that holds notes after the contacts lift
//! - Computer keyboard emulation (piano and tracker layouts)
//! - Arrow-key focus navigation
//! - Terminal rendering with ratatui
//! - Configurable via TOML file
//!
//! # Usage as a Library
//!
//! ```no_run
//! use vibelang_piano::{EventKind, InputEvent, Keyboard, KeyboardOptions};
//!
//! let mut keyboard = Keyboard::new(KeyboardOptions::default()).unwrap();
//!
//! keyboard.on(EventKind::NoteOn, |event| {
//!     println!("Play note {} with velocity {}", event.which(), event.value());
//! });
//!
//! // Programmatic playing
//! keyboard.note_on("C3").note_off("C3");
//!
//! // Pointer input in surface coordinates
//! keyboard.handle(InputEvent::PointerDown { x: 10.0, y: 100.0 });
//! keyboard.handle(InputEvent::PointerUp);
//! ```

pub mod bridge;
pub mod config;
pub mod contact;
pub mod engine;
pub mod error;
pub mod event;
pub mod input;
pub mod layout;
pub mod midi;
pub mod note;
pub mod os_keyboard;
pub mod qwerty;
pub mod state;
pub mod ui;
pub mod widget;

// Re-export main types
pub use config::{Config, KeyboardSettings, Theme};
pub use engine::{NoteEngine, Tick};
pub use error::{Error, Result};
pub use event::{EventKind, KeyboardEvent, SubscriptionId};
pub use input::{InputEvent, NavKey, Touch};
pub use layout::{Geometry, KeyDescriptor, KeyHandle, KeyLayout, KeyRange, PianoGeometry, Point, Rect};
pub use midi::{DummyMidiOutput, MidiMessage, MidiOutput};
pub use note::{note_name, parse_note_name, KeyId, NoteRef, C3_MIDI, DEFAULT_VELOCITY};
pub use os_keyboard::{is_available as os_keyboard_available, OsKeyEvent, OsKeyboardListener};
pub use qwerty::{KeyMapping, QwertyKeys, QwertyMode};
pub use ui::{piano_area, render_keyboard, PianoWidget, TerminalGeometry};
pub use widget::{KeyView, Keyboard, KeyboardOptions};
