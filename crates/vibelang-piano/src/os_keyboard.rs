//! OS-level keyboard input using rdev
//!
//! Terminals rarely report key releases, and never report shift on its own.
//! Listening at the OS level gives both, which the qwerty emulation and the
//! chord lock need.

use crate::input::{InputEvent, NavKey};
use crossbeam_channel::{unbounded, Receiver, Sender};
use rdev::{listen, Event, EventType, Key};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Keyboard events from the OS-level listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsKeyEvent {
    /// A key was pressed
    Press(char),
    /// A key was released
    Release(char),
    /// Either shift key went down
    ShiftDown,
    /// Either shift key went up
    ShiftUp,
}

impl OsKeyEvent {
    /// Translate into keyboard input
    ///
    /// Space drives focus navigation; everything else goes to the qwerty
    /// emulation. Escape has no keyboard meaning and maps to `None`.
    pub fn to_input(self) -> Option<InputEvent> {
        match self {
            OsKeyEvent::Press(' ') => Some(InputEvent::NavKeyDown(NavKey::Space)),
            OsKeyEvent::Release(' ') => Some(InputEvent::NavKeyUp(NavKey::Space)),
            OsKeyEvent::Press('\x1b') | OsKeyEvent::Release('\x1b') => None,
            OsKeyEvent::Press(c) => Some(InputEvent::QwertyDown(c)),
            OsKeyEvent::Release(c) => Some(InputEvent::QwertyUp(c)),
            OsKeyEvent::ShiftDown => Some(InputEvent::ModifierDown),
            OsKeyEvent::ShiftUp => Some(InputEvent::ModifierUp),
        }
    }
}

/// OS-level keyboard listener that captures key press and release events
pub struct OsKeyboardListener {
    /// Channel receiver for keyboard events
    event_rx: Receiver<OsKeyEvent>,
    /// Shutdown flag
    shutdown: Arc<AtomicBool>,
    /// Listener thread handle
    _thread: JoinHandle<()>,
}

impl OsKeyboardListener {
    /// Start the OS keyboard listener
    ///
    /// Returns None if the listener couldn't be started (e.g., on systems without X11)
    pub fn new() -> Option<Self> {
        if !is_available() {
            return None;
        }

        let (tx, rx) = unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let thread = thread::spawn(move || {
            run_listener(tx, shutdown_clone);
        });

        // Give the thread a moment to start
        thread::sleep(std::time::Duration::from_millis(100));

        Some(Self {
            event_rx: rx,
            shutdown,
            _thread: thread,
        })
    }

    /// Try to receive a keyboard event (non-blocking)
    pub fn try_recv(&self) -> Option<OsKeyEvent> {
        self.event_rx.try_recv().ok()
    }
}

impl Drop for OsKeyboardListener {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

/// Map an rdev key (physical US position) to the character it types
pub fn key_to_char(key: Key) -> Option<char> {
    let c = match key {
        Key::KeyA => 'a',
        Key::KeyB => 'b',
        Key::KeyC => 'c',
        Key::KeyD => 'd',
        Key::KeyE => 'e',
        Key::KeyF => 'f',
        Key::KeyG => 'g',
        Key::KeyH => 'h',
        Key::KeyI => 'i',
        Key::KeyJ => 'j',
        Key::KeyK => 'k',
        Key::KeyL => 'l',
        Key::KeyM => 'm',
        Key::KeyN => 'n',
        Key::KeyO => 'o',
        Key::KeyP => 'p',
        Key::KeyQ => 'q',
        Key::KeyR => 'r',
        Key::KeyS => 's',
        Key::KeyT => 't',
        Key::KeyU => 'u',
        Key::KeyV => 'v',
        Key::KeyW => 'w',
        Key::KeyX => 'x',
        Key::KeyY => 'y',
        Key::KeyZ => 'z',
        Key::Num0 => '0',
        Key::Num1 => '1',
        Key::Num2 => '2',
        Key::Num3 => '3',
        Key::Num4 => '4',
        Key::Num5 => '5',
        Key::Num6 => '6',
        Key::Num7 => '7',
        Key::Num8 => '8',
        Key::Num9 => '9',
        Key::SemiColon => ';',
        Key::Quote => '\'',
        Key::Comma => ',',
        Key::Dot => '.',
        Key::Slash => '/',

        // Control keys
        Key::Escape => '\x1b',
        Key::Space => ' ',

        _ => return None,
    };
    Some(c)
}

/// Run the rdev listener (blocking - runs in its own thread)
fn run_listener(tx: Sender<OsKeyEvent>, shutdown: Arc<AtomicBool>) {
    let callback = move |event: Event| {
        if shutdown.load(Ordering::Relaxed) {
            return;
        }

        let translated = match event.event_type {
            EventType::KeyPress(Key::ShiftLeft | Key::ShiftRight) => Some(OsKeyEvent::ShiftDown),
            EventType::KeyRelease(Key::ShiftLeft | Key::ShiftRight) => Some(OsKeyEvent::ShiftUp),
            EventType::KeyPress(key) => key_to_char(key).map(OsKeyEvent::Press),
            EventType::KeyRelease(key) => key_to_char(key).map(OsKeyEvent::Release),
            _ => None,
        };
        if let Some(event) = translated {
            let _ = tx.send(event);
        }
    };

    // This blocks until an error occurs
    if let Err(e) = listen(callback) {
        log::error!("OS keyboard listener error: {:?}", e);
    }
}

/// Check if the OS keyboard listener is likely to work on this system
pub fn is_available() -> bool {
    // On Linux, rdev requires X11 or Wayland
    #[cfg(target_os = "linux")]
    {
        std::env::var("DISPLAY").is_ok() || std::env::var("WAYLAND_DISPLAY").is_ok()
    }

    #[cfg(not(target_os = "linux"))]
    {
        true
    }
}
