//! Input events fed to the keyboard
//!
//! Whatever owns the window, terminal or touch surface translates its native
//! events into these and hands them to [`Keyboard::handle`](crate::widget::Keyboard::handle).

/// One touch point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Touch {
    pub id: u64,
    pub x: f32,
    pub y: f32,
}

impl Touch {
    pub fn new(id: u64, x: f32, y: f32) -> Self {
        Self { id, x, y }
    }
}

/// Keys used for focus navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Left,
    Right,
    Up,
    Down,
    /// Plays the focused key
    Space,
}

/// Input the keyboard reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Mouse button pressed over the keyboard
    PointerDown { x: f32, y: f32 },
    /// Mouse moved
    PointerMove { x: f32, y: f32 },
    /// Mouse button released
    PointerUp,
    /// Mouse left the surface
    PointerLeave,
    /// Touches began; carries every touch currently on the surface
    TouchStart(Vec<Touch>),
    /// Touches moved; carries every touch currently on the surface
    TouchMove(Vec<Touch>),
    /// Touches ended; carries the touches that remain
    TouchEnd(Vec<Touch>),
    /// Chord lock modifier (shift) pressed
    ModifierDown,
    /// Chord lock modifier released
    ModifierUp,
    /// The surface lost focus
    Blur,
    /// The surface changed size
    Resize,
    /// Navigation key pressed on the focused key
    NavKeyDown(NavKey),
    /// Navigation key released on the focused key
    NavKeyUp(NavKey),
    /// Computer key pressed (qwerty emulation)
    QwertyDown(char),
    /// Computer key released (qwerty emulation)
    QwertyUp(char),
}
