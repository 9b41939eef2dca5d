//! vibe-piano - Playable Terminal Piano for VibeLang
//!
//! Play the keyboard with the mouse, the computer keyboard or arrow keys.
//! Hold shift to keep a chord sounding after letting go.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use crossterm::{
    event::{
        self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture, Event, KeyCode,
        KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Clear};
use std::io::{self, stdout};
use std::path::Path;
use std::time::{Duration, Instant};

use vibelang_piano::{
    config::{Config, Theme},
    input::{InputEvent, NavKey},
    note::KeyId,
    os_keyboard::{is_available as os_keyboard_available, OsKeyEvent, OsKeyboardListener},
    qwerty::QwertyMode,
    ui::{piano_area, render_keyboard, TerminalGeometry},
    widget::Keyboard,
};

/// Rows used by the keyboard widget, border and status line included
const KEYBOARD_HEIGHT: u16 = 14;

#[derive(Parser)]
#[command(name = "vibe-piano")]
#[command(author, version, about = "Playable terminal piano for VibeLang", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path (default: ~/.config/vibe-piano/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Key range: lowest key and the key after the highest (e.g. C3 C5 or 48 72)
    #[arg(short, long, num_args = 2, value_names = ["LOW", "HIGH"])]
    range: Option<Vec<String>>,

    /// Computer keyboard emulation
    #[arg(short, long, value_enum)]
    qwerty: Option<QwertyArg>,

    /// Arrow key focus navigation (space plays the focused key)
    #[arg(long)]
    a11y: Option<bool>,

    /// Velocity for emulated key presses (1-127)
    #[arg(long)]
    velocity: Option<u8>,

    /// MIDI channel (0-15)
    #[arg(long)]
    channel: Option<u8>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a default configuration file
    Init,
    /// Show the configuration file path
    ConfigPath,
}

#[derive(Clone, Copy, ValueEnum)]
enum QwertyArg {
    Off,
    Piano,
    Tracker,
}

impl From<QwertyArg> for QwertyMode {
    fn from(arg: QwertyArg) -> Self {
        match arg {
            QwertyArg::Off => QwertyMode::Off,
            QwertyArg::Piano => QwertyMode::Piano,
            QwertyArg::Tracker => QwertyMode::Tracker,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init) => {
            let path = Config::create_default_config_file()?;
            println!("Created default config at: {}", path.display());
            return Ok(());
        }
        Some(Commands::ConfigPath) => {
            let path = Config::config_path()?;
            println!("{}", path.display());
            return Ok(());
        }
        None => {}
    }

    // Load config
    let mut config = if let Some(path) = cli.config {
        Config::load_from(Path::new(&path)).with_context(|| format!("loading config from {}", path))?
    } else {
        Config::load_or_default()
    };

    // Apply CLI overrides
    if let Some(range) = cli.range {
        if let [low, high] = range.as_slice() {
            config.keyboard.low = parse_key_id(low);
            config.keyboard.high = parse_key_id(high);
        }
    }
    if let Some(qwerty) = cli.qwerty {
        config.keyboard.qwerty = qwerty.into();
    }
    if let Some(a11y) = cli.a11y {
        config.keyboard.a11y = a11y;
    }
    if let Some(velocity) = cli.velocity {
        config.keyboard.velocity = velocity.clamp(1, 127);
    }
    if let Some(channel) = cli.channel {
        config.keyboard.channel = channel.min(15);
    }

    // Validate the range before touching the terminal
    let keyboard = Keyboard::new(config.to_keyboard_options()).context("invalid keyboard range")?;

    run_tui(config, keyboard)
}

/// A number is a note number, anything else a note name
fn parse_key_id(s: &str) -> KeyId {
    s.parse::<u8>().map(KeyId::Number).unwrap_or_else(|_| KeyId::from(s))
}

/// Where the keyboard widget sits on screen: full width, vertically centered
fn keyboard_area(screen: Rect) -> Rect {
    let height = KEYBOARD_HEIGHT.min(screen.height);
    Rect {
        x: screen.x,
        y: screen.y + (screen.height - height) / 2,
        width: screen.width,
        height,
    }
}

fn fit_to_screen(keyboard: &mut Keyboard, width: u16, height: u16) {
    let area = keyboard_area(Rect::new(0, 0, width, height));
    keyboard.set_geometry(Box::new(TerminalGeometry::new(piano_area(area))));
}

fn run_tui(config: Config, mut keyboard: Keyboard) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (width, height) = crossterm::terminal::size()?;
    fit_to_screen(&mut keyboard, width, height);

    // Create OS keyboard listener
    let os_keyboard = if os_keyboard_available() {
        OsKeyboardListener::new()
    } else {
        None
    };
    if os_keyboard.is_none() {
        log::info!("OS keyboard listener unavailable, using terminal key events");
    }

    // Main loop
    let result = run_event_loop(&mut terminal, &mut keyboard, os_keyboard.as_ref(), &config);

    // Cleanup
    keyboard.disable();
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableFocusChange
    )?;

    result
}

/// Terminal-side input state that the keyboard itself does not track
struct TerminalInput {
    has_focus: bool,
    /// Shift as last reported through mouse modifiers
    shift_held: bool,
    /// Space press time, for terminals that never report the release
    space_down: Option<Instant>,
}

fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    keyboard: &mut Keyboard,
    os_keyboard: Option<&OsKeyboardListener>,
    config: &Config,
) -> Result<()> {
    let theme: &Theme = &config.theme;
    let release_after = config.key_release_duration();
    let mut input = TerminalInput {
        has_focus: true,
        shift_held: false,
        space_down: None,
    };

    loop {
        // Draw
        terminal.draw(|frame| {
            let area = frame.area();

            // Clear the screen with a dark background
            frame.render_widget(Clear, area);
            let bg_block = Block::default().style(Style::default().bg(Color::Rgb(20, 20, 30)));
            frame.render_widget(bg_block, area);

            render_keyboard(
                frame,
                keyboard_area(area),
                keyboard,
                os_keyboard.is_some() && input.has_focus,
                theme,
            );
        })?;

        // Process OS keyboard events only when focused
        if let Some(os_kb) = os_keyboard {
            while let Some(event) = os_kb.try_recv() {
                if !input.has_focus {
                    continue;
                }
                if event == OsKeyEvent::Press('\x1b') {
                    return Ok(());
                }
                if let Some(event) = event.to_input() {
                    keyboard.handle(event);
                }
            }
        } else {
            // Auto-release for terminals without key-up detection
            keyboard.release_stale_keys(release_after);
            if input.space_down.is_some_and(|t| t.elapsed() > release_after) {
                input.space_down = None;
                keyboard.handle(InputEvent::NavKeyUp(NavKey::Space));
            }
        }

        // Poll for terminal events
        if !event::poll(Duration::from_millis(16))? {
            continue;
        }

        match event::read()? {
            Event::FocusGained => {
                input.has_focus = true;
            }
            Event::FocusLost => {
                input.has_focus = false;
                input.shift_held = false;
                input.space_down = None;
                keyboard.handle(InputEvent::Blur);
            }
            Event::Resize(width, height) => {
                fit_to_screen(keyboard, width, height);
                keyboard.handle(InputEvent::Resize);
            }
            Event::Mouse(mouse) => {
                handle_mouse(keyboard, &mut input, mouse, os_keyboard.is_none());
            }
            Event::Key(key) => {
                input.has_focus = true;
                if is_quit(&key) {
                    return Ok(());
                }
                handle_key(keyboard, &mut input, key, os_keyboard.is_none());
            }
            _ => {}
        }
    }
}

fn is_quit(key: &KeyEvent) -> bool {
    key.kind == KeyEventKind::Press
        && (key.code == KeyCode::Esc
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)))
}

fn handle_mouse(keyboard: &mut Keyboard, input: &mut TerminalInput, mouse: MouseEvent, track_shift: bool) {
    // Without the OS listener, shift is only visible on mouse events
    if track_shift {
        let shift = mouse.modifiers.contains(KeyModifiers::SHIFT);
        if shift != input.shift_held {
            input.shift_held = shift;
            keyboard.handle(if shift {
                InputEvent::ModifierDown
            } else {
                InputEvent::ModifierUp
            });
        }
    }

    let (x, y) = (mouse.column as f32, mouse.row as f32);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            keyboard.handle(InputEvent::PointerDown { x, y });
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            keyboard.handle(InputEvent::PointerMove { x, y });
        }
        MouseEventKind::Up(MouseButton::Left) => {
            keyboard.handle(InputEvent::PointerUp);
        }
        _ => {}
    }
}

fn handle_key(keyboard: &mut Keyboard, input: &mut TerminalInput, key: KeyEvent, terminal_keys: bool) {
    let nav = match key.code {
        KeyCode::Left => Some(NavKey::Left),
        KeyCode::Right => Some(NavKey::Right),
        KeyCode::Up => Some(NavKey::Up),
        KeyCode::Down => Some(NavKey::Down),
        _ => None,
    };
    if let Some(nav) = nav {
        if key.kind != KeyEventKind::Release {
            keyboard.handle(InputEvent::NavKeyDown(nav));
        }
        return;
    }

    // The OS listener reports space and letters itself
    if !terminal_keys {
        return;
    }

    match (key.code, key.kind) {
        (KeyCode::Char(' '), KeyEventKind::Press) => {
            if input.space_down.replace(Instant::now()).is_none() {
                keyboard.handle(InputEvent::NavKeyDown(NavKey::Space));
            }
        }
        (KeyCode::Char(' '), KeyEventKind::Repeat) => {
            input.space_down = Some(Instant::now());
        }
        (KeyCode::Char(' '), KeyEventKind::Release) => {
            if input.space_down.take().is_some() {
                keyboard.handle(InputEvent::NavKeyUp(NavKey::Space));
            }
        }
        // Repeats refresh the auto-release timer
        (KeyCode::Char(c), KeyEventKind::Press | KeyEventKind::Repeat) => {
            keyboard.handle(InputEvent::QwertyDown(c));
        }
        (KeyCode::Char(c), KeyEventKind::Release) => {
            keyboard.handle(InputEvent::QwertyUp(c));
        }
        _ => {}
    }
}
