//! TUI rendering for the piano keyboard
//!
//! Keys are drawn from the rectangles of the keyboard's layout, so what is
//! painted is exactly what pointer hit-testing sees. [`TerminalGeometry`]
//! lays keys out in terminal cells; mouse columns and rows can then be fed
//! to the keyboard unchanged.

use crate::config::Theme;
use crate::layout::{Geometry, KeyDescriptor, Rect as KeyRect};
use crate::note::note_name;
use crate::widget::{KeyView, Keyboard};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::collections::HashMap;

/// Default width of a white key in cells
pub const KEY_WIDTH: u16 = 6;

/// Black keys cover this share of the key height
const BLACK_KEY_HEIGHT: f32 = 0.6;

/// Key geometry in terminal cells
///
/// White keys are `key_width` cells wide and centered in the area; black
/// keys are three cells wide, straddling the boundary after their white key.
/// Rectangle edges are inclusive, so a white key spans `key_width - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalGeometry {
    area: Rect,
    key_width: u16,
}

impl TerminalGeometry {
    pub fn new(area: Rect) -> Self {
        Self {
            area,
            key_width: KEY_WIDTH,
        }
    }

    pub fn with_key_width(mut self, key_width: u16) -> Self {
        self.key_width = key_width.max(3);
        self
    }

    pub fn area(&self) -> Rect {
        self.area
    }
}

impl Geometry for TerminalGeometry {
    fn measure(&self, keys: &[KeyDescriptor]) -> Vec<KeyRect> {
        let mut whites: Vec<u8> = keys.iter().filter(|k| !k.is_black).map(|k| k.note).collect();
        whites.sort_unstable();
        let white_index: HashMap<u8, usize> = whites.iter().enumerate().map(|(i, n)| (*n, i)).collect();

        // Narrow the keys when the terminal is too small, down to 3 cells
        let fit = match whites.len() {
            0 => self.key_width,
            n => (self.area.width / n as u16).max(3),
        };
        let kw = self.key_width.min(fit) as f32;
        let total = kw * whites.len() as f32;
        let x0 = self.area.x as f32 + ((self.area.width as f32 - total) / 2.0).max(0.0).floor();
        let y0 = self.area.y as f32;

        let height = self.area.height.max(1) as f32;
        let black_rows = (height * BLACK_KEY_HEIGHT).round().clamp(1.0, (height - 1.0).max(1.0));

        keys.iter()
            .map(|key| {
                if key.is_black {
                    let boundary = match key.parent.and_then(|p| white_index.get(&p)) {
                        Some(idx) => x0 + (*idx as f32 + 1.0) * kw,
                        None => x0,
                    };
                    KeyRect::new(boundary - 1.0, y0, 2.0, black_rows - 1.0)
                } else {
                    let idx = white_index.get(&key.note).copied().unwrap_or(0) as f32;
                    KeyRect::new(x0 + idx * kw, y0, kw - 1.0, height - 1.0)
                }
            })
            .collect()
    }
}

/// Area the keys occupy inside a keyboard widget drawn at `area`
///
/// Excludes the border and the status line.
pub fn piano_area(area: Rect) -> Rect {
    Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(3),
    }
}

/// Keyboard widget for rendering in ratatui
pub struct PianoWidget<'a> {
    keyboard: &'a Keyboard,
    os_keyboard_active: bool,
    theme: Theme,
}

impl<'a> PianoWidget<'a> {
    pub fn new(keyboard: &'a Keyboard) -> Self {
        Self {
            keyboard,
            os_keyboard_active: false,
            theme: Theme::default(),
        }
    }

    /// Set whether OS keyboard input is active
    pub fn os_keyboard_active(mut self, active: bool) -> Self {
        self.os_keyboard_active = active;
        self
    }

    pub fn theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }
}

impl Widget for PianoWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 4 || area.width < 8 {
            return;
        }
        render_keyboard_to_buffer(buf, area, self.keyboard, self.os_keyboard_active, &self.theme);
    }
}

/// Render the keyboard into a frame
pub fn render_keyboard(frame: &mut Frame, area: Rect, keyboard: &Keyboard, os_keyboard_active: bool, theme: &Theme) {
    frame.render_widget(
        PianoWidget::new(keyboard)
            .os_keyboard_active(os_keyboard_active)
            .theme(theme.clone()),
        area,
    );
}

fn render_keyboard_to_buffer(buf: &mut Buffer, area: Rect, keyboard: &Keyboard, os_keyboard_active: bool, theme: &Theme) {
    let range = keyboard.layout().range();
    let input_mode = if os_keyboard_active { "OS" } else { "Terminal" };
    let mut title = format!(
        " Piano [{}-{}] ({}) ",
        note_name(range.low()),
        note_name(range.high() - 1),
        input_mode
    );
    if !keyboard.is_enabled() {
        title.push_str("disabled ");
    }

    let mut block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border()));
    if keyboard.is_locked() {
        block = block.title(Line::from(" LOCK ").right_aligned().style(Style::default().fg(theme.locked_key())));
    }
    block.render(area, buf);

    let piano = piano_area(area);
    let lines: Vec<Line> = key_grid(piano, keyboard, theme)
        .iter()
        .map(|row| Line::from(build_spans_from_chars(row)))
        .collect();
    Paragraph::new(lines).render(piano, buf);

    let status = Rect {
        x: piano.x,
        y: piano.y + piano.height,
        width: piano.width,
        height: 1,
    };
    Paragraph::new(status_line(keyboard, theme)).render(status, buf);
}

/// One `(char, style)` cell per position of the piano area
fn key_grid(piano: Rect, keyboard: &Keyboard, theme: &Theme) -> Vec<Vec<(char, Style)>> {
    let mut grid = vec![vec![(' ', Style::default()); piano.width as usize]; piano.height as usize];
    let low = keyboard.layout().range().low();
    let lowest_white = keyboard.layout().white_keys().map(|k| k.note).min();
    let labels: HashMap<u8, char> = keyboard
        .qwerty()
        .map(|q| {
            q.mappings()
                .iter()
                .filter_map(|m| low.checked_add(m.note_offset).map(|n| (n, m.display_char)))
                .collect()
        })
        .unwrap_or_default();

    // Whites first so black keys paint over them
    let views: Vec<KeyView> = keyboard.keys().collect();
    for view in views.iter().filter(|v| !v.key.is_black).chain(views.iter().filter(|v| v.key.is_black)) {
        let Some(cells) = CellSpan::clip(view.key.rect, piano) else {
            continue;
        };
        let style = key_style(view, theme);
        for row in cells.top..=cells.bottom {
            for col in cells.left..=cells.right {
                grid[row][col] = (' ', style);
            }
        }

        if view.key.is_black {
            if let Some(c) = labels.get(&view.key.note) {
                put_centered(&mut grid[cells.top], cells.left, cells.right, &c.to_string(), style);
            }
            continue;
        }

        if Some(view.key.note) != lowest_white {
            let edge = Style::default().fg(Color::Black).bg(theme.white_key());
            for row in cells.top..=cells.bottom {
                grid[row][cells.left] = ('|', edge);
            }
        }
        let inner_left = (cells.left + 1).min(cells.right);
        if theme.show_note_names {
            put_centered(&mut grid[cells.bottom], inner_left, cells.right, &view.key.name, style);
        }
        if let Some(c) = labels.get(&view.key.note) {
            let row = if theme.show_note_names { cells.bottom.checked_sub(1) } else { Some(cells.bottom) };
            if let Some(row) = row.filter(|r| *r >= cells.top) {
                put_centered(&mut grid[row], inner_left, cells.right, &c.to_string(), style.add_modifier(Modifier::BOLD));
            }
        }
    }
    grid
}

fn key_style(view: &KeyView, theme: &Theme) -> Style {
    let bg = if view.locked {
        theme.locked_key()
    } else if view.active {
        theme.pressed_key()
    } else if view.key.is_black {
        theme.black_key()
    } else {
        theme.white_key()
    };
    let fg = if view.key.is_black { Color::White } else { Color::Black };

    let style = Style::default().fg(fg).bg(bg);
    if view.focused {
        style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    } else {
        style
    }
}

fn status_line<'a>(keyboard: &Keyboard, theme: &Theme) -> Line<'a> {
    let playing: Vec<String> = keyboard.active_notes().map(note_name).collect();
    let playing = if playing.is_empty() { "-".to_string() } else { playing.join(" ") };

    let mut spans = vec![
        Span::styled("Playing: ", Style::default().fg(Color::DarkGray)),
        Span::styled(playing, Style::default().fg(theme.pressed_key()).add_modifier(Modifier::BOLD)),
    ];
    if let Some(focused) = keyboard.focused() {
        spans.push(Span::styled(format!("  Focus: {}", note_name(focused)), Style::default().fg(Color::DarkGray)));
    }
    if theme.show_help {
        spans.push(Span::styled(
            "  Shift: hold chord  Esc: quit",
            Style::default().fg(Color::DarkGray),
        ));
    }
    Line::from(spans)
}

/// Inclusive cell bounds of a key, relative to the piano area
struct CellSpan {
    left: usize,
    right: usize,
    top: usize,
    bottom: usize,
}

impl CellSpan {
    fn clip(rect: KeyRect, piano: Rect) -> Option<Self> {
        let (x0, y0) = (piano.x as f32, piano.y as f32);
        let (w, h) = (piano.width as f32, piano.height as f32);
        let left = (rect.left.round() - x0).max(0.0);
        let right = (rect.right.round() - x0).min(w - 1.0);
        let top = (rect.top.round() - y0).max(0.0);
        let bottom = (rect.bottom.round() - y0).min(h - 1.0);
        if right < left || bottom < top {
            return None;
        }
        Some(Self {
            left: left as usize,
            right: right as usize,
            top: top as usize,
            bottom: bottom as usize,
        })
    }
}

fn put_centered(row: &mut [(char, Style)], left: usize, right: usize, text: &str, style: Style) {
    let width = right + 1 - left;
    let len = text.chars().count();
    if len > width {
        return;
    }
    let start = left + (width - len) / 2;
    for (i, c) in text.chars().enumerate() {
        row[start + i] = (c, style);
    }
}

/// Convert a character buffer with styles into spans (grouping consecutive chars with same style)
fn build_spans_from_chars(chars: &[(char, Style)]) -> Vec<Span<'static>> {
    if chars.is_empty() {
        return vec![];
    }

    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut current_style = chars[0].1;
    let mut buffer = String::new();

    for (ch, style) in chars {
        if *style == current_style {
            buffer.push(*ch);
        } else {
            if !buffer.is_empty() {
                spans.push(Span::styled(buffer.clone(), current_style));
                buffer.clear();
            }
            buffer.push(*ch);
            current_style = *style;
        }
    }

    if !buffer.is_empty() {
        spans.push(Span::styled(buffer, current_style));
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::KeyboardEvent;
    use crate::input::InputEvent;
    use crate::layout::Point;
    use crate::widget::KeyboardOptions;

    const AREA: Rect = Rect {
        x: 0,
        y: 0,
        width: 80,
        height: 12,
    };

    fn keyboard() -> Keyboard {
        Keyboard::new(KeyboardOptions::default())
            .unwrap()
            .with_geometry(TerminalGeometry::new(piano_area(AREA)))
    }

    fn buffer_rows(buf: &Buffer) -> Vec<String> {
        buf.content
            .chunks(buf.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect())
            .collect()
    }

    #[test]
    fn test_build_spans() {
        let chars = vec![
            ('a', Style::default().fg(Color::Red)),
            ('b', Style::default().fg(Color::Red)),
            ('c', Style::default().fg(Color::Blue)),
        ];
        let spans = build_spans_from_chars(&chars);
        assert_eq!(spans.len(), 2);
    }

    #[test]
    fn test_piano_area_excludes_border_and_status() {
        let piano = piano_area(AREA);
        assert_eq!(piano, Rect::new(1, 1, 78, 9));
    }

    #[test]
    fn test_keys_fit_the_area() {
        let piano = piano_area(AREA);
        let keyboard = keyboard();
        for key in keyboard.layout().white_keys() {
            assert!(key.rect.left >= piano.x as f32);
            assert!(key.rect.right < (piano.x + piano.width) as f32);
            assert!(key.rect.bottom < (piano.y + piano.height) as f32);
        }
    }

    #[test]
    fn test_black_keys_straddle_white_boundary() {
        let keyboard = keyboard();
        let c = keyboard.layout().get(48).unwrap().rect;
        let c_sharp = keyboard.layout().get(49).unwrap().rect;
        assert!(c_sharp.left <= c.right && c_sharp.right > c.right);
        assert!(c_sharp.bottom < c.bottom);
    }

    #[test]
    fn test_narrow_area_shrinks_keys() {
        let geometry = TerminalGeometry::new(Rect::new(0, 0, 28, 6));
        let mut keyboard = Keyboard::new(KeyboardOptions::default()).unwrap();
        keyboard.set_geometry(Box::new(geometry));
        let b = keyboard.layout().get(59).unwrap().rect;
        assert_eq!(b.width(), 3.0);
        assert!(b.right < 28.0);
    }

    #[test]
    fn test_cell_hit_testing() {
        let mut keyboard = keyboard();
        let rx = keyboard.stream();
        let c = keyboard.layout().get(48).unwrap().rect;
        let c_sharp = keyboard.layout().get(49).unwrap().rect;

        // Bottom of the C key, below the black keys
        let p = Point::new(c.left + 1.0, c.bottom);
        keyboard.handle(InputEvent::PointerDown { x: p.x, y: p.y }).handle(InputEvent::PointerUp);
        // Top of the boundary between C and D lands on C#
        let p = Point::new(c_sharp.left + 1.0, c_sharp.top);
        keyboard.handle(InputEvent::PointerDown { x: p.x, y: p.y }).handle(InputEvent::PointerUp);

        let ons: Vec<u8> = rx
            .try_iter()
            .filter(|e| matches!(e, KeyboardEvent::NoteOn { .. }))
            .map(|e| e.which())
            .collect();
        assert_eq!(ons, vec![48, 49]);
    }

    #[test]
    fn test_render_status_and_labels() {
        let mut keyboard = keyboard();
        keyboard.note_on("E3");
        let mut buf = Buffer::empty(AREA);
        PianoWidget::new(&keyboard).render(AREA, &mut buf);

        let rows = buffer_rows(&buf);
        assert!(rows[0].contains("Piano [C3-B3]"));
        assert!(rows[AREA.height as usize - 2].contains("Playing: E3"));
        assert!(rows[AREA.height as usize - 3].contains("C3"));
    }

    #[test]
    fn test_render_lock_marker() {
        let mut keyboard = keyboard();
        keyboard.note_on("C3").handle(InputEvent::ModifierDown);
        let mut buf = Buffer::empty(AREA);
        PianoWidget::new(&keyboard).render(AREA, &mut buf);
        assert!(buffer_rows(&buf)[0].contains("LOCK"));
    }

    #[test]
    fn test_tiny_area_renders_nothing() {
        let keyboard = keyboard();
        let area = Rect::new(0, 0, 4, 2);
        let mut buf = Buffer::empty(area);
        PianoWidget::new(&keyboard).render(area, &mut buf);
        assert!(buffer_rows(&buf).iter().all(|r| r.trim().is_empty()));
    }
}
