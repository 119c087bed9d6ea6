//! Single-line text entry with optional history

use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
};
use std::collections::VecDeque;
use unicode_width::UnicodeWidthChar;

use crate::core::event::{EventContext, EventOutcome, InputEvent, KeyPress, Notification};
use crate::core::widget::{RenderContext, Size, Widget};
use crate::theme::StyleRole;

/// Editable line with a char-indexed cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineBuffer {
    chars: Vec<char>,
    cursor: usize,
    max_length: Option<usize>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: &str) -> Self {
        let mut buffer = Self::new();
        buffer.set_text(text);
        buffer
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_text(&mut self, text: &str) {
        self.chars = text.chars().collect();
        if let Some(max) = self.max_length {
            self.chars.truncate(max);
        }
        self.cursor = self.chars.len();
    }

    pub fn clear(&mut self) {
        self.chars.clear();
        self.cursor = 0;
    }

    pub fn insert_char(&mut self, c: char) -> bool {
        if self.max_length.map_or(false, |max| self.chars.len() >= max) {
            return false;
        }
        self.chars.insert(self.cursor, c);
        self.cursor += 1;
        true
    }

    pub fn delete_char(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.chars.remove(self.cursor);
        true
    }

    pub fn delete_char_forward(&mut self) -> bool {
        if self.cursor >= self.chars.len() {
            return false;
        }
        self.chars.remove(self.cursor);
        true
    }

    pub fn move_cursor_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    pub fn move_cursor_right(&mut self) -> bool {
        if self.cursor >= self.chars.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    pub fn move_cursor_home(&mut self) -> bool {
        let moved = self.cursor != 0;
        self.cursor = 0;
        moved
    }

    pub fn move_cursor_end(&mut self) -> bool {
        let moved = self.cursor != self.chars.len();
        self.cursor = self.chars.len();
        moved
    }

    /// Apply an editing key. `None` means the key is not an editing key;
    /// `Some(changed)` tells whether the text changed.
    pub fn handle_key(&mut self, key: &KeyPress) -> Option<bool> {
        if let Some(c) = key.printable() {
            return Some(self.insert_char(c));
        }
        match (key.code, key.modifiers) {
            (KeyCode::Backspace, _) => Some(self.delete_char()),
            (KeyCode::Delete, _) => Some(self.delete_char_forward()),
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => {
                let changed = !self.chars.is_empty();
                self.clear();
                Some(changed)
            }
            (KeyCode::Left, _) => {
                self.move_cursor_left();
                Some(false)
            }
            (KeyCode::Right, _) => {
                self.move_cursor_right();
                Some(false)
            }
            (KeyCode::Home, _) | (KeyCode::Char('a'), KeyModifiers::CONTROL) => {
                self.move_cursor_home();
                Some(false)
            }
            (KeyCode::End, _) | (KeyCode::Char('e'), KeyModifiers::CONTROL) => {
                self.move_cursor_end();
                Some(false)
            }
            _ => None,
        }
    }

    /// Draw the visible slice of the line, scrolled so the cursor stays in
    /// view. The cursor cell is reversed when `show_cursor` is set.
    pub fn render(&self, area: Rect, buf: &mut Buffer, style: Style, show_cursor: bool) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        buf.set_style(Rect::new(area.x, area.y, area.width, 1), style);

        let width = usize::from(area.width);
        // Scroll so the cursor (and one cell for it past the end) fits.
        let mut start = 0;
        let mut used: usize = self.chars[..self.cursor]
            .iter()
            .map(|c| c.width().unwrap_or(0))
            .sum::<usize>()
            + 1;
        while used > width && start < self.cursor {
            used -= self.chars[start].width().unwrap_or(0);
            start += 1;
        }

        let mut x = area.x;
        let right = area.x + area.width;
        for (index, &c) in self.chars.iter().enumerate().skip(start) {
            let w = c.width().unwrap_or(0) as u16;
            if x + w > right {
                break;
            }
            let cell_style = if show_cursor && index == self.cursor {
                style.add_modifier(Modifier::REVERSED)
            } else {
                style
            };
            buf.set_stringn(x, area.y, c.to_string(), usize::from(w.max(1)), cell_style);
            x += w;
        }
        if show_cursor && self.cursor == self.chars.len() && x < right {
            buf.set_string(x, area.y, " ", style.add_modifier(Modifier::REVERSED));
        }
    }
}

/// Past entries, browsed newest first
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<String>,
    capacity: usize,
    /// Index into `entries` while browsing, 0 = newest
    position: Option<usize>,
    /// Text that was being edited when browsing started
    draft: Option<String>,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
            position: None,
            draft: None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_browsing(&self) -> bool {
        self.position.is_some()
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Record a committed entry. Blank entries and repeats of the newest
    /// entry are skipped.
    pub fn push(&mut self, entry: &str) {
        self.reset();
        if entry.trim().is_empty() || self.entries.front().map_or(false, |newest| newest == entry) {
            return;
        }
        self.entries.push_front(entry.to_string());
        self.entries.truncate(self.capacity);
    }

    /// Step to an older entry, remembering `current` as the draft
    pub fn older(&mut self, current: &str) -> Option<&str> {
        let next = match self.position {
            None if !self.entries.is_empty() => 0,
            Some(position) if position + 1 < self.entries.len() => position + 1,
            _ => return None,
        };
        if self.position.is_none() {
            self.draft = Some(current.to_string());
        }
        self.position = Some(next);
        self.entries.get(next).map(String::as_str)
    }

    /// Step to a newer entry; past the newest entry the draft comes back
    pub fn newer(&mut self) -> Option<String> {
        match self.position? {
            0 => {
                self.position = None;
                Some(self.draft.take().unwrap_or_default())
            }
            position => {
                self.position = Some(position - 1);
                self.entries.get(position - 1).cloned()
            }
        }
    }

    /// Stop browsing, returning the draft if browsing was active
    pub fn cancel(&mut self) -> Option<String> {
        self.position.take()?;
        Some(self.draft.take().unwrap_or_default())
    }

    pub fn reset(&mut self) {
        self.position = None;
        self.draft = None;
    }
}

/// Focusable single-line editor
#[derive(Debug, Clone)]
pub struct TextInput {
    buffer: LineBuffer,
    placeholder: String,
    history: Option<History>,
    required: bool,
    error: Option<String>,
    focused: bool,
}

impl Default for TextInput {
    fn default() -> Self {
        Self::new()
    }
}

impl TextInput {
    pub fn new() -> Self {
        Self {
            buffer: LineBuffer::new(),
            placeholder: String::new(),
            history: None,
            required: false,
            error: None,
            focused: false,
        }
    }

    pub fn value<S: AsRef<str>>(mut self, value: S) -> Self {
        self.buffer.set_text(value.as_ref());
        self
    }

    pub fn placeholder<S: Into<String>>(mut self, placeholder: S) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.buffer = self.buffer.max_length(max_length);
        self
    }

    /// Keep committed entries: Enter commits and clears, Up/Down browse
    pub fn with_history(mut self, capacity: usize) -> Self {
        self.history = Some(History::new(capacity));
        self
    }

    /// Refuse to lose focus while empty
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn text(&self) -> String {
        self.buffer.text()
    }

    pub fn set_text(&mut self, text: &str) {
        self.buffer.set_text(text);
    }

    pub fn history(&self) -> Option<&History> {
        self.history.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn commit(&mut self, ctx: &mut EventContext<'_>) -> EventOutcome {
        let Some(history) = self.history.as_mut() else {
            return EventOutcome::Ignored;
        };
        let text = self.buffer.text();
        history.push(&text);
        self.buffer.clear();
        let node = ctx.node();
        ctx.notify(Notification::TextCommitted { node, text });
        EventOutcome::ConsumedAndRequestRedraw
    }
}

impl Widget for TextInput {
    fn name(&self) -> &'static str {
        "text_input"
    }

    fn want_focus(&self) -> bool {
        true
    }

    fn measure(&self, available: Size) -> Size {
        Size::new(available.width, 1)
    }

    fn render(&self, area: Rect, buf: &mut Buffer, ctx: &RenderContext<'_>) {
        let role = if self.error.is_some() {
            StyleRole::Error
        } else if ctx.focused {
            StyleRole::InputFocus
        } else {
            StyleRole::InputNormal
        };
        let style = ctx.theme.style(role);

        if self.buffer.is_empty() && !ctx.focused && !self.placeholder.is_empty() {
            buf.set_style(Rect::new(area.x, area.y, area.width, 1.min(area.height)), style);
            buf.set_stringn(
                area.x,
                area.y,
                &self.placeholder,
                usize::from(area.width),
                style.add_modifier(Modifier::DIM),
            );
            return;
        }
        self.buffer.render(area, buf, style, ctx.focused);
    }

    fn handle_event(&mut self, event: &InputEvent, ctx: &mut EventContext<'_>) -> EventOutcome {
        let InputEvent::Key(key) = event else {
            return EventOutcome::Ignored;
        };

        match key.code {
            KeyCode::Enter => return self.commit(ctx),
            KeyCode::Up => {
                let current = self.buffer.text();
                if let Some(entry) = self.history.as_mut().and_then(|h| h.older(&current)) {
                    let entry = entry.to_string();
                    self.buffer.set_text(&entry);
                    return EventOutcome::ConsumedAndRequestRedraw;
                }
                return match self.history {
                    Some(_) => EventOutcome::Consumed,
                    None => EventOutcome::Ignored,
                };
            }
            KeyCode::Down => {
                if let Some(entry) = self.history.as_mut().and_then(History::newer) {
                    self.buffer.set_text(&entry);
                    return EventOutcome::ConsumedAndRequestRedraw;
                }
                return match self.history {
                    Some(_) => EventOutcome::Consumed,
                    None => EventOutcome::Ignored,
                };
            }
            KeyCode::Esc => {
                if let Some(draft) = self.history.as_mut().and_then(History::cancel) {
                    self.buffer.set_text(&draft);
                    return EventOutcome::ConsumedAndRequestRedraw;
                }
                return EventOutcome::Ignored;
            }
            _ => {}
        }

        match self.buffer.handle_key(key) {
            Some(changed) => {
                if changed {
                    self.error = None;
                }
                EventOutcome::ConsumedAndRequestRedraw
            }
            None => EventOutcome::Ignored,
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.required && self.buffer.text().trim().is_empty() {
            return Err("a value is required".to_string());
        }
        Ok(())
    }

    fn on_validation_failed(&mut self, reason: &str) {
        self.error = Some(reason.to_string());
    }

    fn on_focus_change(&mut self, focused: bool) {
        self.focused = focused;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::keys::KeyConfig;
    use crate::core::tree::NodeId;
    use slotmap::KeyData;

    fn node() -> NodeId {
        NodeId::from(KeyData::from_ffi(1))
    }

    fn press(input: &mut TextInput, code: KeyCode) -> (EventOutcome, Vec<Notification>) {
        let keys = KeyConfig::default();
        let mut notifications = Vec::new();
        let mut commands = Vec::new();
        let mut ctx = EventContext::new(node(), node(), &keys, &mut notifications, &mut commands);
        let outcome = input.handle_event(&InputEvent::key(code), &mut ctx);
        (outcome, notifications)
    }

    fn type_text(input: &mut TextInput, text: &str) {
        for c in text.chars() {
            press(input, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_line_buffer_editing() {
        let mut buffer = LineBuffer::with_text("héllo");
        assert_eq!(buffer.cursor(), 5);
        buffer.move_cursor_left();
        buffer.delete_char();
        assert_eq!(buffer.text(), "hélo");
        buffer.move_cursor_home();
        buffer.insert_char('>');
        assert_eq!(buffer.text(), ">hélo");
        buffer.move_cursor_end();
        assert!(!buffer.delete_char_forward());
    }

    #[test]
    fn test_line_buffer_max_length() {
        let mut buffer = LineBuffer::new().max_length(2);
        assert!(buffer.insert_char('a'));
        assert!(buffer.insert_char('b'));
        assert!(!buffer.insert_char('c'));
        assert_eq!(buffer.text(), "ab");
    }

    #[test]
    fn test_history_browse_and_restore_draft() {
        let mut history = History::new(10);
        history.push("first");
        history.push("second");
        history.push("second");
        assert_eq!(history.len(), 2);

        assert_eq!(history.older("draft"), Some("second"));
        assert_eq!(history.older("ignored"), Some("first"));
        assert_eq!(history.older("ignored"), None);
        assert_eq!(history.newer().as_deref(), Some("second"));
        assert_eq!(history.newer().as_deref(), Some("draft"));
        assert_eq!(history.newer(), None);
    }

    #[test]
    fn test_history_capacity() {
        let mut history = History::new(2);
        for entry in ["a", "b", "c"] {
            history.push(entry);
        }
        assert_eq!(history.entries().collect::<Vec<_>>(), vec!["c", "b"]);
    }

    #[test]
    fn test_commit_with_history() {
        let mut input = TextInput::new().with_history(5);
        type_text(&mut input, "ls");
        let (outcome, notifications) = press(&mut input, KeyCode::Enter);

        assert_eq!(outcome, EventOutcome::ConsumedAndRequestRedraw);
        assert_eq!(
            notifications,
            vec![Notification::TextCommitted {
                node: node(),
                text: "ls".to_string()
            }]
        );
        assert_eq!(input.text(), "");

        type_text(&mut input, "pw");
        press(&mut input, KeyCode::Up);
        assert_eq!(input.text(), "ls");
        press(&mut input, KeyCode::Esc);
        assert_eq!(input.text(), "pw");
    }

    #[test]
    fn test_without_history_navigation_bubbles() {
        let mut input = TextInput::new();
        assert_eq!(press(&mut input, KeyCode::Up).0, EventOutcome::Ignored);
        assert_eq!(press(&mut input, KeyCode::Enter).0, EventOutcome::Ignored);
        assert_eq!(press(&mut input, KeyCode::Esc).0, EventOutcome::Ignored);
        assert_eq!(
            press(&mut input, KeyCode::Char('z')).0,
            EventOutcome::ConsumedAndRequestRedraw
        );
    }

    #[test]
    fn test_required_validation() {
        let mut input = TextInput::new().required();
        assert!(input.validate().is_err());
        input.on_validation_failed("a value is required");
        assert_eq!(input.error(), Some("a value is required"));
        type_text(&mut input, "x");
        assert!(input.validate().is_ok());
        assert_eq!(input.error(), None);
    }
}
