//! Log viewer fed by a `tracing` layer
//!
//! [`LogViewerLayer`] appends every event to a shared [`LogBuffer`]; the
//! [`LogViewer`] widget reads the buffer while rendering. The buffer is the
//! only state shared across threads, since events may be emitted anywhere.

use chrono::{DateTime, Local};
use crossterm::event::KeyCode;
use ratatui::{buffer::Buffer, layout::Rect};
use std::cell::Cell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use crate::core::event::{EventContext, EventOutcome, InputEvent, MouseAction};
use crate::core::widget::{RenderContext, Size, Widget};
use crate::theme::StyleRole;

/// Entries kept when no capacity is configured
pub const DEFAULT_CAPACITY: usize = 2048;

const MARKER: &str = "\u{2015}";

/// A single event captured from tracing
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub level: Level,
    pub message: String,
}

impl LogEntry {
    pub fn new<S: Into<String>>(level: Level, message: S) -> Self {
        Self {
            at: Local::now(),
            level,
            message: message.into(),
        }
    }

    /// Three-column gutter marking the severity
    pub fn prefix(&self) -> &'static str {
        match self.level {
            Level::ERROR => " \u{25CF} ",
            Level::WARN => " \u{25B2} ",
            Level::DEBUG | Level::TRACE => " \u{25B6} ",
            Level::INFO => "   ",
        }
    }

    fn role(&self) -> StyleRole {
        match self.level {
            Level::ERROR => StyleRole::LogError,
            Level::WARN => StyleRole::LogWarning,
            Level::INFO => StyleRole::LogInfo,
            Level::DEBUG | Level::TRACE => StyleRole::LogDebug,
        }
    }

    pub fn format(&self) -> String {
        format!("{}{} {}", self.prefix(), self.at.format("%H:%M:%S"), self.message)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogLine {
    Entry(LogEntry),
    /// Horizontal rule the user can drop in to separate runs
    Marker,
}

#[derive(Debug)]
struct Lines {
    lines: VecDeque<LogLine>,
    capacity: usize,
    /// Sequence number of `lines[0]`
    first: u64,
}

/// Bounded, thread-safe ring of log lines
#[derive(Debug, Clone)]
pub struct LogBuffer {
    inner: Arc<Mutex<Lines>>,
    dirty: Arc<AtomicBool>,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Mutex::new(Lines {
                lines: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
                capacity,
                first: 0,
            })),
            dirty: Arc::new(AtomicBool::new(false)),
        }
    }

    // A panic while holding the lock leaves the ring consistent, so a
    // poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Lines> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, line: LogLine) {
        let mut inner = self.lock();
        if inner.lines.len() >= inner.capacity {
            inner.lines.pop_front();
            inner.first += 1;
        }
        inner.lines.push_back(line);
        self.dirty.store(true, Ordering::Release);
    }

    pub fn add(&self, entry: LogEntry) {
        self.push(LogLine::Entry(entry));
    }

    pub fn add_marker(&self) {
        self.push(LogLine::Marker);
    }

    pub fn len(&self) -> usize {
        self.lock().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.first += inner.lines.len() as u64;
        inner.lines.clear();
        self.dirty.store(true, Ordering::Release);
    }

    pub fn lines(&self) -> Vec<LogLine> {
        self.lock().lines.iter().cloned().collect()
    }

    /// Whether lines arrived since the last call
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    /// Sequence numbers of the first line and one past the last
    fn span(&self) -> (u64, u64) {
        let inner = self.lock();
        (inner.first, inner.first + inner.lines.len() as u64)
    }
}

/// Tracing layer that appends every event to a [`LogBuffer`]
pub struct LogViewerLayer {
    buffer: LogBuffer,
}

impl LogViewerLayer {
    pub fn new(buffer: LogBuffer) -> Self {
        Self { buffer }
    }
}

impl<S> Layer<S> for LogViewerLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.buffer
            .add(LogEntry::new(*event.metadata().level(), visitor.finish()));
    }
}

/// Collects the message and appends other fields as `key=value`
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields.join(" ")
        } else {
            format!("{} {}", self.message, self.fields.join(" "))
        }
    }
}

impl tracing::field::Visit for MessageVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}

/// Scrollable view of a [`LogBuffer`].
///
/// In follow mode the newest line stays selected as lines arrive. Moving the
/// selection up leaves follow mode; reaching the last line again (or End)
/// resumes it.
#[derive(Debug)]
pub struct LogViewer {
    buffer: LogBuffer,
    follow: bool,
    /// Sequence number of the selected line while not following
    selected: u64,
    page: Cell<u16>,
}

impl LogViewer {
    pub fn new(buffer: LogBuffer) -> Self {
        Self {
            buffer,
            follow: true,
            selected: 0,
            page: Cell::new(1),
        }
    }

    pub fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }

    pub fn is_following(&self) -> bool {
        self.follow
    }

    /// Index into the buffer's current lines of the selected line
    pub fn selected_index(&self) -> Option<usize> {
        let (first, end) = self.buffer.span();
        if first == end {
            return None;
        }
        let sequence = if self.follow {
            end - 1
        } else {
            self.selected.clamp(first, end - 1)
        };
        usize::try_from(sequence - first).ok()
    }

    /// Select the most recent line and resume following
    pub fn focus_most_recent(&mut self) {
        self.follow = true;
    }

    fn scroll(&mut self, delta: i64) -> EventOutcome {
        let (first, end) = self.buffer.span();
        if first == end {
            return EventOutcome::Ignored;
        }
        let last = end - 1;
        let current = if self.follow {
            last
        } else {
            self.selected.clamp(first, last)
        };
        let target = if delta < 0 {
            current.saturating_sub(delta.unsigned_abs()).max(first)
        } else {
            current.saturating_add(delta.unsigned_abs()).min(last)
        };
        let was_following = self.follow;
        self.selected = target;
        self.follow = target == last;
        if target == current && was_following == self.follow {
            EventOutcome::Consumed
        } else {
            EventOutcome::ConsumedAndRequestRedraw
        }
    }
}

impl Widget for LogViewer {
    fn name(&self) -> &'static str {
        "log_viewer"
    }

    fn want_focus(&self) -> bool {
        true
    }

    fn render(&self, area: Rect, buf: &mut Buffer, ctx: &RenderContext<'_>) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        self.page.set(area.height);
        let lines = self.buffer.lines();
        let Some(selected) = self.selected_index() else {
            return;
        };
        let height = usize::from(area.height);
        let offset = selected.saturating_sub(height - 1);
        let width = usize::from(area.width);

        for (row, (index, line)) in lines.iter().enumerate().skip(offset).take(height).enumerate() {
            let y = area.y + row as u16;
            let (text, role) = match line {
                LogLine::Entry(entry) => (entry.format(), entry.role()),
                LogLine::Marker => (MARKER.repeat(width), StyleRole::LogMarker),
            };
            let style = if ctx.focused && index == selected {
                ctx.theme.style(StyleRole::ListFocus)
            } else {
                ctx.theme.style(role)
            };
            buf.set_style(Rect::new(area.x, y, area.width, 1), style);
            buf.set_stringn(area.x, y, text, width, style);
        }
    }

    fn measure(&self, available: Size) -> Size {
        available
    }

    fn handle_event(&mut self, event: &InputEvent, _ctx: &mut EventContext<'_>) -> EventOutcome {
        let page = i64::from(self.page.get().max(1));
        match event {
            InputEvent::Key(key) => match key.code {
                KeyCode::Up => self.scroll(-1),
                KeyCode::Down => self.scroll(1),
                KeyCode::PageUp => self.scroll(-page),
                KeyCode::PageDown => self.scroll(page),
                KeyCode::Home => self.scroll(i64::MIN),
                KeyCode::End => self.scroll(i64::MAX),
                _ => EventOutcome::Ignored,
            },
            InputEvent::Mouse(mouse) => match mouse.action {
                MouseAction::ScrollUp => self.scroll(-1),
                MouseAction::ScrollDown => self.scroll(1),
                _ => EventOutcome::Ignored,
            },
            InputEvent::Resize { .. } => EventOutcome::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::keys::KeyConfig;
    use crate::core::tree::NodeId;
    use crate::theme::Theme;
    use slotmap::KeyData;
    use tracing_subscriber::layer::SubscriberExt;

    fn press(viewer: &mut LogViewer, code: KeyCode) -> EventOutcome {
        let node = NodeId::from(KeyData::from_ffi(1));
        let keys = KeyConfig::default();
        let mut notifications = Vec::new();
        let mut commands = Vec::new();
        let mut ctx = EventContext::new(node, node, &keys, &mut notifications, &mut commands);
        viewer.handle_event(&InputEvent::key(code), &mut ctx)
    }

    fn filled(count: usize, capacity: usize) -> LogBuffer {
        let buffer = LogBuffer::new(capacity);
        for i in 0..count {
            buffer.add(LogEntry::new(Level::INFO, format!("line {i}")));
        }
        buffer
    }

    #[test]
    fn test_buffer_drops_oldest() {
        let buffer = filled(5, 3);
        let lines = buffer.lines();
        assert_eq!(lines.len(), 3);
        assert!(matches!(&lines[0], LogLine::Entry(entry) if entry.message == "line 2"));
        assert!(buffer.take_dirty());
        assert!(!buffer.take_dirty());
    }

    #[test]
    fn test_follow_mode() {
        let buffer = filled(3, 10);
        let mut viewer = LogViewer::new(buffer.clone());
        assert_eq!(viewer.selected_index(), Some(2));

        assert_eq!(press(&mut viewer, KeyCode::Up), EventOutcome::ConsumedAndRequestRedraw);
        assert!(!viewer.is_following());
        buffer.add(LogEntry::new(Level::WARN, "new"));
        assert_eq!(viewer.selected_index(), Some(1));

        press(&mut viewer, KeyCode::End);
        assert!(viewer.is_following());
        buffer.add(LogEntry::new(Level::INFO, "newer"));
        assert_eq!(viewer.selected_index(), Some(4));
    }

    #[test]
    fn test_selection_survives_trimming() {
        let buffer = filled(3, 3);
        let mut viewer = LogViewer::new(buffer.clone());
        press(&mut viewer, KeyCode::Home);
        assert_eq!(viewer.selected_index(), Some(0));
        assert_eq!(press(&mut viewer, KeyCode::Up), EventOutcome::Consumed);

        buffer.add(LogEntry::new(Level::INFO, "pushes line 0 out"));
        assert_eq!(viewer.selected_index(), Some(0));
    }

    #[test]
    fn test_empty_viewer_ignores_keys() {
        let mut viewer = LogViewer::new(LogBuffer::new(4));
        assert_eq!(press(&mut viewer, KeyCode::Up), EventOutcome::Ignored);
        assert_eq!(viewer.selected_index(), None);
    }

    #[test]
    fn test_render_prefixes_and_marker() {
        let buffer = LogBuffer::new(8);
        buffer.add(LogEntry::new(Level::ERROR, "boom"));
        buffer.add_marker();
        buffer.add(LogEntry::new(Level::INFO, "fine"));
        let viewer = LogViewer::new(buffer);
        let theme = Theme::default();
        let ctx = RenderContext {
            focused: false,
            focus_within: false,
            theme: &theme,
        };
        let area = Rect::new(0, 0, 30, 3);
        let mut buf = Buffer::empty(area);
        viewer.render(area, &mut buf, &ctx);

        assert_eq!(buf.get(1, 0).symbol(), "\u{25CF}");
        assert_eq!(buf.get(0, 1).symbol(), MARKER);
        assert_eq!(buf.get(29, 1).symbol(), MARKER);
        assert_eq!(buf.get(1, 2).symbol(), " ");
        assert_eq!(buf.get(0, 0).fg, theme.style(StyleRole::LogError).fg.unwrap_or_default());
    }

    #[test]
    fn test_layer_captures_message_and_fields() {
        let buffer = LogBuffer::new(8);
        let subscriber = tracing_subscriber::registry().with(LogViewerLayer::new(buffer.clone()));
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(dialog = 3, "close vetoed");
        });

        let lines = buffer.lines();
        assert!(matches!(
            &lines[..],
            [LogLine::Entry(entry)] if entry.level == Level::WARN && entry.message == "close vetoed dialog=3"
        ));
    }
}
