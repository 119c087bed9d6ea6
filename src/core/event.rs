//! Input events, handler outcomes and the context handlers run in

use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

use super::focus::FocusPath;
use super::tree::NodeId;
use crate::config::keys::{KeyBinding, KeyConfig};
use crate::widgets::dialog::DialogId;
use crate::widgets::menu::MenuItem;

/// A key press with its modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyPress {
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    /// Printable character typed without Ctrl/Alt
    pub fn printable(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(c)
                if !self
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                Some(c)
            }
            _ => None,
        }
    }

    pub fn matches(&self, binding: &KeyBinding) -> bool {
        binding.matches(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseAction {
    Down,
    Up,
    Drag,
    Moved,
    ScrollUp,
    ScrollDown,
}

/// Mouse input with absolute screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseInput {
    pub x: u16,
    pub y: u16,
    pub button: Option<MouseButton>,
    pub action: MouseAction,
}

/// Input delivered by the event loop, one at a time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyPress),
    Mouse(MouseInput),
    Resize { width: u16, height: u16 },
}

impl InputEvent {
    pub fn key(code: KeyCode) -> Self {
        Self::Key(KeyPress::plain(code))
    }

    pub fn key_with(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self::Key(KeyPress::new(code, modifiers))
    }

    pub fn click(x: u16, y: u16) -> Self {
        Self::Mouse(MouseInput {
            x,
            y,
            button: Some(MouseButton::Left),
            action: MouseAction::Down,
        })
    }

    /// Convert a terminal event. Key releases, focus and paste events have
    /// no counterpart and yield `None`.
    pub fn from_crossterm(event: Event) -> Option<Self> {
        match event {
            Event::Key(KeyEvent {
                code,
                modifiers,
                kind,
                ..
            }) => {
                if kind == KeyEventKind::Release {
                    return None;
                }
                Some(Self::Key(KeyPress::new(code, modifiers)))
            }
            Event::Mouse(MouseEvent {
                kind, column, row, ..
            }) => {
                let (button, action) = match kind {
                    MouseEventKind::Down(button) => (Some(button), MouseAction::Down),
                    MouseEventKind::Up(button) => (Some(button), MouseAction::Up),
                    MouseEventKind::Drag(button) => (Some(button), MouseAction::Drag),
                    MouseEventKind::Moved => (None, MouseAction::Moved),
                    MouseEventKind::ScrollUp => (None, MouseAction::ScrollUp),
                    MouseEventKind::ScrollDown => (None, MouseAction::ScrollDown),
                    _ => return None,
                };
                Some(Self::Mouse(MouseInput {
                    x: column,
                    y: row,
                    button,
                    action,
                }))
            }
            Event::Resize(width, height) => Some(Self::Resize { width, height }),
            _ => None,
        }
    }

    pub fn as_key(&self) -> Option<&KeyPress> {
        match self {
            Self::Key(key) => Some(key),
            _ => None,
        }
    }
}

/// What a handler did with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Consumed,
    Ignored,
    ConsumedAndRequestRedraw,
}

impl EventOutcome {
    pub fn is_consumed(self) -> bool {
        !matches!(self, Self::Ignored)
    }

    pub fn wants_redraw(self) -> bool {
        matches!(self, Self::ConsumedAndRequestRedraw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusDirection {
    Forward,
    Backward,
}

/// Observable results of dispatching, drained by the integrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    FocusChanged { old: FocusPath, new: FocusPath },
    Selected { node: NodeId, index: usize, item: String },
    ValidationFailed { node: NodeId, field: String, reason: String },
    Activated { node: NodeId },
    TextCommitted { node: NodeId, text: String },
    MenuActivated { command: String },
    DialogClosed { dialog: DialogId },
    FormSubmitted { form: NodeId, values: Vec<(String, String)> },
    QuitRequested,
}

/// Tree-level requests queued by handlers and applied once dispatch returns
#[derive(Debug, Clone)]
pub enum HostCommand {
    /// Close the dialog whose frame is the given node, and every dialog above it
    CloseDialog(NodeId),
    /// Close the innermost dialog containing the given node
    CloseDialogContaining(NodeId),
    CloseAllDialogs,
    /// Close the menu stack on top of the dialog stack
    CloseMenus,
    OpenMenu { title: String, items: Vec<MenuItem> },
    Focus(NodeId),
    MoveFocus(FocusDirection),
    SubmitForm(NodeId),
    Quit,
}

/// Handed to a widget while it handles one event
pub struct EventContext<'a> {
    node: NodeId,
    origin: NodeId,
    keys: &'a KeyConfig,
    notifications: &'a mut Vec<Notification>,
    commands: &'a mut Vec<HostCommand>,
}

impl<'a> EventContext<'a> {
    pub fn new(
        node: NodeId,
        origin: NodeId,
        keys: &'a KeyConfig,
        notifications: &'a mut Vec<Notification>,
        commands: &'a mut Vec<HostCommand>,
    ) -> Self {
        Self {
            node,
            origin,
            keys,
            notifications,
            commands,
        }
    }

    /// Node whose handler is running
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Node the event was first offered to
    pub fn origin(&self) -> NodeId {
        self.origin
    }

    /// Whether the event is being handled by the node it was offered to
    pub fn is_origin(&self) -> bool {
        self.node == self.origin
    }

    pub fn keys(&self) -> &KeyConfig {
        self.keys
    }

    pub fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    pub fn command(&mut self, command: HostCommand) {
        self.commands.push(command);
    }

    pub fn close_dialog(&mut self, frame: NodeId) {
        self.command(HostCommand::CloseDialog(frame));
    }

    pub fn move_focus(&mut self, direction: FocusDirection) {
        self.command(HostCommand::MoveFocus(direction));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    #[test]
    fn test_key_release_is_dropped() {
        let press = Event::Key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE));
        assert_eq!(
            InputEvent::from_crossterm(press),
            Some(InputEvent::key(KeyCode::Char('a')))
        );

        let release = Event::Key(KeyEvent {
            code: KeyCode::Char('a'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        });
        assert_eq!(InputEvent::from_crossterm(release), None);
    }

    #[test]
    fn test_mouse_and_resize_conversion() {
        let click = Event::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 4,
            row: 7,
            modifiers: KeyModifiers::NONE,
        });
        assert_eq!(InputEvent::from_crossterm(click), Some(InputEvent::click(4, 7)));
        assert_eq!(
            InputEvent::from_crossterm(Event::Resize(80, 24)),
            Some(InputEvent::Resize {
                width: 80,
                height: 24
            })
        );
        assert_eq!(InputEvent::from_crossterm(Event::FocusLost), None);
    }

    #[test]
    fn test_printable_ignores_control_chords() {
        assert_eq!(KeyPress::plain(KeyCode::Char('x')).printable(), Some('x'));
        assert_eq!(
            KeyPress::new(KeyCode::Char('X'), KeyModifiers::SHIFT).printable(),
            Some('X')
        );
        assert_eq!(
            KeyPress::new(KeyCode::Char('c'), KeyModifiers::CONTROL).printable(),
            None
        );
    }

    #[test]
    fn test_outcome_flags() {
        assert!(!EventOutcome::Ignored.is_consumed());
        assert!(EventOutcome::Consumed.is_consumed());
        assert!(!EventOutcome::Consumed.wants_redraw());
        assert!(EventOutcome::ConsumedAndRequestRedraw.wants_redraw());
    }
}
