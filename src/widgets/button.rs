//! Push button

use crossterm::event::{KeyCode, MouseButton};
use ratatui::{buffer::Buffer, layout::Rect};
use unicode_width::UnicodeWidthStr;

use crate::core::event::{
    EventContext, EventOutcome, HostCommand, InputEvent, MouseAction, Notification,
};
use crate::core::widget::{RenderContext, Size, Widget};
use crate::theme::StyleRole;

/// A focusable button rendered as `< label >`.
///
/// Enter, Space or a left click emits [`Notification::Activated`] and queues
/// the button's command, if it has one.
#[derive(Debug, Clone)]
pub struct Button {
    label: String,
    command: Option<ButtonCommand>,
    focused: bool,
}

#[derive(Debug, Clone)]
enum ButtonCommand {
    CloseDialog,
    Host(HostCommand),
}

impl Button {
    pub fn new<S: Into<String>>(label: S) -> Self {
        Self {
            label: label.into(),
            command: None,
            focused: false,
        }
    }

    /// Close the dialog this button lives in when pressed
    pub fn closes_dialog(mut self) -> Self {
        self.command = Some(ButtonCommand::CloseDialog);
        self
    }

    pub fn on_press(mut self, command: HostCommand) -> Self {
        self.command = Some(ButtonCommand::Host(command));
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Columns the rendered button needs
    pub fn label_width(&self) -> u16 {
        u16::try_from(self.label.width() + 4).unwrap_or(u16::MAX)
    }

    fn press(&self, ctx: &mut EventContext<'_>) -> EventOutcome {
        let node = ctx.node();
        ctx.notify(Notification::Activated { node });
        match &self.command {
            Some(ButtonCommand::CloseDialog) => ctx.command(HostCommand::CloseDialogContaining(node)),
            Some(ButtonCommand::Host(command)) => ctx.command(command.clone()),
            None => {}
        }
        EventOutcome::ConsumedAndRequestRedraw
    }
}

impl Widget for Button {
    fn name(&self) -> &'static str {
        "button"
    }

    fn want_focus(&self) -> bool {
        true
    }

    fn measure(&self, _available: Size) -> Size {
        Size::new(self.label_width(), 1)
    }

    fn render(&self, area: Rect, buf: &mut Buffer, ctx: &RenderContext<'_>) {
        let role = if ctx.focused {
            StyleRole::ButtonFocus
        } else {
            StyleRole::ButtonNormal
        };
        let text = format!("< {} >", self.label);
        buf.set_stringn(area.x, area.y, text, usize::from(area.width), ctx.theme.style(role));
    }

    fn handle_event(&mut self, event: &InputEvent, ctx: &mut EventContext<'_>) -> EventOutcome {
        match event {
            InputEvent::Key(key) if matches!(key.code, KeyCode::Enter | KeyCode::Char(' ')) => {
                self.press(ctx)
            }
            InputEvent::Mouse(mouse)
                if mouse.action == MouseAction::Down && mouse.button == Some(MouseButton::Left) =>
            {
                self.press(ctx)
            }
            _ => EventOutcome::Ignored,
        }
    }

    fn on_focus_change(&mut self, focused: bool) {
        self.focused = focused;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::keys::KeyConfig;
    use slotmap::KeyData;

    #[test]
    fn test_enter_activates_and_queues_close() {
        let node = crate::core::tree::NodeId::from(KeyData::from_ffi(1));
        let keys = KeyConfig::default();
        let mut notifications = Vec::new();
        let mut commands = Vec::new();
        let mut ctx = EventContext::new(node, node, &keys, &mut notifications, &mut commands);

        let mut button = Button::new("OK").closes_dialog();
        let outcome = button.handle_event(&InputEvent::key(KeyCode::Enter), &mut ctx);
        assert_eq!(outcome, EventOutcome::ConsumedAndRequestRedraw);

        let outcome = button.handle_event(&InputEvent::key(KeyCode::Char('x')), &mut ctx);
        assert_eq!(outcome, EventOutcome::Ignored);

        assert_eq!(notifications, vec![Notification::Activated { node }]);
        assert!(matches!(commands[..], [HostCommand::CloseDialogContaining(id)] if id == node));
    }

    #[test]
    fn test_measure_includes_decoration() {
        assert_eq!(Button::new("OK").measure(Size::new(80, 24)), Size::new(6, 1));
    }
}
