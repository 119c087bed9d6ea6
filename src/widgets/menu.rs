//! Cascading menus
//!
//! A menu level is a [`Menu`] widget inside a dialog frame of kind
//! [`DialogKind::Menu`](super::dialog::DialogKind). Submenus open as new
//! levels on top of the dialog stack; activating an action closes every
//! menu level at once.

use crossterm::event::{KeyCode, MouseButton};
use ratatui::{buffer::Buffer, layout::Rect};
use std::cell::Cell;
use unicode_width::UnicodeWidthStr;

use crate::core::event::{
    EventContext, EventOutcome, HostCommand, InputEvent, MouseAction, Notification,
};
use crate::core::widget::{RenderContext, Size, Widget};
use crate::theme::StyleRole;

const SEPARATOR: &str = "\u{2015}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuItem {
    /// Emits [`Notification::MenuActivated`] with `command`
    Action { label: String, command: String },
    Submenu { label: String, items: Vec<MenuItem> },
    Separator,
    Disabled { label: String },
}

impl MenuItem {
    pub fn action<L: Into<String>, C: Into<String>>(label: L, command: C) -> Self {
        Self::Action {
            label: label.into(),
            command: command.into(),
        }
    }

    /// A submenu without items is shown disabled
    pub fn submenu<L: Into<String>>(label: L, items: Vec<MenuItem>) -> Self {
        if items.is_empty() {
            Self::Disabled {
                label: label.into(),
            }
        } else {
            Self::Submenu {
                label: label.into(),
                items,
            }
        }
    }

    pub fn disabled<L: Into<String>>(label: L) -> Self {
        Self::Disabled {
            label: label.into(),
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Action { label, .. } | Self::Submenu { label, .. } | Self::Disabled { label } => {
                Some(label)
            }
            Self::Separator => None,
        }
    }

    pub fn is_selectable(&self) -> bool {
        matches!(self, Self::Action { .. } | Self::Submenu { .. })
    }

    fn width(&self) -> usize {
        match self {
            Self::Action { label, .. } | Self::Submenu { label, .. } => label.width() + 5,
            Self::Disabled { label } => label.width() + 3,
            Self::Separator => 0,
        }
    }
}

/// Submenu with one radio-style action per choice, the current one marked.
///
/// Each action's command is `command_prefix` followed by the choice value.
pub fn enum_choices<'a, I>(title: &str, choices: I, current: &str, command_prefix: &str) -> MenuItem
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let items = choices
        .into_iter()
        .map(|(value, label)| {
            let mark = if value == current { '*' } else { ' ' };
            MenuItem::action(format!("({mark}) {label}"), format!("{command_prefix}{value}"))
        })
        .collect();
    MenuItem::submenu(title, items)
}

/// One level of a menu
#[derive(Debug, Clone)]
pub struct Menu {
    items: Vec<MenuItem>,
    selected: Option<usize>,
    /// Area of the last render, for mapping clicks to rows
    area: Cell<Rect>,
}

impl Menu {
    pub fn new(items: Vec<MenuItem>) -> Self {
        let selected = items.iter().position(MenuItem::is_selectable);
        Self {
            items,
            selected,
            area: Cell::new(Rect::default()),
        }
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_item(&self) -> Option<&MenuItem> {
        self.selected.and_then(|index| self.items.get(index))
    }

    /// Move to the next selectable item in `step` direction, without wrapping
    fn step(&mut self, forward: bool) -> bool {
        let Some(current) = self.selected else {
            return false;
        };
        let next = if forward {
            (current + 1..self.items.len()).find(|&i| self.items[i].is_selectable())
        } else {
            (0..current).rev().find(|&i| self.items[i].is_selectable())
        };
        match next {
            Some(index) => {
                self.selected = Some(index);
                true
            }
            None => false,
        }
    }

    fn activate(&self, ctx: &mut EventContext<'_>) -> EventOutcome {
        match self.selected_item() {
            Some(MenuItem::Action { command, .. }) => {
                tracing::debug!(command = %command, "menu item activated");
                ctx.notify(Notification::MenuActivated {
                    command: command.clone(),
                });
                ctx.command(HostCommand::CloseMenus);
                EventOutcome::ConsumedAndRequestRedraw
            }
            Some(MenuItem::Submenu { label, items }) => {
                ctx.command(HostCommand::OpenMenu {
                    title: label.clone(),
                    items: items.clone(),
                });
                EventOutcome::ConsumedAndRequestRedraw
            }
            _ => EventOutcome::Consumed,
        }
    }

    fn moved(changed: bool) -> EventOutcome {
        if changed {
            EventOutcome::ConsumedAndRequestRedraw
        } else {
            EventOutcome::Consumed
        }
    }
}

impl Widget for Menu {
    fn name(&self) -> &'static str {
        "menu"
    }

    fn want_focus(&self) -> bool {
        true
    }

    fn measure(&self, _available: Size) -> Size {
        let width = self.items.iter().map(MenuItem::width).max().unwrap_or(0);
        Size::new(
            u16::try_from(width).unwrap_or(u16::MAX),
            u16::try_from(self.items.len()).unwrap_or(u16::MAX),
        )
    }

    fn render(&self, area: Rect, buf: &mut Buffer, ctx: &RenderContext<'_>) {
        self.area.set(area);
        let width = usize::from(area.width);
        for (row, item) in self.items.iter().enumerate().take(usize::from(area.height)) {
            let y = area.y + row as u16;
            let focused = ctx.focused && self.selected == Some(row);
            let style = match item {
                MenuItem::Disabled { .. } => ctx.theme.style(StyleRole::MenuDisabled),
                _ if focused => ctx.theme.style(StyleRole::MenuFocus),
                _ => ctx.theme.style(StyleRole::Menu),
            };
            buf.set_style(Rect::new(area.x, y, area.width, 1), style);
            match item {
                MenuItem::Separator => {
                    buf.set_stringn(area.x, y, SEPARATOR.repeat(width), width, style);
                }
                MenuItem::Action { label, .. } | MenuItem::Disabled { label } => {
                    buf.set_stringn(area.x, y, format!("  {label}"), width, style);
                }
                MenuItem::Submenu { label, .. } => {
                    buf.set_stringn(area.x, y, format!("  {label}"), width, style);
                    if area.width > 0 {
                        buf.set_string(area.right() - 1, y, ">", style);
                    }
                }
            }
        }
    }

    fn handle_event(&mut self, event: &InputEvent, ctx: &mut EventContext<'_>) -> EventOutcome {
        if self.selected.is_none() {
            return EventOutcome::Ignored;
        }
        match event {
            InputEvent::Key(key) => match key.code {
                KeyCode::Up => Self::moved(self.step(false)),
                KeyCode::Down => Self::moved(self.step(true)),
                KeyCode::Home => {
                    let first = self.items.iter().position(MenuItem::is_selectable);
                    Self::moved(std::mem::replace(&mut self.selected, first) != first)
                }
                KeyCode::End => {
                    let last = self.items.iter().rposition(MenuItem::is_selectable);
                    Self::moved(std::mem::replace(&mut self.selected, last) != last)
                }
                KeyCode::Enter | KeyCode::Char(' ') => self.activate(ctx),
                KeyCode::Right if matches!(self.selected_item(), Some(MenuItem::Submenu { .. })) => {
                    self.activate(ctx)
                }
                _ => EventOutcome::Ignored,
            },
            InputEvent::Mouse(mouse) => match mouse.action {
                MouseAction::ScrollUp => Self::moved(self.step(false)),
                MouseAction::ScrollDown => Self::moved(self.step(true)),
                MouseAction::Down if mouse.button == Some(MouseButton::Left) => {
                    let area = self.area.get();
                    let row = usize::from(mouse.y.saturating_sub(area.y));
                    match self.items.get(row) {
                        Some(item) if mouse.y >= area.y && item.is_selectable() => {
                            self.selected = Some(row);
                            self.activate(ctx)
                        }
                        _ => EventOutcome::Consumed,
                    }
                }
                _ => EventOutcome::Ignored,
            },
            InputEvent::Resize { .. } => EventOutcome::Ignored,
        }
    }
}
