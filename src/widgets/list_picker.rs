//! Scrollable list with a single selection

use crossterm::event::KeyCode;
use ratatui::{buffer::Buffer, layout::Rect};
use std::cell::Cell;

use crate::core::event::{EventContext, EventOutcome, InputEvent, MouseAction, Notification};
use crate::core::widget::{RenderContext, Size, Widget};
use crate::theme::StyleRole;

type SortKey = Box<dyn Fn(&str) -> String>;

/// Up/Down move the selection by one and stop at the ends; Enter emits
/// [`Notification::Selected`].
pub struct ListPicker {
    items: Vec<String>,
    selected: usize,
    sort_key: Option<SortKey>,
    /// Rows shown by the last render, used for paging
    page: Cell<u16>,
}

impl std::fmt::Debug for ListPicker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListPicker")
            .field("items", &self.items)
            .field("selected", &self.selected)
            .field("sorted", &self.sort_key.is_some())
            .finish()
    }
}

impl ListPicker {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: items.into_iter().map(Into::into).collect(),
            selected: 0,
            sort_key: None,
            page: Cell::new(10),
        }
    }

    /// Keep items ordered by `key`, now and on every insertion
    pub fn sorted_by<F>(mut self, key: F) -> Self
    where
        F: Fn(&str) -> String + 'static,
    {
        self.sort_key = Some(Box::new(key));
        self.sort();
        self
    }

    fn sort(&mut self) {
        if let Some(key) = &self.sort_key {
            let current = self.items.get(self.selected).cloned();
            self.items.sort_by_cached_key(|item| key(item));
            if let Some(current) = current {
                self.selected = self.items.iter().position(|item| *item == current).unwrap_or(0);
            }
        }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Selected index, `None` for an empty list
    pub fn selected(&self) -> Option<usize> {
        (!self.items.is_empty()).then_some(self.selected)
    }

    pub fn selected_item(&self) -> Option<&str> {
        self.items.get(self.selected).map(String::as_str)
    }

    /// Select `index`, clamped to the last item. Returns whether the
    /// selection moved.
    pub fn select(&mut self, index: usize) -> bool {
        let clamped = index.min(self.items.len().saturating_sub(1));
        let moved = clamped != self.selected;
        self.selected = clamped;
        moved
    }

    pub fn set_items<I, S>(&mut self, items: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.items = items.into_iter().map(Into::into).collect();
        self.sort();
        self.select(self.selected);
    }

    /// Add an item at its sorted position (or at the end when unsorted).
    /// Returns its index.
    pub fn add_item<S: Into<String>>(&mut self, item: S) -> usize {
        let item = item.into();
        let index = match &self.sort_key {
            Some(key) => {
                let item_key = key(&item);
                self.items.partition_point(|existing| key(existing) <= item_key)
            }
            None => self.items.len(),
        };
        self.items.insert(index, item);
        if index <= self.selected && self.items.len() > 1 {
            self.selected += 1;
        }
        index
    }

    /// Remove the item at `index`, keeping the selection in range
    pub fn remove_item(&mut self, index: usize) -> Option<String> {
        if index >= self.items.len() {
            return None;
        }
        let removed = self.items.remove(index);
        if index < self.selected {
            self.selected -= 1;
        }
        self.select(self.selected);
        Some(removed)
    }

    fn moved(&mut self, index: usize) -> EventOutcome {
        if self.select(index) {
            EventOutcome::ConsumedAndRequestRedraw
        } else {
            EventOutcome::Consumed
        }
    }
}

impl Widget for ListPicker {
    fn name(&self) -> &'static str {
        "list_picker"
    }

    fn want_focus(&self) -> bool {
        true
    }

    fn measure(&self, available: Size) -> Size {
        let width = self
            .items
            .iter()
            .map(|item| unicode_width::UnicodeWidthStr::width(item.as_str()))
            .max()
            .unwrap_or(0);
        Size::new(
            u16::try_from(width).unwrap_or(u16::MAX),
            u16::try_from(self.items.len()).unwrap_or(u16::MAX),
        )
        .min(available)
    }

    fn render(&self, area: Rect, buf: &mut Buffer, ctx: &RenderContext<'_>) {
        if area.height == 0 {
            return;
        }
        self.page.set(area.height);
        let offset = self.selected.saturating_sub(usize::from(area.height) - 1);

        for (row, (index, item)) in self
            .items
            .iter()
            .enumerate()
            .skip(offset)
            .take(usize::from(area.height))
            .enumerate()
        {
            let role = if index == self.selected && ctx.focused {
                StyleRole::ListFocus
            } else {
                StyleRole::ListItem
            };
            let style = ctx.theme.style(role);
            let line = Rect::new(area.x, area.y + row as u16, area.width, 1);
            buf.set_style(line, style);
            buf.set_stringn(line.x, line.y, item, usize::from(area.width), style);
        }
    }

    fn handle_event(&mut self, event: &InputEvent, ctx: &mut EventContext<'_>) -> EventOutcome {
        if self.items.is_empty() {
            return EventOutcome::Ignored;
        }
        let page = usize::from(self.page.get().max(1));
        let last = self.items.len() - 1;

        match event {
            InputEvent::Key(key) => match key.code {
                KeyCode::Up => self.moved(self.selected.saturating_sub(1)),
                KeyCode::Down => self.moved((self.selected + 1).min(last)),
                KeyCode::Home => self.moved(0),
                KeyCode::End => self.moved(last),
                KeyCode::PageUp => self.moved(self.selected.saturating_sub(page)),
                KeyCode::PageDown => self.moved((self.selected + page).min(last)),
                KeyCode::Enter => {
                    let node = ctx.node();
                    ctx.notify(Notification::Selected {
                        node,
                        index: self.selected,
                        item: self.items[self.selected].clone(),
                    });
                    EventOutcome::ConsumedAndRequestRedraw
                }
                _ => EventOutcome::Ignored,
            },
            InputEvent::Mouse(mouse) => match mouse.action {
                MouseAction::ScrollUp => self.moved(self.selected.saturating_sub(1)),
                MouseAction::ScrollDown => self.moved((self.selected + 1).min(last)),
                _ => EventOutcome::Ignored,
            },
            InputEvent::Resize { .. } => EventOutcome::Ignored,
        }
    }
}
