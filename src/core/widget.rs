//! Widget abstraction shared by every node in the tree

use std::any::Any;

use ratatui::{buffer::Buffer, layout::Rect};

use super::event::{EventContext, EventOutcome, InputEvent};
use crate::theme::Theme;

/// Upcast helper so trait objects can be downcast to their concrete widget.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Columns and rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: u16,
    pub height: u16,
}

impl Size {
    pub const ZERO: Size = Size { width: 0, height: 0 };

    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Component-wise minimum.
    pub fn min(self, other: Size) -> Self {
        Self {
            width: self.width.min(other.width),
            height: self.height.min(other.height),
        }
    }
}

impl From<Rect> for Size {
    fn from(rect: Rect) -> Self {
        Self::new(rect.width, rect.height)
    }
}

/// Per-node information available while rendering.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    /// The node is the focused leaf.
    pub focused: bool,
    /// The node lies on the focus path.
    pub focus_within: bool,
    pub theme: &'a Theme,
}

/// Common widget trait for all UI components
pub trait Widget: AsAny {
    /// Short type name used in logs
    fn name(&self) -> &'static str {
        "widget"
    }

    /// Whether a node created for this widget accepts focus by default
    fn want_focus(&self) -> bool {
        false
    }

    /// Desired size for flow layout, given the room on offer
    fn measure(&self, available: Size) -> Size {
        available
    }

    /// Cells taken by a frame on each side; children are laid out inside it
    fn border(&self) -> u16 {
        0
    }

    /// Render the widget to the given area
    fn render(&self, area: Rect, buf: &mut Buffer, ctx: &RenderContext<'_>);

    /// Handle an input event routed to this node
    fn handle_event(&mut self, _event: &InputEvent, _ctx: &mut EventContext<'_>) -> EventOutcome {
        EventOutcome::Ignored
    }

    /// Consulted before focus leaves this widget
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    /// Called when a failed [`validate`](Self::validate) blocked a focus change
    fn on_validation_failed(&mut self, _reason: &str) {}

    /// Called when this widget gains or loses focus
    fn on_focus_change(&mut self, _focused: bool) {}
}
