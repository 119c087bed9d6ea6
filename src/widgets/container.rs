//! Plain container, optionally framed

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    widgets::{Block, Borders, Widget as RatatuiWidget},
};

use crate::core::widget::{RenderContext, Size, Widget};
use crate::theme::StyleRole;

/// Groups children; the layout axis lives on the node, not here.
#[derive(Debug, Clone, Default)]
pub struct Container {
    title: Option<String>,
    bordered: bool,
    background: Option<StyleRole>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw a frame and lay children out inside it
    pub fn bordered(mut self) -> Self {
        self.bordered = true;
        self
    }

    pub fn title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = Some(title.into());
        self.bordered = true;
        self
    }

    /// Fill the whole region with this role's style before children draw
    pub fn background(mut self, role: StyleRole) -> Self {
        self.background = Some(role);
        self
    }
}

impl Widget for Container {
    fn name(&self) -> &'static str {
        "container"
    }

    fn measure(&self, _available: Size) -> Size {
        let frame = self.border() * 2;
        Size::new(frame, frame)
    }

    fn border(&self) -> u16 {
        u16::from(self.bordered)
    }

    fn render(&self, area: Rect, buf: &mut Buffer, ctx: &RenderContext<'_>) {
        if let Some(role) = self.background {
            buf.set_style(area, ctx.theme.style(role));
        }
        if !self.bordered {
            return;
        }

        let border_role = if ctx.focus_within {
            StyleRole::BorderFocus
        } else {
            StyleRole::Border
        };
        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_style(ctx.theme.style(border_role));
        if let Some(title) = &self.title {
            block = block
                .title(title.as_str())
                .title_style(ctx.theme.style(StyleRole::Title));
        }
        RatatuiWidget::render(block, area, buf);
    }
}
