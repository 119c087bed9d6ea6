//! Application frame: a header row with a title, the body, and a footer
//! row with a status line.
//!
//! Extra widgets can be placed in either row next to the title or status.

use ratatui::{buffer::Buffer, layout::Rect};

use super::container::Container;
use super::text::Label;
use crate::core::tree::{LayoutAxis, NodeId, NodeSpec, SizePolicy, WidgetTree};
use crate::core::widget::{RenderContext, Widget};
use crate::error::{ContractViolation, Result};
use crate::theme::StyleRole;

const HEADER: &str = "header";
const FOOTER: &str = "footer";
const TITLE: &str = "title";
const STATUS: &str = "status";

/// How a widget shares the header or footer row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotSize {
    /// As wide as its content
    #[default]
    Pack,
    /// Exactly this many columns
    Given(u16),
    /// A share of the leftover columns
    Weight(u16),
}

impl From<SlotSize> for SizePolicy {
    fn from(slot: SlotSize) -> Self {
        match slot {
            SlotSize::Pack => SizePolicy::pack(),
            SlotSize::Given(width) => SizePolicy::fixed(width, 1),
            SlotSize::Weight(weight) => SizePolicy::weighted(weight),
        }
    }
}

/// Which bar of the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameBar {
    Header,
    Footer,
}

impl FrameBar {
    fn row_name(self) -> &'static str {
        match self {
            Self::Header => HEADER,
            Self::Footer => FOOTER,
        }
    }

    fn label_name(self) -> &'static str {
        match self {
            Self::Header => TITLE,
            Self::Footer => STATUS,
        }
    }

    fn role(self) -> StyleRole {
        match self {
            Self::Header => StyleRole::Header,
            Self::Footer => StyleRole::Footer,
        }
    }

    fn spec(self) -> NodeSpec {
        NodeSpec::new(Container::new().background(self.role()))
            .axis(LayoutAxis::Horizontal)
            .pack()
            .name(self.row_name())
            .child(
                NodeSpec::new(Label::new("").role(self.role()))
                    .weight(1)
                    .name(self.label_name()),
            )
    }
}

fn named_child(tree: &WidgetTree, parent: NodeId, name: &str) -> Option<NodeId> {
    tree.children(parent)
        .iter()
        .copied()
        .find(|&child| tree.get(child).and_then(|node| node.name()) == Some(name))
}

/// Root of an application frame subtree
#[derive(Debug, Default)]
pub struct AppFrame;

impl AppFrame {
    /// Frame around `body`; the body takes every row the bars leave
    pub fn build(body: NodeSpec) -> NodeSpec {
        NodeSpec::new(AppFrame)
            .axis(LayoutAxis::Vertical)
            .child(FrameBar::Header.spec())
            .child(body.weight(1))
            .child(FrameBar::Footer.spec())
    }

    fn check(tree: &WidgetTree, frame: NodeId) -> Result<()> {
        tree.node(frame)?;
        tree.widget::<AppFrame>(frame)
            .map(|_| ())
            .ok_or_else(|| {
                ContractViolation::WidgetTypeMismatch {
                    node: frame,
                    expected: std::any::type_name::<AppFrame>(),
                }
                .into()
            })
    }

    fn row(tree: &WidgetTree, frame: NodeId, bar: FrameBar) -> Result<NodeId> {
        Self::check(tree, frame)?;
        named_child(tree, frame, bar.row_name())
            .ok_or_else(|| ContractViolation::UnknownNode(frame).into())
    }

    fn label(tree: &WidgetTree, frame: NodeId, bar: FrameBar) -> Result<NodeId> {
        let row = Self::row(tree, frame, bar)?;
        named_child(tree, row, bar.label_name())
            .ok_or_else(|| ContractViolation::UnknownNode(row).into())
    }

    /// The body node
    pub fn body(tree: &WidgetTree, frame: NodeId) -> Result<NodeId> {
        Self::check(tree, frame)?;
        tree.children(frame)
            .get(1)
            .copied()
            .ok_or_else(|| ContractViolation::UnknownNode(frame).into())
    }

    pub fn title(tree: &WidgetTree, frame: NodeId) -> Result<String> {
        let label = Self::label(tree, frame, FrameBar::Header)?;
        Ok(tree
            .widget::<Label>(label)
            .map(|label| label.text().to_string())
            .unwrap_or_default())
    }

    pub fn status(tree: &WidgetTree, frame: NodeId) -> Result<String> {
        let label = Self::label(tree, frame, FrameBar::Footer)?;
        Ok(tree
            .widget::<Label>(label)
            .map(|label| label.text().to_string())
            .unwrap_or_default())
    }

    pub fn set_title(tree: &mut WidgetTree, frame: NodeId, title: &str) -> Result<()> {
        let label = Self::label(tree, frame, FrameBar::Header)?;
        tree.widget_mut::<Label>(label)?.set_text(title);
        Ok(())
    }

    pub fn set_status(tree: &mut WidgetTree, frame: NodeId, status: &str) -> Result<()> {
        let label = Self::label(tree, frame, FrameBar::Footer)?;
        tree.widget_mut::<Label>(label)?.set_text(status);
        Ok(())
    }

    /// Put a widget in the header or footer row, at `index` or at the end
    pub fn add_bar_widget(
        tree: &mut WidgetTree,
        frame: NodeId,
        bar: FrameBar,
        spec: NodeSpec,
        size: SlotSize,
        index: Option<usize>,
    ) -> Result<NodeId> {
        let row = Self::row(tree, frame, bar)?;
        let spec = spec.size(size.into());
        match index {
            Some(index) => tree.insert_at(row, index, spec),
            None => tree.insert(row, spec),
        }
    }
}

impl Widget for AppFrame {
    fn name(&self) -> &'static str {
        "app_frame"
    }

    fn render(&self, _area: Rect, _buf: &mut Buffer, _ctx: &RenderContext<'_>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::compositor::Compositor;
    use crate::core::focus::FocusPath;
    use crate::theme::Theme;
    use crate::widgets::ProgressBar;

    fn row_text(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf.get(x, y).symbol().to_string())
            .collect()
    }

    #[test]
    fn test_bars_frame_the_body() {
        let mut tree = WidgetTree::new(AppFrame::build(NodeSpec::new(Container::new())));
        let frame = tree.root();
        let body = AppFrame::body(&tree, frame).unwrap();
        AppFrame::set_title(&mut tree, frame, "Demo").unwrap();
        AppFrame::set_status(&mut tree, frame, "ready").unwrap();

        let mut compositor = Compositor::new();
        compositor.layout(&tree, Rect::new(0, 0, 30, 6)).unwrap();
        assert_eq!(compositor.region(body), Some(Rect::new(0, 1, 30, 4)));

        let buf = compositor.compose(&tree, &FocusPath::empty(), &Theme::default());
        assert!(row_text(&buf, 0).starts_with("Demo"));
        assert!(row_text(&buf, 5).starts_with("ready"));
        assert_eq!(AppFrame::title(&tree, frame).unwrap(), "Demo");
        assert_eq!(AppFrame::status(&tree, frame).unwrap(), "ready");
    }

    #[test]
    fn test_bar_widgets_share_the_row() {
        let mut tree = WidgetTree::new(AppFrame::build(NodeSpec::new(Container::new())));
        let frame = tree.root();
        AppFrame::set_status(&mut tree, frame, "ok").unwrap();
        let mode = AppFrame::add_bar_widget(
            &mut tree,
            frame,
            FrameBar::Footer,
            NodeSpec::new(Label::new("[edit]")),
            SlotSize::Pack,
            Some(0),
        )
        .unwrap();
        let bar = AppFrame::add_bar_widget(
            &mut tree,
            frame,
            FrameBar::Footer,
            NodeSpec::new(ProgressBar::new()),
            SlotSize::Given(10),
            None,
        )
        .unwrap();

        let mut compositor = Compositor::new();
        compositor.layout(&tree, Rect::new(0, 0, 30, 4)).unwrap();
        assert_eq!(compositor.region(mode), Some(Rect::new(0, 3, 6, 1)));
        assert_eq!(compositor.region(bar), Some(Rect::new(20, 3, 10, 1)));

        let buf = compositor.compose(&tree, &FocusPath::empty(), &Theme::default());
        assert!(row_text(&buf, 3).starts_with("[edit]ok"));
    }

    #[test]
    fn test_slot_sizes_map_to_policies() {
        assert_eq!(SizePolicy::from(SlotSize::Pack), SizePolicy::pack());
        assert_eq!(SizePolicy::from(SlotSize::Given(8)), SizePolicy::fixed(8, 1));
        assert_eq!(SizePolicy::from(SlotSize::Weight(2)), SizePolicy::weighted(2));
    }

    #[test]
    fn test_other_widgets_are_rejected() {
        let mut tree = WidgetTree::new(NodeSpec::new(Container::new()));
        let root = tree.root();
        let err = AppFrame::set_title(&mut tree, root, "x").unwrap_err();
        assert!(!err.is_recoverable());
    }
}
