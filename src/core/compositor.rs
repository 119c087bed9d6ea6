//! Canvas compositor: two-pass layout and composition into one buffer

use ratatui::{buffer::Buffer, layout::Rect};
use slotmap::SecondaryMap;
use tracing::warn;

use super::focus::FocusPath;
use super::tree::{LayoutAxis, NodeId, SizePolicy, WidgetTree};
use super::widget::{RenderContext, Size};
use crate::error::LayoutOverflow;
use crate::theme::Theme;

/// Shrink a rect by `margin` cells on every side
pub(crate) fn inset(area: Rect, margin: u16) -> Rect {
    let double = margin.saturating_mul(2);
    if area.width <= double || area.height <= double {
        return Rect::new(
            area.x.saturating_add(margin.min(area.width / 2)),
            area.y.saturating_add(margin.min(area.height / 2)),
            0,
            0,
        );
    }
    Rect::new(
        area.x + margin,
        area.y + margin,
        area.width - double,
        area.height - double,
    )
}

fn main_extent(size: Size, axis: LayoutAxis) -> u16 {
    match axis {
        LayoutAxis::Horizontal => size.width,
        _ => size.height,
    }
}

/// Region bookkeeping for one tree
#[derive(Debug, Default)]
pub struct Compositor {
    regions: SecondaryMap<NodeId, Rect>,
    desired: SecondaryMap<NodeId, Size>,
    overflows: Vec<LayoutOverflow>,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last known region of a node
    pub fn region(&self, id: NodeId) -> Option<Rect> {
        self.regions.get(id).copied()
    }

    pub fn regions(&self) -> &SecondaryMap<NodeId, Rect> {
        &self.regions
    }

    /// Overflows recorded by the last layout pass
    pub fn overflows(&self) -> &[LayoutOverflow] {
        &self.overflows
    }

    pub fn forget(&mut self, id: NodeId) {
        self.regions.remove(id);
        self.desired.remove(id);
    }

    /// Assign a region to every displayed node.
    ///
    /// On overflow the pass still completes with the offending children
    /// truncated; the first overflow is returned.
    pub fn layout(&mut self, tree: &WidgetTree, area: Rect) -> Result<(), LayoutOverflow> {
        self.regions.clear();
        self.desired.clear();
        self.overflows.clear();

        let root = tree.root();
        self.measure(tree, root, Size::from(area));
        self.assign(tree, root, area);

        for overflow in &self.overflows {
            warn!(
                node = ?overflow.node,
                axis = ?overflow.axis,
                required = overflow.required,
                available = overflow.available,
                "layout overflow, truncating"
            );
        }
        match self.overflows.first() {
            Some(overflow) => Err(overflow.clone()),
            None => Ok(()),
        }
    }

    /// Pass 1: desired sizes, bottom-up
    fn measure(&mut self, tree: &WidgetTree, id: NodeId, available: Size) -> Size {
        let Some(node) = tree.get(id) else {
            return Size::ZERO;
        };
        let border = node.widget().border();
        let inner = Size::new(
            available.width.saturating_sub(border * 2),
            available.height.saturating_sub(border * 2),
        );

        let children: Vec<NodeId> = node
            .children()
            .iter()
            .copied()
            .filter(|&child| tree.get(child).map_or(false, |c| c.is_visible() && !c.is_detaching()))
            .collect();
        let child_sizes: Vec<Size> = children
            .iter()
            .map(|&child| self.measure(tree, child, inner))
            .collect();

        let desired = match node.size() {
            SizePolicy::Fixed { width, height } => Size::new(width, height),
            SizePolicy::Flow { .. } if children.is_empty() => node.widget().measure(available),
            SizePolicy::Flow { .. } => {
                let content = child_sizes.iter().fold(Size::ZERO, |acc, size| match node.axis() {
                    LayoutAxis::Vertical => Size::new(
                        acc.width.max(size.width),
                        acc.height.saturating_add(size.height),
                    ),
                    LayoutAxis::Horizontal => Size::new(
                        acc.width.saturating_add(size.width),
                        acc.height.max(size.height),
                    ),
                    LayoutAxis::Overlay => Size::new(
                        acc.width.max(size.width),
                        acc.height.max(size.height),
                    ),
                });
                Size::new(
                    content.width.saturating_add(border * 2),
                    content.height.saturating_add(border * 2),
                )
            }
        };
        let desired = desired.min(available);
        self.desired.insert(id, desired);
        desired
    }

    /// Pass 2: concrete regions, top-down
    fn assign(&mut self, tree: &WidgetTree, id: NodeId, area: Rect) {
        self.regions.insert(id, area);
        let Some(node) = tree.get(id) else {
            return;
        };
        let inner = inset(area, node.widget().border());
        let axis = node.axis();
        let children: Vec<NodeId> = node
            .children()
            .iter()
            .copied()
            .filter(|&child| tree.get(child).map_or(false, |c| c.is_visible() && !c.is_detaching()))
            .collect();
        if children.is_empty() {
            return;
        }

        let placements = match axis {
            LayoutAxis::Overlay => self.overlay(tree, id, &children, inner),
            LayoutAxis::Vertical | LayoutAxis::Horizontal => {
                self.stack(tree, id, axis, &children, inner)
            }
        };
        for (child, region) in placements {
            self.assign(tree, child, region);
        }
    }

    fn overlay(
        &mut self,
        tree: &WidgetTree,
        id: NodeId,
        children: &[NodeId],
        inner: Rect,
    ) -> Vec<(NodeId, Rect)> {
        for &child in children {
            if let Some(SizePolicy::Fixed { width, height }) = tree.get(child).map(|c| c.size()) {
                self.check_cross(id, LayoutAxis::Horizontal, width, inner.width);
                self.check_cross(id, LayoutAxis::Vertical, height, inner.height);
            }
        }
        children
            .iter()
            .enumerate()
            .map(|(index, &child)| {
                if index == 0 {
                    return (child, inner);
                }
                let desired = self.desired.get(child).copied().unwrap_or(Size::ZERO);
                let width = desired.width.min(inner.width);
                let height = desired.height.min(inner.height);
                let x = inner.x + (inner.width - width) / 2;
                let y = inner.y + (inner.height - height) / 2;
                (child, Rect::new(x, y, width, height))
            })
            .collect()
    }

    /// Record an overflow when a fixed extent along `axis` exceeds what is there
    fn check_cross(&mut self, node: NodeId, axis: LayoutAxis, required: u16, available: u16) {
        if required > available {
            self.overflows.push(LayoutOverflow {
                node,
                axis,
                required,
                available,
            });
        }
    }

    fn stack(
        &mut self,
        tree: &WidgetTree,
        id: NodeId,
        axis: LayoutAxis,
        children: &[NodeId],
        inner: Rect,
    ) -> Vec<(NodeId, Rect)> {
        let extent = main_extent(Size::from(inner), axis);
        let mut sizes = vec![0u16; children.len()];
        let mut remaining = extent;

        let policies: Vec<SizePolicy> = children
            .iter()
            .map(|&child| tree.get(child).map_or(SizePolicy::pack(), |c| c.size()))
            .collect();

        let required: u32 = policies
            .iter()
            .map(|policy| match policy {
                SizePolicy::Fixed { width, height } => {
                    u32::from(main_extent(Size::new(*width, *height), axis))
                }
                SizePolicy::Flow { .. } => 0,
            })
            .sum();
        if required > u32::from(extent) {
            self.overflows.push(LayoutOverflow {
                node: id,
                axis,
                required: u16::try_from(required).unwrap_or(u16::MAX),
                available: extent,
            });
        }

        let (cross_axis, cross_extent) = match axis {
            LayoutAxis::Horizontal => (LayoutAxis::Vertical, inner.height),
            _ => (LayoutAxis::Horizontal, inner.width),
        };
        for policy in &policies {
            if let SizePolicy::Fixed { width, height } = policy {
                let cross = match axis {
                    LayoutAxis::Horizontal => *height,
                    _ => *width,
                };
                self.check_cross(id, cross_axis, cross, cross_extent);
            }
        }

        // Fixed children first, in order; the ones past the end are truncated.
        for (index, policy) in policies.iter().enumerate() {
            if let SizePolicy::Fixed { width, height } = policy {
                let want = main_extent(Size::new(*width, *height), axis);
                sizes[index] = want.min(remaining);
                remaining -= sizes[index];
            }
        }

        // Flow children get their measured size.
        for (index, policy) in policies.iter().enumerate() {
            if matches!(policy, SizePolicy::Flow { .. }) {
                let desired = self.desired.get(children[index]).copied().unwrap_or(Size::ZERO);
                sizes[index] = main_extent(desired, axis).min(remaining);
                remaining -= sizes[index];
            }
        }

        // Leftover is shared by weight.
        let total_weight: u32 = policies
            .iter()
            .map(|policy| match policy {
                SizePolicy::Flow { weight } => u32::from(*weight),
                SizePolicy::Fixed { .. } => 0,
            })
            .sum();
        if total_weight > 0 && remaining > 0 {
            let leftover = u32::from(remaining);
            let mut handed_out = 0u32;
            for (index, policy) in policies.iter().enumerate() {
                if let SizePolicy::Flow { weight } = policy {
                    let share = leftover * u32::from(*weight) / total_weight;
                    sizes[index] = sizes[index].saturating_add(share as u16);
                    handed_out += share;
                }
            }
            let mut rest = leftover - handed_out;
            for (index, policy) in policies.iter().enumerate() {
                if rest == 0 {
                    break;
                }
                if matches!(policy, SizePolicy::Flow { weight } if *weight > 0) {
                    sizes[index] += 1;
                    rest -= 1;
                }
            }
        }

        let mut offset = 0u16;
        children
            .iter()
            .zip(policies.iter())
            .zip(sizes)
            .map(|((&child, policy), main)| {
                let region = match axis {
                    LayoutAxis::Horizontal => {
                        let cross = match policy {
                            SizePolicy::Fixed { height, .. } => (*height).min(inner.height),
                            SizePolicy::Flow { .. } => inner.height,
                        };
                        Rect::new(inner.x + offset, inner.y, main, cross)
                    }
                    _ => {
                        let cross = match policy {
                            SizePolicy::Fixed { width, .. } => (*width).min(inner.width),
                            SizePolicy::Flow { .. } => inner.width,
                        };
                        Rect::new(inner.x, inner.y + offset, cross, main)
                    }
                };
                offset += main;
                (child, region)
            })
            .collect()
    }

    /// Render every displayed node into its region, parents first and
    /// siblings in tree order.
    pub fn compose(&self, tree: &WidgetTree, focus: &FocusPath, theme: &Theme) -> Buffer {
        let area = self.region(tree.root()).unwrap_or_default();
        let mut buf = Buffer::empty(area);
        for id in tree.displayed_preorder(tree.root()) {
            let (Some(node), Some(region)) = (tree.get(id), self.region(id)) else {
                continue;
            };
            let region = region.intersection(area);
            if region.width == 0 || region.height == 0 {
                continue;
            }
            let ctx = RenderContext {
                focused: focus.leaf() == Some(id),
                focus_within: focus.contains(id),
                theme,
            };
            node.widget().render(region, &mut buf, &ctx);
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tree::NodeSpec;
    use crate::widgets::{Button, Container, Label};

    fn area(width: u16, height: u16) -> Rect {
        Rect::new(0, 0, width, height)
    }

    #[test]
    fn test_vertical_fixed_and_weighted_flow() {
        let mut tree = WidgetTree::new(NodeSpec::new(Container::new()));
        let root = tree.root();
        let header = tree.insert(root, NodeSpec::new(Label::new("head")).fixed(20, 1)).unwrap();
        let body = tree.insert(root, NodeSpec::new(Container::new()).weight(2)).unwrap();
        let side = tree.insert(root, NodeSpec::new(Container::new()).weight(1)).unwrap();
        let mut compositor = Compositor::new();

        compositor.layout(&tree, area(20, 10)).unwrap();

        assert_eq!(compositor.region(header), Some(Rect::new(0, 0, 20, 1)));
        assert_eq!(compositor.region(body), Some(Rect::new(0, 1, 20, 6)));
        assert_eq!(compositor.region(side), Some(Rect::new(0, 7, 20, 3)));
    }

    #[test]
    fn test_horizontal_pack_keeps_content_width() {
        let mut tree = WidgetTree::new(NodeSpec::new(Container::new()).axis(LayoutAxis::Horizontal));
        let root = tree.root();
        let ok = tree.insert(root, NodeSpec::new(Button::new("OK")).pack()).unwrap();
        let rest = tree.insert(root, NodeSpec::new(Container::new())).unwrap();
        let mut compositor = Compositor::new();

        compositor.layout(&tree, area(30, 1)).unwrap();

        let button_width = Button::new("OK").label_width();
        assert_eq!(compositor.region(ok), Some(Rect::new(0, 0, button_width, 1)));
        assert_eq!(
            compositor.region(rest),
            Some(Rect::new(button_width, 0, 30 - button_width, 1))
        );
    }

    #[test]
    fn test_overlay_centers_later_children() {
        let mut tree = WidgetTree::new(NodeSpec::new(Container::new()).axis(LayoutAxis::Overlay));
        let root = tree.root();
        let body = tree.insert(root, NodeSpec::new(Container::new())).unwrap();
        let popup = tree.insert(root, NodeSpec::new(Container::new()).fixed(10, 4)).unwrap();
        let mut compositor = Compositor::new();

        compositor.layout(&tree, area(40, 20)).unwrap();

        assert_eq!(compositor.region(body), Some(area(40, 20)));
        assert_eq!(compositor.region(popup), Some(Rect::new(15, 8, 10, 4)));
    }

    #[test]
    fn test_overflow_truncates_and_reports() {
        let mut tree = WidgetTree::new(NodeSpec::new(Container::new()).axis(LayoutAxis::Horizontal));
        let root = tree.root();
        let a = tree.insert(root, NodeSpec::new(Label::new("a")).fixed(8, 1)).unwrap();
        let b = tree.insert(root, NodeSpec::new(Label::new("b")).fixed(8, 1)).unwrap();
        let c = tree.insert(root, NodeSpec::new(Label::new("c")).fixed(8, 1)).unwrap();
        let mut compositor = Compositor::new();

        let err = compositor.layout(&tree, area(20, 1)).unwrap_err();
        assert_eq!(err.required, 24);
        assert_eq!(err.available, 20);
        assert_eq!(compositor.region(a), Some(Rect::new(0, 0, 8, 1)));
        assert_eq!(compositor.region(b), Some(Rect::new(8, 0, 8, 1)));
        assert_eq!(compositor.region(c), Some(Rect::new(16, 0, 4, 1)));
    }

    #[test]
    fn test_fixed_child_wider_than_vertical_container_overflows() {
        let mut tree = WidgetTree::new(NodeSpec::new(Container::new()));
        let root = tree.root();
        let wide = tree.insert(root, NodeSpec::new(Label::new("wide")).fixed(30, 1)).unwrap();
        let mut compositor = Compositor::new();

        let err = compositor.layout(&tree, area(20, 5)).unwrap_err();
        assert_eq!(err.axis, LayoutAxis::Horizontal);
        assert_eq!(err.required, 30);
        assert_eq!(err.available, 20);
        assert_eq!(compositor.region(wide), Some(Rect::new(0, 0, 20, 1)));
    }

    #[test]
    fn test_fixed_overlay_child_larger_than_screen_overflows() {
        let mut tree = WidgetTree::new(NodeSpec::new(Container::new()).axis(LayoutAxis::Overlay));
        let root = tree.root();
        tree.insert(root, NodeSpec::new(Container::new())).unwrap();
        let popup = tree.insert(root, NodeSpec::new(Container::new()).fixed(60, 30)).unwrap();
        let mut compositor = Compositor::new();

        assert!(compositor.layout(&tree, area(40, 10)).is_err());
        let axes: Vec<(LayoutAxis, u16, u16)> = compositor
            .overflows()
            .iter()
            .map(|overflow| (overflow.axis, overflow.required, overflow.available))
            .collect();
        assert_eq!(
            axes,
            [(LayoutAxis::Horizontal, 60, 40), (LayoutAxis::Vertical, 30, 10)]
        );
        assert_eq!(compositor.region(popup), Some(area(40, 10)));
    }

    #[test]
    fn test_hidden_nodes_get_no_region() {
        let mut tree = WidgetTree::new(NodeSpec::new(Container::new()));
        let root = tree.root();
        let hidden = tree.insert(root, NodeSpec::new(Label::new("x")).hidden()).unwrap();
        let mut compositor = Compositor::new();
        compositor.layout(&tree, area(10, 3)).unwrap();
        assert_eq!(compositor.region(hidden), None);
    }

    #[test]
    fn test_compose_is_idempotent() {
        let mut tree = WidgetTree::new(NodeSpec::new(Container::new()));
        let root = tree.root();
        tree.insert(root, NodeSpec::new(Label::new("hello world")).pack()).unwrap();
        tree.insert(root, NodeSpec::new(Button::new("Go")).pack()).unwrap();
        let mut compositor = Compositor::new();
        compositor.layout(&tree, area(20, 4)).unwrap();
        let theme = Theme::default();

        let first = compositor.compose(&tree, &FocusPath::empty(), &theme);
        let second = compositor.compose(&tree, &FocusPath::empty(), &theme);
        assert_eq!(first, second);
        assert_eq!(first.get(0, 0).symbol(), "h");
    }
}
