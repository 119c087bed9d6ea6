//! Arena-backed widget tree
//!
//! Nodes live in a [`SlotMap`] and refer to each other by [`NodeId`]. A node
//! owns its ordered child list; the parent link is a plain id used for
//! lookups only. Nodes are only ever created under an existing parent and
//! never re-parented, so the tree cannot contain cycles.

use slotmap::{new_key_type, SlotMap};

use super::widget::Widget;
use crate::error::{ContractViolation, Result};

new_key_type! {
    /// Stable identity of a node in the widget tree.
    pub struct NodeId;
}

/// How much room a node asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizePolicy {
    /// Constant size in columns and rows.
    Fixed { width: u16, height: u16 },
    /// Sized from content and available space. Leftover space along the
    /// parent's axis is shared between flow children by weight; a weight of
    /// zero packs the node to its content.
    Flow { weight: u16 },
}

impl SizePolicy {
    pub fn fixed(width: u16, height: u16) -> Self {
        Self::Fixed { width, height }
    }

    pub fn flow() -> Self {
        Self::Flow { weight: 1 }
    }

    pub fn weighted(weight: u16) -> Self {
        Self::Flow { weight }
    }

    pub fn pack() -> Self {
        Self::Flow { weight: 0 }
    }
}

impl Default for SizePolicy {
    fn default() -> Self {
        Self::flow()
    }
}

/// Direction in which a container arranges its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutAxis {
    #[default]
    Vertical,
    Horizontal,
    /// First child fills the area, later children are centered on top of it.
    Overlay,
}

/// Everything needed to create a node, optionally with a subtree below it.
pub struct NodeSpec {
    widget: Box<dyn Widget>,
    size: SizePolicy,
    axis: LayoutAxis,
    focusable: Option<bool>,
    visible: bool,
    name: Option<String>,
    children: Vec<NodeSpec>,
}

impl NodeSpec {
    pub fn new<W: Widget + 'static>(widget: W) -> Self {
        Self {
            widget: Box::new(widget),
            size: SizePolicy::default(),
            axis: LayoutAxis::default(),
            focusable: None,
            visible: true,
            name: None,
            children: Vec::new(),
        }
    }

    pub fn size(mut self, size: SizePolicy) -> Self {
        self.size = size;
        self
    }

    pub fn fixed(self, width: u16, height: u16) -> Self {
        self.size(SizePolicy::fixed(width, height))
    }

    pub fn weight(self, weight: u16) -> Self {
        self.size(SizePolicy::weighted(weight))
    }

    pub fn pack(self) -> Self {
        self.size(SizePolicy::pack())
    }

    pub fn axis(mut self, axis: LayoutAxis) -> Self {
        self.axis = axis;
        self
    }

    /// Override the widget's own opinion about accepting focus.
    pub fn focusable(mut self, focusable: bool) -> Self {
        self.focusable = Some(focusable);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn child(mut self, child: NodeSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn children<I: IntoIterator<Item = NodeSpec>>(mut self, children: I) -> Self {
        self.children.extend(children);
        self
    }
}

/// One widget instance in the composition tree.
pub struct WidgetNode {
    widget: Box<dyn Widget>,
    size: SizePolicy,
    axis: LayoutAxis,
    focusable: bool,
    visible: bool,
    detaching: bool,
    name: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl WidgetNode {
    pub fn widget(&self) -> &dyn Widget {
        &*self.widget
    }

    pub(crate) fn widget_mut(&mut self) -> &mut dyn Widget {
        &mut *self.widget
    }

    pub fn size(&self) -> SizePolicy {
        self.size
    }

    pub fn axis(&self) -> LayoutAxis {
        self.axis
    }

    pub fn is_focusable(&self) -> bool {
        self.focusable
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_detaching(&self) -> bool {
        self.detaching
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

impl std::fmt::Debug for WidgetNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetNode")
            .field("widget", &self.widget.name())
            .field("size", &self.size)
            .field("axis", &self.axis)
            .field("focusable", &self.focusable)
            .field("visible", &self.visible)
            .field("detaching", &self.detaching)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .finish()
    }
}

/// Owner of every node in one viewport.
#[derive(Debug)]
pub struct WidgetTree {
    nodes: SlotMap<NodeId, WidgetNode>,
    root: NodeId,
}

impl WidgetTree {
    /// Create a tree from a root spec, including the spec's subtree.
    pub fn new(root: NodeSpec) -> Self {
        let mut nodes = SlotMap::with_key();
        let NodeSpec {
            widget,
            size,
            axis,
            focusable,
            visible,
            name,
            children,
        } = root;
        let focusable = focusable.unwrap_or_else(|| widget.want_focus());
        let root = nodes.insert(WidgetNode {
            widget,
            size,
            axis,
            focusable,
            visible,
            detaching: false,
            name,
            parent: None,
            children: Vec::new(),
        });

        let mut tree = Self { nodes, root };
        for child in children {
            tree.attach(root, None, child);
        }
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&WidgetNode> {
        self.nodes.get(id)
    }

    pub fn node(&self, id: NodeId) -> Result<&WidgetNode> {
        self.nodes
            .get(id)
            .ok_or_else(|| ContractViolation::UnknownNode(id).into())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Append a node (and its subtree) as the last child of `parent`.
    pub fn insert(&mut self, parent: NodeId, spec: NodeSpec) -> Result<NodeId> {
        self.ensure_mutable(parent)?;
        Ok(self.attach(parent, None, spec))
    }

    /// Insert a node (and its subtree) at `index` among `parent`'s children.
    pub fn insert_at(&mut self, parent: NodeId, index: usize, spec: NodeSpec) -> Result<NodeId> {
        self.ensure_mutable(parent)?;
        Ok(self.attach(parent, Some(index), spec))
    }

    fn attach(&mut self, parent: NodeId, index: Option<usize>, spec: NodeSpec) -> NodeId {
        let NodeSpec {
            widget,
            size,
            axis,
            focusable,
            visible,
            name,
            children,
        } = spec;
        let focusable = focusable.unwrap_or_else(|| widget.want_focus());
        let id = self.nodes.insert(WidgetNode {
            widget,
            size,
            axis,
            focusable,
            visible,
            detaching: false,
            name,
            parent: Some(parent),
            children: Vec::new(),
        });

        let siblings = &mut self.nodes[parent].children;
        match index {
            Some(index) if index < siblings.len() => siblings.insert(index, id),
            _ => siblings.push(id),
        }

        for child in children {
            self.attach(id, None, child);
        }
        id
    }

    fn ensure_mutable(&self, id: NodeId) -> Result<()> {
        let node = self.node(id)?;
        if node.detaching {
            return Err(ContractViolation::NodeDetaching(id).into());
        }
        Ok(())
    }

    /// Typed read access to a node's widget.
    pub fn widget<T: Widget + 'static>(&self, id: NodeId) -> Option<&T> {
        self.nodes
            .get(id)
            .and_then(|node| node.widget().as_any().downcast_ref::<T>())
    }

    /// Typed write access to a node's widget. Fails once the node has
    /// started detaching.
    pub fn widget_mut<T: Widget + 'static>(&mut self, id: NodeId) -> Result<&mut T> {
        self.ensure_mutable(id)?;
        self.nodes[id]
            .widget_mut()
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| {
                ContractViolation::WidgetTypeMismatch {
                    node: id,
                    expected: std::any::type_name::<T>(),
                }
                .into()
            })
    }

    pub(crate) fn dyn_widget_mut(&mut self, id: NodeId) -> Option<&mut dyn Widget> {
        self.nodes.get_mut(id).map(|node| node.widget_mut())
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> Result<()> {
        self.ensure_mutable(id)?;
        self.nodes[id].visible = visible;
        Ok(())
    }

    pub fn set_focusable(&mut self, id: NodeId, focusable: bool) -> Result<()> {
        self.ensure_mutable(id)?;
        self.nodes[id].focusable = focusable;
        Ok(())
    }

    pub fn set_size(&mut self, id: NodeId, size: SizePolicy) -> Result<()> {
        self.ensure_mutable(id)?;
        self.nodes[id].size = size;
        Ok(())
    }

    /// Mark a subtree as being torn down. From here on every mutation of
    /// a node in it fails with [`ContractViolation::NodeDetaching`].
    pub fn begin_detach(&mut self, id: NodeId) -> Result<()> {
        if id == self.root {
            return Err(ContractViolation::RootRemoval.into());
        }
        self.ensure_mutable(id)?;
        for node in self.preorder(id) {
            self.nodes[node].detaching = true;
        }
        Ok(())
    }

    /// Drop a subtree from the arena. Returns the removed ids in pre-order.
    pub fn remove(&mut self, id: NodeId) -> Result<Vec<NodeId>> {
        if id == self.root {
            return Err(ContractViolation::RootRemoval.into());
        }
        let parent = self.node(id)?.parent;
        let removed = self.preorder(id);
        if let Some(parent) = parent.and_then(|parent| self.nodes.get_mut(parent)) {
            parent.children.retain(|&child| child != id);
        }
        for node in &removed {
            self.nodes.remove(*node);
        }
        Ok(removed)
    }

    /// Ids from the root down to `id`, inclusive. Empty for unknown ids.
    pub fn path_to(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            match self.nodes.get(node) {
                Some(widget_node) => {
                    path.push(node);
                    current = widget_node.parent;
                }
                None => return Vec::new(),
            }
        }
        path.reverse();
        path
    }

    pub fn is_descendant_of(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Node and every ancestor are visible and none of them is detaching.
    pub fn is_displayed(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            match self.nodes.get(node) {
                Some(widget_node) if widget_node.visible && !widget_node.detaching => {
                    current = widget_node.parent;
                }
                _ => return false,
            }
        }
        true
    }

    /// Depth-first pre-order walk starting at `from`, children in
    /// insertion order.
    pub fn preorder(&self, from: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            order.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        order
    }

    /// Like [`preorder`](Self::preorder) but skips hidden and detaching
    /// subtrees.
    pub fn displayed_preorder(&self, from: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            if !node.visible || node.detaching {
                continue;
            }
            order.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UiKitError;
    use crate::widgets::{Button, Container, Label};

    fn sample_tree() -> (WidgetTree, NodeId, NodeId, NodeId) {
        let mut tree = WidgetTree::new(NodeSpec::new(Container::new()));
        let root = tree.root();
        let column = tree.insert(root, NodeSpec::new(Container::new())).unwrap();
        let a = tree.insert(column, NodeSpec::new(Button::new("A"))).unwrap();
        let b = tree.insert(column, NodeSpec::new(Button::new("B"))).unwrap();
        (tree, column, a, b)
    }

    #[test]
    fn test_insert_preserves_order_and_parent() {
        let (tree, column, a, b) = sample_tree();
        assert_eq!(tree.children(column), &[a, b]);
        assert_eq!(tree.parent(a), Some(column));
        assert_eq!(tree.path_to(b), vec![tree.root(), column, b]);
        assert!(tree.node(a).unwrap().is_focusable());
    }

    #[test]
    fn test_insert_at_index() {
        let (mut tree, column, a, b) = sample_tree();
        let first = tree
            .insert_at(column, 0, NodeSpec::new(Label::new("first")))
            .unwrap();
        assert_eq!(tree.children(column), &[first, a, b]);
        assert!(!tree.node(first).unwrap().is_focusable());
    }

    #[test]
    fn test_nested_spec_builds_subtree() {
        let mut tree = WidgetTree::new(NodeSpec::new(Container::new()));
        let root = tree.root();
        let column = tree
            .insert(
                root,
                NodeSpec::new(Container::new())
                    .child(NodeSpec::new(Button::new("one")))
                    .child(NodeSpec::new(Button::new("two"))),
            )
            .unwrap();
        assert_eq!(tree.children(column).len(), 2);
        assert_eq!(tree.preorder(root).len(), 4);
    }

    #[test]
    fn test_detaching_nodes_reject_mutation() {
        let (mut tree, column, a, _) = sample_tree();
        tree.begin_detach(column).unwrap();

        let err = tree.set_visible(a, false).unwrap_err();
        assert!(matches!(
            err,
            UiKitError::Contract(ContractViolation::NodeDetaching(id)) if id == a
        ));
        assert!(tree.widget_mut::<Button>(a).is_err());
        assert!(tree.insert(column, NodeSpec::new(Label::new("late"))).is_err());
        assert!(!tree.is_displayed(a));
    }

    #[test]
    fn test_remove_subtree() {
        let (mut tree, column, a, b) = sample_tree();
        let removed = tree.remove(column).unwrap();
        assert_eq!(removed, vec![column, a, b]);
        assert!(!tree.contains(a));
        assert!(tree.children(tree.root()).is_empty());
        assert!(matches!(
            tree.remove(tree.root()),
            Err(UiKitError::Contract(ContractViolation::RootRemoval))
        ));
    }

    #[test]
    fn test_widget_downcast() {
        let (mut tree, _, a, _) = sample_tree();
        assert_eq!(tree.widget::<Button>(a).unwrap().label(), "A");
        assert!(tree.widget::<Label>(a).is_none());
        assert!(matches!(
            tree.widget_mut::<Label>(a),
            Err(UiKitError::Contract(ContractViolation::WidgetTypeMismatch { .. }))
        ));
    }

    #[test]
    fn test_hidden_subtree_skipped() {
        let (mut tree, column, a, b) = sample_tree();
        tree.set_visible(a, false).unwrap();
        assert_eq!(tree.displayed_preorder(column), vec![column, b]);
        assert!(!tree.is_displayed(a));
    }
}
