//! Focus chain: which node holds keyboard focus and how it moves

use tracing::debug;

use super::event::{FocusDirection, Notification};
use super::tree::{NodeId, WidgetTree};
use crate::error::{FocusError, Result, UiKitError};

/// Node ids from the root down to the focused leaf.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FocusPath(Vec<NodeId>);

impl FocusPath {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn leaf(&self) -> Option<NodeId> {
        self.0.last().copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.0.contains(&id)
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<NodeId>> for FocusPath {
    fn from(nodes: Vec<NodeId>) -> Self {
        Self(nodes)
    }
}

/// A modal focus trap and the path to restore when it is popped.
#[derive(Debug)]
struct FocusScope {
    root: NodeId,
    saved: FocusPath,
}

/// Focus state for one widget tree
#[derive(Debug)]
pub struct FocusChain {
    path: FocusPath,
    scopes: Vec<FocusScope>,
    /// Whether traversal wraps at the ends of the active scope
    wrap: bool,
    notifications: Vec<Notification>,
}

impl Default for FocusChain {
    fn default() -> Self {
        Self::new(true)
    }
}

impl FocusChain {
    pub fn new(wrap: bool) -> Self {
        Self {
            path: FocusPath::empty(),
            scopes: Vec::new(),
            wrap,
            notifications: Vec::new(),
        }
    }

    pub fn set_wrap(&mut self, wrap: bool) {
        self.wrap = wrap;
    }

    pub fn path(&self) -> &FocusPath {
        &self.path
    }

    pub fn leaf(&self) -> Option<NodeId> {
        self.path.leaf()
    }

    pub fn is_focused(&self, id: NodeId) -> bool {
        self.leaf() == Some(id)
    }

    /// Root of the innermost focus scope, if any scope is pushed
    pub fn active_scope(&self) -> Option<NodeId> {
        self.scopes.last().map(|scope| scope.root)
    }

    /// Subtree that traversal is currently confined to
    pub fn scope_root(&self, tree: &WidgetTree) -> NodeId {
        self.active_scope().unwrap_or_else(|| tree.root())
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    /// Drain notifications produced since the last call
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Focusable, displayed nodes under `within`, in tab order
    pub fn focusable_nodes(&self, tree: &WidgetTree, within: NodeId) -> Vec<NodeId> {
        tree.displayed_preorder(within)
            .into_iter()
            .filter(|&id| tree.get(id).map_or(false, |node| node.is_focusable()))
            .collect()
    }

    fn check_target(&self, tree: &WidgetTree, target: NodeId) -> std::result::Result<(), FocusError> {
        let invalid = |reason| FocusError::InvalidFocusTarget { node: target, reason };

        let node = tree.get(target).ok_or_else(|| invalid("node does not exist"))?;
        if !node.is_focusable() {
            return Err(invalid("node is not focusable"));
        }
        if !tree.is_displayed(target) {
            return Err(invalid("node or an ancestor is hidden or detaching"));
        }
        if let Some(scope) = self.active_scope() {
            if !tree.is_descendant_of(target, scope) {
                return Err(invalid("node is outside the active focus scope"));
            }
        }
        Ok(())
    }

    /// Focus `target`, replacing the whole path.
    ///
    /// The current leaf is validated first; a failing validation keeps focus
    /// where it is.
    pub fn set_focus(&mut self, tree: &mut WidgetTree, target: NodeId) -> Result<()> {
        self.check_target(tree, target)?;
        if self.is_focused(target) {
            return Ok(());
        }
        self.validate_leaf(tree)?;
        self.apply(tree, FocusPath(tree.path_to(target)));
        Ok(())
    }

    /// Focus `target` without consulting the current leaf's validation
    pub fn force_focus(&mut self, tree: &mut WidgetTree, target: NodeId) -> Result<()> {
        self.check_target(tree, target)?;
        self.apply(tree, FocusPath(tree.path_to(target)));
        Ok(())
    }

    pub(crate) fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    /// Compute the next focusable node from the current leaf without moving
    pub fn next_focusable(&self, tree: &WidgetTree, direction: FocusDirection) -> Result<NodeId> {
        let scope = self.scope_root(tree);
        let all = tree.preorder(scope);
        let candidates: Vec<(usize, NodeId)> = all
            .iter()
            .enumerate()
            .filter(|&(_, &id)| {
                tree.get(id).map_or(false, |node| node.is_focusable()) && tree.is_displayed(id)
            })
            .map(|(index, &id)| (index, id))
            .collect();

        let (first, last) = match (candidates.first(), candidates.last()) {
            (Some(&(_, first)), Some(&(_, last))) => (first, last),
            _ => return Err(FocusError::NoFocusableWidgets.into()),
        };

        let position = self
            .leaf()
            .and_then(|leaf| all.iter().position(|&id| id == leaf));
        let Some(position) = position else {
            return Ok(match direction {
                FocusDirection::Forward => first,
                FocusDirection::Backward => last,
            });
        };

        let current_is_candidate = candidates.iter().any(|&(index, _)| index == position);
        let next = match direction {
            FocusDirection::Forward => candidates
                .iter()
                .find(|&&(index, _)| index > position)
                .map(|&(_, id)| id),
            FocusDirection::Backward => candidates
                .iter()
                .rev()
                .find(|&&(index, _)| index < position)
                .map(|&(_, id)| id),
        };

        Ok(match (next, direction) {
            (Some(id), _) => id,
            (None, FocusDirection::Forward) if self.wrap || !current_is_candidate => first,
            (None, FocusDirection::Backward) if self.wrap || !current_is_candidate => last,
            (None, _) => all[position],
        })
    }

    /// Move focus one step in `direction`, returning the newly focused node
    pub fn move_focus(&mut self, tree: &mut WidgetTree, direction: FocusDirection) -> Result<NodeId> {
        let next = self.next_focusable(tree, direction)?;
        self.set_focus(tree, next)?;
        Ok(next)
    }

    /// Focus the first focusable node of the active scope
    pub fn focus_first(&mut self, tree: &mut WidgetTree) -> Result<NodeId> {
        let scope = self.scope_root(tree);
        let first = self
            .focusable_nodes(tree, scope)
            .first()
            .copied()
            .ok_or(FocusError::NoFocusableWidgets)?;
        self.set_focus(tree, first)?;
        Ok(first)
    }

    /// Repair focus for a subtree that is being torn down.
    ///
    /// Must run after the subtree is marked detaching and before it leaves
    /// the arena. Returns the new leaf, if any.
    pub fn repair_after_removal(&mut self, tree: &mut WidgetTree, removed: NodeId) -> Option<NodeId> {
        // Scopes inside the removed subtree are dropped without restoring.
        self.scopes
            .retain(|scope| !tree.is_descendant_of(scope.root, removed));

        if !self.path.contains(removed) {
            return self.leaf();
        }

        let scope = self.scope_root(tree);
        let mut child = removed;
        while child != scope {
            let Some(parent) = tree.parent(child) else {
                break;
            };
            if let Some(target) = self.nearest_sibling(tree, parent, child) {
                self.apply(tree, FocusPath(tree.path_to(target)));
                return Some(target);
            }
            let parent_focusable = tree.get(parent).map_or(false, |node| node.is_focusable());
            if parent_focusable && tree.is_displayed(parent) {
                self.apply(tree, FocusPath(tree.path_to(parent)));
                return Some(parent);
            }
            child = parent;
        }

        debug!(?removed, "focus path emptied after removal");
        self.apply(tree, FocusPath::empty());
        None
    }

    fn nearest_sibling(&self, tree: &WidgetTree, parent: NodeId, child: NodeId) -> Option<NodeId> {
        let siblings = tree.children(parent);
        let position = siblings.iter().position(|&id| id == child)?;

        let following = siblings[position + 1..]
            .iter()
            .find_map(|&sibling| self.focusable_nodes(tree, sibling).first().copied());
        following.or_else(|| {
            siblings[..position]
                .iter()
                .rev()
                .find_map(|&sibling| self.focusable_nodes(tree, sibling).last().copied())
        })
    }

    /// Trap focus inside `root` and focus its first focusable node.
    ///
    /// The current path is saved and restored by [`pop_scope`](Self::pop_scope).
    pub fn push_scope(&mut self, tree: &mut WidgetTree, root: NodeId) -> Option<NodeId> {
        self.scopes.push(FocusScope {
            root,
            saved: self.path.clone(),
        });
        let first = self.focusable_nodes(tree, root).first().copied();
        let path = first.map_or_else(FocusPath::empty, |id| FocusPath(tree.path_to(id)));
        self.apply(tree, path);
        first
    }

    /// Remove the scope rooted at `root` (and any pushed above it) and restore
    /// the path saved when it was pushed. Returns false when no such scope
    /// exists.
    pub fn pop_scope(&mut self, tree: &mut WidgetTree, root: NodeId) -> bool {
        let Some(position) = self.scopes.iter().position(|scope| scope.root == root) else {
            return false;
        };
        let saved = self.scopes[position].saved.clone();
        self.scopes.truncate(position);

        let restored = saved
            .leaf()
            .filter(|&leaf| self.check_target(tree, leaf).is_ok());
        let path = match restored {
            Some(leaf) => FocusPath(tree.path_to(leaf)),
            None => {
                let scope = self.scope_root(tree);
                self.focusable_nodes(tree, scope)
                    .first()
                    .map_or_else(FocusPath::empty, |&id| FocusPath(tree.path_to(id)))
            }
        };
        self.apply(tree, path);
        true
    }

    fn validate_leaf(&mut self, tree: &mut WidgetTree) -> Result<()> {
        let Some(leaf) = self.leaf() else {
            return Ok(());
        };
        let Some(node) = tree.get(leaf) else {
            return Ok(());
        };
        if node.is_detaching() {
            return Ok(());
        }
        let Err(reason) = node.widget().validate() else {
            return Ok(());
        };

        let field = node
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| node.widget().name().to_string());
        debug!(field = %field, reason = %reason, "focus change blocked by validation");
        if let Some(widget) = tree.dyn_widget_mut(leaf) {
            widget.on_validation_failed(&reason);
        }
        self.notifications.push(Notification::ValidationFailed {
            node: leaf,
            field: field.clone(),
            reason: reason.clone(),
        });
        Err(UiKitError::ValidationFailed { field, reason })
    }

    fn apply(&mut self, tree: &mut WidgetTree, path: FocusPath) {
        if path == self.path {
            return;
        }
        let old = std::mem::replace(&mut self.path, path);

        if let Some(widget) = old.leaf().and_then(|leaf| tree.dyn_widget_mut(leaf)) {
            widget.on_focus_change(false);
        }
        if let Some(widget) = self.path.leaf().and_then(|leaf| tree.dyn_widget_mut(leaf)) {
            widget.on_focus_change(true);
        }

        debug!(old = ?old.leaf(), new = ?self.path.leaf(), "focus changed");
        self.notifications.push(Notification::FocusChanged {
            old,
            new: self.path.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tree::NodeSpec;
    use crate::widgets::{Button, Container, Label, TextInput};

    struct Fixture {
        tree: WidgetTree,
        left: NodeId,
        right: NodeId,
        a: NodeId,
        b: NodeId,
        c: NodeId,
        d: NodeId,
    }

    /// root -> [left -> [a, label, b], right -> [c, d]]
    fn fixture() -> Fixture {
        let mut tree = WidgetTree::new(NodeSpec::new(Container::new()));
        let root = tree.root();
        let left = tree.insert(root, NodeSpec::new(Container::new())).unwrap();
        let right = tree.insert(root, NodeSpec::new(Container::new())).unwrap();
        let a = tree.insert(left, NodeSpec::new(Button::new("a"))).unwrap();
        tree.insert(left, NodeSpec::new(Label::new("label"))).unwrap();
        let b = tree.insert(left, NodeSpec::new(Button::new("b"))).unwrap();
        let c = tree.insert(right, NodeSpec::new(Button::new("c"))).unwrap();
        let d = tree.insert(right, NodeSpec::new(Button::new("d"))).unwrap();
        Fixture {
            tree,
            left,
            right,
            a,
            b,
            c,
            d,
        }
    }

    #[test]
    fn test_set_focus_replaces_path() {
        let mut f = fixture();
        let mut focus = FocusChain::default();
        focus.set_focus(&mut f.tree, f.c).unwrap();

        assert_eq!(focus.path().nodes(), &[f.tree.root(), f.right, f.c]);
        assert!(f.tree.widget::<Button>(f.c).unwrap().is_focused());

        let notifications = focus.take_notifications();
        assert!(matches!(
            &notifications[..],
            [Notification::FocusChanged { old, new }] if old.is_empty() && new.leaf() == Some(f.c)
        ));
    }

    #[test]
    fn test_set_focus_rejects_invalid_targets() {
        let mut f = fixture();
        let mut focus = FocusChain::default();

        let err = focus.set_focus(&mut f.tree, f.left).unwrap_err();
        assert!(matches!(
            err,
            UiKitError::Focus(FocusError::InvalidFocusTarget { .. })
        ));

        f.tree.set_visible(f.right, false).unwrap();
        assert!(focus.set_focus(&mut f.tree, f.d).is_err());
        assert!(focus.path().is_empty());
    }

    #[test]
    fn test_forward_traversal_is_cyclic() {
        let mut f = fixture();
        let mut focus = FocusChain::default();
        let order = [f.a, f.b, f.c, f.d];

        for &start in &order {
            focus.set_focus(&mut f.tree, start).unwrap();
            for _ in 0..order.len() {
                focus.move_focus(&mut f.tree, FocusDirection::Forward).unwrap();
            }
            assert_eq!(focus.leaf(), Some(start));
        }
    }

    #[test]
    fn test_backward_traversal_and_no_wrap() {
        let mut f = fixture();
        let mut focus = FocusChain::default();
        focus.set_focus(&mut f.tree, f.a).unwrap();
        assert_eq!(
            focus.next_focusable(&f.tree, FocusDirection::Backward).unwrap(),
            f.d
        );

        focus.set_wrap(false);
        assert_eq!(
            focus.next_focusable(&f.tree, FocusDirection::Backward).unwrap(),
            f.a
        );
        focus.set_focus(&mut f.tree, f.d).unwrap();
        assert_eq!(
            focus.next_focusable(&f.tree, FocusDirection::Forward).unwrap(),
            f.d
        );
    }

    #[test]
    fn test_no_focusable_widgets() {
        let mut tree = WidgetTree::new(NodeSpec::new(Container::new()));
        let root = tree.root();
        tree.insert(root, NodeSpec::new(Label::new("only text"))).unwrap();
        let focus = FocusChain::default();

        assert!(matches!(
            focus.next_focusable(&tree, FocusDirection::Forward),
            Err(UiKitError::Focus(FocusError::NoFocusableWidgets))
        ));
    }

    #[test]
    fn test_repair_prefers_following_sibling() {
        let mut f = fixture();
        let mut focus = FocusChain::default();
        focus.set_focus(&mut f.tree, f.c).unwrap();

        f.tree.begin_detach(f.c).unwrap();
        assert_eq!(focus.repair_after_removal(&mut f.tree, f.c), Some(f.d));
        f.tree.remove(f.c).unwrap();

        f.tree.begin_detach(f.d).unwrap();
        // No siblings left under `right`; climb and take `left`'s last node.
        assert_eq!(focus.repair_after_removal(&mut f.tree, f.d), Some(f.b));
    }

    #[test]
    fn test_repair_empties_path_when_nothing_survives() {
        let mut tree = WidgetTree::new(NodeSpec::new(Container::new()));
        let root = tree.root();
        let only = tree.insert(root, NodeSpec::new(Button::new("only"))).unwrap();
        let mut focus = FocusChain::default();
        focus.set_focus(&mut tree, only).unwrap();

        tree.begin_detach(only).unwrap();
        assert_eq!(focus.repair_after_removal(&mut tree, only), None);
        assert!(focus.path().is_empty());
    }

    #[test]
    fn test_scope_traps_and_restores() {
        let mut f = fixture();
        let mut focus = FocusChain::default();
        focus.set_focus(&mut f.tree, f.a).unwrap();

        assert_eq!(focus.push_scope(&mut f.tree, f.right), Some(f.c));
        focus.move_focus(&mut f.tree, FocusDirection::Forward).unwrap();
        assert_eq!(focus.leaf(), Some(f.d));
        focus.move_focus(&mut f.tree, FocusDirection::Forward).unwrap();
        assert_eq!(focus.leaf(), Some(f.c));
        assert!(focus.set_focus(&mut f.tree, f.b).is_err());

        assert!(focus.pop_scope(&mut f.tree, f.right));
        assert_eq!(focus.leaf(), Some(f.a));
        assert!(!focus.pop_scope(&mut f.tree, f.right));
    }

    #[test]
    fn test_validation_blocks_blur() {
        let mut tree = WidgetTree::new(NodeSpec::new(Container::new()));
        let root = tree.root();
        let input = tree
            .insert(root, NodeSpec::new(TextInput::new().required()).name("title"))
            .unwrap();
        let button = tree.insert(root, NodeSpec::new(Button::new("ok"))).unwrap();
        let mut focus = FocusChain::default();
        focus.set_focus(&mut tree, input).unwrap();
        focus.take_notifications();

        let err = focus.set_focus(&mut tree, button).unwrap_err();
        assert!(matches!(err, UiKitError::ValidationFailed { ref field, .. } if field == "title"));
        assert_eq!(focus.leaf(), Some(input));
        assert!(matches!(
            &focus.take_notifications()[..],
            [Notification::ValidationFailed { field, .. }] if field == "title"
        ));
    }
}
