//! Event router: interception, focus-leaf dispatch and bubbling

use ratatui::layout::Rect;
use slotmap::SecondaryMap;
use tracing::{debug, trace};

use super::event::{
    EventContext, FocusDirection, HostCommand, InputEvent, KeyPress, MouseAction, MouseInput,
    Notification,
};
use super::focus::FocusChain;
use super::tree::{NodeId, WidgetTree};
use crate::config::keys::{KeyBinding, KeyConfig};
use crate::error::{FocusError, Result, UiKitError};

/// Coalesces redraw requests until the next render.
#[derive(Debug, Default)]
pub struct RedrawQueue {
    pending: bool,
    requests: usize,
}

impl RedrawQueue {
    pub fn request(&mut self) {
        self.pending = true;
        self.requests += 1;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Requests received since the last [`take`](Self::take)
    pub fn requests(&self) -> usize {
        self.requests
    }

    /// Clear the pending flag, returning whether a redraw was due
    pub fn take(&mut self) -> bool {
        let pending = self.pending;
        self.pending = false;
        self.requests = 0;
        pending
    }
}

/// What an overriding node wants done with a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyIntercept {
    Move(FocusDirection),
    /// Deliver the key to widgets instead of moving focus
    PassThrough,
}

/// Which keys the router turns into focus moves.
#[derive(Debug, Default)]
pub struct InterceptRules {
    global: Vec<(KeyBinding, FocusDirection)>,
    overrides: SecondaryMap<NodeId, Vec<(KeyBinding, KeyIntercept)>>,
}

impl InterceptRules {
    pub fn from_keys(keys: &KeyConfig) -> Self {
        let mut rules = Self::default();
        for binding in &keys.focus_next {
            rules.intercept(*binding, FocusDirection::Forward);
        }
        for binding in &keys.focus_previous {
            rules.intercept(*binding, FocusDirection::Backward);
        }
        rules
    }

    pub fn intercept(&mut self, binding: KeyBinding, direction: FocusDirection) {
        self.release(&binding);
        self.global.push((binding, direction));
    }

    /// Stop intercepting `binding` everywhere
    pub fn release(&mut self, binding: &KeyBinding) {
        self.global.retain(|(existing, _)| existing != binding);
    }

    /// Change what `binding` does while focus is at or below `node`
    pub fn override_for(&mut self, node: NodeId, binding: KeyBinding, intercept: KeyIntercept) {
        if let Some(entries) = self.overrides.get_mut(node) {
            entries.retain(|(existing, _)| existing != &binding);
            entries.push((binding, intercept));
        } else {
            self.overrides.insert(node, vec![(binding, intercept)]);
        }
    }

    pub fn clear_overrides(&mut self, node: NodeId) {
        self.overrides.remove(node);
    }

    /// Resolve a key against the focus path; the override nearest the leaf
    /// wins over farther ones and over the global table.
    pub fn resolve(&self, path: &[NodeId], key: &KeyPress) -> Option<FocusDirection> {
        for node in path.iter().rev() {
            let Some(entries) = self.overrides.get(*node) else {
                continue;
            };
            if let Some((_, intercept)) = entries.iter().find(|(binding, _)| binding.matches(key)) {
                return match intercept {
                    KeyIntercept::Move(direction) => Some(*direction),
                    KeyIntercept::PassThrough => None,
                };
            }
        }
        self.global
            .iter()
            .find(|(binding, _)| binding.matches(key))
            .map(|(_, direction)| *direction)
    }
}

/// Accumulates side effects of dispatching until the host drains them
#[derive(Debug, Default)]
pub struct DispatchSink {
    pub notifications: Vec<Notification>,
    pub commands: Vec<HostCommand>,
    pub redraw: RedrawQueue,
    pub quit_requested: bool,
    pub menu_requested: bool,
}

/// Result of routing one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler consumed the event
    Handled { target: NodeId, redraw: bool },
    /// An intercepted key moved focus
    FocusMoved { to: NodeId },
    /// Focus was about to move but the current widget failed validation
    FocusBlocked { reason: String },
    Resized,
    /// Nobody wanted the event
    Unhandled,
}

#[derive(Debug)]
pub struct EventRouter {
    rules: InterceptRules,
    keys: KeyConfig,
    click_to_focus: bool,
}

impl EventRouter {
    pub fn new(keys: KeyConfig, click_to_focus: bool) -> Self {
        Self {
            rules: InterceptRules::from_keys(&keys),
            keys,
            click_to_focus,
        }
    }

    pub fn keys(&self) -> &KeyConfig {
        &self.keys
    }

    pub fn rules(&self) -> &InterceptRules {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut InterceptRules {
        &mut self.rules
    }

    /// Route one event through the tree.
    ///
    /// `regions` are the regions of the last layout pass, used for mouse hit
    /// testing.
    pub fn dispatch(
        &self,
        tree: &mut WidgetTree,
        focus: &mut FocusChain,
        regions: &SecondaryMap<NodeId, Rect>,
        event: &InputEvent,
        sink: &mut DispatchSink,
    ) -> Result<DispatchOutcome> {
        match event {
            InputEvent::Resize { width, height } => {
                debug!(width, height, "resize");
                sink.redraw.request();
                Ok(DispatchOutcome::Resized)
            }
            InputEvent::Key(key) => self.dispatch_key(tree, focus, event, key, sink),
            InputEvent::Mouse(mouse) => self.dispatch_mouse(tree, focus, regions, event, mouse, sink),
        }
    }

    fn dispatch_key(
        &self,
        tree: &mut WidgetTree,
        focus: &mut FocusChain,
        event: &InputEvent,
        key: &KeyPress,
        sink: &mut DispatchSink,
    ) -> Result<DispatchOutcome> {
        if let Some(direction) = self.rules.resolve(focus.path().nodes(), key) {
            return match focus.move_focus(tree, direction) {
                Ok(to) => {
                    sink.redraw.request();
                    Ok(DispatchOutcome::FocusMoved { to })
                }
                Err(UiKitError::ValidationFailed { reason, .. }) => {
                    sink.redraw.request();
                    Ok(DispatchOutcome::FocusBlocked { reason })
                }
                Err(UiKitError::Focus(FocusError::NoFocusableWidgets)) => {
                    Ok(DispatchOutcome::Unhandled)
                }
                Err(err) => Err(err),
            };
        }

        let start = focus.leaf().unwrap_or_else(|| focus.scope_root(tree));
        let outcome = self.bubble(tree, start, event, sink);

        if outcome == DispatchOutcome::Unhandled {
            if self.keys.is_quit(key) {
                debug!("unhandled quit key");
                sink.quit_requested = true;
            } else if self.keys.is_open_menu(key) {
                sink.menu_requested = true;
            }
        }
        Ok(outcome)
    }

    fn dispatch_mouse(
        &self,
        tree: &mut WidgetTree,
        focus: &mut FocusChain,
        regions: &SecondaryMap<NodeId, Rect>,
        event: &InputEvent,
        mouse: &MouseInput,
        sink: &mut DispatchSink,
    ) -> Result<DispatchOutcome> {
        let scope = focus.scope_root(tree);
        let Some(hit) = hit_test(tree, regions, scope, mouse.x, mouse.y) else {
            trace!(x = mouse.x, y = mouse.y, "click outside every region");
            return Ok(DispatchOutcome::Unhandled);
        };

        if self.click_to_focus && mouse.action == MouseAction::Down {
            let target = tree
                .path_to(hit)
                .into_iter()
                .rev()
                .find(|&id| tree.get(id).map_or(false, |node| node.is_focusable()));
            if let Some(target) = target {
                match focus.set_focus(tree, target) {
                    Ok(()) => sink.redraw.request(),
                    Err(UiKitError::ValidationFailed { reason, .. }) => {
                        sink.redraw.request();
                        return Ok(DispatchOutcome::FocusBlocked { reason });
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        Ok(self.bubble(tree, hit, event, sink))
    }

    /// Offer the event to `start`, then to each ancestor until one consumes it.
    fn bubble(
        &self,
        tree: &mut WidgetTree,
        start: NodeId,
        event: &InputEvent,
        sink: &mut DispatchSink,
    ) -> DispatchOutcome {
        let path = tree.path_to(start);
        for &node in path.iter().rev() {
            if tree.get(node).map_or(true, |n| n.is_detaching()) {
                continue;
            }
            let Some(widget) = tree.dyn_widget_mut(node) else {
                continue;
            };
            let mut ctx = EventContext::new(
                node,
                start,
                &self.keys,
                &mut sink.notifications,
                &mut sink.commands,
            );
            let outcome = widget.handle_event(event, &mut ctx);
            if outcome.is_consumed() {
                let redraw = outcome.wants_redraw();
                if redraw {
                    sink.redraw.request();
                }
                trace!(?node, widget = widget.name(), redraw, "event consumed");
                return DispatchOutcome::Handled {
                    target: node,
                    redraw,
                };
            }
        }
        DispatchOutcome::Unhandled
    }
}

pub(crate) fn rect_contains(rect: Rect, x: u16, y: u16) -> bool {
    x >= rect.x && x < rect.right() && y >= rect.y && y < rect.bottom()
}

/// Deepest displayed node under `from` whose region contains the point.
/// Later siblings are on top.
pub fn hit_test(
    tree: &WidgetTree,
    regions: &SecondaryMap<NodeId, Rect>,
    from: NodeId,
    x: u16,
    y: u16,
) -> Option<NodeId> {
    let node = tree.get(from)?;
    if !node.is_visible() || node.is_detaching() {
        return None;
    }
    let region = regions.get(from)?;
    if !rect_contains(*region, x, y) {
        return None;
    }
    node.children()
        .iter()
        .rev()
        .find_map(|&child| hit_test(tree, regions, child, x, y))
        .or(Some(from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::{EventOutcome, FocusDirection};
    use crate::core::tree::NodeSpec;
    use crate::core::widget::{RenderContext, Widget};
    use crate::widgets::{Button, Container};
    use crossterm::event::{KeyCode, KeyModifiers};
    use ratatui::buffer::Buffer;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Records how often it sees events and consumes the ones it is told to
    struct Recorder {
        seen: Rc<Cell<usize>>,
        consume: Option<EventOutcome>,
        focusable: bool,
    }

    impl Recorder {
        fn new(seen: &Rc<Cell<usize>>, consume: Option<EventOutcome>, focusable: bool) -> Self {
            Self {
                seen: Rc::clone(seen),
                consume,
                focusable,
            }
        }
    }

    impl Widget for Recorder {
        fn want_focus(&self) -> bool {
            self.focusable
        }

        fn render(&self, _area: Rect, _buf: &mut Buffer, _ctx: &RenderContext<'_>) {}

        fn handle_event(&mut self, _event: &InputEvent, _ctx: &mut EventContext<'_>) -> EventOutcome {
            self.seen.set(self.seen.get() + 1);
            self.consume.unwrap_or(EventOutcome::Ignored)
        }
    }

    fn router() -> EventRouter {
        EventRouter::new(KeyConfig::default(), true)
    }

    #[test]
    fn test_consumed_event_does_not_bubble() {
        let parent_seen = Rc::new(Cell::new(0));
        let leaf_seen = Rc::new(Cell::new(0));
        let mut tree = WidgetTree::new(NodeSpec::new(Container::new()));
        let root = tree.root();
        let parent = tree
            .insert(root, NodeSpec::new(Recorder::new(&parent_seen, Some(EventOutcome::Consumed), false)))
            .unwrap();
        let leaf = tree
            .insert(parent, NodeSpec::new(Recorder::new(&leaf_seen, Some(EventOutcome::Consumed), true)))
            .unwrap();
        let mut focus = FocusChain::default();
        focus.set_focus(&mut tree, leaf).unwrap();
        let mut sink = DispatchSink::default();

        let outcome = router()
            .dispatch(&mut tree, &mut focus, &SecondaryMap::new(), &InputEvent::key(KeyCode::Char('x')), &mut sink)
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Handled { target: leaf, redraw: false });
        assert_eq!(leaf_seen.get(), 1);
        assert_eq!(parent_seen.get(), 0);
        assert!(!sink.redraw.is_pending());
    }

    #[test]
    fn test_ignored_event_bubbles_to_parent() {
        let parent_seen = Rc::new(Cell::new(0));
        let leaf_seen = Rc::new(Cell::new(0));
        let mut tree = WidgetTree::new(NodeSpec::new(Container::new()));
        let root = tree.root();
        let parent = tree
            .insert(
                root,
                NodeSpec::new(Recorder::new(&parent_seen, Some(EventOutcome::ConsumedAndRequestRedraw), false)),
            )
            .unwrap();
        let leaf = tree
            .insert(parent, NodeSpec::new(Recorder::new(&leaf_seen, None, true)))
            .unwrap();
        let mut focus = FocusChain::default();
        focus.set_focus(&mut tree, leaf).unwrap();
        let mut sink = DispatchSink::default();

        let outcome = router()
            .dispatch(&mut tree, &mut focus, &SecondaryMap::new(), &InputEvent::key(KeyCode::Char('x')), &mut sink)
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Handled { target: parent, redraw: true });
        assert_eq!(leaf_seen.get(), 1);
        assert_eq!(parent_seen.get(), 1);
        assert!(sink.redraw.is_pending());
    }

    #[test]
    fn test_unhandled_quit_key_raises_signal() {
        let seen = Rc::new(Cell::new(0));
        let mut tree = WidgetTree::new(NodeSpec::new(Container::new()));
        let root = tree.root();
        let leaf = tree.insert(root, NodeSpec::new(Recorder::new(&seen, None, true))).unwrap();
        let mut focus = FocusChain::default();
        focus.set_focus(&mut tree, leaf).unwrap();
        let mut sink = DispatchSink::default();

        let outcome = router()
            .dispatch(&mut tree, &mut focus, &SecondaryMap::new(), &InputEvent::key(KeyCode::Char('q')), &mut sink)
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Unhandled);
        assert!(sink.quit_requested);
    }

    #[test]
    fn test_tab_is_intercepted_unless_overridden() {
        let seen = Rc::new(Cell::new(0));
        let mut tree = WidgetTree::new(NodeSpec::new(Container::new()));
        let root = tree.root();
        let editor = tree
            .insert(root, NodeSpec::new(Recorder::new(&seen, Some(EventOutcome::Consumed), true)))
            .unwrap();
        let other = tree.insert(root, NodeSpec::new(Button::new("other"))).unwrap();
        let mut focus = FocusChain::default();
        focus.set_focus(&mut tree, editor).unwrap();
        let mut router = router();
        let mut sink = DispatchSink::default();
        let tab = InputEvent::key(KeyCode::Tab);

        let outcome = router
            .dispatch(&mut tree, &mut focus, &SecondaryMap::new(), &tab, &mut sink)
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::FocusMoved { to: other });
        assert_eq!(seen.get(), 0);

        focus.set_focus(&mut tree, editor).unwrap();
        router
            .rules_mut()
            .override_for(editor, KeyBinding::plain(KeyCode::Tab), KeyIntercept::PassThrough);
        let outcome = router
            .dispatch(&mut tree, &mut focus, &SecondaryMap::new(), &tab, &mut sink)
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Handled { target: editor, redraw: false });
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn test_nearest_override_wins() {
        let mut tree = WidgetTree::new(NodeSpec::new(Container::new()));
        let root = tree.root();
        let column = tree.insert(root, NodeSpec::new(Container::new())).unwrap();
        let leaf = tree.insert(column, NodeSpec::new(Button::new("x"))).unwrap();
        let down = KeyBinding::plain(KeyCode::Down);

        let mut rules = InterceptRules::default();
        rules.override_for(column, down, KeyIntercept::Move(FocusDirection::Forward));
        let key = KeyPress::plain(KeyCode::Down);
        assert_eq!(rules.resolve(&[root, column, leaf], &key), Some(FocusDirection::Forward));

        rules.override_for(leaf, down, KeyIntercept::PassThrough);
        assert_eq!(rules.resolve(&[root, column, leaf], &key), None);

        let shift_tab = KeyPress::new(KeyCode::BackTab, KeyModifiers::SHIFT);
        let rules = InterceptRules::from_keys(&KeyConfig::default());
        assert_eq!(rules.resolve(&[], &shift_tab), Some(FocusDirection::Backward));
    }

    #[test]
    fn test_mouse_hits_deepest_topmost_node() {
        let back_seen = Rc::new(Cell::new(0));
        let front_seen = Rc::new(Cell::new(0));
        let mut tree = WidgetTree::new(NodeSpec::new(Container::new()));
        let root = tree.root();
        let back = tree
            .insert(root, NodeSpec::new(Recorder::new(&back_seen, Some(EventOutcome::Consumed), false)))
            .unwrap();
        let front = tree
            .insert(root, NodeSpec::new(Recorder::new(&front_seen, Some(EventOutcome::Consumed), false)))
            .unwrap();

        let mut regions = SecondaryMap::new();
        regions.insert(root, Rect::new(0, 0, 20, 10));
        regions.insert(back, Rect::new(0, 0, 20, 10));
        regions.insert(front, Rect::new(5, 2, 5, 3));

        assert_eq!(hit_test(&tree, &regions, root, 6, 3), Some(front));
        assert_eq!(hit_test(&tree, &regions, root, 1, 1), Some(back));
        assert_eq!(hit_test(&tree, &regions, root, 30, 30), None);

        let mut focus = FocusChain::default();
        let mut sink = DispatchSink::default();
        let outcome = router()
            .dispatch(&mut tree, &mut focus, &regions, &InputEvent::click(6, 3), &mut sink)
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Handled { target: front, redraw: false });
        assert_eq!(front_seen.get(), 1);
        assert_eq!(back_seen.get(), 0);

        let outcome = router()
            .dispatch(&mut tree, &mut focus, &regions, &InputEvent::click(50, 50), &mut sink)
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Unhandled);
    }

    #[test]
    fn test_redraw_requests_coalesce() {
        let mut queue = RedrawQueue::default();
        queue.request();
        queue.request();
        queue.request();
        assert_eq!(queue.requests(), 3);
        assert!(queue.take());
        assert!(!queue.take());
    }
}
