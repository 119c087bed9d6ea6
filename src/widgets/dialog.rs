//! Modal dialogs and the dialog stack
//!
//! A dialog is a framed subtree inserted into the host's overlay root. While
//! it is visible a focus scope traps traversal inside it. Closing runs the
//! optional veto callback, restores the focus saved when the dialog opened
//! and marks the subtree detaching; the subtree leaves the tree when the
//! host reaps it.

use crossterm::event::KeyCode;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    widgets::{Block, Borders, Clear, Widget as RatatuiWidget},
};
use tracing::{debug, warn};

use super::button::Button;
use super::container::Container;
use crate::core::event::{EventContext, EventOutcome, InputEvent, Notification};
use crate::core::focus::FocusChain;
use crate::core::tree::{LayoutAxis, NodeId, NodeSpec, WidgetTree};
use crate::core::widget::{RenderContext, Size, Widget};
use crate::error::{ContractViolation, Result};
use crate::theme::StyleRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogState {
    Hidden,
    Visible,
    Closing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialogKind {
    #[default]
    Dialog,
    /// Menu levels also close on Left
    Menu,
}

/// Identity of an open dialog: its frame node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DialogId(pub NodeId);

impl DialogId {
    pub fn node(self) -> NodeId {
        self.0
    }
}

/// Return false to keep the dialog open
pub type CloseCallback = Box<dyn FnMut(&WidgetTree, DialogId) -> bool>;

/// Framed, opaque box drawn over whatever is below it
#[derive(Debug, Clone)]
pub struct DialogFrame {
    title: String,
    kind: DialogKind,
}

impl DialogFrame {
    pub fn new<S: Into<String>>(title: S, kind: DialogKind) -> Self {
        Self {
            title: title.into(),
            kind,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn kind(&self) -> DialogKind {
        self.kind
    }
}

impl Widget for DialogFrame {
    fn name(&self) -> &'static str {
        "dialog_frame"
    }

    fn measure(&self, _available: Size) -> Size {
        let title = u16::try_from(unicode_width::UnicodeWidthStr::width(self.title.as_str()))
            .unwrap_or(u16::MAX);
        Size::new(title.saturating_add(4), 2)
    }

    fn border(&self) -> u16 {
        1
    }

    fn render(&self, area: Rect, buf: &mut Buffer, ctx: &RenderContext<'_>) {
        let role = match self.kind {
            DialogKind::Dialog => StyleRole::Dialog,
            DialogKind::Menu => StyleRole::Menu,
        };
        RatatuiWidget::render(Clear, area, buf);
        let mut block = Block::default()
            .borders(Borders::ALL)
            .style(ctx.theme.style(role));
        if !self.title.is_empty() {
            block = block
                .title(self.title.as_str())
                .title_style(ctx.theme.style(StyleRole::Title));
        }
        RatatuiWidget::render(block, area, buf);
    }

    fn handle_event(&mut self, event: &InputEvent, ctx: &mut EventContext<'_>) -> EventOutcome {
        let InputEvent::Key(key) = event else {
            return EventOutcome::Ignored;
        };
        let closes = ctx.keys().is_dismiss(key)
            || (self.kind == DialogKind::Menu && key.code == KeyCode::Left);
        if closes {
            let frame = ctx.node();
            ctx.close_dialog(frame);
            return EventOutcome::ConsumedAndRequestRedraw;
        }
        EventOutcome::Ignored
    }
}

/// Everything needed to open a dialog
pub struct DialogSpec {
    title: String,
    kind: DialogKind,
    size: Option<(u16, u16)>,
    body: Vec<NodeSpec>,
    buttons: Vec<Button>,
    on_close: Option<CloseCallback>,
}

impl DialogSpec {
    pub fn new<S: Into<String>>(title: S) -> Self {
        Self {
            title: title.into(),
            kind: DialogKind::Dialog,
            size: None,
            body: Vec::new(),
            buttons: Vec::new(),
            on_close: None,
        }
    }

    pub(crate) fn menu<S: Into<String>>(title: S) -> Self {
        let mut spec = Self::new(title);
        spec.kind = DialogKind::Menu;
        spec
    }

    /// Fixed outer size; without it the dialog is sized to its content
    pub fn size(mut self, width: u16, height: u16) -> Self {
        self.size = Some((width, height));
        self
    }

    pub fn child(mut self, child: NodeSpec) -> Self {
        self.body.push(child);
        self
    }

    /// Add a button to the row at the bottom
    pub fn button(mut self, button: Button) -> Self {
        self.buttons.push(button);
        self
    }

    pub fn on_close<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&WidgetTree, DialogId) -> bool + 'static,
    {
        self.on_close = Some(Box::new(callback));
        self
    }

    fn into_parts(self) -> (NodeSpec, DialogKind, Option<CloseCallback>) {
        let mut frame = NodeSpec::new(DialogFrame::new(self.title.clone(), self.kind))
            .axis(LayoutAxis::Vertical)
            .name(self.title)
            .children(self.body);
        frame = match self.size {
            Some((width, height)) => frame.fixed(width, height),
            None => frame.pack(),
        };
        if !self.buttons.is_empty() {
            let row = NodeSpec::new(Container::new())
                .axis(LayoutAxis::Horizontal)
                .pack()
                .children(
                    self.buttons
                        .into_iter()
                        .map(|button| NodeSpec::new(button).pack()),
                );
            frame = frame.child(row);
        }
        (frame, self.kind, self.on_close)
    }
}

/// One entry of the dialog stack
pub struct Dialog {
    id: DialogId,
    state: DialogState,
    kind: DialogKind,
    on_close: Option<CloseCallback>,
}

impl Dialog {
    pub fn id(&self) -> DialogId {
        self.id
    }

    pub fn state(&self) -> DialogState {
        self.state
    }

    pub fn kind(&self) -> DialogKind {
        self.kind
    }
}

impl std::fmt::Debug for Dialog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dialog")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("kind", &self.kind)
            .field("on_close", &self.on_close.is_some())
            .finish()
    }
}

/// Open dialogs, bottom first
#[derive(Debug, Default)]
pub struct DialogStack {
    dialogs: Vec<Dialog>,
}

impl DialogStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dialog> {
        self.dialogs.iter()
    }

    /// Number of visible dialogs
    pub fn visible_count(&self) -> usize {
        self.dialogs
            .iter()
            .filter(|dialog| dialog.state == DialogState::Visible)
            .count()
    }

    pub fn top(&self) -> Option<DialogId> {
        self.dialogs
            .iter()
            .rev()
            .find(|dialog| dialog.state == DialogState::Visible)
            .map(|dialog| dialog.id)
    }

    /// State of a dialog; reaped or unknown dialogs are hidden
    pub fn state(&self, id: DialogId) -> DialogState {
        self.dialogs
            .iter()
            .find(|dialog| dialog.id == id)
            .map_or(DialogState::Hidden, |dialog| dialog.state)
    }

    /// Innermost visible dialog whose subtree contains `node`
    pub fn containing(&self, tree: &WidgetTree, node: NodeId) -> Option<DialogId> {
        self.dialogs
            .iter()
            .rev()
            .filter(|dialog| dialog.state == DialogState::Visible)
            .find(|dialog| tree.is_descendant_of(node, dialog.id.0))
            .map(|dialog| dialog.id)
    }

    /// Insert the dialog under `overlay` and trap focus inside it
    pub fn open(
        &mut self,
        tree: &mut WidgetTree,
        focus: &mut FocusChain,
        overlay: NodeId,
        spec: DialogSpec,
    ) -> Result<DialogId> {
        let (frame, kind, on_close) = spec.into_parts();
        let node = tree.insert(overlay, frame)?;
        let id = DialogId(node);
        focus.push_scope(tree, node);
        debug!(?id, ?kind, depth = self.visible_count() + 1, "dialog opened");
        self.dialogs.push(Dialog {
            id,
            state: DialogState::Visible,
            kind,
            on_close,
        });
        Ok(id)
    }

    /// Close `id` and every visible dialog above it, topmost first.
    ///
    /// Stops at the first veto and returns false; dialogs closed before the
    /// veto stay closed.
    pub fn close(
        &mut self,
        tree: &mut WidgetTree,
        focus: &mut FocusChain,
        id: DialogId,
        notifications: &mut Vec<Notification>,
    ) -> Result<bool> {
        self.close_from(tree, focus, id, notifications, true)
    }

    /// Close `id` and every visible dialog above it without asking their
    /// `on_close` callbacks. Used when the frames are about to be removed.
    pub fn discard(
        &mut self,
        tree: &mut WidgetTree,
        focus: &mut FocusChain,
        id: DialogId,
        notifications: &mut Vec<Notification>,
    ) -> Result<()> {
        self.close_from(tree, focus, id, notifications, false)?;
        Ok(())
    }

    /// Lowest visible dialog whose frame lies inside the subtree at `root`
    pub fn lowest_within(&self, tree: &WidgetTree, root: NodeId) -> Option<DialogId> {
        self.dialogs
            .iter()
            .filter(|dialog| dialog.state == DialogState::Visible)
            .find(|dialog| tree.is_descendant_of(dialog.id.0, root))
            .map(|dialog| dialog.id)
    }

    fn close_from(
        &mut self,
        tree: &mut WidgetTree,
        focus: &mut FocusChain,
        id: DialogId,
        notifications: &mut Vec<Notification>,
        ask: bool,
    ) -> Result<bool> {
        let position = self
            .dialogs
            .iter()
            .position(|dialog| dialog.id == id && dialog.state == DialogState::Visible)
            .ok_or(ContractViolation::DialogNotVisible(id.0))?;

        for index in (position..self.dialogs.len()).rev() {
            let dialog = &mut self.dialogs[index];
            if dialog.state != DialogState::Visible {
                continue;
            }
            if let (true, Some(on_close)) = (ask, dialog.on_close.as_mut()) {
                if !on_close(tree, dialog.id) {
                    warn!(id = ?dialog.id, "dialog close vetoed");
                    return Ok(false);
                }
            }
            focus.pop_scope(tree, dialog.id.0);
            tree.begin_detach(dialog.id.0)?;
            dialog.state = DialogState::Closing;
            debug!(id = ?dialog.id, "dialog closing");
            notifications.push(Notification::DialogClosed { dialog: dialog.id });
        }
        Ok(true)
    }

    pub fn close_top(
        &mut self,
        tree: &mut WidgetTree,
        focus: &mut FocusChain,
        notifications: &mut Vec<Notification>,
    ) -> Result<bool> {
        match self.top() {
            Some(id) => self.close(tree, focus, id, notifications),
            None => Ok(true),
        }
    }

    /// Close every visible dialog, stopping at the first veto
    pub fn close_all(
        &mut self,
        tree: &mut WidgetTree,
        focus: &mut FocusChain,
        notifications: &mut Vec<Notification>,
    ) -> Result<bool> {
        let bottom = self
            .dialogs
            .iter()
            .find(|dialog| dialog.state == DialogState::Visible)
            .map(|dialog| dialog.id);
        match bottom {
            Some(id) => self.close(tree, focus, id, notifications),
            None => Ok(true),
        }
    }

    /// Close the run of menus at the top of the stack
    pub fn close_menus(
        &mut self,
        tree: &mut WidgetTree,
        focus: &mut FocusChain,
        notifications: &mut Vec<Notification>,
    ) -> Result<bool> {
        let lowest_menu = self
            .dialogs
            .iter()
            .rev()
            .filter(|dialog| dialog.state == DialogState::Visible)
            .take_while(|dialog| dialog.kind == DialogKind::Menu)
            .last()
            .map(|dialog| dialog.id);
        match lowest_menu {
            Some(id) => self.close(tree, focus, id, notifications),
            None => Ok(true),
        }
    }

    /// Remove closing dialogs from the tree. Returns every node that left
    /// the tree.
    pub fn reap(&mut self, tree: &mut WidgetTree) -> Result<Vec<NodeId>> {
        let mut removed = Vec::new();
        for dialog in self.dialogs.iter_mut().filter(|d| d.state == DialogState::Closing) {
            if tree.contains(dialog.id.0) {
                removed.extend(tree.remove(dialog.id.0)?);
            }
            dialog.state = DialogState::Hidden;
        }
        self.dialogs.retain(|dialog| dialog.state != DialogState::Hidden);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::Label;
    use std::cell::Cell;
    use std::rc::Rc;

    fn setup() -> (WidgetTree, FocusChain, NodeId, NodeId) {
        let mut tree = WidgetTree::new(NodeSpec::new(Container::new()).axis(LayoutAxis::Overlay));
        let root = tree.root();
        let body = tree.insert(root, NodeSpec::new(Button::new("body"))).unwrap();
        let mut focus = FocusChain::default();
        focus.set_focus(&mut tree, body).unwrap();
        (tree, focus, root, body)
    }

    fn confirm(title: &str) -> DialogSpec {
        DialogSpec::new(title)
            .child(NodeSpec::new(Label::new("Sure?")))
            .button(Button::new("Yes").closes_dialog())
            .button(Button::new("No").closes_dialog())
    }

    #[test]
    fn test_open_traps_focus_and_close_restores() {
        let (mut tree, mut focus, root, body) = setup();
        let mut stack = DialogStack::new();
        let mut notifications = Vec::new();

        let id = stack.open(&mut tree, &mut focus, root, confirm("Confirm")).unwrap();
        assert_eq!(stack.state(id), DialogState::Visible);
        let yes = focus.leaf().unwrap();
        assert_eq!(tree.widget::<Button>(yes).unwrap().label(), "Yes");
        assert_eq!(focus.active_scope(), Some(id.node()));

        assert!(stack.close(&mut tree, &mut focus, id, &mut notifications).unwrap());
        assert_eq!(stack.state(id), DialogState::Closing);
        assert_eq!(focus.leaf(), Some(body));
        assert!(tree.node(id.node()).unwrap().is_detaching());
        assert_eq!(notifications, vec![Notification::DialogClosed { dialog: id }]);

        let removed = stack.reap(&mut tree).unwrap();
        assert!(removed.contains(&yes));
        assert_eq!(stack.state(id), DialogState::Hidden);
        assert!(!tree.contains(id.node()));
    }

    #[test]
    fn test_veto_keeps_dialog_open() {
        let (mut tree, mut focus, root, _) = setup();
        let mut stack = DialogStack::new();
        let allow = Rc::new(Cell::new(false));
        let gate = Rc::clone(&allow);
        let spec = confirm("Guarded").on_close(move |_, _| gate.get());
        let id = stack.open(&mut tree, &mut focus, root, spec).unwrap();
        let mut notifications = Vec::new();

        assert!(!stack.close(&mut tree, &mut focus, id, &mut notifications).unwrap());
        assert_eq!(stack.state(id), DialogState::Visible);
        assert!(notifications.is_empty());

        allow.set(true);
        assert!(stack.close(&mut tree, &mut focus, id, &mut notifications).unwrap());
    }

    #[test]
    fn test_closing_lower_dialog_closes_those_above() {
        let (mut tree, mut focus, root, body) = setup();
        let mut stack = DialogStack::new();
        let mut notifications = Vec::new();
        let lower = stack.open(&mut tree, &mut focus, root, confirm("Lower")).unwrap();
        let upper = stack.open(&mut tree, &mut focus, root, confirm("Upper")).unwrap();
        assert_eq!(stack.top(), Some(upper));

        stack.close(&mut tree, &mut focus, lower, &mut notifications).unwrap();
        assert_eq!(stack.state(upper), DialogState::Closing);
        assert_eq!(stack.state(lower), DialogState::Closing);
        assert_eq!(focus.leaf(), Some(body));
        assert_eq!(
            notifications,
            vec![
                Notification::DialogClosed { dialog: upper },
                Notification::DialogClosed { dialog: lower }
            ]
        );
    }

    #[test]
    fn test_close_all_stops_at_veto() {
        let (mut tree, mut focus, root, _) = setup();
        let mut stack = DialogStack::new();
        let mut notifications = Vec::new();
        let lower = stack
            .open(&mut tree, &mut focus, root, confirm("Lower").on_close(|_, _| false))
            .unwrap();
        let upper = stack.open(&mut tree, &mut focus, root, confirm("Upper")).unwrap();

        assert!(!stack.close_all(&mut tree, &mut focus, &mut notifications).unwrap());
        assert_eq!(stack.state(upper), DialogState::Closing);
        assert_eq!(stack.state(lower), DialogState::Visible);
        assert_eq!(focus.active_scope(), Some(lower.node()));
    }

    #[test]
    fn test_closing_hidden_dialog_is_a_contract_violation() {
        let (mut tree, mut focus, root, _) = setup();
        let mut stack = DialogStack::new();
        let mut notifications = Vec::new();
        let id = stack.open(&mut tree, &mut focus, root, confirm("Once")).unwrap();
        stack.close(&mut tree, &mut focus, id, &mut notifications).unwrap();

        let err = stack.close(&mut tree, &mut focus, id, &mut notifications).unwrap_err();
        assert!(!err.is_recoverable());
    }
}
