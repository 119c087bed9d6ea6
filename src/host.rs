//! Widget host: owns the tree and everything that operates on it
//!
//! The host is what an application loop talks to. It feeds input events
//! through the router, applies the commands handlers queue, keeps the dialog
//! stack and focus chain consistent, and re-renders only when something asked
//! for a redraw.

use ratatui::{buffer::Buffer, layout::Rect};
use tracing::{debug, info};

use crate::config::KitConfig;
use crate::core::compositor::Compositor;
use crate::core::event::{FocusDirection, HostCommand, InputEvent, Notification};
use crate::core::focus::FocusChain;
use crate::core::router::{DispatchOutcome, DispatchSink, EventRouter, InterceptRules, RedrawQueue};
use crate::core::tree::{LayoutAxis, NodeId, NodeSpec, WidgetTree};
use crate::core::widget::Widget;
use crate::error::{ContractViolation, Result, UiKitError};
use crate::theme::Theme;
use crate::widgets::app_frame::{AppFrame, FrameBar, SlotSize};
use crate::widgets::container::Container;
use crate::widgets::dialog::{DialogId, DialogSpec, DialogStack, DialogState};
use crate::widgets::form::Form;
use crate::widgets::menu::{Menu, MenuItem};
use crate::widgets::progress::ProgressBar;

const MAIN_MENU_TITLE: &str = "Main menu";

/// Turn a recoverable error into `None`, logging it
fn recover<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_recoverable() => {
            debug!(error = %err, "recovered");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

pub struct WidgetHost {
    tree: WidgetTree,
    body: NodeId,
    focus: FocusChain,
    router: EventRouter,
    compositor: Compositor,
    dialogs: DialogStack,
    theme: Theme,
    progress_template: String,
    main_menu: Option<Vec<MenuItem>>,
    area: Rect,
    frame: Buffer,
    redraw: RedrawQueue,
    rendered: bool,
    notifications: Vec<Notification>,
    quit_requested: bool,
}

impl WidgetHost {
    /// Create a host whose root overlay holds `body` below any dialogs, and
    /// focus the first focusable widget of the body.
    pub fn new(config: &KitConfig, area: Rect, body: NodeSpec) -> Result<Self> {
        let mut tree = WidgetTree::new(
            NodeSpec::new(Container::new())
                .axis(LayoutAxis::Overlay)
                .name("root"),
        );
        let root = tree.root();
        let body = tree.insert(root, body)?;

        let mut focus = FocusChain::new(config.focus.wrap);
        recover(focus.focus_first(&mut tree))?;

        let mut host = Self {
            tree,
            body,
            focus,
            router: EventRouter::new(config.keys.clone(), config.focus.click_to_focus),
            compositor: Compositor::new(),
            dialogs: DialogStack::new(),
            theme: Theme::new(config.theme.variant),
            progress_template: config.progress.template.clone(),
            main_menu: None,
            area,
            frame: Buffer::empty(area),
            redraw: RedrawQueue::default(),
            rendered: false,
            notifications: Vec::new(),
            quit_requested: false,
        };
        host.drain_focus_notifications();
        info!(width = area.width, height = area.height, "widget host created");
        Ok(host)
    }

    pub fn tree(&self) -> &WidgetTree {
        &self.tree
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    /// Root of the application content, below every dialog
    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn focus(&self) -> &FocusChain {
        &self.focus
    }

    pub fn dialogs(&self) -> &DialogStack {
        &self.dialogs
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.redraw.request();
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    /// Keys the router turns into focus moves, and per-subtree overrides
    pub fn intercept_rules_mut(&mut self) -> &mut InterceptRules {
        self.router.rules_mut()
    }

    /// Progress bar using the configured label template
    pub fn progress_bar(&self) -> ProgressBar {
        ProgressBar::new().template(self.progress_template.as_str())
    }

    pub fn widget<T: Widget + 'static>(&self, id: NodeId) -> Option<&T> {
        self.tree.widget::<T>(id)
    }

    /// Mutable access to a widget; schedules a redraw
    pub fn widget_mut<T: Widget + 'static>(&mut self, id: NodeId) -> Result<&mut T> {
        self.redraw.request();
        self.tree.widget_mut::<T>(id)
    }

    pub fn add(&mut self, parent: NodeId, spec: NodeSpec) -> Result<NodeId> {
        let id = self.tree.insert(parent, spec)?;
        self.redraw.request();
        Ok(id)
    }

    /// Remove a subtree, repairing focus first if it lived inside it.
    ///
    /// Dialogs inside the subtree, and any dialog above them, are closed
    /// without consulting their `on_close` callbacks.
    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        if id == self.tree.root() {
            return Err(ContractViolation::RootRemoval.into());
        }
        self.tree.node(id)?;
        if let Some(lowest) = self.dialogs.lowest_within(&self.tree, id) {
            self.dialogs
                .discard(&mut self.tree, &mut self.focus, lowest, &mut self.notifications)?;
            self.reap()?;
        }

        if self.tree.contains(id) {
            self.tree.begin_detach(id)?;
            self.focus.repair_after_removal(&mut self.tree, id);
            for removed in self.tree.remove(id)? {
                self.compositor.forget(removed);
                self.router.rules_mut().clear_overrides(removed);
            }
        }
        self.drain_focus_notifications();
        self.redraw.request();
        Ok(())
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> Result<()> {
        self.tree.set_visible(id, visible)?;
        if !visible && self.focus.path().contains(id) {
            self.focus.repair_after_removal(&mut self.tree, id);
            self.drain_focus_notifications();
        }
        self.redraw.request();
        Ok(())
    }

    pub fn set_focus(&mut self, id: NodeId) -> Result<()> {
        let result = self.focus.set_focus(&mut self.tree, id);
        self.drain_focus_notifications();
        self.redraw.request();
        result
    }

    pub fn move_focus(&mut self, direction: FocusDirection) -> Result<NodeId> {
        let result = self.focus.move_focus(&mut self.tree, direction);
        self.drain_focus_notifications();
        self.redraw.request();
        result
    }

    pub fn focus_first(&mut self) -> Result<NodeId> {
        let result = self.focus.focus_first(&mut self.tree);
        self.drain_focus_notifications();
        self.redraw.request();
        result
    }

    /// Route one event, apply the commands its handlers queued and reap
    /// closed dialogs.
    pub fn dispatch(&mut self, event: InputEvent) -> Result<DispatchOutcome> {
        if let InputEvent::Resize { width, height } = event {
            self.area = Rect::new(0, 0, width, height);
        }

        let mut sink = DispatchSink::default();
        let outcome = self.router.dispatch(
            &mut self.tree,
            &mut self.focus,
            self.compositor.regions(),
            &event,
            &mut sink,
        )?;

        self.drain_focus_notifications();
        self.notifications.append(&mut sink.notifications);
        if sink.redraw.is_pending() {
            self.redraw.request();
        }

        for command in std::mem::take(&mut sink.commands) {
            self.apply(command)?;
        }

        if sink.menu_requested && self.open_main_menu()?.is_none() {
            sink.quit_requested = true;
        }
        if sink.quit_requested {
            self.request_quit();
        }

        self.reap()?;
        Ok(outcome)
    }

    fn apply(&mut self, command: HostCommand) -> Result<()> {
        debug!(?command, "applying host command");
        match command {
            HostCommand::CloseDialog(frame) => {
                let id = DialogId(frame);
                if self.dialogs.state(id) == DialogState::Visible {
                    self.close_dialog(id)?;
                }
            }
            HostCommand::CloseDialogContaining(node) => {
                if let Some(id) = self.dialogs.containing(&self.tree, node) {
                    self.close_dialog(id)?;
                }
            }
            HostCommand::CloseAllDialogs => {
                self.close_all_dialogs()?;
            }
            HostCommand::CloseMenus => {
                self.dialogs
                    .close_menus(&mut self.tree, &mut self.focus, &mut self.notifications)?;
                self.after_dialog_change();
            }
            HostCommand::OpenMenu { title, items } => {
                self.open_menu(title, items)?;
            }
            HostCommand::Focus(node) => {
                recover(self.set_focus(node))?;
            }
            HostCommand::MoveFocus(direction) => {
                recover(self.move_focus(direction))?;
            }
            HostCommand::SubmitForm(form) => {
                self.submit_form(form)?;
            }
            HostCommand::Quit => self.request_quit(),
        }
        Ok(())
    }

    fn request_quit(&mut self) {
        if !self.quit_requested {
            info!("quit requested");
            self.quit_requested = true;
            self.notifications.push(Notification::QuitRequested);
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// Notifications produced since the last call, oldest first
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    fn drain_focus_notifications(&mut self) {
        self.notifications.extend(self.focus.take_notifications());
    }

    fn after_dialog_change(&mut self) {
        self.drain_focus_notifications();
        self.redraw.request();
    }

    pub fn open_dialog(&mut self, spec: DialogSpec) -> Result<DialogId> {
        let root = self.tree.root();
        let id = self
            .dialogs
            .open(&mut self.tree, &mut self.focus, root, spec)?;
        self.after_dialog_change();
        Ok(id)
    }

    /// Close a dialog and every dialog above it. Returns false when an
    /// `on_close` callback vetoed.
    pub fn close_dialog(&mut self, id: DialogId) -> Result<bool> {
        let closed = self
            .dialogs
            .close(&mut self.tree, &mut self.focus, id, &mut self.notifications)?;
        self.after_dialog_change();
        Ok(closed)
    }

    pub fn close_topmost_dialog(&mut self) -> Result<bool> {
        let closed = self
            .dialogs
            .close_top(&mut self.tree, &mut self.focus, &mut self.notifications)?;
        self.after_dialog_change();
        Ok(closed)
    }

    /// Close every dialog, stopping at the first veto
    pub fn close_all_dialogs(&mut self) -> Result<bool> {
        let closed = self
            .dialogs
            .close_all(&mut self.tree, &mut self.focus, &mut self.notifications)?;
        self.after_dialog_change();
        Ok(closed)
    }

    pub fn dialog_state(&self, id: DialogId) -> DialogState {
        self.dialogs.state(id)
    }

    /// Open one menu level on top of the dialog stack
    pub fn open_menu<S: Into<String>>(&mut self, title: S, items: Vec<MenuItem>) -> Result<DialogId> {
        let spec = DialogSpec::menu(title).child(NodeSpec::new(Menu::new(items)).pack());
        self.open_dialog(spec)
    }

    /// Items shown when the open-menu key reaches no widget
    pub fn set_main_menu(&mut self, items: Vec<MenuItem>) {
        self.main_menu = Some(items);
    }

    fn open_main_menu(&mut self) -> Result<Option<DialogId>> {
        match self.main_menu.clone() {
            Some(items) => Ok(Some(self.open_menu(MAIN_MENU_TITLE, items)?)),
            None => Ok(None),
        }
    }

    /// Update a progress bar, scheduling a redraw only when its filled width
    /// changes
    pub fn set_progress(&mut self, id: NodeId, fraction: f64) -> Result<bool> {
        let changed = self.tree.widget_mut::<ProgressBar>(id)?.set_progress(fraction);
        if changed {
            self.redraw.request();
        }
        Ok(changed)
    }

    /// Set the header title of an application frame
    pub fn set_title(&mut self, frame: NodeId, title: &str) -> Result<()> {
        AppFrame::set_title(&mut self.tree, frame, title)?;
        self.redraw.request();
        Ok(())
    }

    /// Set the footer status line of an application frame
    pub fn set_status(&mut self, frame: NodeId, status: &str) -> Result<()> {
        AppFrame::set_status(&mut self.tree, frame, status)?;
        self.redraw.request();
        Ok(())
    }

    pub fn add_header_widget(
        &mut self,
        frame: NodeId,
        spec: NodeSpec,
        size: SlotSize,
        index: Option<usize>,
    ) -> Result<NodeId> {
        let id = AppFrame::add_bar_widget(&mut self.tree, frame, FrameBar::Header, spec, size, index)?;
        self.redraw.request();
        Ok(id)
    }

    pub fn add_footer_widget(
        &mut self,
        frame: NodeId,
        spec: NodeSpec,
        size: SlotSize,
        index: Option<usize>,
    ) -> Result<NodeId> {
        let id = AppFrame::add_bar_widget(&mut self.tree, frame, FrameBar::Footer, spec, size, index)?;
        self.redraw.request();
        Ok(id)
    }

    /// Validate and collect a form. A failing field gets focus and the
    /// values are withheld.
    pub fn submit_form(&mut self, form: NodeId) -> Result<Option<Vec<(String, String)>>> {
        let result = Form::submit(&mut self.tree, &mut self.focus, form);
        self.drain_focus_notifications();
        self.redraw.request();
        match result {
            Ok(values) => {
                info!(fields = values.len(), "form submitted");
                self.notifications.push(Notification::FormSubmitted {
                    form,
                    values: values.clone(),
                });
                Ok(Some(values))
            }
            Err(UiKitError::ValidationFailed { field, reason }) => {
                debug!(field = %field, reason = %reason, "form submission blocked");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Take closed dialogs out of the tree
    fn reap(&mut self) -> Result<()> {
        for removed in self.dialogs.reap(&mut self.tree)? {
            self.compositor.forget(removed);
            self.router.rules_mut().clear_overrides(removed);
        }
        Ok(())
    }

    pub fn request_redraw(&mut self) {
        self.redraw.request();
    }

    pub fn needs_redraw(&self) -> bool {
        !self.rendered || self.redraw.is_pending()
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.area = Rect::new(0, 0, width, height);
        self.redraw.request();
    }

    /// Lay out and compose the tree if anything asked for a redraw since the
    /// last render. Returns whether the frame was rebuilt.
    pub fn render_if_dirty(&mut self) -> Result<bool> {
        self.reap()?;
        let pending = self.redraw.take();
        if self.rendered && !pending {
            return Ok(false);
        }
        // Overflow is logged by the compositor and rendered truncated.
        let _ = self.compositor.layout(&self.tree, self.area);
        self.frame = self
            .compositor
            .compose(&self.tree, self.focus.path(), &self.theme);
        self.rendered = true;
        Ok(true)
    }

    /// The last composed frame
    pub fn frame(&self) -> &Buffer {
        &self.frame
    }
}
