//! Forms: labeled, validated input fields

use crossterm::event::KeyCode;
use ratatui::{buffer::Buffer, layout::Rect};
use regex::Regex;
use tracing::debug;
use unicode_width::UnicodeWidthStr;

use super::container::Container;
use super::input::LineBuffer;
use crate::core::event::{
    EventContext, EventOutcome, FocusDirection, HostCommand, InputEvent, Notification,
};
use crate::core::focus::FocusChain;
use crate::core::tree::{LayoutAxis, NodeId, NodeSpec, SizePolicy, WidgetTree};
use crate::core::widget::{RenderContext, Size, Widget};
use crate::error::{Result, UiKitError};
use crate::theme::StyleRole;

/// A rule a field value must satisfy before focus may leave the field
pub enum Validator {
    Required,
    MinLength(usize),
    MaxLength(usize),
    Pattern { regex: Regex, message: String },
    Custom(Box<dyn Fn(&str) -> std::result::Result<(), String>>),
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Required => f.write_str("Required"),
            Self::MinLength(n) => write!(f, "MinLength({})", n),
            Self::MaxLength(n) => write!(f, "MaxLength({})", n),
            Self::Pattern { regex, .. } => write!(f, "Pattern({})", regex.as_str()),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

impl Validator {
    pub fn pattern<S: Into<String>>(regex: Regex, message: S) -> Self {
        Self::Pattern {
            regex,
            message: message.into(),
        }
    }

    pub fn custom<F>(check: F) -> Self
    where
        F: Fn(&str) -> std::result::Result<(), String> + 'static,
    {
        Self::Custom(Box::new(check))
    }

    pub fn check(&self, value: &str) -> std::result::Result<(), String> {
        let length = value.chars().count();
        match self {
            Self::Required if value.trim().is_empty() => Err("a value is required".to_string()),
            Self::MinLength(min) if length < *min => {
                Err(format!("must be at least {} characters", min))
            }
            Self::MaxLength(max) if length > *max => {
                Err(format!("must be at most {} characters", max))
            }
            Self::Pattern { regex, message } if !regex.is_match(value) => Err(message.clone()),
            Self::Custom(check) => check(value),
            _ => Ok(()),
        }
    }
}

/// One labeled line of a form
#[derive(Debug)]
pub struct FormField {
    label: String,
    buffer: LineBuffer,
    validators: Vec<Validator>,
    /// Current value was accepted despite failing validation
    overridden: bool,
    error: Option<String>,
    focused: bool,
}

impl FormField {
    pub fn new<S: Into<String>>(label: S) -> Self {
        Self {
            label: label.into(),
            buffer: LineBuffer::new(),
            validators: Vec::new(),
            overridden: false,
            error: None,
            focused: false,
        }
    }

    pub fn value<S: AsRef<str>>(mut self, value: S) -> Self {
        self.buffer.set_text(value.as_ref());
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn required(self) -> Self {
        self.validator(Validator::Required)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn text(&self) -> String {
        self.buffer.text()
    }

    pub fn set_text(&mut self, text: &str) {
        self.buffer.set_text(text);
        self.overridden = false;
        self.error = None;
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_overridden(&self) -> bool {
        self.overridden
    }

    fn label_width(&self) -> u16 {
        u16::try_from(self.label.width() + 2).unwrap_or(u16::MAX)
    }
}

impl Widget for FormField {
    fn name(&self) -> &'static str {
        "form_field"
    }

    fn want_focus(&self) -> bool {
        true
    }

    fn measure(&self, available: Size) -> Size {
        let value_width = u16::try_from(self.buffer.len().max(10) + 1).unwrap_or(u16::MAX);
        Size::new(self.label_width().saturating_add(value_width), 1).min(available)
    }

    fn render(&self, area: Rect, buf: &mut Buffer, ctx: &RenderContext<'_>) {
        let label = format!("{}: ", self.label);
        buf.set_stringn(
            area.x,
            area.y,
            &label,
            usize::from(area.width),
            ctx.theme.style(StyleRole::Normal),
        );

        let label_width = self.label_width().min(area.width);
        let value_area = Rect::new(area.x + label_width, area.y, area.width - label_width, 1);
        let role = if self.error.is_some() {
            StyleRole::Error
        } else if ctx.focused {
            StyleRole::InputFocus
        } else {
            StyleRole::InputNormal
        };
        self.buffer.render(value_area, buf, ctx.theme.style(role), ctx.focused);
    }

    fn handle_event(&mut self, event: &InputEvent, ctx: &mut EventContext<'_>) -> EventOutcome {
        let InputEvent::Key(key) = event else {
            return EventOutcome::Ignored;
        };

        if ctx.keys().is_validation_override(key) {
            debug!(field = %self.label, "validation overridden");
            self.overridden = true;
            self.error = None;
            ctx.move_focus(FocusDirection::Forward);
            return EventOutcome::ConsumedAndRequestRedraw;
        }

        match self.buffer.handle_key(key) {
            Some(changed) => {
                if changed {
                    self.overridden = false;
                    self.error = None;
                }
                EventOutcome::ConsumedAndRequestRedraw
            }
            None => EventOutcome::Ignored,
        }
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.overridden {
            return Ok(());
        }
        let value = self.buffer.text();
        self.validators
            .iter()
            .try_for_each(|validator| validator.check(&value))
    }

    fn on_validation_failed(&mut self, reason: &str) {
        self.error = Some(reason.to_string());
    }

    fn on_focus_change(&mut self, focused: bool) {
        self.focused = focused;
    }
}

/// Container for [`FormField`]s.
///
/// Handles keys its fields leave alone: Up/Down move between fields and
/// Enter submits.
#[derive(Debug, Default)]
pub struct Form {
    frame: Container,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title<S: Into<String>>(mut self, title: S) -> Self {
        self.frame = self.frame.title(title);
        self
    }

    /// Field values in field order, as (label, text)
    pub fn values(tree: &WidgetTree, form: NodeId) -> Vec<(String, String)> {
        tree.children(form)
            .iter()
            .filter_map(|&child| tree.widget::<FormField>(child))
            .map(|field| (field.label().to_string(), field.text()))
            .collect()
    }

    /// Validate every field. The first failing field is told why and
    /// receives focus; otherwise the values are returned.
    pub fn submit(
        tree: &mut WidgetTree,
        focus: &mut FocusChain,
        form: NodeId,
    ) -> Result<Vec<(String, String)>> {
        tree.widget::<Form>(form).ok_or(crate::error::ContractViolation::WidgetTypeMismatch {
            node: form,
            expected: std::any::type_name::<Form>(),
        })?;

        let fields: Vec<NodeId> = tree
            .children(form)
            .iter()
            .copied()
            .filter(|&child| tree.widget::<FormField>(child).is_some() && tree.is_displayed(child))
            .collect();

        for field_id in fields {
            let Some(field) = tree.widget::<FormField>(field_id) else {
                continue;
            };
            if let Err(reason) = field.validate() {
                let label = field.label().to_string();
                tree.widget_mut::<FormField>(field_id)?.on_validation_failed(&reason);
                focus.force_focus(tree, field_id)?;
                focus.notify(Notification::ValidationFailed {
                    node: field_id,
                    field: label.clone(),
                    reason: reason.clone(),
                });
                return Err(UiKitError::ValidationFailed {
                    field: label,
                    reason,
                });
            }
        }
        Ok(Self::values(tree, form))
    }
}

impl Widget for Form {
    fn name(&self) -> &'static str {
        "form"
    }

    fn measure(&self, available: Size) -> Size {
        self.frame.measure(available)
    }

    fn border(&self) -> u16 {
        self.frame.border()
    }

    fn render(&self, area: Rect, buf: &mut Buffer, ctx: &RenderContext<'_>) {
        self.frame.render(area, buf, ctx);
    }

    fn handle_event(&mut self, event: &InputEvent, ctx: &mut EventContext<'_>) -> EventOutcome {
        let InputEvent::Key(key) = event else {
            return EventOutcome::Ignored;
        };
        match key.code {
            KeyCode::Enter => {
                let form = ctx.node();
                ctx.command(HostCommand::SubmitForm(form));
                EventOutcome::ConsumedAndRequestRedraw
            }
            KeyCode::Down => {
                ctx.move_focus(FocusDirection::Forward);
                EventOutcome::Consumed
            }
            KeyCode::Up => {
                ctx.move_focus(FocusDirection::Backward);
                EventOutcome::Consumed
            }
            _ => EventOutcome::Ignored,
        }
    }
}

/// Builder for a form subtree
#[derive(Debug, Default)]
pub struct FormSpec {
    title: Option<String>,
    axis: LayoutAxis,
    fields: Vec<(FormField, SizePolicy)>,
}

impl FormSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn axis(mut self, axis: LayoutAxis) -> Self {
        self.axis = axis;
        self
    }

    pub fn field(mut self, field: FormField) -> Self {
        self.fields.push((field, SizePolicy::pack()));
        self
    }

    pub fn fixed_field(mut self, field: FormField, width: u16, height: u16) -> Self {
        self.fields.push((field, SizePolicy::fixed(width, height)));
        self
    }

    pub fn build(self) -> NodeSpec {
        let form = match self.title {
            Some(title) => Form::new().title(title),
            None => Form::new(),
        };
        let fields = self.fields.into_iter().map(|(field, size)| {
            let name = field.label().to_string();
            NodeSpec::new(field).size(size).name(name)
        });
        NodeSpec::new(form).axis(self.axis).children(fields)
    }
}
