//! Progress bar widget

use ratatui::{buffer::Buffer, layout::Rect, style::Style};
use std::cell::Cell;
use unicode_width::UnicodeWidthChar;

use crate::core::widget::{RenderContext, Size, Widget};
use crate::theme::StyleRole;

/// Default label template; `{}` is replaced by the whole percentage
pub const DEFAULT_TEMPLATE: &str = "{} %";

/// Selects the fill style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressStatus {
    #[default]
    Normal,
    Successful,
    Warning,
    Error,
}

impl ProgressStatus {
    fn fill_role(self) -> StyleRole {
        match self {
            Self::Normal => StyleRole::ProgressComplete,
            Self::Successful => StyleRole::ProgressSuccessful,
            Self::Warning => StyleRole::ProgressWarning,
            Self::Error => StyleRole::ProgressError,
        }
    }
}

/// Clamp to `[0, 1]`; NaN counts as no progress
fn clamp_fraction(fraction: f64) -> f64 {
    if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    }
}

/// Absorbs representation error such as `0.29 * 100.0 == 28.999999999999996`
const ROUNDING_SLACK: f64 = 1e-9;

/// `fraction * scale`, floored
fn scaled(fraction: f64, scale: f64) -> f64 {
    (clamp_fraction(fraction) * scale + ROUNDING_SLACK).floor().min(scale)
}

/// Number of filled cells for a bar `width` cells wide
pub fn filled_cells(fraction: f64, width: u16) -> u16 {
    scaled(fraction, f64::from(width)) as u16
}

/// A progress bar widget
#[derive(Debug, Clone)]
pub struct ProgressBar {
    progress: f64,
    template: String,
    status: ProgressStatus,
    /// Width of the last render, 0 before the first one
    rendered_width: Cell<u16>,
}

impl Default for ProgressBar {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressBar {
    pub fn new() -> Self {
        Self {
            progress: 0.0,
            template: DEFAULT_TEMPLATE.to_string(),
            status: ProgressStatus::Normal,
            rendered_width: Cell::new(0),
        }
    }

    pub fn progress(mut self, progress: f64) -> Self {
        self.progress = clamp_fraction(progress);
        self
    }

    pub fn template<S: Into<String>>(mut self, template: S) -> Self {
        self.template = template.into();
        self
    }

    pub fn status(mut self, status: ProgressStatus) -> Self {
        self.status = status;
        self
    }

    pub fn fraction(&self) -> f64 {
        self.progress
    }

    pub fn current_status(&self) -> ProgressStatus {
        self.status
    }

    /// Update progress. Out-of-range input is clamped.
    ///
    /// Returns whether the rendered bar changes width, i.e. whether a redraw
    /// is worth it. Before the first render any change counts.
    pub fn set_progress(&mut self, fraction: f64) -> bool {
        let fraction = clamp_fraction(fraction);
        let width = self.rendered_width.get();
        let changed = if width == 0 {
            fraction != self.progress
        } else {
            filled_cells(fraction, width) != filled_cells(self.progress, width)
        };
        self.progress = fraction;
        changed
    }

    /// Returns whether the status changed
    pub fn set_status(&mut self, status: ProgressStatus) -> bool {
        let changed = self.status != status;
        self.status = status;
        changed
    }

    pub fn filled_cells(&self, width: u16) -> u16 {
        filled_cells(self.progress, width)
    }

    pub fn label(&self) -> String {
        let percent = scaled(self.progress, 100.0) as u32;
        self.template.replacen("{}", &percent.to_string(), 1)
    }
}

impl Widget for ProgressBar {
    fn name(&self) -> &'static str {
        "progress_bar"
    }

    fn measure(&self, available: Size) -> Size {
        Size::new(available.width, 1.min(available.height))
    }

    fn render(&self, area: Rect, buf: &mut Buffer, ctx: &RenderContext<'_>) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        self.rendered_width.set(area.width);

        let filled = self.filled_cells(area.width);
        let fill_style = ctx.theme.style(self.status.fill_role());
        let empty_style = ctx.theme.style(StyleRole::ProgressNormal);
        let row = Rect::new(area.x, area.y, area.width, 1);
        buf.set_style(row, empty_style);
        buf.set_style(Rect::new(area.x, area.y, filled, 1), fill_style);

        let label = self.label();
        let label_width: usize = label.chars().map(|c| c.width().unwrap_or(0)).sum();
        let mut x = area.x + area.width.saturating_sub(label_width as u16) / 2;
        for c in label.chars() {
            let w = c.width().unwrap_or(0) as u16;
            if x + w > row.right() {
                break;
            }
            let cell_role = if x < area.x + filled { fill_style } else { empty_style };
            let text_style = Style {
                fg: cell_role.fg,
                ..Style::default()
            };
            buf.set_stringn(x, area.y, c.to_string(), usize::from(w.max(1)), text_style);
            x += w;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::Theme;

    fn filled_after(fraction: f64) -> u16 {
        let mut bar = ProgressBar::new();
        bar.set_progress(fraction);
        bar.filled_cells(10)
    }

    #[test]
    fn test_filled_cells_on_ten_cell_bar() {
        assert_eq!(filled_after(0.0), 0);
        assert_eq!(filled_after(0.25), 2);
        assert_eq!(filled_after(0.5), 5);
        assert_eq!(filled_after(1.0), 10);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(filled_after(-0.5), 0);
        assert_eq!(filled_after(1.5), 10);
        assert_eq!(filled_after(f64::NAN), 0);
    }

    #[test]
    fn test_redraw_only_when_width_changes() {
        let theme = Theme::default();
        let ctx = RenderContext {
            focused: false,
            focus_within: false,
            theme: &theme,
        };
        let area = Rect::new(0, 0, 10, 1);
        let mut buf = Buffer::empty(area);
        let mut bar = ProgressBar::new();
        assert!(bar.set_progress(0.1));
        bar.render(area, &mut buf, &ctx);

        assert!(!bar.set_progress(0.15));
        assert!(bar.set_progress(0.2));
        assert!(!bar.set_progress(0.2));
    }

    #[test]
    fn test_label_template() {
        let bar = ProgressBar::new().progress(0.426);
        assert_eq!(bar.label(), "42 %");
        assert_eq!(ProgressBar::new().progress(0.29).label(), "29 %");
        assert_eq!(ProgressBar::new().progress(0.57).label(), "57 %");
        assert_eq!(filled_cells(0.57, 100), 57);
        let bar = ProgressBar::new().template("done: {}").progress(1.0);
        assert_eq!(bar.label(), "done: 100");
    }

    #[test]
    fn test_render_fills_with_status_style() {
        let theme = Theme::default();
        let ctx = RenderContext {
            focused: false,
            focus_within: false,
            theme: &theme,
        };
        let area = Rect::new(0, 0, 10, 1);
        let mut buf = Buffer::empty(area);
        ProgressBar::new()
            .progress(0.5)
            .status(ProgressStatus::Error)
            .render(area, &mut buf, &ctx);

        let fill_bg = theme.style(StyleRole::ProgressError).bg;
        let empty_bg = theme.style(StyleRole::ProgressNormal).bg;
        assert_eq!(Some(buf.get(0, 0).bg), fill_bg);
        assert_eq!(Some(buf.get(4, 0).bg), fill_bg);
        assert_eq!(Some(buf.get(5, 0).bg), empty_bg);
        assert_eq!(Some(buf.get(9, 0).bg), empty_bg);
    }
}
