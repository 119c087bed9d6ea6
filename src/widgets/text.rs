//! Text display widgets

use ratatui::{buffer::Buffer, layout::Rect};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::core::widget::{RenderContext, Size, Widget};
use crate::theme::StyleRole;

/// Greedy word wrap by display width. Words wider than `width` are split.
pub(crate) fn wrap_text(text: &str, width: u16) -> Vec<String> {
    let width = usize::from(width.max(1));
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut line = String::new();
        let mut line_width = 0;

        for word in paragraph.split(' ') {
            let word_width = word.width();
            let gap = usize::from(!line.is_empty());

            if line_width + gap + word_width <= width {
                if gap == 1 {
                    line.push(' ');
                }
                line.push_str(word);
                line_width += gap + word_width;
                continue;
            }

            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
                line_width = 0;
            }
            for ch in word.chars() {
                let ch_width = ch.width().unwrap_or(0);
                if line_width + ch_width > width && !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                    line_width = 0;
                }
                line.push(ch);
                line_width += ch_width;
            }
        }
        lines.push(line);
    }
    lines
}

fn widest(lines: &[String]) -> u16 {
    let width = lines.iter().map(|line| line.width()).max().unwrap_or(0);
    u16::try_from(width).unwrap_or(u16::MAX)
}

fn height(lines: &[String]) -> u16 {
    u16::try_from(lines.len()).unwrap_or(u16::MAX)
}

/// Static, wrapped text
#[derive(Debug, Clone)]
pub struct Label {
    text: String,
    role: StyleRole,
}

impl Label {
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            role: StyleRole::Normal,
        }
    }

    pub fn role(mut self, role: StyleRole) -> Self {
        self.role = role;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text<S: Into<String>>(&mut self, text: S) {
        self.text = text.into();
    }
}

pub(crate) fn render_lines(lines: &[String], area: Rect, buf: &mut Buffer, style: ratatui::style::Style) {
    for (row, line) in lines.iter().take(usize::from(area.height)).enumerate() {
        buf.set_stringn(
            area.x,
            area.y + row as u16,
            line,
            usize::from(area.width),
            style,
        );
    }
}

impl Widget for Label {
    fn name(&self) -> &'static str {
        "label"
    }

    fn measure(&self, available: Size) -> Size {
        let lines = wrap_text(&self.text, available.width);
        Size::new(widest(&lines), height(&lines))
    }

    fn render(&self, area: Rect, buf: &mut Buffer, ctx: &RenderContext<'_>) {
        let lines = wrap_text(&self.text, area.width);
        render_lines(&lines, area, buf, ctx.theme.style(self.role));
    }
}

/// Text that can hold focus, e.g. a row in a hand-built list
#[derive(Debug, Clone)]
pub struct SelectableText {
    text: String,
}

impl SelectableText {
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Widget for SelectableText {
    fn name(&self) -> &'static str {
        "selectable_text"
    }

    fn want_focus(&self) -> bool {
        true
    }

    fn measure(&self, available: Size) -> Size {
        let lines = wrap_text(&self.text, available.width);
        Size::new(widest(&lines), height(&lines))
    }

    fn render(&self, area: Rect, buf: &mut Buffer, ctx: &RenderContext<'_>) {
        let role = if ctx.focused {
            StyleRole::ListFocus
        } else {
            StyleRole::ListItem
        };
        let style = ctx.theme.style(role);
        buf.set_style(area, style);
        render_lines(&wrap_text(&self.text, area.width), area, buf, style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_by_words() {
        assert_eq!(wrap_text("the quick brown fox", 9), vec!["the quick", "brown fox"]);
        assert_eq!(wrap_text("a\nb", 10), vec!["a", "b"]);
        assert_eq!(wrap_text("", 5), vec![""]);
    }

    #[test]
    fn test_wrap_splits_long_words() {
        assert_eq!(wrap_text("abcdefgh", 3), vec!["abc", "def", "gh"]);
    }

    #[test]
    fn test_wrap_counts_wide_chars() {
        // Each CJK character is two columns wide.
        assert_eq!(wrap_text("日本語", 4), vec!["日本", "語"]);
    }

    #[test]
    fn test_label_measure() {
        let label = Label::new("hello world");
        assert_eq!(label.measure(Size::new(40, 10)), Size::new(11, 1));
        assert_eq!(label.measure(Size::new(5, 10)), Size::new(5, 2));
    }
}
