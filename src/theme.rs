//! Theme system for the widget kit
//!
//! Widgets never pick colors themselves; they ask the theme for the style of
//! a semantic role, so a whole interface can be switched between dark, light
//! and high contrast variants.

use ratatui::style::{Color, Modifier, Style};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Available theme variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeVariant {
    #[default]
    Dark,
    Light,
    HighContrast,
}

/// Semantic style roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleRole {
    Normal,
    Border,
    BorderFocus,
    Title,
    Header,
    Footer,
    Error,

    Dialog,
    DialogBackground,
    Menu,
    MenuFocus,
    MenuDisabled,

    ListItem,
    ListFocus,
    ButtonNormal,
    ButtonFocus,
    InputNormal,
    InputFocus,

    ProgressNormal,
    ProgressComplete,
    ProgressSuccessful,
    ProgressWarning,
    ProgressError,

    LogDebug,
    LogInfo,
    LogWarning,
    LogError,
    LogMarker,
}

/// Base colors a variant is derived from
struct Palette {
    foreground: Color,
    background: Color,
    surface: Color,
    primary: Color,
    accent: Color,
    muted: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Palette {
    fn dark() -> Self {
        Self {
            foreground: Color::Gray,
            background: Color::Black,
            surface: Color::Blue,
            primary: Color::Cyan,
            accent: Color::Yellow,
            muted: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }

    fn light() -> Self {
        Self {
            foreground: Color::Black,
            background: Color::White,
            surface: Color::Gray,
            primary: Color::Blue,
            accent: Color::Magenta,
            muted: Color::DarkGray,
            success: Color::Green,
            warning: Color::Rgb(180, 120, 0),
            danger: Color::Red,
        }
    }

    fn high_contrast() -> Self {
        Self {
            foreground: Color::White,
            background: Color::Black,
            surface: Color::Black,
            primary: Color::White,
            accent: Color::LightYellow,
            muted: Color::Gray,
            success: Color::LightGreen,
            warning: Color::LightYellow,
            danger: Color::LightRed,
        }
    }
}

/// Complete theme definition
#[derive(Debug, Clone)]
pub struct Theme {
    variant: ThemeVariant,
    styles: HashMap<StyleRole, Style>,
}

impl Default for Theme {
    fn default() -> Self {
        Self::new(ThemeVariant::Dark)
    }
}

impl Theme {
    pub fn new(variant: ThemeVariant) -> Self {
        let palette = match variant {
            ThemeVariant::Dark => Palette::dark(),
            ThemeVariant::Light => Palette::light(),
            ThemeVariant::HighContrast => Palette::high_contrast(),
        };
        let mut theme = Self {
            variant,
            styles: HashMap::new(),
        };
        theme.apply_palette(&palette);
        if variant == ThemeVariant::HighContrast {
            // Focus must not rely on color alone.
            for role in [StyleRole::MenuFocus, StyleRole::ListFocus, StyleRole::ButtonFocus] {
                let style = theme.style(role).add_modifier(Modifier::UNDERLINED);
                theme.set(role, style);
            }
        }
        theme
    }

    pub fn dark() -> Self {
        Self::new(ThemeVariant::Dark)
    }

    pub fn light() -> Self {
        Self::new(ThemeVariant::Light)
    }

    pub fn high_contrast() -> Self {
        Self::new(ThemeVariant::HighContrast)
    }

    pub fn variant(&self) -> ThemeVariant {
        self.variant
    }

    /// Style for a role; unset roles render with the terminal default
    pub fn style(&self, role: StyleRole) -> Style {
        self.styles.get(&role).copied().unwrap_or_default()
    }

    pub fn set(&mut self, role: StyleRole, style: Style) {
        self.styles.insert(role, style);
    }

    fn apply_palette(&mut self, p: &Palette) {
        let normal = Style::default().fg(p.foreground);
        let bold = Modifier::BOLD;
        let inverse = Style::default().fg(p.background).bg(p.primary);

        self.set(StyleRole::Normal, normal);
        self.set(StyleRole::Border, Style::default().fg(p.muted));
        self.set(StyleRole::BorderFocus, Style::default().fg(p.primary));
        self.set(StyleRole::Title, Style::default().fg(p.primary).add_modifier(bold));
        self.set(StyleRole::Header, inverse.add_modifier(bold));
        self.set(StyleRole::Footer, Style::default().fg(p.foreground).bg(p.muted));
        self.set(StyleRole::Error, Style::default().fg(p.danger).add_modifier(bold));

        self.set(StyleRole::Dialog, Style::default().fg(p.foreground).bg(p.surface));
        self.set(StyleRole::DialogBackground, Style::default().fg(p.muted).bg(p.background));
        self.set(StyleRole::Menu, Style::default().fg(p.foreground).bg(p.surface));
        self.set(StyleRole::MenuFocus, inverse.add_modifier(bold));
        self.set(StyleRole::MenuDisabled, Style::default().fg(p.muted).bg(p.surface));

        self.set(StyleRole::ListItem, normal);
        self.set(StyleRole::ListFocus, inverse);
        self.set(StyleRole::ButtonNormal, normal);
        self.set(StyleRole::ButtonFocus, inverse.add_modifier(bold));
        self.set(StyleRole::InputNormal, Style::default().fg(p.foreground).bg(p.muted));
        self.set(StyleRole::InputFocus, Style::default().fg(p.background).bg(p.accent));

        self.set(StyleRole::ProgressNormal, Style::default().fg(p.foreground).bg(p.muted));
        self.set(StyleRole::ProgressComplete, Style::default().fg(p.background).bg(p.primary));
        self.set(StyleRole::ProgressSuccessful, Style::default().fg(p.background).bg(p.success));
        self.set(StyleRole::ProgressWarning, Style::default().fg(p.background).bg(p.warning));
        self.set(StyleRole::ProgressError, Style::default().fg(p.background).bg(p.danger));

        self.set(StyleRole::LogDebug, Style::default().fg(p.muted));
        self.set(StyleRole::LogInfo, normal);
        self.set(StyleRole::LogWarning, Style::default().fg(p.warning));
        self.set(StyleRole::LogError, Style::default().fg(p.danger).add_modifier(bold));
        self.set(StyleRole::LogMarker, Style::default().fg(p.accent));
    }
}
