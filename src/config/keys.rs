//! Key bindings
//!
//! Bindings are written as `modifier+key` strings in the config file, for
//! example `"tab"`, `"shift+tab"`, `"ctrl+c"` or `"f10"`.

use std::fmt;
use std::str::FromStr;

use crossterm::event::{KeyCode, KeyModifiers};
use serde::{Deserialize, Serialize};

use crate::core::event::{FocusDirection, KeyPress};
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyBinding {
    code: KeyCode,
    modifiers: KeyModifiers,
}

/// Terminals disagree on how Shift+Tab and shifted characters are reported,
/// so both sides of a comparison are folded to one form.
fn normalize(code: KeyCode, modifiers: KeyModifiers) -> (KeyCode, KeyModifiers) {
    match code {
        KeyCode::BackTab => (KeyCode::BackTab, modifiers - KeyModifiers::SHIFT),
        KeyCode::Tab if modifiers.contains(KeyModifiers::SHIFT) => {
            (KeyCode::BackTab, modifiers - KeyModifiers::SHIFT)
        }
        KeyCode::Char(_) => (code, modifiers - KeyModifiers::SHIFT),
        _ => (code, modifiers),
    }
}

impl KeyBinding {
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        let (code, modifiers) = normalize(code, modifiers);
        Self { code, modifiers }
    }

    pub fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub fn code(&self) -> KeyCode {
        self.code
    }

    pub fn modifiers(&self) -> KeyModifiers {
        self.modifiers
    }

    pub fn matches(&self, key: &KeyPress) -> bool {
        normalize(key.code, key.modifiers) == (self.code, self.modifiers)
    }
}

fn parse_code(name: &str) -> Option<KeyCode> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(KeyCode::Char(c));
    }

    let lower = name.to_ascii_lowercase();
    let code = match lower.as_str() {
        "tab" => KeyCode::Tab,
        "backtab" => KeyCode::BackTab,
        "esc" | "escape" => KeyCode::Esc,
        "enter" | "return" => KeyCode::Enter,
        "space" => KeyCode::Char(' '),
        "backspace" => KeyCode::Backspace,
        "delete" | "del" => KeyCode::Delete,
        "insert" | "ins" => KeyCode::Insert,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" | "pgup" => KeyCode::PageUp,
        "pagedown" | "pgdn" => KeyCode::PageDown,
        other => {
            let number = other.strip_prefix('f')?.parse::<u8>().ok()?;
            if !(1..=24).contains(&number) {
                return None;
            }
            KeyCode::F(number)
        }
    };
    Some(code)
}

impl FromStr for KeyBinding {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidKey {
            field: "key".to_string(),
            value: s.to_string(),
        };

        let trimmed = s.trim();
        // A lone "+" is the plus key, not an empty chord.
        let (prefix, key) = match trimmed.rsplit_once('+') {
            Some((prefix, "")) if prefix.is_empty() || prefix.ends_with('+') => {
                (prefix.trim_end_matches('+'), "+")
            }
            Some((prefix, key)) => (prefix, key),
            None => ("", trimmed),
        };

        let mut modifiers = KeyModifiers::NONE;
        for part in prefix.split('+').filter(|part| !part.is_empty()) {
            modifiers |= match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => KeyModifiers::CONTROL,
                "alt" | "meta" => KeyModifiers::ALT,
                "shift" => KeyModifiers::SHIFT,
                _ => return Err(invalid()),
            };
        }

        let code = parse_code(key).ok_or_else(invalid)?;
        Ok(Self::new(code, modifiers))
    }
}

impl TryFrom<String> for KeyBinding {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KeyBinding> for String {
    fn from(binding: KeyBinding) -> Self {
        binding.to_string()
    }
}

impl fmt::Display for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            f.write_str("ctrl+")?;
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            f.write_str("alt+")?;
        }
        if self.modifiers.contains(KeyModifiers::SHIFT) {
            f.write_str("shift+")?;
        }
        match self.code {
            KeyCode::Char(' ') => f.write_str("space"),
            KeyCode::Char(c) => write!(f, "{}", c),
            KeyCode::F(n) => write!(f, "f{}", n),
            KeyCode::Tab => f.write_str("tab"),
            KeyCode::BackTab => f.write_str("backtab"),
            KeyCode::Esc => f.write_str("esc"),
            KeyCode::Enter => f.write_str("enter"),
            KeyCode::Backspace => f.write_str("backspace"),
            KeyCode::Delete => f.write_str("delete"),
            KeyCode::Insert => f.write_str("insert"),
            KeyCode::Up => f.write_str("up"),
            KeyCode::Down => f.write_str("down"),
            KeyCode::Left => f.write_str("left"),
            KeyCode::Right => f.write_str("right"),
            KeyCode::Home => f.write_str("home"),
            KeyCode::End => f.write_str("end"),
            KeyCode::PageUp => f.write_str("pageup"),
            KeyCode::PageDown => f.write_str("pagedown"),
            other => write!(f, "{:?}", other),
        }
    }
}

fn bindings(names: &[&str]) -> Vec<KeyBinding> {
    names.iter().filter_map(|name| name.parse().ok()).collect()
}

fn default_focus_next() -> Vec<KeyBinding> {
    bindings(&["tab"])
}

fn default_focus_previous() -> Vec<KeyBinding> {
    bindings(&["shift+tab"])
}

fn default_dismiss() -> Vec<KeyBinding> {
    bindings(&["esc"])
}

fn default_quit() -> Vec<KeyBinding> {
    bindings(&["q", "ctrl+c"])
}

fn default_open_menu() -> Vec<KeyBinding> {
    bindings(&["esc", "f10"])
}

fn default_validation_override() -> Vec<KeyBinding> {
    bindings(&["ctrl+o"])
}

/// `[keys]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyConfig {
    /// Move focus forward (intercepted before widgets see the key)
    #[serde(default = "default_focus_next")]
    pub focus_next: Vec<KeyBinding>,

    /// Move focus backward
    #[serde(default = "default_focus_previous")]
    pub focus_previous: Vec<KeyBinding>,

    /// Close the topmost dialog or menu
    #[serde(default = "default_dismiss")]
    pub dismiss: Vec<KeyBinding>,

    /// Raise the quit signal when no widget wants the key
    #[serde(default = "default_quit")]
    pub quit: Vec<KeyBinding>,

    /// Open the main menu when no widget wants the key
    #[serde(default = "default_open_menu")]
    pub open_menu: Vec<KeyBinding>,

    /// Accept a form field's value despite failed validation
    #[serde(default = "default_validation_override")]
    pub validation_override: Vec<KeyBinding>,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            focus_next: default_focus_next(),
            focus_previous: default_focus_previous(),
            dismiss: default_dismiss(),
            quit: default_quit(),
            open_menu: default_open_menu(),
            validation_override: default_validation_override(),
        }
    }
}

fn any_match(bindings: &[KeyBinding], key: &KeyPress) -> bool {
    bindings.iter().any(|binding| binding.matches(key))
}

impl KeyConfig {
    pub fn focus_direction(&self, key: &KeyPress) -> Option<FocusDirection> {
        if any_match(&self.focus_next, key) {
            Some(FocusDirection::Forward)
        } else if any_match(&self.focus_previous, key) {
            Some(FocusDirection::Backward)
        } else {
            None
        }
    }

    pub fn is_dismiss(&self, key: &KeyPress) -> bool {
        any_match(&self.dismiss, key)
    }

    pub fn is_quit(&self, key: &KeyPress) -> bool {
        any_match(&self.quit, key)
    }

    pub fn is_open_menu(&self, key: &KeyPress) -> bool {
        any_match(&self.open_menu, key)
    }

    pub fn is_validation_override(&self, key: &KeyPress) -> bool {
        any_match(&self.validation_override, key)
    }

    /// Every (section field, binding) pair, for validation
    pub fn all(&self) -> Vec<(&'static str, &KeyBinding)> {
        let sections: [(&'static str, &Vec<KeyBinding>); 6] = [
            ("focus_next", &self.focus_next),
            ("focus_previous", &self.focus_previous),
            ("dismiss", &self.dismiss),
            ("quit", &self.quit),
            ("open_menu", &self.open_menu),
            ("validation_override", &self.validation_override),
        ];
        sections
            .into_iter()
            .flat_map(|(field, bindings)| bindings.iter().map(move |binding| (field, binding)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bindings() {
        let binding: KeyBinding = "ctrl+c".parse().unwrap();
        assert_eq!(binding.code(), KeyCode::Char('c'));
        assert_eq!(binding.modifiers(), KeyModifiers::CONTROL);

        assert_eq!("F10".parse::<KeyBinding>().unwrap().code(), KeyCode::F(10));
        assert_eq!("space".parse::<KeyBinding>().unwrap().code(), KeyCode::Char(' '));
        assert_eq!("+".parse::<KeyBinding>().unwrap().code(), KeyCode::Char('+'));
        assert_eq!("ctrl++".parse::<KeyBinding>().unwrap().code(), KeyCode::Char('+'));
        assert!("hyper+x".parse::<KeyBinding>().is_err());
        assert!("f99".parse::<KeyBinding>().is_err());
        assert!("nonsense".parse::<KeyBinding>().is_err());
    }

    #[test]
    fn test_shift_tab_matches_backtab() {
        let binding: KeyBinding = "shift+tab".parse().unwrap();
        assert!(binding.matches(&KeyPress::new(KeyCode::BackTab, KeyModifiers::SHIFT)));
        assert!(binding.matches(&KeyPress::plain(KeyCode::BackTab)));
        assert!(binding.matches(&KeyPress::new(KeyCode::Tab, KeyModifiers::SHIFT)));
        assert!(!binding.matches(&KeyPress::plain(KeyCode::Tab)));
    }

    #[test]
    fn test_display_round_trip() {
        for name in ["ctrl+o", "f10", "esc", "q", "alt+left", "space"] {
            let binding: KeyBinding = name.parse().unwrap();
            assert_eq!(binding.to_string(), name);
        }
    }

    #[test]
    fn test_default_key_config() {
        let keys = KeyConfig::default();
        assert_eq!(
            keys.focus_direction(&KeyPress::plain(KeyCode::Tab)),
            Some(FocusDirection::Forward)
        );
        assert_eq!(
            keys.focus_direction(&KeyPress::new(KeyCode::BackTab, KeyModifiers::SHIFT)),
            Some(FocusDirection::Backward)
        );
        assert!(keys.is_quit(&KeyPress::plain(KeyCode::Char('q'))));
        assert!(keys.is_quit(&KeyPress::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(keys.is_dismiss(&KeyPress::plain(KeyCode::Esc)));
        assert!(keys.is_validation_override(&KeyPress::new(
            KeyCode::Char('o'),
            KeyModifiers::CONTROL
        )));
    }

    #[test]
    fn test_keys_from_toml() {
        let keys: KeyConfig = toml::from_str("focus_next = [\"tab\", \"down\"]\nquit = [\"ctrl+q\"]").unwrap();
        assert_eq!(keys.focus_next.len(), 2);
        assert!(keys.is_quit(&KeyPress::new(KeyCode::Char('q'), KeyModifiers::CONTROL)));
        assert!(!keys.is_quit(&KeyPress::plain(KeyCode::Char('q'))));
        assert_eq!(keys.dismiss, default_dismiss());
    }
}
