//! Composite terminal widgets on top of ratatui
//!
//! A [`WidgetHost`] owns a tree of widgets, routes input to the focused one,
//! keeps a stack of modal dialogs and menus, and composes the tree into a
//! [`ratatui::buffer::Buffer`] whenever something changed.

pub mod config;
pub mod core;
pub mod error;
pub mod host;
pub mod terminal;
pub mod theme;
pub mod utils;
pub mod widgets;


pub use config::KitConfig;
pub use error::{Result, UiKitError};
pub use host::WidgetHost;
pub use theme::{StyleRole, Theme, ThemeVariant};
