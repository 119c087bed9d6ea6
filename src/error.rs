//! Error handling for the widget kit
//!
//! Errors are split by concern. Everything except [`ContractViolation`] is
//! recoverable: the caller (usually a composite widget or the host) reports
//! it and carries on. A contract violation means the integrator asked for
//! something the engine's invariants forbid, such as mutating a node that is
//! already being torn down; the operation is aborted but the process is not.

use std::path::PathBuf;
use thiserror::Error;

use crate::core::tree::NodeId;
use crate::core::tree::LayoutAxis;

#[derive(Error, Debug)]
pub enum UiKitError {
    #[error("Focus error: {0}")]
    Focus(#[from] FocusError),

    #[error("Layout error: {0}")]
    Layout(#[from] LayoutOverflow),

    #[error("Validation failed for field '{field}': {reason}")]
    ValidationFailed { field: String, reason: String },

    #[error("Contract violation: {0}")]
    Contract(#[from] ContractViolation),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Terminal I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl UiKitError {
    /// Whether the caller may report the error and continue.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, UiKitError::Contract(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FocusError {
    #[error("Invalid focus target {node:?}: {reason}")]
    InvalidFocusTarget { node: NodeId, reason: &'static str },

    #[error("No focusable widgets")]
    NoFocusableWidgets,
}

/// Fixed children of a container need more room than the container has.
///
/// The compositor still finishes the pass by truncating the children that
/// do not fit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{axis:?} container {node:?} needs {required} cells but only {available} are available")]
pub struct LayoutOverflow {
    pub node: NodeId,
    pub axis: LayoutAxis,
    pub required: u16,
    pub available: u16,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    #[error("Node {0:?} is being detached and can no longer be modified")]
    NodeDetaching(NodeId),

    #[error("Node {0:?} does not exist in the widget tree")]
    UnknownNode(NodeId),

    #[error("The root node cannot be removed")]
    RootRemoval,

    #[error("Node {node:?} does not hold a widget of type {expected}")]
    WidgetTypeMismatch { node: NodeId, expected: &'static str },

    #[error("Dialog {0:?} is not visible")]
    DialogNotVisible(NodeId),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid config format: {0}")]
    InvalidFormat(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid key binding for {field}: '{value}'")]
    InvalidKey { field: String, value: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Config file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, UiKitError>;
