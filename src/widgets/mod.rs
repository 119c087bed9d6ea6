//! Reusable widgets
//!
//! Basic building blocks (containers, labels, buttons, text input) and the
//! composite widgets built from them: the application frame, dialogs, menus,
//! forms, list pickers, progress bars and the log viewer.

pub mod app_frame;
pub mod button;
pub mod container;
pub mod dialog;
pub mod form;
pub mod input;
pub mod list_picker;
pub mod log_viewer;
pub mod menu;
pub mod progress;
pub mod text;

pub use app_frame::{AppFrame, FrameBar, SlotSize};
pub use button::Button;
pub use container::Container;
pub use dialog::{Dialog, DialogFrame, DialogId, DialogKind, DialogSpec, DialogStack, DialogState};
pub use form::{Form, FormField, FormSpec, Validator};
pub use input::{History, LineBuffer, TextInput};
pub use list_picker::ListPicker;
pub use log_viewer::{LogBuffer, LogEntry, LogLine, LogViewer, LogViewerLayer};
pub use menu::{enum_choices, Menu, MenuItem};
pub use progress::{ProgressBar, ProgressStatus};
pub use text::{Label, SelectableText};

pub use crate::core::widget::{RenderContext, Size, Widget};
