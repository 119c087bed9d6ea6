//! Engine core
//!
//! - `tree`: the widget arena and its structural operations
//! - `widget`: the trait every node implements
//! - `event`: input events, outcomes, notifications and host commands
//! - `focus`: the focus chain and modal focus scopes
//! - `router`: key interception, dispatch and bubbling
//! - `compositor`: two-pass layout and rendering into a buffer

pub mod compositor;
pub mod event;
pub mod focus;
pub mod router;
pub mod tree;
pub mod widget;

pub use compositor::Compositor;
pub use event::{EventContext, EventOutcome, FocusDirection, HostCommand, InputEvent, KeyPress, Notification};
pub use focus::{FocusChain, FocusPath};
pub use router::{DispatchOutcome, EventRouter, RedrawQueue};
pub use tree::{LayoutAxis, NodeId, NodeSpec, SizePolicy, WidgetTree};
pub use widget::{RenderContext, Size, Widget};
