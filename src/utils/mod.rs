//! Utility modules for common functionality
//!
//! - `logging`: tracing subscriber setup, to stderr or into a log viewer

pub mod logging;
