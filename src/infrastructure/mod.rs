//! Infrastructure Layer
//!
//! Process-level concerns shared by every controller.

pub mod shutdown;

pub use shutdown::{wait_for_signal, Shutdown};
