//! Process lifecycle: shutdown coordination and signal handling.

pub mod shutdown;

pub use shutdown::{watch_signals, Shutdown};
