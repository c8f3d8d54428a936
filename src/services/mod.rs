//! Platform capabilities module
//!
//! Notification and audio output are optional: every capability has an
//! implementation that does nothing, and failures are logged, never raised.

pub mod chime;
pub mod notifier;

// Re-export main types
pub use chime::{Chime, NullChime, TerminalBell};
pub use notifier::{CommandNotifier, LogNotifier, Notification, Notifier, NullNotifier, NOTIFICATION_TAG};
