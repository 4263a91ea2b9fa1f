//! Notification sink for non-fatal conditions.
//!
//! Registries report warnings (such as trigger collisions) and progress
//! through a [`Notifier`] instead of failing. The default
//! [`TracingNotifier`] forwards everything to `tracing`; [`MemoryNotifier`]
//! keeps the entries so embedders can inspect or replay them.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    /// A plain message, neither progress nor problem.
    Message,
    Warning,
    Error,
    /// An operation finished successfully.
    Success,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Message => "message",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Success => "success",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives notifications from the container and registries.
///
/// `sender` names the reporting component (e.g. `"CommandRegistry"`).
pub trait Notifier: Send + Sync {
    fn notify(&self, level: LogLevel, sender: &str, text: &str);

    fn debug(&self, sender: &str, text: &str) {
        self.notify(LogLevel::Debug, sender, text);
    }

    fn info(&self, sender: &str, text: &str) {
        self.notify(LogLevel::Info, sender, text);
    }

    fn message(&self, sender: &str, text: &str) {
        self.notify(LogLevel::Message, sender, text);
    }

    fn warning(&self, sender: &str, text: &str) {
        self.notify(LogLevel::Warning, sender, text);
    }

    fn error(&self, sender: &str, text: &str) {
        self.notify(LogLevel::Error, sender, text);
    }

    fn success(&self, sender: &str, text: &str) {
        self.notify(LogLevel::Success, sender, text);
    }
}

/// Returns the notifier used when none is configured.
pub fn default_notifier() -> Arc<dyn Notifier> {
    Arc::new(TracingNotifier)
}

// =============================================================================
// TracingNotifier
// =============================================================================

/// Forwards notifications to `tracing` events.
///
/// `Message` and `Success` are emitted at `INFO`; `Success` carries an
/// `outcome = "success"` field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: LogLevel, sender: &str, text: &str) {
        match level {
            LogLevel::Debug => debug!(sender = %sender, "{text}"),
            LogLevel::Info | LogLevel::Message => info!(sender = %sender, "{text}"),
            LogLevel::Success => info!(sender = %sender, outcome = "success", "{text}"),
            LogLevel::Warning => warn!(sender = %sender, "{text}"),
            LogLevel::Error => error!(sender = %sender, "{text}"),
        }
    }
}

// =============================================================================
// MemoryNotifier
// =============================================================================

/// One recorded notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: LogLevel,
    pub sender: String,
    pub text: String,
}

/// Buffers notifications in memory.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    entries: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every recorded notification.
    pub fn entries(&self) -> Vec<Notification> {
        self.entries.lock().clone()
    }

    /// Returns the recorded notifications at `level`.
    pub fn at_level(&self, level: LogLevel) -> Vec<Notification> {
        self.entries
            .lock()
            .iter()
            .filter(|n| n.level == level)
            .cloned()
            .collect()
    }

    /// Drains the buffer.
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.entries.lock())
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, level: LogLevel, sender: &str, text: &str) {
        self.entries.lock().push(Notification {
            level,
            sender: sender.to_owned(),
            text: text.to_owned(),
        });
    }
}
