//! Run notifications.
//!
//! Catalog runs announce their start, end and counts through a [`Notifier`].
//! Notifications are fire-and-forget: nothing in the pipeline depends on
//! them being delivered.

use tracing::{error, info};

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

/// Receives run announcements.
pub trait Notifier: Send + Sync {
    fn notify(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.notify(Level::Info, message);
    }

    fn error(&self, message: &str) {
        self.notify(Level::Error, message);
    }
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, level: Level, message: &str) {
        match level {
            Level::Info => info!(target: "events", "{message}"),
            Level::Error => error!(target: "events", "{message}"),
        }
    }
}

/// Keeps every notification in memory.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: parking_lot::Mutex<Vec<(Level, String)>>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(Level, String)> {
        self.seen.lock().clone()
    }
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
    fn notify(&self, level: Level, message: &str) {
        self.seen.lock().push((level, message.to_string()));
    }
}
