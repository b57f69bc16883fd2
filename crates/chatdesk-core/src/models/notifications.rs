use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::services::attachment_validation::ValidationError;

const DEFAULT_MAX_ENTRIES: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

/// A short user-facing message (toast)
#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    pub timestamp: DateTime<Utc>,
    pub level: NotificationLevel,
    pub title: String,
    pub description: String,
}

/// Bounded queue of notifications waiting to be shown.
///
/// Cloning yields another handle to the same queue.
#[derive(Clone, Debug)]
pub struct NotificationLog {
    entries: Arc<Mutex<VecDeque<Notification>>>,
    max_entries: usize,
}

impl Default for NotificationLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl NotificationLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::new())),
            max_entries: max_entries.max(1),
        }
    }

    pub fn push(&self, level: NotificationLevel, title: impl Into<String>, description: impl Into<String>) {
        let mut entries = self.entries.lock();
        entries.push_back(Notification {
            timestamp: Utc::now(),
            level,
            title: title.into(),
            description: description.into(),
        });

        // FIFO eviction when exceeding max
        while entries.len() > self.max_entries {
            entries.pop_front();
        }
    }

    pub fn info(&self, title: impl Into<String>, description: impl Into<String>) {
        self.push(NotificationLevel::Info, title, description);
    }

    pub fn error(&self, title: impl Into<String>, description: impl Into<String>) {
        self.push(NotificationLevel::Error, title, description);
    }

    /// Report a rejected attachment
    pub fn rejected_file(&self, name: &str, reason: &ValidationError) {
        let (title, description) = match reason {
            ValidationError::InvalidType { .. } => (
                "Invalid file type",
                format!("{} is not an allowed file type", name),
            ),
            ValidationError::TooLarge { .. } => {
                ("File too large", format!("{} exceeds the 10MB limit", name))
            }
        };
        self.error(title, description);
    }

    pub fn entries(&self) -> Vec<Notification> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Take every pending notification, oldest first
    pub fn drain(&self) -> Vec<Notification> {
        self.entries.lock().drain(..).collect()
    }

    pub fn error_count(&self) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|n| n.level == NotificationLevel::Error)
            .count()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_eviction() {
        let log = NotificationLog::new(2);
        log.info("one", "");
        log.error("two", "");
        log.info("three", "");

        let titles: Vec<String> = log.entries().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["two", "three"]);
        assert_eq!(log.error_count(), 1);
    }

    #[test]
    fn test_drain_empties_shared_queue() {
        let log = NotificationLog::default();
        let handle = log.clone();
        handle.error("Request failed", "boom");

        let drained = log.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].level, NotificationLevel::Error);
        assert!(handle.entries().is_empty());
    }

    #[test]
    fn test_rejected_file_messages() {
        let log = NotificationLog::default();
        log.rejected_file(
            "setup.exe",
            &ValidationError::InvalidType {
                mime_type: "application/x-msdownload".to_string(),
            },
        );
        log.rejected_file(
            "movie.mp4",
            &ValidationError::TooLarge {
                size: 11 * 1024 * 1024,
                max: 10 * 1024 * 1024,
            },
        );

        let entries = log.entries();
        assert_eq!(entries[0].title, "Invalid file type");
        assert_eq!(entries[0].description, "setup.exe is not an allowed file type");
        assert_eq!(entries[1].title, "File too large");
        assert_eq!(entries[1].description, "movie.mp4 exceeds the 10MB limit");
    }
}
