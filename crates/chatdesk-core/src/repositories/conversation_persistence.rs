use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::error::StorageResult;
use super::key_value_store::KeyValueStore;
use crate::models::Conversation;

/// Storage key of the serialized conversation list
pub const CONVERSATIONS_KEY: &str = "chat_history";

/// Persists the whole conversation list as one JSON document.
///
/// This is a convenience cache, not a system of record: load failures are
/// treated as "nothing saved" and save failures are only logged. Attachment
/// bytes never reach storage.
#[derive(Clone)]
pub struct ConversationPersistence {
    backend: Arc<dyn KeyValueStore>,
    writer: Option<Arc<BackgroundWriter>>,
}

impl ConversationPersistence {
    /// Adapter that writes on the calling thread
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            writer: None,
        }
    }

    /// Adapter that hands serialized snapshots to a writer thread, so saving
    /// never waits on storage. Pending writes are flushed when the last clone
    /// is dropped.
    pub fn background(backend: Arc<dyn KeyValueStore>) -> Self {
        let writer = match BackgroundWriter::spawn(backend.clone()) {
            Ok(writer) => Some(Arc::new(writer)),
            Err(e) => {
                warn!(error = ?e, "Failed to start persistence writer, saving synchronously");
                None
            }
        };
        Self { backend, writer }
    }

    /// Load all conversations, newest first as they were saved
    pub fn load(&self) -> Vec<Conversation> {
        let contents = match self.backend.get(CONVERSATIONS_KEY) {
            Ok(Some(contents)) => contents,
            Ok(None) => {
                debug!("No saved conversations");
                return Vec::new();
            }
            Err(e) => {
                warn!(error = ?e, "Failed to read saved conversations");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Conversation>>(&contents) {
            Ok(conversations) => {
                debug!(count = conversations.len(), "Loaded conversations");
                conversations
            }
            Err(e) => {
                warn!(error = ?e, "Saved conversations are unreadable, starting fresh");
                Vec::new()
            }
        }
    }

    /// Save the full list; failures are logged and swallowed
    pub fn save(&self, conversations: &[Conversation]) {
        let json = match Self::serialize(conversations) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = ?e, "Failed to serialize conversations");
                return;
            }
        };

        match &self.writer {
            Some(writer) => writer.submit(json),
            None => write_snapshot(self.backend.as_ref(), &json),
        }
    }

    /// The exact document written to storage
    pub fn serialize(conversations: &[Conversation]) -> StorageResult<String> {
        Ok(serde_json::to_string(conversations)?)
    }
}

fn write_snapshot(backend: &dyn KeyValueStore, json: &str) {
    if let Err(e) = backend.set(CONVERSATIONS_KEY, json) {
        warn!(error = ?e, "Failed to save conversations");
    }
}

/// Writer thread fed with serialized snapshots. Only the newest pending
/// snapshot is written.
struct BackgroundWriter {
    sender: Mutex<Option<Sender<String>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl BackgroundWriter {
    fn spawn(backend: Arc<dyn KeyValueStore>) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::channel();
        let handle = std::thread::Builder::new()
            .name("conversation-writer".to_string())
            .spawn(move || run_writer(backend, receiver))?;

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            handle: Mutex::new(Some(handle)),
        })
    }

    fn submit(&self, json: String) {
        let sent = self
            .sender
            .lock()
            .as_ref()
            .map(|sender| sender.send(json).is_ok())
            .unwrap_or(false);
        if !sent {
            warn!("Persistence writer has stopped, snapshot dropped");
        }
    }
}

impl Drop for BackgroundWriter {
    fn drop(&mut self) {
        // Closing the channel ends the loop once pending snapshots are written
        self.sender.lock().take();
        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                warn!("Persistence writer panicked");
            }
        }
    }
}

fn run_writer(backend: Arc<dyn KeyValueStore>, receiver: Receiver<String>) {
    while let Ok(mut json) = receiver.recv() {
        while let Ok(newer) = receiver.try_recv() {
            json = newer;
        }
        write_snapshot(backend.as_ref(), &json);
    }
    debug!("Persistence writer stopped");
}
