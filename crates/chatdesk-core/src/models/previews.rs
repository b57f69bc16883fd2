use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use uuid::Uuid;

use super::conversation::Attachment;

/// Display previews of media attachments, keyed by attachment id.
///
/// A preview is built at most once per attachment and released at most once.
#[derive(Debug, Default)]
pub struct PreviewCache {
    entries: HashMap<Uuid, String>,
}

impl PreviewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `data:` URL for a media attachment; `None` for other types
    pub fn preview(&mut self, attachment: &Attachment) -> Option<&str> {
        if !attachment.is_media() {
            return None;
        }

        let url = self.entries.entry(attachment.id()).or_insert_with(|| {
            format!(
                "data:{};base64,{}",
                attachment.mime_type(),
                STANDARD.encode(attachment.data())
            )
        });
        Some(url.as_str())
    }

    /// Release one preview. Returns false if it was never created or is already gone.
    pub fn release(&mut self, id: Uuid) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Release everything (e.g., on conversation switch)
    pub fn release_all(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    pub fn live_count(&self) -> usize {
        self.entries.len()
    }
}
