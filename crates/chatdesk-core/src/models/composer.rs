use tracing::debug;

use super::conversation::Attachment;
use crate::error::{ChatError, ChatResult};
use crate::repositories::CredentialStore;
use crate::services::attachment_validation::{self, ValidationError};

/// An outgoing user turn, ready for the orchestrator
#[derive(Clone, Debug, PartialEq)]
pub struct Turn {
    content: String,
    attachments: Vec<Attachment>,
}

impl Turn {
    pub fn new(content: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self {
            content: content.into(),
            attachments,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn into_parts(self) -> (String, Vec<Attachment>) {
        (self.content, self.attachments)
    }
}

/// Draft text plus the attachments queued for the next send
#[derive(Debug, Default)]
pub struct MessageComposer {
    draft: String,
    pending: Vec<Attachment>,
}

impl MessageComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Append text to the draft, separated from existing text by one space
    pub fn append_text(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if !self.draft.trim_end().is_empty() {
            let kept = self.draft.trim_end().len();
            self.draft.truncate(kept);
            self.draft.push(' ');
        } else {
            self.draft.clear();
        }
        self.draft.push_str(text);
    }

    /// Merge a speech transcript into the draft
    pub fn append_transcript(&mut self, transcript: &str) {
        self.append_text(transcript);
    }

    /// Validate and queue files. Accepted files keep their selection order;
    /// the rejected ones are returned with their reason.
    pub fn add_files(&mut self, files: Vec<Attachment>) -> Vec<(Attachment, ValidationError)> {
        let report = attachment_validation::validate(files);
        debug!(
            accepted = report.accepted.len(),
            rejected = report.rejected.len(),
            "Queued attachments"
        );
        self.pending.extend(report.accepted);
        report.rejected
    }

    /// Drop a queued attachment by position
    pub fn remove_attachment(&mut self, index: usize) -> Option<Attachment> {
        if index < self.pending.len() {
            Some(self.pending.remove(index))
        } else {
            None
        }
    }

    pub fn pending(&self) -> &[Attachment] {
        &self.pending
    }

    /// Turn the draft into an outgoing turn and reset the composer.
    ///
    /// Without a credential nothing is sent and the draft is kept.
    pub fn submit(&mut self, credentials: &CredentialStore) -> ChatResult<Turn> {
        if !credentials.has_credential() {
            return Err(ChatError::AuthRequired);
        }

        let content = self.draft.trim();
        if content.is_empty() && self.pending.is_empty() {
            return Err(ChatError::EmptyTurn);
        }

        let turn = Turn::new(content, std::mem::take(&mut self.pending));
        self.draft.clear();
        Ok(turn)
    }
}
