use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::services::title::derive_title;

/// Title every conversation starts with until a user message or edit replaces it
pub const DEFAULT_TITLE: &str = "New Chat";

/// Fallback MIME type for files whose extension is unknown
const OCTET_STREAM: &str = "application/octet-stream";

/// Author of a message.
///
/// Older stores wrote the assistant role as `"ai"`; it is still accepted on load.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    #[serde(alias = "ai")]
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A file attached to a user message.
///
/// Attachments live only in memory: the bytes are shared between the composer,
/// the stored message and the gateway call, and are never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    id: Uuid,
    name: String,
    mime_type: String,
    data: Arc<[u8]>,
}

impl Attachment {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let data = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or(OCTET_STREAM)
            .to_string();

        Ok(Self::new(name, mime_type, data))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Size in bytes
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Images and videos are sent to the model; everything else is display-only
    pub fn is_media(&self) -> bool {
        crate::services::attachment_validation::is_media_type(&self.mime_type)
    }
}

/// A single turn in a conversation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip)]
    pub attachments: Vec<Attachment>,
}

impl Message {
    pub fn user(content: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            attachments,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            attachments: Vec::new(),
        }
    }

    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }
}

fn default_auto_title() -> bool {
    true
}

/// A conversation with the assistant, as held in memory and persisted
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    id: String,
    title: String,
    messages: Vec<Message>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    created_at: DateTime<Utc>,
    /// Cleared by the first derivation or by any user edit
    #[serde(default = "default_auto_title")]
    auto_title: bool,
}

impl Conversation {
    /// Create a conversation seeded with the assistant greeting
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: DEFAULT_TITLE.to_string(),
            messages: vec![Message::assistant(greeting)],
            created_at: Utc::now(),
            auto_title: true,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether the next user message may still replace the placeholder title
    pub fn auto_title(&self) -> bool {
        self.auto_title && self.title == DEFAULT_TITLE
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Append a message, deriving the title from it when allowed.
    /// Returns whether the title changed.
    pub(crate) fn push_message(&mut self, message: Message) -> bool {
        let mut title_derived = false;
        if message.role == Role::User && self.auto_title() {
            self.title = derive_title(&message.content);
            self.auto_title = false;
            title_derived = true;
        }

        self.messages.push(message);
        title_derived
    }

    /// User edit: always wins and stops further derivation
    pub(crate) fn set_title(&mut self, title: String) {
        self.title = title;
        self.auto_title = false;
    }
}

/// Accept RFC 3339 strings (what we write) as well as epoch milliseconds.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Text(String),
        Millis(i64),
        Fractional(f64),
    }

    match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Text(text) => DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| serde::de::Error::custom(format!("invalid createdAt '{}': {}", text, e))),
        RawTimestamp::Millis(ms) => millis_to_datetime(ms),
        RawTimestamp::Fractional(ms) => millis_to_datetime(ms as i64),
    }
}

fn millis_to_datetime<E: serde::de::Error>(ms: i64) -> Result<DateTime<Utc>, E> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| E::custom(format!("createdAt out of range: {}", ms)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_conversation_is_seeded_with_greeting() {
        let conv = Conversation::new("Hello there");
        assert_eq!(conv.title(), DEFAULT_TITLE);
        assert_eq!(conv.message_count(), 1);
        assert_eq!(conv.messages()[0].role, Role::Assistant);
        assert_eq!(conv.messages()[0].content, "Hello there");
        assert!(conv.auto_title());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Conversation::new("hi");
        let b = Conversation::new("hi");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_first_user_message_derives_title_once() {
        let mut conv = Conversation::new("hi");
        assert!(conv.push_message(Message::user("What is Rust?", vec![])));
        assert_eq!(conv.title(), "What is Rust?");

        assert!(!conv.push_message(Message::user("Another question", vec![])));
        assert_eq!(conv.title(), "What is Rust?");
    }

    #[test]
    fn test_assistant_message_never_derives_title() {
        let mut conv = Conversation::new("hi");
        assert!(!conv.push_message(Message::assistant("Sure")));
        assert_eq!(conv.title(), DEFAULT_TITLE);
    }

    #[test]
    fn test_user_edit_disables_derivation() {
        let mut conv = Conversation::new("hi");
        conv.set_title(DEFAULT_TITLE.to_string());
        conv.push_message(Message::user("Would otherwise become the title", vec![]));
        assert_eq!(conv.title(), DEFAULT_TITLE);
    }

    #[test]
    fn test_attachment_only_first_message_derives_empty_title() {
        let mut conv = Conversation::new("hi");
        let file = Attachment::new("cat.png", "image/png", vec![1u8, 2, 3]);
        assert!(conv.push_message(Message::user("", vec![file])));
        assert_eq!(conv.title(), "");
        assert!(!conv.auto_title());

        assert!(!conv.push_message(Message::user("Describe the cat", vec![])));
        assert_eq!(conv.title(), "");
    }

    #[test]
    fn test_attachments_are_not_serialized() {
        let file = Attachment::new("notes.txt", "text/plain", b"secret".to_vec());
        let message = Message::user("see file", vec![file]);

        let json = serde_json::to_string(&message).unwrap();
        assert!(!json.contains("notes.txt"));

        let restored: Message = serde_json::from_str(&json).unwrap();
        assert!(restored.attachments.is_empty());
        assert_eq!(restored.content, "see file");
    }

    #[test]
    fn test_legacy_record_is_accepted() {
        let json = r#"{
            "id": "1717171717171",
            "title": "Old chat",
            "messages": [
                {"role": "ai", "content": "Hi"},
                {"role": "user", "content": "Hello"}
            ],
            "createdAt": "2024-05-31T16:08:37.171Z"
        }"#;

        let conv: Conversation = serde_json::from_str(json).unwrap();
        assert_eq!(conv.messages()[0].role, Role::Assistant);
        assert_eq!(conv.messages()[1].role, Role::User);
        assert_eq!(conv.created_at().timestamp_millis(), 1_717_171_717_171);
        assert!(!conv.auto_title(), "non-placeholder title must not be derived");
    }

    #[test]
    fn test_created_at_from_epoch_millis() {
        let json = r#"{"id":"a","title":"t","messages":[],"createdAt":1700000000000}"#;
        let conv: Conversation = serde_json::from_str(json).unwrap();
        assert_eq!(conv.created_at().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_invalid_created_at_is_rejected() {
        let json = r#"{"id":"a","title":"t","messages":[],"createdAt":"yesterday"}"#;
        assert!(serde_json::from_str::<Conversation>(json).is_err());
    }

    #[test]
    fn test_attachment_from_path_guesses_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, [0u8; 16]).unwrap();

        let attachment = Attachment::from_path(&path).unwrap();
        assert_eq!(attachment.name(), "photo.jpg");
        assert_eq!(attachment.mime_type(), "image/jpeg");
        assert_eq!(attachment.size(), 16);
        assert!(attachment.is_media());
    }

    #[test]
    fn test_unknown_extension_falls_back_to_octet_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.zzzunknown");
        std::fs::write(&path, [0u8; 4]).unwrap();

        let attachment = Attachment::from_path(&path).unwrap();
        assert_eq!(attachment.mime_type(), OCTET_STREAM);
        assert!(!attachment.is_media());
    }
}
