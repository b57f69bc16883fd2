pub mod composer;
pub mod conversation;
pub mod conversations_store;
pub mod notifications;
pub mod previews;

pub use composer::{MessageComposer, Turn};
pub use conversation::{Attachment, Conversation, DEFAULT_TITLE, Message, Role};
pub use conversations_store::{AppendOutcome, ConversationsStore, SharedConversationsStore};
pub use notifications::{Notification, NotificationLevel, NotificationLog};
pub use previews::PreviewCache;
