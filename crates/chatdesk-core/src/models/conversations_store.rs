use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use super::conversation::{Conversation, Message};
use crate::error::{ChatError, ChatResult};
use crate::repositories::ConversationPersistence;

/// Store handle shared between the front end and the orchestrator.
/// Locks are held only for the duration of a single operation.
pub type SharedConversationsStore = Arc<Mutex<ConversationsStore>>;

/// What an append did, so callers need not infer it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppendOutcome {
    pub conversation_id: String,
    /// A conversation was created because none was current
    pub created_conversation: bool,
    pub title_derived: bool,
}

/// Authoritative in-memory state of all conversations.
///
/// Conversations are kept newest first. Every mutation finishes by writing
/// the full list through the persistence adapter.
pub struct ConversationsStore {
    conversations: Vec<Conversation>,
    active_conversation_id: Option<String>,
    persistence: ConversationPersistence,
    greeting: String,
}

impl ConversationsStore {
    /// Empty store; nothing is read from storage
    pub fn new(persistence: ConversationPersistence, greeting: impl Into<String>) -> Self {
        Self {
            conversations: Vec::new(),
            active_conversation_id: None,
            persistence,
            greeting: greeting.into(),
        }
    }

    /// Restore saved conversations; the most recent one becomes current
    pub fn load(persistence: ConversationPersistence, greeting: impl Into<String>) -> Self {
        let conversations = persistence.load();
        let active_conversation_id = conversations.first().map(|c| c.id().to_string());
        info!(count = conversations.len(), "Restored conversations");

        Self {
            conversations,
            active_conversation_id,
            persistence,
            greeting: greeting.into(),
        }
    }

    pub fn into_shared(self) -> SharedConversationsStore {
        Arc::new(Mutex::new(self))
    }

    /// Create a conversation seeded with the greeting, put it first and make it current
    pub fn create_conversation(&mut self) -> String {
        let id = self.insert_new_conversation();
        self.persist();
        id
    }

    fn insert_new_conversation(&mut self) -> String {
        let conversation = Conversation::new(self.greeting.clone());
        let id = conversation.id().to_string();
        debug!(conversation_id = %id, "Created conversation");

        self.conversations.insert(0, conversation);
        self.active_conversation_id = Some(id.clone());
        id
    }

    /// Set the current conversation
    pub fn select_conversation(&mut self, id: &str) -> ChatResult<()> {
        if self.position(id).is_none() {
            return Err(ChatError::NotFound(id.to_string()));
        }
        self.active_conversation_id = Some(id.to_string());
        Ok(())
    }

    /// Append to the current conversation, creating one first if none is current
    pub fn append_message(&mut self, message: Message) -> AppendOutcome {
        let existing = self
            .active_conversation_id
            .as_deref()
            .and_then(|id| self.position(id));

        let (index, created_conversation) = match existing {
            Some(index) => (index, false),
            None => {
                self.insert_new_conversation();
                (0, true)
            }
        };

        let conversation = &mut self.conversations[index];
        let title_derived = conversation.push_message(message);
        let outcome = AppendOutcome {
            conversation_id: conversation.id().to_string(),
            created_conversation,
            title_derived,
        };

        self.persist();
        outcome
    }

    /// Append to a specific conversation, whether or not it is current
    pub fn append_to(&mut self, id: &str, message: Message) -> ChatResult<AppendOutcome> {
        let index = self
            .position(id)
            .ok_or_else(|| ChatError::NotFound(id.to_string()))?;

        let title_derived = self.conversations[index].push_message(message);
        self.persist();

        Ok(AppendOutcome {
            conversation_id: id.to_string(),
            created_conversation: false,
            title_derived,
        })
    }

    /// Rename a conversation; unknown ids are ignored. Returns whether it was found.
    pub fn update_title(&mut self, id: &str, title: impl Into<String>) -> bool {
        let Some(index) = self.position(id) else {
            debug!(conversation_id = %id, "Ignoring title update for unknown conversation");
            return false;
        };

        self.conversations[index].set_title(title.into());
        self.persist();
        true
    }

    /// Delete a conversation. Deleting the current one promotes the list head.
    pub fn delete_conversation(&mut self, id: &str) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };

        self.conversations.remove(index);

        // If we deleted the active conversation, switch to the newest remaining or none
        if self.active_conversation_id.as_deref() == Some(id) {
            self.active_conversation_id = self.conversations.first().map(|c| c.id().to_string());
        }

        self.persist();
        true
    }

    pub fn current(&self) -> Option<&Conversation> {
        self.active_conversation_id
            .as_deref()
            .and_then(|id| self.get(id))
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_conversation_id.as_deref()
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id() == id)
    }

    /// All conversations, newest first
    pub fn list(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn count(&self) -> usize {
        self.conversations.len()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.conversations.iter().position(|c| c.id() == id)
    }

    fn persist(&self) {
        self.persistence.save(&self.conversations);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::conversation::{DEFAULT_TITLE, Role};
    use crate::repositories::{CONVERSATIONS_KEY, InMemoryStore, KeyValueStore};

    const GREETING: &str = "Hello!";

    fn new_store() -> (ConversationsStore, Arc<InMemoryStore>) {
        let backend = Arc::new(InMemoryStore::new());
        let persistence = ConversationPersistence::new(backend.clone());
        (ConversationsStore::new(persistence, GREETING), backend)
    }

    fn saved_ids(backend: &InMemoryStore) -> Vec<String> {
        let json = backend.get(CONVERSATIONS_KEY).unwrap().unwrap_or_default();
        let saved: Vec<Conversation> = serde_json::from_str(&json).unwrap();
        saved.iter().map(|c| c.id().to_string()).collect()
    }

    #[test]
    fn test_create_conversation_is_current_and_first() {
        let (mut store, backend) = new_store();
        let first = store.create_conversation();
        let second = store.create_conversation();

        assert_eq!(store.active_id(), Some(second.as_str()));
        let ids: Vec<&str> = store.list().iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec![second.as_str(), first.as_str()]);

        let current = store.current().unwrap();
        assert_eq!(current.messages().len(), 1);
        assert_eq!(current.messages()[0].role, Role::Assistant);
        assert_eq!(current.messages()[0].content, GREETING);

        assert_eq!(saved_ids(&backend), vec![second, first]);
    }

    #[test]
    fn test_select_unknown_conversation_fails() {
        let (mut store, _) = new_store();
        let id = store.create_conversation();

        assert!(matches!(
            store.select_conversation("nope"),
            Err(ChatError::NotFound(_))
        ));
        assert_eq!(store.active_id(), Some(id.as_str()));
    }

    #[test]
    fn test_select_switches_current() {
        let (mut store, _) = new_store();
        let first = store.create_conversation();
        store.create_conversation();

        store.select_conversation(&first).unwrap();
        assert_eq!(store.current().unwrap().id(), first);
    }

    #[test]
    fn test_append_without_current_creates_conversation() {
        let (mut store, backend) = new_store();

        let outcome = store.append_message(Message::user("hi", vec![]));
        assert!(outcome.created_conversation);
        assert_eq!(store.count(), 1);
        assert_eq!(store.active_id(), Some(outcome.conversation_id.as_str()));

        let current = store.current().unwrap();
        assert_eq!(current.messages().len(), 2);
        assert_eq!(current.messages()[0].content, GREETING);
        assert_eq!(current.messages()[1].content, "hi");
        assert_eq!(saved_ids(&backend), vec![outcome.conversation_id]);
    }

    #[test]
    fn test_append_to_current_does_not_create() {
        let (mut store, _) = new_store();
        let id = store.create_conversation();

        let outcome = store.append_message(Message::user("hi", vec![]));
        assert!(!outcome.created_conversation);
        assert_eq!(outcome.conversation_id, id);
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_appends_keep_call_order() {
        let (mut store, _) = new_store();
        store.create_conversation();

        let contents: Vec<String> = (0..20).map(|i| format!("message {}", i)).collect();
        for (i, content) in contents.iter().enumerate() {
            let message = if i % 2 == 0 {
                Message::user(content.clone(), vec![])
            } else {
                Message::assistant(content.clone())
            };
            store.append_message(message);
        }

        let stored: Vec<&str> = store.current().unwrap().messages()[1..]
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        let expected: Vec<&str> = contents.iter().map(|c| c.as_str()).collect();
        assert_eq!(stored, expected);
    }

    #[test]
    fn test_title_derived_from_first_user_message() {
        let (mut store, _) = new_store();
        store.create_conversation();

        let long = "Please summarise the history of the Rust programming language";
        let outcome = store.append_message(Message::user(long, vec![]));
        assert!(outcome.title_derived);
        assert_eq!(
            store.current().unwrap().title(),
            "Please summarise the history o..."
        );

        let outcome = store.append_message(Message::user("short", vec![]));
        assert!(!outcome.title_derived);
    }

    #[test]
    fn test_short_first_message_becomes_title_verbatim() {
        let (mut store, _) = new_store();
        let outcome = store.append_message(Message::user("Hello Rust", vec![]));
        assert_eq!(
            store.get(&outcome.conversation_id).unwrap().title(),
            "Hello Rust"
        );
    }

    #[test]
    fn test_attachment_only_first_message_sets_empty_title() {
        let (mut store, _) = new_store();
        let image = crate::models::Attachment::new("cat.png", "image/png", vec![1u8; 4]);

        let outcome = store.append_message(Message::user("", vec![image]));
        assert!(outcome.title_derived);
        assert_eq!(store.current().unwrap().title(), "");

        let outcome = store.append_message(Message::user("later text", vec![]));
        assert!(!outcome.title_derived);
        assert_eq!(store.current().unwrap().title(), "");
    }

    #[test]
    fn test_user_title_edit_wins() {
        let (mut store, _) = new_store();
        let id = store.create_conversation();

        assert!(store.update_title(&id, "My research"));
        store.append_message(Message::user("What is ownership?", vec![]));
        assert_eq!(store.current().unwrap().title(), "My research");
    }

    #[test]
    fn test_update_title_unknown_id_is_noop() {
        let (mut store, _) = new_store();
        let id = store.create_conversation();

        assert!(!store.update_title("missing", "x"));
        assert_eq!(store.get(&id).unwrap().title(), DEFAULT_TITLE);
    }

    #[test]
    fn test_append_to_specific_conversation() {
        let (mut store, _) = new_store();
        let first = store.create_conversation();
        let second = store.create_conversation();

        store
            .append_to(&first, Message::assistant("late reply"))
            .unwrap();
        assert_eq!(store.active_id(), Some(second.as_str()));
        assert_eq!(
            store.get(&first).unwrap().messages().last().unwrap().content,
            "late reply"
        );

        assert!(matches!(
            store.append_to("gone", Message::assistant("x")),
            Err(ChatError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_current_promotes_list_head() {
        let (mut store, backend) = new_store();
        let oldest = store.create_conversation();
        let middle = store.create_conversation();
        let newest = store.create_conversation();

        store.select_conversation(&middle).unwrap();
        assert!(store.delete_conversation(&middle));
        assert_eq!(store.active_id(), Some(newest.as_str()));
        assert_eq!(saved_ids(&backend), vec![newest.clone(), oldest.clone()]);
    }

    #[test]
    fn test_delete_non_current_keeps_current() {
        let (mut store, _) = new_store();
        let oldest = store.create_conversation();
        let newest = store.create_conversation();

        assert!(store.delete_conversation(&oldest));
        assert_eq!(store.active_id(), Some(newest.as_str()));
    }

    #[test]
    fn test_delete_sole_conversation_clears_current() {
        let (mut store, _) = new_store();
        let id = store.create_conversation();

        assert!(store.delete_conversation(&id));
        assert!(store.current().is_none());
        assert_eq!(store.active_id(), None);
        assert!(!store.delete_conversation(&id));
    }

    #[test]
    fn test_load_restores_most_recent_as_current() {
        let backend = Arc::new(InMemoryStore::new());
        let (older, newer) = {
            let mut store =
                ConversationsStore::new(ConversationPersistence::new(backend.clone()), GREETING);
            let older = store.create_conversation();
            let newer = store.create_conversation();
            store.select_conversation(&older).unwrap();
            store.append_message(Message::user("kept", vec![]));
            (older, newer)
        };

        let restored = ConversationsStore::load(ConversationPersistence::new(backend), GREETING);
        assert_eq!(restored.count(), 2);
        assert_eq!(restored.active_id(), Some(newer.as_str()));
        assert_eq!(restored.get(&older).unwrap().title(), "kept");
    }
}
