pub mod conversation_persistence;
pub mod credential_store;
pub mod error;
pub mod key_value_store;

pub use conversation_persistence::{CONVERSATIONS_KEY, ConversationPersistence};
pub use credential_store::CredentialStore;
pub use error::{StorageError, StorageResult};
pub use key_value_store::{InMemoryStore, JsonFileStore, KeyValueStore};
