use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::key_value_store::KeyValueStore;
use crate::error::{ChatError, ChatResult};
use crate::settings::ProviderType;

/// API key of one provider.
///
/// Stored in its own namespace, apart from conversations, and cached in
/// memory for the rest of the process after the first successful read.
pub struct CredentialStore {
    backend: Arc<dyn KeyValueStore>,
    provider: ProviderType,
    cached: Mutex<Option<String>>,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, provider: ProviderType) -> Self {
        Self {
            backend,
            provider,
            cached: Mutex::new(None),
        }
    }

    pub fn provider(&self) -> ProviderType {
        self.provider
    }

    /// Set the API key. Blank keys are refused.
    ///
    /// The key is usable immediately even if writing it to storage fails.
    pub fn set_credential(&self, key: &str) -> ChatResult<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ChatError::AuthRequired);
        }

        *self.cached.lock() = Some(key.to_string());

        if let Err(e) = self.backend.set(self.provider.credential_key(), key) {
            warn!(provider = %self.provider.display_name(), error = ?e, "Failed to persist API key");
        }
        Ok(())
    }

    /// The API key, if one is configured
    pub fn credential(&self) -> Option<String> {
        let mut cached = self.cached.lock();
        if let Some(key) = cached.as_ref() {
            return Some(key.clone());
        }

        match self.backend.get(self.provider.credential_key()) {
            Ok(Some(key)) if !key.trim().is_empty() => {
                debug!(provider = %self.provider.display_name(), "Loaded API key from storage");
                let key = key.trim().to_string();
                *cached = Some(key.clone());
                Some(key)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(provider = %self.provider.display_name(), error = ?e, "Failed to read API key");
                None
            }
        }
    }

    pub fn has_credential(&self) -> bool {
        self.credential().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::key_value_store::InMemoryStore;

    #[test]
    fn test_no_credential_by_default() {
        let store = CredentialStore::new(Arc::new(InMemoryStore::new()), ProviderType::Gemini);
        assert_eq!(store.credential(), None);
        assert!(!store.has_credential());
    }

    #[test]
    fn test_set_persists_under_provider_key() {
        let backend = Arc::new(InMemoryStore::new());
        let store = CredentialStore::new(backend.clone(), ProviderType::DeepSeek);

        store.set_credential("  sk-test  ").unwrap();
        assert_eq!(store.credential().as_deref(), Some("sk-test"));
        assert_eq!(
            backend.get("deepseek-api-key").unwrap().as_deref(),
            Some("sk-test")
        );
        assert_eq!(backend.get("gemini-api-key").unwrap(), None);
    }

    #[test]
    fn test_blank_key_is_refused() {
        let store = CredentialStore::new(Arc::new(InMemoryStore::new()), ProviderType::Gemini);
        assert!(matches!(
            store.set_credential("   "),
            Err(ChatError::AuthRequired)
        ));
        assert!(!store.has_credential());
    }

    #[test]
    fn test_credential_is_cached_after_first_read() {
        let backend = Arc::new(InMemoryStore::new());
        backend.set("gemini-api-key", "stored-key").unwrap();

        let store = CredentialStore::new(backend.clone(), ProviderType::Gemini);
        assert_eq!(store.credential().as_deref(), Some("stored-key"));

        backend.remove("gemini-api-key").unwrap();
        assert_eq!(store.credential().as_deref(), Some("stored-key"));
    }
}
