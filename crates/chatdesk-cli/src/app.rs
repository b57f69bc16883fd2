use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chatdesk_core::models::{NotificationLevel, PreviewCache};
use chatdesk_core::repositories::{ConversationPersistence, CredentialStore, JsonFileStore};
use chatdesk_core::settings::SettingsJsonRepository;
use chatdesk_core::{
    Attachment, ChatError, ChatSettings, ConversationsStore, GatewayClient, MessageComposer,
    NotificationLog, ProviderType, RequestOrchestrator, Role, SharedConversationsStore,
};
use tracing::info;

const STORAGE_DIR: &str = "storage";
const SECRETS_DIR: &str = "secrets";

/// Everything one CLI session works with
pub struct App {
    pub settings: ChatSettings,
    pub store: SharedConversationsStore,
    pub credentials: Arc<CredentialStore>,
    pub composer: MessageComposer,
    pub notifications: NotificationLog,
    pub previews: PreviewCache,
    orchestrator: RequestOrchestrator,
}

impl App {
    pub fn open(data_dir: &Path, provider: Option<ProviderType>) -> Result<Self> {
        let mut settings = SettingsJsonRepository::in_dir(data_dir).load();
        if let Some(provider) = provider {
            settings.provider = provider;
        }

        let conversations = Arc::new(JsonFileStore::new(data_dir.join(STORAGE_DIR)));
        let secrets = Arc::new(JsonFileStore::new(data_dir.join(SECRETS_DIR)));

        let store = ConversationsStore::load(
            ConversationPersistence::background(conversations),
            settings.greeting.clone(),
        )
        .into_shared();
        let credentials = Arc::new(CredentialStore::new(secrets, settings.provider));
        let notifications = NotificationLog::default();

        let gateway = GatewayClient::from_settings(&settings, credentials.clone())
            .context("Failed to create HTTP client")?;
        let orchestrator =
            RequestOrchestrator::new(store.clone(), Arc::new(gateway), notifications.clone());

        info!(
            data_dir = %data_dir.display(),
            provider = %settings.provider.display_name(),
            "Session opened"
        );

        Ok(Self {
            settings,
            store,
            credentials,
            composer: MessageComposer::new(),
            notifications,
            previews: PreviewCache::new(),
            orchestrator,
        })
    }

    /// Queue a file from disk; rejected files become notifications
    pub fn attach_file(&mut self, path: &Path) -> Result<()> {
        let attachment = Attachment::from_path(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let is_media = attachment.is_media();
        let name = attachment.name().to_string();

        let rejected = self.composer.add_files(vec![attachment]);
        for (file, reason) in &rejected {
            self.notifications.rejected_file(file.name(), reason);
        }

        if rejected.is_empty() && is_media && !self.settings.provider.supports_media() {
            self.notifications.info(
                "Media not sent",
                format!(
                    "{} only receives text; {} stays attached for display",
                    self.settings.provider.display_name(),
                    name
                ),
            );
        }
        Ok(())
    }

    /// Submit the composer and wait for the reply
    pub async fn send(&mut self) -> Result<String, ChatError> {
        let turn = match self.composer.submit(&self.credentials) {
            Ok(turn) => turn,
            Err(ChatError::AuthRequired) => {
                self.notifications.error(
                    "API key required",
                    format!(
                        "Set your {} API key with `chatdesk set-key <KEY>`",
                        self.settings.provider.display_name()
                    ),
                );
                return Err(ChatError::AuthRequired);
            }
            Err(e) => return Err(e),
        };

        let outcome = self.orchestrator.dispatch(turn).await?;
        Ok(outcome.reply)
    }

    pub fn print_notifications(&self) {
        for notification in self.notifications.drain() {
            let prefix = match notification.level {
                NotificationLevel::Info => "info",
                NotificationLevel::Error => "error",
            };
            eprintln!(
                "[{}] {}: {}",
                prefix, notification.title, notification.description
            );
        }
    }

    pub fn print_list(&self) {
        let store = self.store.lock();
        if store.count() == 0 {
            println!("No conversations yet");
            return;
        }

        for conversation in store.list() {
            let marker = if store.active_id() == Some(conversation.id()) {
                "*"
            } else {
                " "
            };
            println!(
                "{} {}  {}  ({} messages, {})",
                marker,
                conversation.id(),
                conversation.title(),
                conversation.message_count(),
                conversation.created_at().format("%Y-%m-%d %H:%M")
            );
        }
    }

    pub fn print_conversation(&self, id: Option<&str>) -> Result<()> {
        let store = self.store.lock();
        let conversation = match id {
            Some(id) => store.get(id),
            None => store.current(),
        }
        .with_context(|| match id {
            Some(id) => format!("Conversation not found: {}", id),
            None => "No conversations yet".to_string(),
        })?;

        println!("# {}", conversation.title());
        for message in conversation.messages() {
            print_message(message.role, &message.content);
            for attachment in &message.attachments {
                println!("  [attachment] {} ({})", attachment.name(), attachment.mime_type());
            }
        }
        Ok(())
    }
}

pub fn print_message(role: Role, content: &str) {
    let label = match role {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    println!("{}> {}", label, content);
}
