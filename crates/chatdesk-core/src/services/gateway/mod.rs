//! HTTP clients for the remote model providers.
//!
//! Each provider gets its own module; [`GatewayClient`] selects one from the
//! settings and dispatches to it.

mod deepseek;
mod error;
mod gemini;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::models::{Attachment, Message, Role};
use crate::repositories::CredentialStore;
use crate::settings::{ChatSettings, ProviderType};

pub use deepseek::DeepSeekGateway;
pub use error::GatewayError;
pub use gemini::GeminiGateway;

/// One entry of the history sent to the provider
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        Self::new(message.role, message.content.clone())
    }
}

/// A remote model that turns a conversation into one assistant reply
#[async_trait]
pub trait LlmGateway: Send + Sync {
    fn provider(&self) -> ProviderType;

    /// Send the text-only history and return the reply text
    async fn send_text(&self, history: &[ChatMessage]) -> Result<String, GatewayError>;

    /// Send media attachments together with the latest user text
    async fn send_multimodal(
        &self,
        history: &[ChatMessage],
        media: &[Attachment],
    ) -> Result<String, GatewayError>;
}

/// The configured provider's gateway
pub enum GatewayClient {
    Gemini(GeminiGateway),
    DeepSeek(DeepSeekGateway),
}

impl GatewayClient {
    pub fn from_settings(
        settings: &ChatSettings,
        credentials: Arc<CredentialStore>,
    ) -> Result<Self, GatewayError> {
        let http = build_http_client(settings.request_timeout_secs)?;
        let provider_settings = settings.provider_settings().clone();
        debug!(
            provider = %settings.provider.display_name(),
            model = %provider_settings.model,
            "Creating gateway client"
        );

        Ok(match settings.provider {
            ProviderType::Gemini => GatewayClient::Gemini(GeminiGateway::new(
                http,
                provider_settings,
                settings.generation.clone(),
                credentials,
            )),
            ProviderType::DeepSeek => GatewayClient::DeepSeek(DeepSeekGateway::new(
                http,
                provider_settings,
                settings.generation.clone(),
                credentials,
            )),
        })
    }
}

#[async_trait]
impl LlmGateway for GatewayClient {
    fn provider(&self) -> ProviderType {
        match self {
            GatewayClient::Gemini(g) => g.provider(),
            GatewayClient::DeepSeek(g) => g.provider(),
        }
    }

    async fn send_text(&self, history: &[ChatMessage]) -> Result<String, GatewayError> {
        match self {
            GatewayClient::Gemini(g) => g.send_text(history).await,
            GatewayClient::DeepSeek(g) => g.send_text(history).await,
        }
    }

    async fn send_multimodal(
        &self,
        history: &[ChatMessage],
        media: &[Attachment],
    ) -> Result<String, GatewayError> {
        match self {
            GatewayClient::Gemini(g) => g.send_multimodal(history, media).await,
            GatewayClient::DeepSeek(g) => g.send_multimodal(history, media).await,
        }
    }
}

fn build_http_client(timeout_secs: Option<u64>) -> Result<reqwest::Client, GatewayError> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder
        .build()
        .map_err(|e| GatewayError::Transport(e.to_string()))
}

fn require_credential(credentials: &CredentialStore) -> Result<String, GatewayError> {
    credentials
        .credential()
        .ok_or_else(|| GatewayError::MissingCredential {
            provider: credentials.provider().display_name().to_string(),
        })
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Turn a non-success response into a status error, preferring the
/// provider's `{"error": {"message": ...}}` text over the raw body
async fn status_error(response: reqwest::Response) -> GatewayError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<no body>".to_string());
    GatewayError::Status {
        status,
        message: extract_error_message(&body),
    }
}

fn extract_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) if body.trim().is_empty() => "<no body>".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

fn trim_base_url(base_url: &str) -> &str {
    base_url.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::InMemoryStore;

    #[test]
    fn test_extract_error_message() {
        assert_eq!(
            extract_error_message(r#"{"error": {"message": "API key not valid", "code": 400}}"#),
            "API key not valid"
        );
        assert_eq!(extract_error_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(extract_error_message("   "), "<no body>");
    }

    #[test]
    fn test_client_follows_configured_provider() {
        let credentials = Arc::new(CredentialStore::new(
            Arc::new(InMemoryStore::new()),
            ProviderType::DeepSeek,
        ));
        let settings = ChatSettings {
            provider: ProviderType::DeepSeek,
            ..ChatSettings::default()
        };

        let client = GatewayClient::from_settings(&settings, credentials).unwrap();
        assert_eq!(client.provider(), ProviderType::DeepSeek);
        assert!(matches!(client, GatewayClient::DeepSeek(_)));
    }

    #[test]
    fn test_chat_message_from_message() {
        let message = Message::user("hi", vec![]);
        assert_eq!(ChatMessage::from(&message), ChatMessage::new(Role::User, "hi"));
    }
}
