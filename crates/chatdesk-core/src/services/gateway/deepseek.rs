use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{
    ChatMessage, GatewayError, LlmGateway, require_credential, status_error, trim_base_url,
};
use crate::models::Attachment;
use crate::repositories::CredentialStore;
use crate::settings::{GenerationConfig, ProviderSettings, ProviderType};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// DeepSeek OpenAI-compatible chat completions client
pub struct DeepSeekGateway {
    http: reqwest::Client,
    settings: ProviderSettings,
    generation: GenerationConfig,
    credentials: Arc<CredentialStore>,
}

impl DeepSeekGateway {
    pub fn new(
        http: reqwest::Client,
        settings: ProviderSettings,
        generation: GenerationConfig,
        credentials: Arc<CredentialStore>,
    ) -> Self {
        Self {
            http,
            settings,
            generation,
            credentials,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", trim_base_url(&self.settings.base_url))
    }
}

#[async_trait]
impl LlmGateway for DeepSeekGateway {
    fn provider(&self) -> ProviderType {
        ProviderType::DeepSeek
    }

    async fn send_text(&self, history: &[ChatMessage]) -> Result<String, GatewayError> {
        if history.is_empty() {
            return Err(GatewayError::EmptyRequest);
        }
        let api_key = require_credential(&self.credentials)?;

        let request = ChatRequest {
            model: &self.settings.model,
            messages: history
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: self.generation.temperature,
            max_tokens: self.generation.max_output_tokens,
        };

        debug!(model = %self.settings.model, messages = history.len(), "Sending DeepSeek request");
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body: ChatResponse = response.json().await?;
        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GatewayError::InvalidResponse("response has no choices".to_string()))?;

        info!(model = %self.settings.model, chars = text.chars().count(), "DeepSeek reply received");
        Ok(text)
    }

    /// Media is not transmitted; the text history is sent instead
    async fn send_multimodal(
        &self,
        history: &[ChatMessage],
        media: &[Attachment],
    ) -> Result<String, GatewayError> {
        if !media.is_empty() {
            warn!(
                count = media.len(),
                "DeepSeek does not accept media, sending text only"
            );
        }
        self.send_text(history).await
    }
}
