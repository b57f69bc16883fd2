use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    ChatMessage, GatewayError, LlmGateway, require_credential, status_error, trim_base_url,
};
use crate::models::{Attachment, Role};
use crate::repositories::CredentialStore;
use crate::settings::{GenerationConfig, ProviderSettings, ProviderType};

const API_KEY_HEADER: &str = "x-goog-api-key";

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];
const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content>,
    generation_config: WireGenerationConfig,
    safety_settings: Vec<SafetySetting<'a>>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

impl From<&GenerationConfig> for WireGenerationConfig {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_k: config.top_k,
            top_p: config.top_p,
            max_output_tokens: config.max_output_tokens,
        }
    }
}

#[derive(Serialize)]
struct SafetySetting<'a> {
    category: &'a str,
    threshold: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

fn text_part(text: impl Into<String>) -> Part {
    Part {
        text: Some(text.into()),
        ..Part::default()
    }
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

/// Google Gemini `generateContent` client
pub struct GeminiGateway {
    http: reqwest::Client,
    settings: ProviderSettings,
    generation: GenerationConfig,
    credentials: Arc<CredentialStore>,
}

impl GeminiGateway {
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
        format!(
            "{}/v1beta/models/{}:generateContent",
            trim_base_url(&self.settings.base_url),
            self.settings.model
        )
    }

    fn request(&self, contents: Vec<Content>) -> GenerateContentRequest<'static> {
        GenerateContentRequest {
            contents,
            generation_config: WireGenerationConfig::from(&self.generation),
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: SAFETY_THRESHOLD,
                })
                .collect(),
        }
    }

    async fn generate(&self, contents: Vec<Content>) -> Result<String, GatewayError> {
        if contents.is_empty() {
            return Err(GatewayError::EmptyRequest);
        }
        let api_key = require_credential(&self.credentials)?;

        debug!(model = %self.settings.model, turns = contents.len(), "Sending Gemini request");
        let response = self
            .http
            .post(self.endpoint())
            .header(API_KEY_HEADER, api_key)
            .json(&self.request(contents))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body: GenerateContentResponse = response.json().await?;
        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .ok_or_else(|| GatewayError::InvalidResponse("response has no candidates".to_string()))?;

        info!(model = %self.settings.model, chars = text.chars().count(), "Gemini reply received");
        Ok(text)
    }
}

/// History as Gemini contents. Gemini requires the first turn to be the
/// user's, so leading assistant turns (the greeting) are skipped.
fn history_contents(history: &[ChatMessage]) -> Vec<Content> {
    history
        .iter()
        .skip_while(|message| message.role == Role::Assistant)
        .map(|message| Content {
            role: wire_role(message.role).to_string(),
            parts: vec![text_part(message.content.clone())],
        })
        .collect()
}

/// A single user turn: every media part first, then the latest text if any
fn multimodal_contents(history: &[ChatMessage], media: &[Attachment]) -> Vec<Content> {
    let mut parts: Vec<Part> = media
        .iter()
        .map(|attachment| Part {
            inline_data: Some(InlineData {
                mime_type: attachment.mime_type().to_string(),
                data: STANDARD.encode(attachment.data()),
            }),
            ..Part::default()
        })
        .collect();

    if let Some(last) = history.last() {
        if !last.content.trim().is_empty() {
            parts.push(text_part(last.content.clone()));
        }
    }

    vec![Content {
        role: wire_role(Role::User).to_string(),
        parts,
    }]
}

#[async_trait]
impl LlmGateway for GeminiGateway {
    fn provider(&self) -> ProviderType {
        ProviderType::Gemini
    }

    async fn send_text(&self, history: &[ChatMessage]) -> Result<String, GatewayError> {
        self.generate(history_contents(history)).await
    }

    async fn send_multimodal(
        &self,
        history: &[ChatMessage],
        media: &[Attachment],
    ) -> Result<String, GatewayError> {
        if media.is_empty() {
            return self.send_text(history).await;
        }
        self.generate(multimodal_contents(history, media)).await
    }
}
