pub mod settings_json_repository;

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::repositories::{StorageError, StorageResult};

pub use settings_json_repository::SettingsJsonRepository;

/// Directory name under the platform config dir
pub const APP_DIR_NAME: &str = "chatdesk";

pub const DEFAULT_GREETING: &str = "Hi, I'm your AI assistant. How can I help you today?";

/// Remote model providers the gateway can talk to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    Gemini,
    #[serde(rename = "deepseek")]
    DeepSeek,
}

impl ProviderType {
    pub fn display_name(&self) -> &str {
        match self {
            ProviderType::Gemini => "Google Gemini",
            ProviderType::DeepSeek => "DeepSeek",
        }
    }

    /// Storage key of this provider's API key in the secrets namespace
    pub fn credential_key(&self) -> &'static str {
        match self {
            ProviderType::Gemini => "gemini-api-key",
            ProviderType::DeepSeek => "deepseek-api-key",
        }
    }

    /// Whether images and videos are actually transmitted
    pub fn supports_media(&self) -> bool {
        match self {
            ProviderType::Gemini => true,
            ProviderType::DeepSeek => false,
        }
    }

    fn default_settings(&self) -> ProviderSettings {
        match self {
            ProviderType::Gemini => ProviderSettings {
                model: "gemini-1.5-pro".to_string(),
                base_url: "https://generativelanguage.googleapis.com".to_string(),
            },
            ProviderType::DeepSeek => ProviderSettings {
                model: "deepseek-chat".to_string(),
                base_url: "https://api.deepseek.com".to_string(),
            },
        }
    }
}

impl FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(ProviderType::Gemini),
            "deepseek" => Ok(ProviderType::DeepSeek),
            other => Err(format!("unknown provider '{}' (expected gemini or deepseek)", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub model: String,
    pub base_url: String,
}

/// Sampling parameters sent with every request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 2048,
        }
    }
}

fn default_gemini() -> ProviderSettings {
    ProviderType::Gemini.default_settings()
}

fn default_deepseek() -> ProviderSettings {
    ProviderType::DeepSeek.default_settings()
}

fn default_provider() -> ProviderType {
    ProviderType::Gemini
}

fn default_greeting() -> String {
    DEFAULT_GREETING.to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatSettings {
    #[serde(default = "default_provider")]
    pub provider: ProviderType,
    #[serde(default = "default_gemini")]
    pub gemini: ProviderSettings,
    #[serde(default = "default_deepseek")]
    pub deepseek: ProviderSettings,
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Unset means the HTTP client's own behaviour applies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            gemini: default_gemini(),
            deepseek: default_deepseek(),
            generation: GenerationConfig::default(),
            request_timeout_secs: None,
            greeting: default_greeting(),
        }
    }
}

impl ChatSettings {
    /// Settings of the active provider
    pub fn provider_settings(&self) -> &ProviderSettings {
        self.settings_for(self.provider)
    }

    pub fn settings_for(&self, provider: ProviderType) -> &ProviderSettings {
        match provider {
            ProviderType::Gemini => &self.gemini,
            ProviderType::DeepSeek => &self.deepseek,
        }
    }
}

/// `<config_dir>/chatdesk`, the root of settings, conversations and secrets
pub fn default_data_dir() -> StorageResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| StorageError::PathError {
            message: "Cannot determine config directory".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_generation_config() {
        let settings = ChatSettings::default();
        assert_eq!(settings.provider, ProviderType::Gemini);
        assert_eq!(settings.generation.temperature, 0.7);
        assert_eq!(settings.generation.top_k, 40);
        assert_eq!(settings.generation.top_p, 0.95);
        assert_eq!(settings.generation.max_output_tokens, 2048);
        assert_eq!(settings.request_timeout_secs, None);
        assert_eq!(settings.provider_settings().model, "gemini-1.5-pro");
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let settings: ChatSettings =
            serde_json::from_str(r#"{"provider": "deepseek", "generation": {"temperature": 0.2}}"#)
                .unwrap();
        assert_eq!(settings.provider, ProviderType::DeepSeek);
        assert_eq!(settings.provider_settings().model, "deepseek-chat");
        assert_eq!(settings.generation.temperature, 0.2);
        assert_eq!(settings.generation.max_output_tokens, 2048);
        assert_eq!(settings.greeting, DEFAULT_GREETING);
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("Gemini".parse::<ProviderType>(), Ok(ProviderType::Gemini));
        assert_eq!("deepseek".parse::<ProviderType>(), Ok(ProviderType::DeepSeek));
        assert!("openai".parse::<ProviderType>().is_err());
    }

    #[test]
    fn test_only_gemini_receives_media() {
        assert!(ProviderType::Gemini.supports_media());
        assert!(!ProviderType::DeepSeek.supports_media());
    }

    #[test]
    fn test_credential_keys_are_distinct() {
        assert_ne!(
            ProviderType::Gemini.credential_key(),
            ProviderType::DeepSeek.credential_key()
        );
    }
}
