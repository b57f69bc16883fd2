use thiserror::Error;

use crate::services::attachment_validation::ValidationError;
use crate::services::gateway::GatewayError;

/// Errors surfaced to the user-facing flow.
///
/// None of these are fatal: every variant leaves the conversation store in a
/// consistent state and is meant to be shown as a notification.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("An API key is required before messages can be sent")]
    AuthRequired,

    #[error("LLM request failed{}: {message}", status_suffix(.status))]
    Gateway { status: Option<u16>, message: String },

    #[error("Conversation not found: {0}")]
    NotFound(String),

    #[error("Nothing to send: the message is empty and has no attachments")]
    EmptyTurn,
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|code| format!(" with status {}", code))
        .unwrap_or_default()
}

impl From<GatewayError> for ChatError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::MissingCredential { .. } => ChatError::AuthRequired,
            GatewayError::Status { status, message } => ChatError::Gateway {
                status: Some(status),
                message,
            },
            other => ChatError::Gateway {
                status: None,
                message: other.to_string(),
            },
        }
    }
}

pub type ChatResult<T> = Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credential_maps_to_auth_required() {
        let err: ChatError = GatewayError::MissingCredential {
            provider: "Google Gemini".to_string(),
        }
        .into();
        assert!(matches!(err, ChatError::AuthRequired));
    }

    #[test]
    fn test_status_error_keeps_status_code() {
        let err: ChatError = GatewayError::Status {
            status: 429,
            message: "quota exceeded".to_string(),
        }
        .into();
        match &err {
            ChatError::Gateway { status, message } => {
                assert_eq!(*status, Some(429));
                assert_eq!(message, "quota exceeded");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(
            err.to_string(),
            "LLM request failed with status 429: quota exceeded"
        );
    }

    #[test]
    fn test_transport_error_has_no_status() {
        let err: ChatError = GatewayError::Transport("connection reset".to_string()).into();
        match err {
            ChatError::Gateway { status, message } => {
                assert_eq!(status, None);
                assert!(message.contains("connection reset"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
