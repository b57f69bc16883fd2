use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("API key not configured for {provider}")]
    MissingCredential { provider: String },

    #[error("provider returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("no messages to send")]
    EmptyRequest,
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::InvalidResponse(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}
