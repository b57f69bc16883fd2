use thiserror::Error;

#[derive(Debug, Error)]
#[allow(clippy::enum_variant_names)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Path error: {message}")]
    PathError { message: String },

    #[error("Invalid storage key: {key}")]
    InvalidKey { key: String },

    #[error("Invalid data: {message}")]
    InvalidData { message: String },
}

pub type StorageResult<T> = Result<T, StorageError>;
