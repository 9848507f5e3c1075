//! Errors raised while sampling and persisting a running system.

use animus_core::error::AnimusError;
use thiserror::Error;

/// Persistence and configuration failures.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML error: {0}")]
    Toml(String),
    #[error("unknown serializer '{0}'")]
    UnknownSerializer(String),
    #[error("serializer '{serializer}' cannot write {sample} samples")]
    Incompatible { serializer: String, sample: String },
    #[error("rule '{0}' has a stride of zero")]
    InvalidStride(String),
    #[error(transparent)]
    Animus(#[from] AnimusError),
}

impl From<toml::de::Error> for PersistError {
    fn from(e: toml::de::Error) -> Self {
        PersistError::Toml(e.to_string())
    }
}
