use crate::config::ConfigPathError;
use crate::storage::StorageError;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    ConfigPath(#[from] ConfigPathError),
    #[error("failed to encode report")]
    Encode(#[from] serde_json::Error),
    #[error("unknown command: {0:?}")]
    UnknownCommand(String),
    #[error("invalid theme value: {0:?} (expected \"dark\" or \"light\")")]
    InvalidTheme(String),
    #[error("theme preference was not persisted under {key}")]
    NotPersisted { key: String },
}
