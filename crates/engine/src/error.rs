use recordbox_core::{CoreError, EntityId, ValidationError};
use recordbox_storage::StorageError;
use thiserror::Error;

use crate::conflict::ConflictWarning;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("entity not found: {0}")]
    NotFound(EntityId),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("conflict: {0}")]
    Conflict(ConflictWarning),

    #[error("import rejected at record {index}: {reason}")]
    ImportRejected { index: usize, reason: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("logging error: {0}")]
    Logging(String),
}
