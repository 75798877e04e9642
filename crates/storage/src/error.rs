use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("quota exceeded writing `{key}`: {size} bytes (limit {limit})")]
    QuotaExceeded { key: String, size: usize, limit: usize },
}
