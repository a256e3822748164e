//! Error types for AutoZoom persistent state.

use thiserror::Error;

pub type StateResult<T> = Result<T, StateError>;

/// A failed state operation. Nothing is retried; callers decide.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("cannot open state database: {0}")]
    Open(String),

    #[error("state transaction failed: {0}")]
    Transaction(String),

    #[error("cannot open entries table: {0}")]
    Table(String),

    #[error("cannot read entry: {0}")]
    Read(String),

    #[error("cannot write entry: {0}")]
    Write(String),

    #[error("cannot encode options: {0}")]
    Serialize(String),

    #[error("cannot decode options: {0}")]
    Deserialize(String),

    /// Failure reported by a non-redb `KeyValueStore` implementation.
    #[error("storage backend failed: {0}")]
    Backend(String),
}

/// `map_err` closure turning any `Display` error into the given variant.
macro_rules! map_err {
    ($variant:ident) => {
        |e| $crate::error::StateError::$variant(e.to_string())
    };
}
