//! Error kinds surfaced by the shredding engine.

use thiserror::Error;

use crate::types::EraserState;

pub type Result<T> = std::result::Result<T, ShredError>;

#[derive(Debug, Error)]
pub enum ShredError {
    /// Path is empty, or neither a regular file nor a directory.
    #[error("invalid path: {0:?}")]
    InvalidPath(String),

    /// The cache is coherent and already contains the submitted path.
    #[error("path already submitted: {0:?}")]
    AlreadyPresent(String),

    /// A work-list store operation failed.
    #[error("work-list store: {0}")]
    Store(#[from] rusqlite::Error),

    /// File could not be opened for raw write after two attempts.
    #[error("unable to open {path:?} for overwrite")]
    Open { path: String },

    /// Write, seek or rename failure during a shred.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// An eraser operation was invoked out of order.
    #[error("operation not valid in eraser state {0:?}")]
    InvalidState(EraserState),
}
