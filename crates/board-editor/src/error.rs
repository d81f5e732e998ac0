//! Error types for the interaction engine.

use board_core::error::{DocumentError, SceneError};
use thiserror::Error;

/// A save or load through a [`crate::persistence::PersistenceBackend`]
/// failed. The in-memory scene is never rolled back on this error.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("nothing has been saved yet")]
    Missing,
    #[error("backend: {0}")]
    Backend(String),
}

/// Clipboard text that could not be turned back into elements.
#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported clipboard format {found:?}")]
    Format { found: String },
    #[error("unsupported clipboard version {found} (newest known is {supported})")]
    Version { found: u32, supported: u32 },
}

/// Anything the engine's public operations can fail with.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
}
