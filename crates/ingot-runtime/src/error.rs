//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use crate::watcher::WatchError;

/// Errors from host orchestration.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration loading or validation failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The hot-reload watcher failed.
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// A required collaborator was not supplied to the builder.
    #[error("host builder is missing {0}")]
    MissingCollaborator(&'static str),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
