//! Framework error types.

use thiserror::Error;

/// Errors from importing a plugin module.
///
/// Load errors are always isolated to their source: the registry logs them
/// (or, for [`MissingDependency`](LoadError::MissingDependency), batches
/// them into one actionable report) and keeps loading everything else.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The module needs a package that is not installed. Collected across
    /// the whole load and reported as a single "install these" batch.
    #[error("missing package dependency: {package}")]
    MissingDependency {
        /// Name of the missing package.
        package: String,
    },

    /// The module could not be imported for any other reason.
    #[error("failed to import module '{module}': {reason}")]
    Import {
        /// Source key of the failing module.
        module: String,
        /// Decoded failure description.
        reason: String,
    },

    /// Filesystem error while walking the plugin tree.
    #[error("plugin discovery I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    /// Creates an import error for the given source key.
    pub fn import(module: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Import {
            module: module.into(),
            reason: reason.into(),
        }
    }
}

/// Boxed error type for plugin-authored code (rule handlers, task actions,
/// init hooks). Always absorbed by the engine and terminal only for the
/// current event or task fire.
pub type PluginError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for plugin-authored code.
pub type PluginResult<T> = Result<T, PluginError>;
