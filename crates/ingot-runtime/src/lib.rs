//! # Ingot Runtime
//!
//! Orchestration layer for the Ingot dispatch engine.
//!
//! This crate provides:
//! - Configuration loading and validation (`figment`-backed, TOML/YAML)
//! - Logging setup (`tracing` + `tracing-subscriber`)
//! - The hot-reload watcher over the plugin tree (`notify`-backed)
//! - An in-memory counter store
//! - [`Host`], the assembly of registry, scheduler, pipeline, and watcher
//!
//! ```ignore
//! use ingot_runtime::{ConfigLoader, Host};
//!
//! #[tokio::main]
//! async fn main() -> ingot_runtime::RuntimeResult<()> {
//!     let config = ConfigLoader::new().with_current_dir().load()?;
//!     let host = Host::builder()
//!         .config(config)
//!         .with_logging()
//!         .transport(transport)
//!         .module_loader(loader)
//!         .build()?;
//!     host.start().await?;
//!     host.run_until_shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod counters;
pub mod error;
pub mod host;
pub mod logging;
pub mod watcher;

// Re-exports
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, HostConfig, LogFormat, LogLevel, LogOutput,
    LoggingConfig, PluginTreeConfig, StaticConfig, load_config, load_config_from_file,
    validate_config,
};
pub use counters::MemoryCounters;
pub use error::{RuntimeError, RuntimeResult};
pub use host::{Host, HostBuilder};
pub use logging::LoggingBuilder;
pub use watcher::{HotReloadWatcher, WatchError};

// Re-export tracing for embedders
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// Provides the common logging macros alongside the host types.
pub mod prelude {
    pub use crate::host::Host;
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
