//! Configuration module for the Ingot runtime.

pub mod error;
pub mod loader;
pub mod provider;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, load_config, load_config_from_file};
pub use provider::StaticConfig;
pub use schema::{HostConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, PluginTreeConfig};
pub use validation::validate_config;
