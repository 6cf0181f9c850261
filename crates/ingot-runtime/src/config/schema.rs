//! Configuration schema definitions.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use ingot_core::{AccessSettings, BotSettings, DialectSettings, GroupSettings};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HostConfig {
    /// Global bot behaviour switches.
    #[serde(default)]
    pub bot: BotSettings,

    /// Allow/deny lists and master users.
    #[serde(default)]
    pub access: AccessSettings,

    /// Settings applied to groups without an explicit entry.
    #[serde(default)]
    pub default_group: GroupSettings,

    /// Per-group overrides, keyed by stringified group id.
    #[serde(default)]
    pub groups: HashMap<String, GroupSettings>,

    /// Alternate command dialects.
    #[serde(default)]
    pub dialects: Vec<DialectSettings>,

    /// Plugin tree settings.
    #[serde(default)]
    pub plugins: PluginTreeConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where plugins live and how their tree is watched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginTreeConfig {
    /// Root directory of the plugin tree.
    #[serde(default = "default_plugin_dir")]
    pub dir: PathBuf,

    /// Watch the tree and hot-reload on changes.
    #[serde(default = "default_watch")]
    pub watch: bool,

    /// Seconds to wait after watch start before reacting to new files
    /// (avoids importing files still being written).
    #[serde(default = "default_arm_delay")]
    pub watch_arm_delay_secs: u64,
}

impl Default for PluginTreeConfig {
    fn default() -> Self {
        Self {
            dir: default_plugin_dir(),
            watch: default_watch(),
            watch_arm_delay_secs: default_arm_delay(),
        }
    }
}

fn default_plugin_dir() -> PathBuf {
    PathBuf::from("plugins")
}

fn default_watch() -> bool {
    true
}

fn default_arm_delay() -> u64 {
    10
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level (default).
    #[default]
    Info,
    /// Warn level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the lowercase level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Compact single-line output (default).
    #[default]
    Compact,
    /// Full fmt output.
    Full,
    /// Multi-line pretty output.
    Pretty,
    /// JSON lines (requires the `json-log` feature).
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// Standard output (default).
    #[default]
    Stdout,
    /// Standard error.
    Stderr,
    /// A log file (see [`LoggingConfig::file_path`]).
    File,
}

/// Logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base level.
    #[serde(default)]
    pub level: LogLevel,

    /// Line format.
    #[serde(default)]
    pub format: LogFormat,

    /// Destination.
    #[serde(default)]
    pub output: LogOutput,

    /// Log file path, for [`LogOutput::File`].
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Per-module level overrides (`module → level`).
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

impl HostConfig {
    /// Resolves the settings for a group id.
    pub fn group_settings(&self, group_id: Option<i64>) -> GroupSettings {
        group_id
            .and_then(|id| self.groups.get(&id.to_string()))
            .cloned()
            .unwrap_or_else(|| self.default_group.clone())
    }
}
