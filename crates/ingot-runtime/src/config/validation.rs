//! Configuration validation.

use regex::Regex;
use std::collections::HashSet;
use tracing::warn;

use super::error::{ConfigError, ConfigResult};
use super::schema::HostConfig;

/// Validates a loaded configuration.
///
/// Hard errors: an empty plugin directory, a dialect with an empty or
/// unparsable trigger, duplicate dialect names, a group key that is not a
/// numeric id. Suspicious-but-legal values only warn.
pub fn validate_config(config: &HostConfig) -> ConfigResult<()> {
    if config.plugins.dir.as_os_str().is_empty() {
        return Err(ConfigError::validation("plugins.dir must not be empty"));
    }

    let mut seen = HashSet::new();
    for dialect in &config.dialects {
        if dialect.name.is_empty() {
            return Err(ConfigError::validation("dialect name must not be empty"));
        }
        if !seen.insert(dialect.name.as_str()) {
            return Err(ConfigError::validation(format!(
                "duplicate dialect name: {}",
                dialect.name
            )));
        }
        if let Err(err) = Regex::new(&dialect.trigger) {
            return Err(ConfigError::validation(format!(
                "dialect '{}' has an invalid trigger: {err}",
                dialect.name
            )));
        }
    }

    for key in config.groups.keys() {
        if key.parse::<i64>().is_err() {
            return Err(ConfigError::validation(format!(
                "group key '{key}' is not a numeric id"
            )));
        }
    }

    if config.access.masters.is_empty() {
        warn!("no master users configured; master-only rules can never fire");
    }

    Ok(())
}
