//! [`ConfigProvider`] implementation over a loaded [`HostConfig`].

use std::sync::Arc;

use parking_lot::RwLock;

use ingot_core::{AccessSettings, BotSettings, ConfigProvider, DialectSettings, GroupSettings};

use super::schema::HostConfig;

/// A config provider backed by an in-memory [`HostConfig`].
///
/// The inner config can be replaced at runtime with [`replace`](Self::replace);
/// each trait accessor hands out an owned snapshot, so in-flight dispatches
/// keep a consistent view across a swap.
#[derive(Clone)]
pub struct StaticConfig {
    inner: Arc<RwLock<HostConfig>>,
}

impl StaticConfig {
    /// Wraps a loaded configuration.
    pub fn new(config: HostConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Replaces the whole configuration.
    pub fn replace(&self, config: HostConfig) {
        *self.inner.write() = config;
    }

    /// Runs a closure against the current configuration.
    pub fn with<R>(&self, f: impl FnOnce(&HostConfig) -> R) -> R {
        f(&self.inner.read())
    }
}

impl From<HostConfig> for StaticConfig {
    fn from(config: HostConfig) -> Self {
        Self::new(config)
    }
}

impl ConfigProvider for StaticConfig {
    fn bot(&self) -> BotSettings {
        self.inner.read().bot.clone()
    }

    fn group(&self, group_id: Option<i64>) -> GroupSettings {
        self.inner.read().group_settings(group_id)
    }

    fn access(&self) -> AccessSettings {
        self.inner.read().access.clone()
    }

    fn dialects(&self) -> Vec<DialectSettings> {
        self.inner.read().dialects.clone()
    }
}
