//! Plugin registry: discovery, load, hot reload, unload.
//!
//! The registry owns the priority-ordered descriptor list that dispatch
//! iterates. Mutations (load, reload, unload) happen under a write lock;
//! dispatch takes a cheap cloned snapshot under a read lock, so an
//! in-flight event sees either the pre-mutation or post-mutation list,
//! never a torn one.
//!
//! Loading is failure-isolated per source: one module's import error never
//! blocks another's registration. Imports that fail with a missing-package
//! signature are collected across the whole load and reported once as an
//! actionable batch instead of as individual stack dumps.

use std::path::PathBuf;
use std::sync::Arc;

use futures::future;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use ingot_core::{ConfigProvider, CounterStore, HookRegistry};

use crate::error::LoadError;
use crate::loader::{ModuleLoader, PluginSource, discover};
use crate::plugin::{InitOutcome, PluginFactory};
use crate::scheduler::TaskScheduler;

/// A registered plugin: the stable identity plus the swappable factory.
///
/// `factory` and `priority` are replaced in place on hot reload; `hook_keys`
/// records the `(namespace, key)` hook registrations made at load so unload
/// and reload can retract them without re-instantiating the plugin.
#[derive(Clone)]
pub struct PluginDescriptor {
    /// Source key this plugin was loaded from.
    pub key: String,
    /// Plugin name.
    pub name: String,
    /// Evaluation priority; the registry keeps itself sorted by this.
    pub priority: i32,
    /// Factory producing the per-event instance.
    pub factory: PluginFactory,
    /// Hook registrations owned by this descriptor.
    pub hook_keys: Vec<(String, String)>,
}

impl std::fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish()
    }
}

/// The plugin registry.
pub struct PluginRegistry {
    root: PathBuf,
    loader: Arc<dyn ModuleLoader>,
    hooks: Arc<HookRegistry>,
    scheduler: Arc<TaskScheduler>,
    counters: Arc<dyn CounterStore>,
    config: Arc<dyn ConfigProvider>,
    descriptors: RwLock<Vec<PluginDescriptor>>,
}

impl PluginRegistry {
    /// Creates a registry rooted at the given plugin directory.
    pub fn new(
        root: impl Into<PathBuf>,
        loader: Arc<dyn ModuleLoader>,
        hooks: Arc<HookRegistry>,
        scheduler: Arc<TaskScheduler>,
        counters: Arc<dyn CounterStore>,
        config: Arc<dyn ConfigProvider>,
    ) -> Self {
        Self {
            root: root.into(),
            loader,
            hooks,
            scheduler,
            counters,
            config,
            descriptors: RwLock::new(Vec::new()),
        }
    }

    /// The plugin root directory.
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// The module loader collaborator.
    pub fn loader(&self) -> &Arc<dyn ModuleLoader> {
        &self.loader
    }

    /// Walks the plugin tree and returns the loadable sources.
    pub async fn discover(&self) -> Vec<PluginSource> {
        match discover(&self.root, self.loader.as_ref()).await {
            Ok(sources) => sources,
            Err(err) => {
                warn!(root = %self.root.display(), error = %err, "plugin discovery failed");
                Vec::new()
            }
        }
    }

    /// Loads every discovered source.
    ///
    /// Idempotent unless `refresh` is set or nothing is registered yet.
    /// Fan-out is serial or concurrent per the `serial_load` setting;
    /// either way, one source's failure never blocks another.
    pub async fn load(&self, refresh: bool) {
        if refresh {
            self.descriptors.write().clear();
        } else if !self.descriptors.read().is_empty() {
            return;
        }

        self.counters.reset("send_msg:total", None);
        self.counters.reset("screenshot:total", None);

        let sources = self.discover().await;
        info!(root = %self.root.display(), sources = sources.len(), "loading plugins");

        let missing: Mutex<Vec<(String, String)>> = Mutex::new(Vec::new());
        if self.config.bot().serial_load {
            for source in &sources {
                self.import_source(source, Some(&missing)).await;
            }
        } else {
            future::join_all(
                sources
                    .iter()
                    .map(|source| self.import_source(source, Some(&missing))),
            )
            .await;
        }

        self.report_missing(missing.into_inner());
        self.sort();

        info!(
            plugins = self.descriptors.read().len(),
            tasks = self.scheduler.collected(),
            "plugin load complete"
        );
    }

    /// Imports a single source (the watcher's "add" path) and re-sorts.
    pub async fn load_source(&self, source: &PluginSource) {
        self.import_source(source, None).await;
        self.sort();
    }

    /// Re-imports `key` and swaps the matching descriptors' factories and
    /// priorities in place. Hook registrations are replaced: the old
    /// `(namespace, key)` entries are retracted, the new ones installed.
    pub async fn reload(&self, key: &str) {
        let source = PluginSource::new(key, self.root.join(key));
        let factories = match self.loader.load_module(&source).await {
            Ok(factories) => factories,
            Err(err) => {
                error!(source = %key, error = %err, "failed to reload plugin");
                return;
            }
        };

        for factory in factories {
            let plugin = factory();
            let name = plugin.name().to_owned();
            let namespace = plugin.namespace().unwrap_or(key).to_owned();
            let priority = plugin.priority();
            let hooks = plugin.hooks();

            let mut descriptors = self.descriptors.write();
            let Some(descriptor) = descriptors
                .iter_mut()
                .find(|d| d.key == key && d.name == name)
            else {
                continue;
            };

            for (ns, hook_key) in descriptor.hook_keys.drain(..) {
                self.hooks.remove(&ns, &hook_key);
            }
            let mut hook_keys = Vec::with_capacity(hooks.len());
            for spec in hooks {
                let hook_priority = spec.priority.unwrap_or(priority);
                self.hooks
                    .add(namespace.clone(), spec.key.clone(), hook_priority, spec.hook);
                hook_keys.push((namespace.clone(), spec.key));
            }

            descriptor.factory = factory;
            descriptor.priority = priority;
            descriptor.hook_keys = hook_keys;
            info!(source = %key, plugin = %name, priority, "plugin reloaded");
        }

        self.sort();
    }

    /// Removes every descriptor loaded from `key`, retracting their hook
    /// registrations.
    pub fn unload(&self, key: &str) {
        let removed: Vec<PluginDescriptor> = {
            let mut descriptors = self.descriptors.write();
            let (gone, kept) = descriptors.drain(..).partition(|d| d.key == key);
            *descriptors = kept;
            gone
        };

        for descriptor in &removed {
            for (ns, hook_key) in &descriptor.hook_keys {
                self.hooks.remove(ns, hook_key);
            }
            info!(source = %key, plugin = %descriptor.name, "plugin unloaded");
        }
    }

    /// A snapshot of the current descriptor list, in priority order.
    pub fn snapshot(&self) -> Vec<PluginDescriptor> {
        self.descriptors.read().clone()
    }

    /// Number of registered plugins.
    pub fn len(&self) -> usize {
        self.descriptors.read().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.descriptors.read().is_empty()
    }

    async fn import_source(
        &self,
        source: &PluginSource,
        missing: Option<&Mutex<Vec<(String, String)>>>,
    ) {
        match self.loader.load_module(source).await {
            Ok(factories) => {
                for factory in factories {
                    if let Err(err) = self.install(source, factory).await {
                        error!(source = %source.key, error = %err, "failed to register plugin");
                    }
                }
            }
            Err(LoadError::MissingDependency { package }) if missing.is_some() => {
                if let Some(missing) = missing {
                    missing.lock().push((source.key.clone(), package));
                }
            }
            Err(err) => {
                error!(source = %source.key, error = %err, "failed to import plugin module");
            }
        }
    }

    async fn install(
        &self,
        source: &PluginSource,
        factory: PluginFactory,
    ) -> crate::error::PluginResult<()> {
        let mut plugin = factory();
        debug!(source = %source.key, plugin = %plugin.name(), "loading plugin");

        match plugin.init().await? {
            InitOutcome::Skip => {
                debug!(source = %source.key, plugin = %plugin.name(), "plugin skipped by init");
                return Ok(());
            }
            InitOutcome::Ready => {}
        }

        self.scheduler.collect(plugin.tasks());

        let name = plugin.name().to_owned();
        let priority = plugin.priority();
        let namespace = plugin.namespace().unwrap_or(&source.key).to_owned();
        let mut hook_keys = Vec::new();
        for spec in plugin.hooks() {
            let hook_priority = spec.priority.unwrap_or(priority);
            self.hooks
                .add(namespace.clone(), spec.key.clone(), hook_priority, spec.hook);
            hook_keys.push((namespace.clone(), spec.key));
        }

        let descriptor = PluginDescriptor {
            key: source.key.clone(),
            name,
            priority,
            factory,
            hook_keys,
        };

        let mut descriptors = self.descriptors.write();
        match descriptors
            .iter_mut()
            .find(|d| d.key == descriptor.key && d.name == descriptor.name)
        {
            // A `(key, name)` pair never has two live entries.
            Some(existing) => *existing = descriptor,
            None => descriptors.push(descriptor),
        }
        Ok(())
    }

    fn report_missing(&self, missing: Vec<(String, String)>) {
        if missing.is_empty() {
            return;
        }
        warn!("-------- plugin load errors --------");
        for (source, package) in &missing {
            warn!(source = %source, package = %package, "missing package dependency");
        }
        warn!("install the packages above, then reload the affected plugins");
    }

    fn sort(&self) {
        // Stable sort: equal priorities keep registration order.
        self.descriptors.write().sort_by_key(|d| d.priority);
    }
}
