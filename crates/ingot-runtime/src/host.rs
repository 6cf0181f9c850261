//! Host orchestration.
//!
//! [`Host`] wires the engine together: registry, scheduler, dispatch
//! pipeline, and (optionally) the hot-reload watcher. The transport and
//! module loader are supplied by the embedding application; config and
//! counters have in-memory defaults.
//!
//! ```rust,ignore
//! use ingot_runtime::Host;
//!
//! #[tokio::main]
//! async fn main() -> ingot_runtime::RuntimeResult<()> {
//!     let host = Host::builder()
//!         .config(ConfigLoader::new().with_current_dir().load()?)
//!         .transport(my_transport)
//!         .module_loader(my_loader)
//!         .build()?;
//!     host.start().await?;
//!
//!     // Feed transport events into the pipeline:
//!     // host.handle_event(event).await;
//!
//!     host.run_until_shutdown().await;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::info;

use ingot_core::{ConfigProvider, CooldownStore, CounterStore, HookRegistry, RawEvent, Transport};
use ingot_framework::{DispatchPipeline, ModuleLoader, PluginRegistry, TaskScheduler};

use crate::config::{HostConfig, StaticConfig, validate_config};
use crate::counters::MemoryCounters;
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use crate::watcher::HotReloadWatcher;

/// The assembled dispatch host.
pub struct Host {
    config: StaticConfig,
    hooks: Arc<HookRegistry>,
    scheduler: Arc<TaskScheduler>,
    registry: Arc<PluginRegistry>,
    pipeline: DispatchPipeline,
    watcher: Mutex<Option<HotReloadWatcher>>,
    watch: bool,
}

impl Host {
    /// Creates a builder.
    pub fn builder() -> HostBuilder {
        HostBuilder::default()
    }

    /// Loads plugins, activates scheduled tasks, and starts the hot-reload
    /// watcher when enabled.
    pub async fn start(&self) -> RuntimeResult<()> {
        self.registry.load(false).await;
        self.scheduler.activate();

        if self.watch {
            let mut watcher = HotReloadWatcher::new(Arc::clone(&self.registry)).with_arm_delay(
                self.config
                    .with(|c| Duration::from_secs(c.plugins.watch_arm_delay_secs)),
            );
            watcher.start()?;
            watcher.run().await?;
            *self.watcher.lock() = Some(watcher);
        }

        info!(
            plugins = self.registry.len(),
            tasks = self.scheduler.collected(),
            watching = self.watch,
            "host started"
        );
        Ok(())
    }

    /// Runs one inbound event through the dispatch pipeline.
    pub async fn handle_event(&self, event: RawEvent) {
        self.pipeline.dispatch(event).await;
    }

    /// Forces a full registry refresh.
    pub async fn refresh(&self) {
        self.registry.load(true).await;
        self.scheduler.activate();
    }

    /// The plugin registry.
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// The hook registry.
    pub fn hooks(&self) -> &Arc<HookRegistry> {
        &self.hooks
    }

    /// The task scheduler.
    pub fn scheduler(&self) -> &Arc<TaskScheduler> {
        &self.scheduler
    }

    /// The live configuration handle.
    pub fn config(&self) -> &StaticConfig {
        &self.config
    }

    /// Blocks until ctrl-c, then shuts down.
    pub async fn run_until_shutdown(&self) {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
        self.shutdown();
    }

    /// Stops the watcher and aborts scheduled tasks.
    pub fn shutdown(&self) {
        if let Some(watcher) = self.watcher.lock().as_mut() {
            watcher.stop();
        }
        self.scheduler.shutdown();
        info!("host stopped");
    }
}

/// Builder for [`Host`].
#[derive(Default)]
pub struct HostBuilder {
    config: Option<HostConfig>,
    transport: Option<Arc<dyn Transport>>,
    loader: Option<Arc<dyn ModuleLoader>>,
    counters: Option<Arc<dyn CounterStore>>,
    init_logging: bool,
}

impl HostBuilder {
    /// Sets the host configuration (defaults otherwise).
    pub fn config(mut self, config: HostConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the transport collaborator (required).
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the module loader collaborator (required).
    pub fn module_loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Sets the counter store (in-memory by default).
    pub fn counters(mut self, counters: Arc<dyn CounterStore>) -> Self {
        self.counters = Some(counters);
        self
    }

    /// Also initialize logging from the configuration.
    pub fn with_logging(mut self) -> Self {
        self.init_logging = true;
        self
    }

    /// Validates the configuration and assembles the host.
    pub fn build(self) -> RuntimeResult<Host> {
        let transport = self
            .transport
            .ok_or(RuntimeError::MissingCollaborator("a transport"))?;
        let loader = self
            .loader
            .ok_or(RuntimeError::MissingCollaborator("a module loader"))?;

        let config = self.config.unwrap_or_default();
        validate_config(&config)?;
        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        let counters = self
            .counters
            .unwrap_or_else(|| Arc::new(MemoryCounters::new()));
        let watch = config.plugins.watch;
        let plugin_dir = config.plugins.dir.clone();
        let provider = StaticConfig::new(config);

        let hooks = Arc::new(HookRegistry::new());
        let scheduler = Arc::new(TaskScheduler::new());
        let registry = Arc::new(PluginRegistry::new(
            plugin_dir,
            loader,
            Arc::clone(&hooks),
            Arc::clone(&scheduler),
            Arc::clone(&counters),
            Arc::new(provider.clone()) as Arc<dyn ConfigProvider>,
        ));
        let pipeline = DispatchPipeline::new(
            Arc::clone(&registry),
            CooldownStore::new(),
            transport,
            Arc::new(provider.clone()) as Arc<dyn ConfigProvider>,
            counters,
        );

        Ok(Host {
            config: provider,
            hooks,
            scheduler,
            registry,
            pipeline,
            watcher: Mutex::new(None),
            watch,
        })
    }
}
