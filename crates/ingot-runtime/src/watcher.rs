//! Hot-reload watcher for the plugin tree.
//!
//! Watches the registry's plugin root recursively and drives incremental
//! registry updates from a background task:
//!
//! - *modify* on a watched file → [`PluginRegistry::reload`]
//! - *remove* → the file stops reacting to further modifies and is
//!   unloaded; a later *create* re-arms it
//! - *create* → ignored until the arming delay after watch start has
//!   passed (files still being written), then loaded as a fresh source and
//!   watched individually
//!
//! Event routing is a synchronous state machine ([`WatchState`]) separate
//! from the notify plumbing, so the transitions are unit-testable without a
//! real filesystem watcher.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use ingot_framework::{PluginRegistry, PluginSource};

/// Default quiet period before new-file events are honored.
pub const DEFAULT_ARM_DELAY: Duration = Duration::from_secs(10);

/// Errors from the hot-reload watcher.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The underlying filesystem watcher could not be created.
    #[error("failed to create file watcher: {0}")]
    Init(String),

    /// The plugin root could not be watched.
    #[error("failed to watch '{path}': {reason}")]
    Watch {
        /// The path that failed.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// `run` was called before `start`.
    #[error("watcher not started")]
    NotStarted,
}

// =============================================================================
// Routing state machine
// =============================================================================

/// Filesystem event classes the watcher cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FsEventKind {
    Modify,
    Create,
    Remove,
}

/// What the registry should do about a filesystem event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WatchAction {
    Reload(String),
    Unload(String),
    Add(PluginSource),
}

/// Per-file watch state: `unwatched → watching → {changed, removed}`.
pub(crate) struct WatchState {
    root: PathBuf,
    armed_at: Instant,
    arm_delay: Duration,
    /// Source key → still reacting to modify events.
    files: HashMap<String, bool>,
    /// Packs that contain individually watched files. Creates outside these
    /// packs are ignored, as are packs loaded through an entry point.
    packs: HashSet<String>,
}

impl WatchState {
    pub(crate) fn new(root: PathBuf, arm_delay: Duration, now: Instant) -> Self {
        Self {
            root,
            armed_at: now,
            arm_delay,
            files: HashMap::new(),
            packs: HashSet::new(),
        }
    }

    /// Seeds the state from the initially discovered sources.
    pub(crate) fn seed(&mut self, sources: &[PluginSource]) {
        for source in sources {
            if let Some((pack, _)) = source.key.split_once('/') {
                self.packs.insert(pack.to_owned());
                self.files.insert(source.key.clone(), true);
            }
        }
    }

    /// Routes one filesystem event to a registry action.
    pub(crate) fn route(
        &mut self,
        kind: FsEventKind,
        path: &Path,
        recognized: bool,
        now: Instant,
    ) -> Option<WatchAction> {
        let key = self.source_key(path)?;

        match kind {
            FsEventKind::Modify => match self.files.get(&key) {
                Some(true) => Some(WatchAction::Reload(key)),
                _ => None,
            },
            FsEventKind::Remove => match self.files.get_mut(&key) {
                Some(active) if *active => {
                    *active = false;
                    Some(WatchAction::Unload(key))
                }
                _ => None,
            },
            FsEventKind::Create => {
                if now.duration_since(self.armed_at) < self.arm_delay {
                    return None;
                }
                if !recognized {
                    return None;
                }
                let (pack, _) = key.split_once('/')?;
                if !self.packs.contains(pack) {
                    return None;
                }
                match self.files.insert(key.clone(), true) {
                    // An active file recreated in place is a change.
                    Some(true) => Some(WatchAction::Reload(key)),
                    _ => Some(WatchAction::Add(PluginSource::new(key, path))),
                }
            }
        }
    }

    fn source_key(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        // Plugin files live exactly one pack deep.
        if parts.len() != 2 {
            return None;
        }
        Some(parts.join("/"))
    }
}

// =============================================================================
// Watcher
// =============================================================================

/// Watches the plugin tree and applies incremental registry updates.
pub struct HotReloadWatcher {
    registry: Arc<PluginRegistry>,
    arm_delay: Duration,
    watcher: Option<RecommendedWatcher>,
    rx: Option<mpsc::UnboundedReceiver<notify::Result<Event>>>,
}

impl HotReloadWatcher {
    /// Creates a watcher over the registry's plugin root.
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self {
            registry,
            arm_delay: DEFAULT_ARM_DELAY,
            watcher: None,
            rx: None,
        }
    }

    /// Overrides the new-file arming delay.
    pub fn with_arm_delay(mut self, delay: Duration) -> Self {
        self.arm_delay = delay;
        self
    }

    /// Starts watching the plugin root.
    pub fn start(&mut self) -> Result<(), WatchError> {
        let root = self.registry.root().to_path_buf();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )
        .map_err(|e| WatchError::Init(e.to_string()))?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| WatchError::Watch {
                path: root.clone(),
                reason: e.to_string(),
            })?;

        self.watcher = Some(watcher);
        self.rx = Some(rx);
        info!(root = %root.display(), "hot-reload watcher started");
        Ok(())
    }

    /// Stops watching.
    pub fn stop(&mut self) {
        self.watcher = None;
        self.rx = None;
        info!("hot-reload watcher stopped");
    }

    /// Spawns the event loop. Returns after the loop task is running; the
    /// task exits when the watcher is stopped.
    pub async fn run(&mut self) -> Result<(), WatchError> {
        let mut rx = self.rx.take().ok_or(WatchError::NotStarted)?;
        let registry = Arc::clone(&self.registry);

        let mut state = WatchState::new(
            self.registry.root().to_path_buf(),
            self.arm_delay,
            Instant::now(),
        );
        state.seed(&self.registry.discover().await);

        tokio::spawn(async move {
            while let Some(res) = rx.recv().await {
                match res {
                    Ok(event) => {
                        let Some(kind) = classify(&event.kind) else {
                            continue;
                        };
                        for path in &event.paths {
                            let recognized = registry.loader().matches(path);
                            let Some(action) = state.route(kind, path, recognized, Instant::now())
                            else {
                                continue;
                            };
                            apply(&registry, action).await;
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "file watcher error");
                    }
                }
            }
            debug!("hot-reload event loop exited");
        });

        Ok(())
    }
}

fn classify(kind: &EventKind) -> Option<FsEventKind> {
    match kind {
        EventKind::Modify(_) => Some(FsEventKind::Modify),
        EventKind::Create(_) => Some(FsEventKind::Create),
        EventKind::Remove(_) => Some(FsEventKind::Remove),
        _ => None,
    }
}

async fn apply(registry: &PluginRegistry, action: WatchAction) {
    match action {
        WatchAction::Reload(key) => {
            info!(source = %key, "plugin file changed");
            registry.reload(&key).await;
        }
        WatchAction::Unload(key) => {
            info!(source = %key, "plugin file removed");
            registry.unload(&key);
        }
        WatchAction::Add(source) => {
            info!(source = %source.key, "plugin file added");
            registry.load_source(&source).await;
        }
    }
}
