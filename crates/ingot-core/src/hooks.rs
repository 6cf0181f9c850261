//! Namespace-scoped hook registry.
//!
//! Hooks are the cross-plugin extension mechanism, distinct from rule
//! matching: a plugin exposes a capability under a key (`"render.profile"`,
//! `"lookup.uid"`, …) and other plugins call it without knowing who
//! provides it. Multiple providers may register under the same key; they
//! are tried in ascending priority order and the first one that accepts
//! wins.
//!
//! Registrations are keyed by `(namespace, key)` — re-adding the same pair
//! replaces the previous entry, which is what makes hot reload idempotent.
//!
//! ```rust,ignore
//! registry.add("weather-pack", "render.card", 500, hook_fn);
//! let value = registry.call("render.card", ctx, json!({"city": "Oslo"})).await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::foundation::{Context, HookError, HookResult};

/// A type-erased hook function.
///
/// Receives the current event context and a JSON payload; returns a JSON
/// value on success, or [`HookError::Declined`] to pass the call on to the
/// next provider.
pub type HookFn =
    Arc<dyn Fn(Context, Value) -> BoxFuture<'static, HookResult<Value>> + Send + Sync>;

struct HookEntry {
    namespace: String,
    priority: i32,
    hook: HookFn,
}

/// Ordered table of hook registrations, keyed by hook key.
#[derive(Default)]
pub struct HookRegistry {
    entries: RwLock<HashMap<String, Vec<HookEntry>>>,
}

impl HookRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a hook under `(namespace, key)` with the given priority.
    ///
    /// An existing entry for the same `(namespace, key)` is replaced.
    /// Entries for one key are kept sorted ascending by priority; among
    /// equal priorities, earlier registrations stay first.
    pub fn add(
        &self,
        namespace: impl Into<String>,
        key: impl Into<String>,
        priority: i32,
        hook: HookFn,
    ) {
        let namespace = namespace.into();
        let key = key.into();
        let mut entries = self.entries.write();
        let list = entries.entry(key.clone()).or_default();
        list.retain(|e| e.namespace != namespace);
        let pos = list.partition_point(|e| e.priority <= priority);
        list.insert(
            pos,
            HookEntry {
                namespace: namespace.clone(),
                priority,
                hook,
            },
        );
        debug!(namespace = %namespace, key = %key, priority, "hook registered");
    }

    /// Removes the hook registered under `(namespace, key)`.
    ///
    /// Returns `true` when an entry was removed.
    pub fn remove(&self, namespace: &str, key: &str) -> bool {
        let mut entries = self.entries.write();
        let Some(list) = entries.get_mut(key) else {
            return false;
        };
        let before = list.len();
        list.retain(|e| e.namespace != namespace);
        let removed = list.len() != before;
        if list.is_empty() {
            entries.remove(key);
        }
        if removed {
            debug!(namespace = %namespace, key = %key, "hook removed");
        }
        removed
    }

    /// Whether any hook is registered under `key`.
    pub fn has(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Number of hooks registered under `key`.
    pub fn count(&self, key: &str) -> usize {
        self.entries.read().get(key).map_or(0, Vec::len)
    }

    /// Invokes the hooks registered under `key` in ascending priority order.
    ///
    /// The first hook returning `Ok` wins. A hook that errors (declines or
    /// fails) is skipped and the next provider is tried; the last error is
    /// returned when every provider errors.
    pub async fn call(&self, key: &str, ctx: Context, payload: Value) -> HookResult<Value> {
        let hooks: Vec<(String, HookFn)> = {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(list) => list
                    .iter()
                    .map(|e| (e.namespace.clone(), Arc::clone(&e.hook)))
                    .collect(),
                None => return Err(HookError::NoHook(key.to_owned())),
            }
        };

        let mut last_err = HookError::NoHook(key.to_owned());
        for (namespace, hook) in hooks {
            match hook(ctx.clone(), payload.clone()).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    debug!(namespace = %namespace, key = %key, error = %err, "hook did not take the call");
                    last_err = err;
                }
            }
        }
        Err(last_err)
    }
}
