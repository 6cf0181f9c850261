//! # Ingot Framework
//!
//! Plugin lifecycle and event dispatch for the Ingot engine.
//!
//! This crate is the stateful middle of the system:
//!
//! - **Plugin contract** ([`Plugin`], [`Rule`], [`TaskSpec`], [`HookSpec`]):
//!   what a plugin declares and how the engine talks to it. One instance per
//!   event, created from a swappable [`PluginFactory`].
//! - **Module loading** ([`ModuleLoader`], [`discover`]): the collaborator
//!   that turns source locations into factories, and the tree walk that
//!   finds them.
//! - **Plugin registry** ([`PluginRegistry`]): the priority-ordered
//!   descriptor list with load / hot-reload / unload, iterated by dispatch
//!   through consistent snapshots.
//! - **Task scheduler** ([`TaskScheduler`]): cron triggers for
//!   plugin-contributed background jobs, bound once per process lifetime.
//! - **Dispatch pipeline** ([`DispatchPipeline`]): the strict per-event
//!   gauntlet of gates, hooks, and rule matching.
//! - **Reply agent** ([`ReplyAgent`]): the per-event decoration of the
//!   transport send that owns mute refusal, mention prefixing, recall
//!   scheduling, failure absorption, and the send counters.

pub mod dispatch;
pub mod error;
pub mod loader;
pub mod plugin;
pub mod registry;
pub mod reply;
pub mod scheduler;

pub use dispatch::DispatchPipeline;
pub use error::{LoadError, PluginError, PluginResult};
pub use loader::{ModuleLoader, PluginSource, discover};
pub use plugin::{
    AcceptOutcome, ContextOutcome, DEFAULT_PRIORITY, HookSpec, InitOutcome, Permission, Plugin,
    PluginFactory, Rule, RuleOutcome, TaskFn, TaskSpec, factory,
};
pub use registry::{PluginDescriptor, PluginRegistry};
pub use reply::{AtTarget, ReplyAgent, ReplyOptions};
pub use scheduler::TaskScheduler;

/// Prelude for plugin authors.
pub mod prelude {
    pub use super::error::{PluginError, PluginResult};
    pub use super::plugin::{
        AcceptOutcome, ContextOutcome, HookSpec, InitOutcome, Permission, Plugin, Rule,
        RuleOutcome, TaskSpec, factory,
    };
    pub use super::reply::{AtTarget, ReplyAgent, ReplyOptions};
    pub use ingot_core::prelude::*;
}
