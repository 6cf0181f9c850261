//! The plugin contract.
//!
//! A plugin is the unit that contributes rules, scheduled tasks, and hooks.
//! One instance is created per inbound event for every registered plugin
//! whose static gates pass, used for that event only, and dropped when
//! dispatch completes. State a plugin wants to keep across events lives in
//! whatever its factory closure captures (an `Arc` of its own making) — the
//! engine provides no cross-event storage.
//!
//! # Lifecycle
//!
//! At load time the registry calls the factory once to read metadata
//! (`name`, `priority`, `tasks`, `hooks`) and runs [`Plugin::init`]; a
//! plugin may answer [`InitOutcome::Skip`] to stay unregistered (feature
//! probe failed, config says off). After that the factory is invoked per
//! event.
//!
//! # Minimal plugin
//!
//! ```rust,ignore
//! struct Greeter;
//!
//! #[async_trait]
//! impl Plugin for Greeter {
//!     fn name(&self) -> &str {
//!         "greeter"
//!     }
//!
//!     fn rules(&self) -> Vec<Rule> {
//!         vec![Rule::new(r"^#hello$", "hello")]
//!     }
//!
//!     async fn handle(
//!         &mut self,
//!         handler: &str,
//!         ctx: &mut Context,
//!         reply: &ReplyAgent,
//!     ) -> PluginResult<RuleOutcome> {
//!         match handler {
//!             "hello" => {
//!                 reply.send(format!("hello, {}", ctx.sender_card)).await;
//!                 Ok(RuleOutcome::Handled)
//!             }
//!             _ => Ok(RuleOutcome::Pass),
//!         }
//!     }
//! }
//! ```

pub mod rule;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use ingot_core::{Context, EventFilter, HookFn};

use crate::error::PluginResult;
use crate::reply::ReplyAgent;

pub use rule::{Permission, Rule};

/// Priority assigned when a plugin does not declare one. Lower runs first.
pub const DEFAULT_PRIORITY: i32 = 5000;

/// Result of [`Plugin::init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// Register the plugin.
    Ready,
    /// Leave the plugin unregistered; not an error.
    Skip,
}

/// Result of [`Plugin::poll_context`], the pre-rule conversational check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextOutcome {
    /// No pending conversational state; try the next candidate.
    Idle,
    /// Had pending state but chose to let the event through.
    Continue,
    /// The event belongs to an ongoing conversation and has been fully
    /// handled; dispatch stops here.
    Claimed,
}

/// Result of [`Plugin::accept`], the pre-rule interception point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// Not interested; try the next candidate's accept hook.
    Pass,
    /// Claimed the pre-processing slot. No further accept hooks run, but
    /// rule matching still proceeds for this event.
    Take,
    /// The event is fully handled; dispatch stops immediately.
    Halt,
}

/// Result of a rule handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    /// The event was handled: cooldowns are committed and no further rule
    /// or plugin is tried.
    Handled,
    /// Explicitly not handled; matching continues with the next rule.
    Pass,
}

/// A cron task contributed by a plugin at load time.
#[derive(Clone)]
pub struct TaskSpec {
    /// Task name, used in logs.
    pub name: String,
    /// Cron expression (5-field crontab or 6/7-field with seconds).
    pub cron: String,
    /// Log each fire's start and completion.
    pub log: bool,
    /// The action to run on each fire.
    pub run: TaskFn,
}

/// A type-erased task action.
pub type TaskFn = Arc<dyn Fn() -> BoxFuture<'static, PluginResult<()>> + Send + Sync>;

impl TaskSpec {
    /// Creates a task spec.
    pub fn new(name: impl Into<String>, cron: impl Into<String>, run: TaskFn) -> Self {
        Self {
            name: name.into(),
            cron: cron.into(),
            log: false,
            run,
        }
    }

    /// Enables fire logging for this task.
    pub fn logged(mut self) -> Self {
        self.log = true;
        self
    }
}

impl std::fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSpec")
            .field("name", &self.name)
            .field("cron", &self.cron)
            .field("log", &self.log)
            .finish()
    }
}

/// A hook registration contributed by a plugin at load time.
#[derive(Clone)]
pub struct HookSpec {
    /// Hook key other plugins call this capability under.
    pub key: String,
    /// Registration priority; defaults to the plugin's priority.
    pub priority: Option<i32>,
    /// The hook function.
    pub hook: HookFn,
}

impl HookSpec {
    /// Creates a hook spec at the plugin's default priority.
    pub fn new(key: impl Into<String>, hook: HookFn) -> Self {
        Self {
            key: key.into(),
            priority: None,
            hook,
        }
    }

    /// Overrides the registration priority.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// The contract every plugin implements.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Plugin name, used for logs and the per-group enable/disable filter.
    fn name(&self) -> &str;

    /// Evaluation priority; lower runs first.
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// Hook namespace; defaults to the source key the plugin loaded from.
    fn namespace(&self) -> Option<&str> {
        None
    }

    /// Event scope this plugin participates in.
    fn event_scope(&self) -> EventFilter {
        EventFilter::new("message")
    }

    /// Declared rules, in evaluation order.
    fn rules(&self) -> Vec<Rule> {
        Vec::new()
    }

    /// Cron tasks to collect at load time.
    fn tasks(&self) -> Vec<TaskSpec> {
        Vec::new()
    }

    /// Hook registrations to install at load time.
    fn hooks(&self) -> Vec<HookSpec> {
        Vec::new()
    }

    /// One-time initialization at load. Return [`InitOutcome::Skip`] to
    /// leave this plugin unregistered; an error is logged and also skips
    /// registration.
    async fn init(&mut self) -> PluginResult<InitOutcome> {
        Ok(InitOutcome::Ready)
    }

    /// Pre-rule conversational check. A plugin holding state for this
    /// conversation may claim the event before any rule runs.
    async fn poll_context(&mut self, _ctx: &mut Context, _reply: &ReplyAgent) -> ContextOutcome {
        ContextOutcome::Idle
    }

    /// Pre-rule interception point; at most one plugin's accept takes
    /// effect per event.
    async fn accept(&mut self, _ctx: &mut Context, _reply: &ReplyAgent) -> AcceptOutcome {
        AcceptOutcome::Pass
    }

    /// Dispatches a matched rule to the named handler.
    ///
    /// Anything other than `Ok(RuleOutcome::Pass)` ends rule evaluation for
    /// this event: `Handled` commits cooldowns, `Err` is logged and stops
    /// dispatch without retry.
    async fn handle(
        &mut self,
        _handler: &str,
        _ctx: &mut Context,
        _reply: &ReplyAgent,
    ) -> PluginResult<RuleOutcome> {
        Ok(RuleOutcome::Pass)
    }
}

/// Factory producing a fresh plugin instance.
///
/// This is the replaceable indirection hot reload swaps: the registry keeps
/// an `Arc` of the factory, and a reload installs a new one without touching
/// any dispatch snapshot already in flight.
pub type PluginFactory = Arc<dyn Fn() -> Box<dyn Plugin> + Send + Sync>;

/// Wraps a plain constructor closure into a [`PluginFactory`].
pub fn factory<P, F>(f: F) -> PluginFactory
where
    P: Plugin + 'static,
    F: Fn() -> P + Send + Sync + 'static,
{
    Arc::new(move || Box::new(f()))
}
