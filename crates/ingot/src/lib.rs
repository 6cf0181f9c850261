//! # Ingot
//!
//! An event dispatch and plugin lifecycle engine for chat-message
//! processing hosts.
//!
//! ## Overview
//!
//! Ingot routes every inbound message/notice/request event through a
//! deterministic pipeline of filters, rate limiters, and pattern-matched
//! handlers — exactly one of which is allowed to win per event — while the
//! plugins contributing those handlers stay hot-reloadable at runtime.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐  events  ┌────────────────────┐  in priority order  ┌─────────┐
//! │ Transport │─────────▶│  Dispatch pipeline │────────────────────▶│ Plugins │
//! │ (yours)   │◀─────────│  gates → hooks →   │                     │ (rules, │
//! └───────────┘  replies │  rules             │                     │  tasks, │
//!                        └────────────────────┘                     │  hooks) │
//!                              ▲                                    └─────────┘
//!                  ┌───────────┴───────────┐
//!                  │ Plugin registry       │◀── hot-reload watcher
//!                  │ (priority-ordered)    │◀── module loader (yours)
//!                  └───────────────────────┘
//! ```
//!
//! - **ingot-core**: event model, per-event context, hook registry,
//!   cooldown store, collaborator traits
//! - **ingot-framework**: plugin contract, registry, task scheduler,
//!   dispatch pipeline, reply agent
//! - **ingot-runtime**: configuration, logging, hot reload, the [`Host`]
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use ingot::prelude::*;
//!
//! struct Greeter;
//!
//! #[async_trait::async_trait]
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
//!         _handler: &str,
//!         ctx: &mut Context,
//!         reply: &ReplyAgent,
//!     ) -> PluginResult<RuleOutcome> {
//!         reply.send(format!("hello, {}", ctx.sender_card)).await;
//!         Ok(RuleOutcome::Handled)
//!     }
//! }
//! ```
//!
//! [`Host`]: ingot_runtime::Host

pub use ingot_core as core;
pub use ingot_framework as framework;
pub use ingot_runtime as runtime;

/// Prelude module for convenient imports.
pub mod prelude {
    // Host - main entry point
    pub use ingot_runtime::{ConfigLoader, Host, HostConfig};

    // Plugin contract - the primary unit of event handling
    pub use ingot_framework::{
        AcceptOutcome, ContextOutcome, HookSpec, InitOutcome, ModuleLoader, Permission, Plugin,
        PluginFactory, PluginResult, PluginSource, Rule, RuleOutcome, TaskSpec, factory,
    };

    // Reply surface handed to handlers
    pub use ingot_framework::{AtTarget, ReplyAgent, ReplyOptions};

    // Event model and context
    pub use ingot_core::{
        Context, EventFilter, EventKind, OutboundMessage, RawEvent, Segment, Sender,
    };

    // Collaborator traits for embedders
    pub use ingot_core::{ConfigProvider, CounterStore, Transport};
}
