//! # Ingot Core
//!
//! Core types and collaborator interfaces for the Ingot dispatch engine.
//!
//! This crate holds everything the higher layers agree on but none of the
//! orchestration:
//!
//! ## Foundation Layer
//!
//! - **Event model**: the typed inbound event and its discriminator triple
//!   ([`RawEvent`], [`EventKind`], [`EventFilter`])
//! - **Context**: the normalized per-event view handed to plugins
//!   ([`Context`])
//! - **Core errors**: [`SendError`], [`HookError`]
//!
//! ## Shared State
//!
//! - **Hook registry**: namespace-scoped cross-plugin extension points
//!   ([`HookRegistry`])
//! - **Cooldown store**: TTL flags backing the rate-limit gate
//!   ([`CooldownStore`])
//!
//! ## Integration Layer
//!
//! Narrow traits for the external collaborators: [`Transport`],
//! [`ConfigProvider`], [`CounterStore`], plus the outbound message types.
//!
//! ```text
//! ┌───────────┐   events   ┌────────────────────┐   rules/hooks   ┌─────────┐
//! │ Transport │───────────▶│  Dispatch pipeline │────────────────▶│ Plugins │
//! │           │◀───────────│  (ingot-framework) │                 └─────────┘
//! └───────────┘   replies  └────────────────────┘
//! ```

pub mod cooldown;
pub mod foundation;
pub mod hooks;
pub mod integration;

// Re-export foundation types
pub use foundation::{
    BotIdentity, Context, EventFilter, EventKind, FileRef, HookError, HookResult, MemberRole,
    RawEvent, Segment, SendError, SendResult, Sender, truncate,
};

// Re-export shared state
pub use cooldown::{CooldownStore, DEFAULT_DEDUPE_WINDOW};
pub use hooks::{HookFn, HookRegistry};

// Re-export integration types
pub use integration::{
    AccessSettings, AttentionMode, BotSettings, ConfigProvider, CounterStore, DialectSettings,
    GroupSettings, ImageSource, MessageReceipt, OutSegment, OutboundMessage, Transport,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::cooldown::CooldownStore;
    pub use super::foundation::*;
    pub use super::hooks::{HookFn, HookRegistry};
    pub use super::integration::*;
}
