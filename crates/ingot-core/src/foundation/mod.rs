//! Foundation layer: event model, per-event context, and core error types.

pub mod context;
pub mod error;
pub mod event;
pub mod text;

pub use context::{BotIdentity, Context, FileRef};
pub use error::{HookError, HookResult, SendError, SendResult};
pub use event::{EventFilter, EventKind, MemberRole, RawEvent, Segment, Sender};
pub use text::truncate;
