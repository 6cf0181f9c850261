//! Transport collaborator interface.
//!
//! The engine never talks to a protocol client directly; everything it
//! needs from the wire is behind this narrow trait: identity, the two send
//! primitives, recall, and a best-effort member-name lookup used when
//! prefixing replies with a mention.

use async_trait::async_trait;

use super::message::{MessageReceipt, OutboundMessage};
use crate::foundation::{BotIdentity, SendResult};

/// Interface to the underlying message transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Identity of the bot account this transport is connected as.
    fn identity(&self) -> BotIdentity;

    /// Sends a message into a group conversation.
    async fn send_group(
        &self,
        group_id: i64,
        message: OutboundMessage,
    ) -> SendResult<MessageReceipt>;

    /// Sends a private message to a user.
    async fn send_private(
        &self,
        user_id: i64,
        message: OutboundMessage,
    ) -> SendResult<MessageReceipt>;

    /// Recalls a previously sent message by id.
    async fn recall(&self, message_id: &str) -> SendResult<()>;

    /// Resolves a member's display name in a group, when available.
    async fn member_display_name(&self, _group_id: i64, _user_id: i64) -> Option<String> {
        None
    }
}
