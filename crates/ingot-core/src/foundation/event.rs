//! Inbound event model.
//!
//! Every event delivered by the transport collaborator is one [`RawEvent`]:
//! a typed envelope carrying the three-level discriminator triple
//! (`kind.detail.sub_type`), the message segments, and the sender snapshot.
//!
//! Plugins scope themselves to events through [`EventFilter`], a dotted
//! expression matched against [`RawEvent::discriminators`]:
//!
//! ```rust,ignore
//! use ingot_core::EventFilter;
//!
//! let filter = EventFilter::new("message.group");
//! assert!(filter.matches(&group_message));
//!
//! // `*` wildcards a single level
//! let filter = EventFilter::new("notice.*.poke");
//! ```

use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// Event Kind
// ============================================================================

/// Top-level classification of an inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Message events (private messages, group messages, guild messages).
    #[default]
    Message,
    /// Notice events (recalls, mutes, member changes, pokes).
    Notice,
    /// Request events (friend requests, group join requests).
    Request,
}

impl EventKind {
    /// Returns the wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Message => "message",
            EventKind::Notice => "notice",
            EventKind::Request => "request",
        }
    }
}

impl FromStr for EventKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "message" => Ok(EventKind::Message),
            "notice" => Ok(EventKind::Notice),
            "request" => Ok(EventKind::Request),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Message Segments
// ============================================================================

/// One segment of an inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    /// Plain text.
    Text {
        /// The text content.
        text: String,
    },
    /// An image attachment, referenced by URL.
    Image {
        /// Download URL of the image.
        url: String,
    },
    /// An @-mention. `qq` is the numeric account id; `id` is the
    /// channel-space (guild) identifier when the platform uses one.
    At {
        /// Numeric account id of the mentioned user.
        #[serde(default)]
        qq: Option<i64>,
        /// Channel-space identifier of the mentioned user.
        #[serde(default)]
        id: Option<String>,
    },
    /// A file attachment.
    File {
        /// Display name of the file.
        name: String,
        /// Transport file id, usable for later download.
        fid: String,
    },
    /// Embedded XML payload.
    Xml {
        /// The raw XML data.
        data: String,
    },
    /// Embedded JSON payload.
    Json {
        /// The raw JSON data.
        data: String,
    },
}

// ============================================================================
// Sender
// ============================================================================

/// Group role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    /// Group owner.
    Owner,
    /// Group administrator.
    Admin,
    /// Ordinary member.
    Member,
}

/// Sender snapshot attached to an event by the transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sender {
    /// Group display name (falls back to `nickname` when unset).
    #[serde(default)]
    pub card: Option<String>,
    /// Account nickname.
    #[serde(default)]
    pub nickname: Option<String>,
    /// Group role, when known. `None` means the member data has not been
    /// loaded yet; permission checks treat that as "try again later".
    #[serde(default)]
    pub role: Option<MemberRole>,
}

// ============================================================================
// RawEvent
// ============================================================================

/// A typed inbound event as delivered by the transport collaborator.
///
/// The `(kind, detail, sub_type)` triple forms the discriminator path that
/// [`EventFilter`] expressions match against — e.g. a group message is
/// `message.group.normal`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEvent {
    /// Unix timestamp of the event.
    #[serde(default)]
    pub time: i64,
    /// Account id of the receiving bot.
    #[serde(default)]
    pub self_id: i64,
    /// Top-level event kind.
    #[serde(default)]
    pub kind: EventKind,
    /// Second discriminator level: message/notice/request type
    /// (`"private"`, `"group"`, `"friend"`, …).
    #[serde(default)]
    pub detail: String,
    /// Third discriminator level.
    #[serde(default)]
    pub sub_type: String,
    /// Conversation-space marker; `"guild"` for channel-space events.
    #[serde(default)]
    pub detail_type: Option<String>,
    /// Sending user id.
    #[serde(default)]
    pub user_id: Option<i64>,
    /// Group id, for group-scoped events.
    #[serde(default)]
    pub group_id: Option<i64>,
    /// Group display name, when the transport resolves it.
    #[serde(default)]
    pub group_name: Option<String>,
    /// Transport message id, usable for quoting and recall.
    #[serde(default)]
    pub message_id: Option<String>,
    /// The unparsed message text, used for duplicate detection.
    #[serde(default)]
    pub raw_message: String,
    /// Parsed message segments. Empty for non-message events.
    #[serde(default)]
    pub message: Vec<Segment>,
    /// Sender snapshot.
    #[serde(default)]
    pub sender: Option<Sender>,
    /// Seconds the bot remains muted in this group; 0 when not muted.
    #[serde(default)]
    pub group_mute_left: u64,
}

impl RawEvent {
    /// Returns the `[kind, detail, sub_type]` discriminator triple.
    pub fn discriminators(&self) -> [&str; 3] {
        [self.kind.as_str(), &self.detail, &self.sub_type]
    }

    /// Whether this event originates from a channel space.
    pub fn is_guild(&self) -> bool {
        self.detail_type.as_deref() == Some("guild")
    }

    /// Whether this is a private-conversation event.
    pub fn is_private(&self) -> bool {
        matches!(
            (self.kind, self.detail.as_str()),
            (EventKind::Message, "private") | (EventKind::Notice, "friend")
        )
    }

    /// Whether this is a group-conversation event.
    pub fn is_group(&self) -> bool {
        matches!(self.kind, EventKind::Message | EventKind::Notice) && self.detail == "group"
    }

    /// Whether this event carries message segments.
    pub fn has_message(&self) -> bool {
        !self.message.is_empty()
    }
}

// ============================================================================
// EventFilter
// ============================================================================

/// A dotted event-scope expression (`kind.detail.sub_type`).
///
/// Each segment must equal the corresponding discriminator, with `*`
/// wildcarding a single level. Shorter expressions match a prefix: the
/// filter `"message"` matches every message event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    raw: String,
    segments: Vec<String>,
}

impl EventFilter {
    /// Creates a filter from a dotted expression.
    pub fn new(expr: impl Into<String>) -> Self {
        let raw = expr.into();
        let segments = raw.split('.').map(str::to_owned).collect();
        Self { raw, segments }
    }

    /// Returns the original expression.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Tests this filter against an event's discriminator triple.
    pub fn matches(&self, event: &RawEvent) -> bool {
        let discriminators = event.discriminators();
        self.segments.iter().enumerate().all(|(i, segment)| {
            segment == "*" || discriminators.get(i).is_some_and(|d| d == segment)
        })
    }
}

impl std::fmt::Display for EventFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for EventFilter {
    fn from(expr: &str) -> Self {
        Self::new(expr)
    }
}
