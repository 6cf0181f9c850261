//! Outbound message types.

use serde_json::json;

use crate::foundation::truncate;

/// Where an outbound image comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// Reference by URL; the transport downloads it.
    Url(String),
    /// Locally rendered bytes (a generated card, chart, screenshot).
    Bytes(Vec<u8>),
}

/// One segment of an outbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum OutSegment {
    /// Plain text.
    Text(String),
    /// An @-mention with a display name to render next to it.
    At {
        /// Stringified target id.
        target: String,
        /// Display name shown with the mention.
        display: String,
    },
    /// An image.
    Image(ImageSource),
}

/// An outbound message as handed to the transport.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutboundMessage {
    /// Segments in send order.
    pub segments: Vec<OutSegment>,
    /// Message id to quote, when this is a quoting reply.
    pub quote: Option<String>,
}

impl OutboundMessage {
    /// Creates a plain-text message.
    pub fn text(s: impl Into<String>) -> Self {
        Self {
            segments: vec![OutSegment::Text(s.into())],
            quote: None,
        }
    }

    /// Creates a message from an image source.
    pub fn image(source: ImageSource) -> Self {
        Self {
            segments: vec![OutSegment::Image(source)],
            quote: None,
        }
    }

    /// Whether the message has no segments (empty messages are never sent).
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
            || self
                .segments
                .iter()
                .all(|s| matches!(s, OutSegment::Text(t) if t.is_empty()))
    }

    /// Whether any segment carries locally rendered image bytes.
    pub fn has_rendered_image(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, OutSegment::Image(ImageSource::Bytes(_))))
    }

    /// Inserts a segment at the front (used for mention prefixes).
    pub fn prepend(&mut self, segment: OutSegment) {
        self.segments.insert(0, segment);
    }

    /// A log-safe preview, truncated to `max` characters. Image bytes are
    /// elided so a failed screenshot send never dumps a buffer into the log.
    pub fn preview(&self, max: usize) -> String {
        let rendered: Vec<_> = self
            .segments
            .iter()
            .map(|s| match s {
                OutSegment::Text(t) => json!({"type": "text", "text": t}),
                OutSegment::At { target, display } => {
                    json!({"type": "at", "target": target, "display": display})
                }
                OutSegment::Image(ImageSource::Url(url)) => json!({"type": "image", "url": url}),
                OutSegment::Image(ImageSource::Bytes(bytes)) => {
                    json!({"type": "image", "bytes": bytes.len()})
                }
            })
            .collect();
        truncate(&serde_json::to_string(&rendered).unwrap_or_default(), max)
    }
}

impl From<&str> for OutboundMessage {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<String> for OutboundMessage {
    fn from(s: String) -> Self {
        Self::text(s)
    }
}

/// Receipt returned by the transport for a delivered message.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageReceipt {
    /// Transport message id, usable for recall.
    pub message_id: String,
}
