//! Normalized per-event context.
//!
//! A [`Context`] is derived from a [`RawEvent`] once per inbound event by
//! [`Context::from_event`] and discarded when dispatch completes. It carries
//! the flattened message text, mention/attachment extractions, conversation
//! classification, and the log prefix used by rule logging.
//!
//! The dialect discriminant is a plain field with a pure projection
//! ([`Context::is_dialect`]); it is tagged by the dispatch pipeline when an
//! alternate command dialect is canonicalized, and stays `None` for the
//! primary dialect.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use super::event::{RawEvent, Segment};
use super::text::truncate;

/// Leading full-width/variant command markers are canonicalized so one rule
/// pattern covers every way users type the prefix.
static HASH_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[＃井#]+\s*").expect("valid prefix pattern"));
static STAR_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[\\*※＊]+\s*").expect("valid prefix pattern"));

/// Identity of the receiving bot, used to resolve self-mentions.
#[derive(Debug, Clone, Default)]
pub struct BotIdentity {
    /// Numeric account id.
    pub self_id: i64,
    /// Alternate channel-space id, when the platform assigns one.
    pub alt_id: Option<String>,
}

/// A received file attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRef {
    /// Display name.
    pub name: String,
    /// Transport file id.
    pub fid: String,
}

/// The normalized view of one inbound event.
#[derive(Debug, Clone)]
pub struct Context {
    /// The underlying transport event.
    pub event: Arc<RawEvent>,
    /// Concatenated, prefix-canonicalized message text.
    pub msg: String,
    /// Image URLs in message order.
    pub img: Vec<String>,
    /// Last non-self mention target, stringified.
    pub at: Option<String>,
    /// Whether the bot itself was mentioned.
    pub at_bot: bool,
    /// File attachment, if any.
    pub file: Option<FileRef>,
    /// Private-conversation event.
    pub is_private: bool,
    /// Group-conversation event.
    pub is_group: bool,
    /// Channel-space event.
    pub is_guild: bool,
    /// Sender is a configured master user.
    pub is_master: bool,
    /// The message started with a configured bot alias (now stripped).
    pub has_alias: bool,
    /// Sender display name (group card, falling back to nickname).
    pub sender_card: String,
    /// Sender nickname.
    pub sender_nickname: String,
    /// Log prefix identifying the conversation and sender.
    pub log_text: String,
    /// Alternate command dialect this event was normalized from;
    /// `None` for the primary dialect.
    pub dialect: Option<String>,
}

impl Context {
    /// Builds the normalized context for one event.
    ///
    /// `masters` is the configured master-user list and `aliases` the
    /// per-group bot alias list (an alias prefix is stripped from the
    /// message and remembered in [`has_alias`](Self::has_alias)).
    pub fn from_event(
        event: Arc<RawEvent>,
        identity: &BotIdentity,
        masters: &[i64],
        aliases: &[String],
    ) -> Self {
        let mut msg = String::new();
        let mut img = Vec::new();
        let mut at = None;
        let mut at_bot = false;
        let mut file = None;

        for segment in &event.message {
            match segment {
                Segment::Text { text } => msg.push_str(&canonicalize_prefix(text)),
                Segment::Image { url } => img.push(url.clone()),
                Segment::At { qq, id } => {
                    if *qq == Some(identity.self_id) {
                        at_bot = true;
                    } else if id.is_some() && *id == identity.alt_id {
                        at_bot = true;
                    } else if let Some(id) = id {
                        // Multiple mentions: the last one wins.
                        at = Some(id.clone());
                    } else if let Some(qq) = qq {
                        at = Some(qq.to_string());
                    }
                }
                Segment::File { name, fid } => {
                    file = Some(FileRef {
                        name: name.clone(),
                        fid: fid.clone(),
                    });
                }
                Segment::Xml { data } | Segment::Json { data } => msg.push_str(data),
            }
        }

        let is_private = event.is_private();
        let is_group = event.is_group();
        let is_guild = !is_group && event.is_guild();

        let sender = event.sender.clone().unwrap_or_default();
        let sender_nickname = sender.nickname.clone().unwrap_or_default();
        let sender_card = if is_private {
            sender_nickname.clone()
        } else {
            sender.card.or(sender.nickname).unwrap_or_default()
        };

        let log_text = if is_private {
            format!(
                "[private][{}({})]",
                sender_nickname,
                event.user_id.unwrap_or_default()
            )
        } else if is_group {
            format!(
                "[{}({})]",
                event.group_name.as_deref().unwrap_or_default(),
                sender_card
            )
        } else {
            String::new()
        };

        let is_master = event
            .user_id
            .is_some_and(|user_id| masters.contains(&user_id));

        let mut has_alias = false;
        if is_group && !msg.is_empty() {
            for alias in aliases {
                if alias.is_empty() {
                    continue;
                }
                if let Some(rest) = msg.strip_prefix(alias.as_str()) {
                    msg = rest.trim().to_owned();
                    has_alias = true;
                    break;
                }
            }
        }

        Self {
            event,
            msg,
            img,
            at,
            at_bot,
            file,
            is_private,
            is_group,
            is_guild,
            is_master,
            has_alias,
            sender_card,
            sender_nickname,
            log_text,
            dialect: None,
        }
    }

    /// Whether this event was normalized from the named dialect.
    pub fn is_dialect(&self, name: &str) -> bool {
        self.dialect.as_deref() == Some(name)
    }

    /// A log-safe preview of the message text.
    pub fn msg_preview(&self) -> String {
        truncate(&self.msg, 100)
    }
}

/// Collapses leading command-marker variants to their canonical form.
fn canonicalize_prefix(text: &str) -> String {
    let step = HASH_PREFIX.replace(text, "#");
    STAR_PREFIX.replace(&step, "*").trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::event::{EventKind, Sender};

    fn identity() -> BotIdentity {
        BotIdentity {
            self_id: 10_000,
            alt_id: Some("tiny-1".into()),
        }
    }

    fn group_event(segments: Vec<Segment>) -> Arc<RawEvent> {
        Arc::new(RawEvent {
            kind: EventKind::Message,
            detail: "group".into(),
            sub_type: "normal".into(),
            user_id: Some(42),
            group_id: Some(100),
            group_name: Some("testers".into()),
            sender: Some(Sender {
                card: Some("Card".into()),
                nickname: Some("Nick".into()),
                role: None,
            }),
            message: segments,
            ..Default::default()
        })
    }

    #[test]
    fn text_segments_concatenate_with_prefix_canonicalized() {
        let event = group_event(vec![
            Segment::Text {
                text: " ＃ status".into(),
            },
            Segment::Text {
                text: " now".into(),
            },
        ]);
        let ctx = Context::from_event(event, &identity(), &[], &[]);
        assert_eq!(ctx.msg, "#statusnow");
    }

    #[test]
    fn star_prefix_is_canonicalized() {
        let event = group_event(vec![Segment::Text {
            text: "※roll".into(),
        }]);
        let ctx = Context::from_event(event, &identity(), &[], &[]);
        assert_eq!(ctx.msg, "*roll");
    }

    #[test]
    fn self_mention_sets_at_bot_and_last_other_mention_wins() {
        let event = group_event(vec![
            Segment::At {
                qq: Some(10_000),
                id: None,
            },
            Segment::At {
                qq: Some(1),
                id: None,
            },
            Segment::At {
                qq: Some(2),
                id: None,
            },
        ]);
        let ctx = Context::from_event(event, &identity(), &[], &[]);
        assert!(ctx.at_bot);
        assert_eq!(ctx.at.as_deref(), Some("2"));
    }

    #[test]
    fn alt_id_mention_counts_as_self() {
        let event = group_event(vec![Segment::At {
            qq: None,
            id: Some("tiny-1".into()),
        }]);
        let ctx = Context::from_event(event, &identity(), &[], &[]);
        assert!(ctx.at_bot);
        assert!(ctx.at.is_none());
    }

    #[test]
    fn group_log_text_uses_card() {
        let event = group_event(vec![Segment::Text { text: "hi".into() }]);
        let ctx = Context::from_event(event, &identity(), &[], &[]);
        assert!(ctx.is_group);
        assert_eq!(ctx.log_text, "[testers(Card)]");
    }

    #[test]
    fn private_log_text_uses_nickname() {
        let event = Arc::new(RawEvent {
            kind: EventKind::Message,
            detail: "private".into(),
            user_id: Some(42),
            sender: Some(Sender {
                card: None,
                nickname: Some("Nick".into()),
                role: None,
            }),
            message: vec![Segment::Text { text: "hi".into() }],
            ..Default::default()
        });
        let ctx = Context::from_event(event, &identity(), &[], &[]);
        assert!(ctx.is_private);
        assert_eq!(ctx.sender_card, "Nick");
        assert_eq!(ctx.log_text, "[private][Nick(42)]");
    }

    #[test]
    fn master_flag_follows_list() {
        let event = group_event(vec![Segment::Text { text: "hi".into() }]);
        let ctx = Context::from_event(event.clone(), &identity(), &[42], &[]);
        assert!(ctx.is_master);
        let ctx = Context::from_event(event, &identity(), &[7], &[]);
        assert!(!ctx.is_master);
    }

    #[test]
    fn alias_prefix_is_stripped_once() {
        let event = group_event(vec![Segment::Text {
            text: "botty help me".into(),
        }]);
        let ctx = Context::from_event(
            event,
            &identity(),
            &[],
            &["botty".to_string(), "bo".to_string()],
        );
        assert!(ctx.has_alias);
        assert_eq!(ctx.msg, "help me");
    }

    #[test]
    fn alias_only_applies_in_groups() {
        let event = Arc::new(RawEvent {
            kind: EventKind::Message,
            detail: "private".into(),
            user_id: Some(42),
            message: vec![Segment::Text {
                text: "botty help".into(),
            }],
            ..Default::default()
        });
        let ctx = Context::from_event(event, &identity(), &[], &["botty".to_string()]);
        assert!(!ctx.has_alias);
        assert_eq!(ctx.msg, "botty help");
    }

    #[test]
    fn file_segment_is_captured() {
        let event = group_event(vec![Segment::File {
            name: "notes.txt".into(),
            fid: "f1".into(),
        }]);
        let ctx = Context::from_event(event, &identity(), &[], &[]);
        assert_eq!(
            ctx.file,
            Some(FileRef {
                name: "notes.txt".into(),
                fid: "f1".into()
            })
        );
    }

    #[test]
    fn dialect_projection() {
        let event = group_event(vec![]);
        let mut ctx = Context::from_event(event, &identity(), &[], &[]);
        assert!(!ctx.is_dialect("alt"));
        ctx.dialect = Some("alt".into());
        assert!(ctx.is_dialect("alt"));
        assert!(!ctx.is_dialect("other"));
    }
}
