//! Per-event reply agent.
//!
//! Dispatch wraps the transport's native send once per event. The wrapper
//! is where all reply policy lives: mute refusal, mention prefixing,
//! delayed recall, failure absorption, and the send counters. Rule
//! handlers only ever see this agent, never the raw transport.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Local};
use tracing::{error, warn};

use ingot_core::{
    AccessSettings, BotSettings, Context, CounterStore, MessageReceipt, OutSegment,
    OutboundMessage, Transport, truncate,
};

/// Counter keys live this long after their last increment.
const COUNTER_TTL: Duration = Duration::from_secs(30 * 24 * 3600);

/// Mention target for [`ReplyOptions::at`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AtTarget {
    /// No mention prefix.
    #[default]
    None,
    /// Mention the sender of the event.
    Sender,
    /// Mention a specific user.
    User(i64),
}

/// Options for one reply.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplyOptions {
    /// Quote the triggering message.
    pub quote: bool,
    /// Recall the reply after this many seconds; 0 keeps it.
    pub recall_after_secs: u64,
    /// Mention to prefix the reply with (groups only).
    pub at: AtTarget,
}

/// The scoped reply decoration for one event.
pub struct ReplyAgent {
    transport: Arc<dyn Transport>,
    counters: Arc<dyn CounterStore>,
    forward_send_errors: bool,
    masters: Vec<i64>,
    group_id: Option<i64>,
    user_id: Option<i64>,
    event_message_id: Option<String>,
    is_group: bool,
    is_guild: bool,
    muted: bool,
    sender_card: String,
}

impl ReplyAgent {
    /// Binds a reply agent to one event.
    pub fn new(
        ctx: &Context,
        transport: Arc<dyn Transport>,
        counters: Arc<dyn CounterStore>,
        bot: &BotSettings,
        access: &AccessSettings,
    ) -> Self {
        Self {
            transport,
            counters,
            forward_send_errors: bot.forward_send_errors,
            masters: access.masters.clone(),
            group_id: ctx.event.group_id,
            user_id: ctx.event.user_id,
            event_message_id: ctx.event.message_id.clone(),
            is_group: ctx.is_group,
            is_guild: ctx.is_guild,
            muted: ctx.is_group && ctx.event.group_mute_left > 0,
            sender_card: ctx.sender_card.clone(),
        }
    }

    /// Sends a reply with default options.
    pub async fn send(&self, message: impl Into<OutboundMessage> + Send) -> Option<MessageReceipt> {
        self.send_with(message, ReplyOptions::default()).await
    }

    /// Sends a reply.
    ///
    /// Returns the transport receipt, or `None` when the reply was refused
    /// (empty payload, active mute) or the transport failed. Failures are
    /// logged here and never propagate into dispatch.
    pub async fn send_with(
        &self,
        message: impl Into<OutboundMessage> + Send,
        options: ReplyOptions,
    ) -> Option<MessageReceipt> {
        let mut message = message.into();
        if message.is_empty() {
            return None;
        }
        if self.muted {
            return None;
        }

        if options.quote {
            message.quote = self.event_message_id.clone();
        }

        if self.is_group && options.at != AtTarget::None {
            if let Some((target, display)) = self.resolve_mention(options.at).await {
                message.prepend(OutSegment::Text("\n".into()));
                message.prepend(OutSegment::At { target, display });
            }
        }

        let screenshot = message.has_rendered_image();
        let result = match (self.group_id, self.user_id) {
            (Some(group_id), _) if self.is_group => {
                self.transport.send_group(group_id, message.clone()).await
            }
            (_, Some(user_id)) => self.transport.send_private(user_id, message.clone()).await,
            _ => {
                self.record_counters(screenshot);
                return None;
            }
        };

        let receipt = match result {
            Ok(receipt) => Some(receipt),
            Err(err) => {
                error!(
                    error = %err,
                    message = %message.preview(300),
                    "failed to send reply"
                );
                if self.forward_send_errors {
                    self.forward_failure(&message).await;
                }
                None
            }
        };

        if let Some(receipt) = &receipt {
            if !self.is_guild && options.recall_after_secs > 0 {
                self.arm_recall(receipt.message_id.clone(), options.recall_after_secs);
            }
        }

        self.record_counters(screenshot);
        receipt
    }

    async fn resolve_mention(&self, at: AtTarget) -> Option<(String, String)> {
        match at {
            AtTarget::None => None,
            AtTarget::Sender => {
                let user_id = self.user_id?;
                Some((user_id.to_string(), truncate(&self.sender_card, 10)))
            }
            AtTarget::User(user_id) => {
                let display = match self.group_id {
                    Some(group_id) => self
                        .transport
                        .member_display_name(group_id, user_id)
                        .await
                        .unwrap_or_default(),
                    None => String::new(),
                };
                Some((user_id.to_string(), truncate(&display, 10)))
            }
        }
    }

    async fn forward_failure(&self, message: &OutboundMessage) {
        let Some(&master) = self.masters.first() else {
            return;
        };
        let notice =
            OutboundMessage::text(format!("failed to send reply: {}", message.preview(300)));
        if let Err(err) = self.transport.send_private(master, notice).await {
            warn!(error = %err, "could not forward send failure to master");
        }
    }

    fn arm_recall(&self, message_id: String, after_secs: u64) {
        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(after_secs)).await;
            if let Err(err) = transport.recall(&message_id).await {
                warn!(message_id = %message_id, error = %err, "scheduled recall failed");
            }
        });
    }

    fn record_counters(&self, screenshot: bool) {
        self.save_count("send_msg", None);
        if screenshot {
            self.save_count("screenshot", None);
        }
        if let Some(group_id) = self.group_id {
            self.save_count("send_msg", Some(group_id));
            if screenshot {
                self.save_count("screenshot", Some(group_id));
            }
        }
    }

    fn save_count(&self, metric: &str, group_id: Option<i64>) {
        let now = Local::now();
        let day = now.format("%m%d");
        self.counters
            .incr(&format!("{metric}:day:{day}"), group_id, Some(COUNTER_TTL));
        self.counters.incr(
            &format!("{metric}:month:{}", now.month()),
            group_id,
            Some(COUNTER_TTL),
        );
        if group_id.is_none() {
            self.counters.incr(&format!("{metric}:total"), None, None);
        }
    }
}
