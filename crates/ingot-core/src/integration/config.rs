//! Configuration collaborator interface.
//!
//! The engine reads settings through [`ConfigProvider`]; the structs here
//! are the shapes it consumes. Each accessor returns an owned snapshot so a
//! dispatch in flight sees one consistent view even if the backing store
//! reloads underneath it.

use serde::{Deserialize, Serialize};

/// Global bot behaviour switches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotSettings {
    /// Load plugin modules strictly one after another instead of fanning
    /// out concurrently. Serial mode keeps construction-time side effects
    /// (global hook registration) in a predictable order.
    #[serde(default)]
    pub serial_load: bool,
    /// Forward reply-send failures to the first configured master.
    #[serde(default)]
    pub forward_send_errors: bool,
}

/// When the bot reacts to group messages that don't mention it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttentionMode {
    /// React to everything.
    #[default]
    Off,
    /// Require an alias prefix or an @-mention.
    Required,
    /// Same as [`Required`](Self::Required), but masters are exempt.
    MastersExempt,
}

/// Per-group settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupSettings {
    /// Name prefixes the bot answers to; a matching prefix is stripped
    /// before rule matching.
    #[serde(default)]
    pub bot_alias: Vec<String>,
    /// Group-global cooldown in milliseconds after a handled command;
    /// 0 disables.
    #[serde(default)]
    pub group_global_cd_ms: u64,
    /// Per-member cooldown in milliseconds; 0 disables.
    #[serde(default)]
    pub single_cd_ms: u64,
    /// Attention requirement for this group.
    #[serde(default)]
    pub only_reply_at: AttentionMode,
    /// When non-empty, only plugins named here run in this group.
    #[serde(default)]
    pub enable: Vec<String>,
    /// Plugins named here never run in this group.
    #[serde(default)]
    pub disable: Vec<String>,
}

/// Global allow/deny lists and master users.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessSettings {
    /// Master (superuser) account ids.
    #[serde(default)]
    pub masters: Vec<i64>,
    /// Users whose events are dropped outright.
    #[serde(default)]
    pub black_users: Vec<i64>,
    /// When non-empty, only these users are processed.
    #[serde(default)]
    pub white_users: Vec<i64>,
    /// Groups whose events are dropped outright.
    #[serde(default)]
    pub black_groups: Vec<i64>,
    /// When non-empty, only these groups are processed.
    #[serde(default)]
    pub white_groups: Vec<i64>,
    /// Drop all channel-space (guild) events.
    #[serde(default)]
    pub disable_guild_msg: bool,
}

/// One alternate command dialect.
///
/// A message whose text matches `trigger` is rewritten so the match is
/// replaced by `canonical`, and the event is tagged with `name` — letting
/// one rule set serve several textual conventions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialectSettings {
    /// Dialect tag recorded on the context.
    pub name: String,
    /// Anchored regex matching the dialect's command prefix.
    pub trigger: String,
    /// Canonical prefix substituted for the match.
    pub canonical: String,
}

/// Interface to the configuration store.
pub trait ConfigProvider: Send + Sync {
    /// Global bot switches.
    fn bot(&self) -> BotSettings;

    /// Settings for a group, or the defaults when `group_id` is `None` or
    /// unknown.
    fn group(&self, group_id: Option<i64>) -> GroupSettings;

    /// Allow/deny lists and master users.
    fn access(&self) -> AccessSettings;

    /// Configured command dialects.
    fn dialects(&self) -> Vec<DialectSettings> {
        Vec::new()
    }
}
