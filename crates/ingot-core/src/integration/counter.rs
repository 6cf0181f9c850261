//! Counter collaborator interface.

use std::time::Duration;

/// Interface to the persistent counters store.
///
/// Metrics are plain string keys (`"send_msg:day:0804"`), optionally scoped
/// to a group. Implementations are expected to be fire-and-forget cheap —
/// the reply path calls these on every send.
pub trait CounterStore: Send + Sync {
    /// Increments a metric by one. When `expire` is set, the key's
    /// time-to-live is (re)armed to that duration.
    fn incr(&self, metric: &str, group_id: Option<i64>, expire: Option<Duration>);

    /// Resets a metric to zero.
    fn reset(&self, metric: &str, group_id: Option<i64>);
}
