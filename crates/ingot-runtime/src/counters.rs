//! In-memory counter store.
//!
//! Drop-in [`CounterStore`] for hosts that don't wire a persistent backend.
//! Expiry is lazy: an expired key reads as zero and restarts from one on
//! the next increment, which matches what the reply path needs from its
//! day/month counters.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use ingot_core::CounterStore;

struct CounterEntry {
    value: u64,
    expires_at: Option<Instant>,
}

impl CounterEntry {
    fn expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// A process-local counter store.
#[derive(Default)]
pub struct MemoryCounters {
    entries: Mutex<HashMap<String, CounterEntry>>,
}

impl MemoryCounters {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a counter's current value.
    pub fn get(&self, metric: &str, group_id: Option<i64>) -> u64 {
        let key = storage_key(metric, group_id);
        let entries = self.entries.lock();
        match entries.get(&key) {
            Some(entry) if !entry.expired() => entry.value,
            _ => 0,
        }
    }
}

impl CounterStore for MemoryCounters {
    fn incr(&self, metric: &str, group_id: Option<i64>, expire: Option<Duration>) {
        let key = storage_key(metric, group_id);
        let mut entries = self.entries.lock();
        let entry = entries.entry(key).or_insert(CounterEntry {
            value: 0,
            expires_at: None,
        });
        if entry.expired() {
            entry.value = 0;
        }
        entry.value += 1;
        entry.expires_at = expire.map(|ttl| Instant::now() + ttl);
    }

    fn reset(&self, metric: &str, group_id: Option<i64>) {
        let key = storage_key(metric, group_id);
        self.entries.lock().insert(
            key,
            CounterEntry {
                value: 0,
                expires_at: None,
            },
        );
    }
}

fn storage_key(metric: &str, group_id: Option<i64>) -> String {
    match group_id {
        Some(group_id) => format!("group:{group_id}:{metric}"),
        None => metric.to_owned(),
    }
}
