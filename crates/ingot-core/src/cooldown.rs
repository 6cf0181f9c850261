//! TTL-keyed cooldown flags.
//!
//! Three independent maps back the rate-limit gate: a group-global
//! cooldown, a per-member cooldown, and a short duplicate-message throttle.
//! Every flag is cleared by its own spawned timer — there is no manual
//! reset path and no sweep; a flag that exists is active by definition.
//!
//! The store is cheap to clone (shared maps) and is only touched from
//! async context, since arming a flag spawns its expiry task.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

/// Default window for the duplicate-message throttle.
pub const DEFAULT_DEDUPE_WINDOW: Duration = Duration::from_millis(200);

/// Transient cooldown flags with timer-driven expiry.
#[derive(Clone)]
pub struct CooldownStore {
    group: Arc<Mutex<HashSet<i64>>>,
    member: Arc<Mutex<HashSet<(i64, i64)>>>,
    throttle: Arc<Mutex<HashSet<(i64, String)>>>,
    dedupe_window: Duration,
}

impl Default for CooldownStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CooldownStore {
    /// Creates a store with the default duplicate-message window.
    pub fn new() -> Self {
        Self::with_dedupe_window(DEFAULT_DEDUPE_WINDOW)
    }

    /// Creates a store with a custom duplicate-message window.
    pub fn with_dedupe_window(window: Duration) -> Self {
        Self {
            group: Arc::new(Mutex::new(HashSet::new())),
            member: Arc::new(Mutex::new(HashSet::new())),
            throttle: Arc::new(Mutex::new(HashSet::new())),
            dedupe_window: window,
        }
    }

    /// Whether the group-global cooldown is active.
    pub fn group_active(&self, group_id: i64) -> bool {
        self.group.lock().contains(&group_id)
    }

    /// Whether the per-member cooldown is active.
    pub fn member_active(&self, group_id: i64, user_id: i64) -> bool {
        self.member.lock().contains(&(group_id, user_id))
    }

    /// Arms the group-global cooldown for `ttl`.
    pub fn set_group(&self, group_id: i64, ttl: Duration) {
        self.group.lock().insert(group_id);
        let flags = Arc::clone(&self.group);
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            flags.lock().remove(&group_id);
        });
    }

    /// Arms the per-member cooldown for `ttl`.
    pub fn set_member(&self, group_id: i64, user_id: i64, ttl: Duration) {
        self.member.lock().insert((group_id, user_id));
        let flags = Arc::clone(&self.member);
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            flags.lock().remove(&(group_id, user_id));
        });
    }

    /// Records `(user_id, raw_text)` in the duplicate-message throttle.
    ///
    /// Returns `true` when the pair was already present (a duplicate inside
    /// the window). Otherwise the pair is recorded and expires after the
    /// configured window.
    pub fn throttle(&self, user_id: i64, raw_text: &str) -> bool {
        let key = (user_id, raw_text.to_owned());
        {
            let mut seen = self.throttle.lock();
            if seen.contains(&key) {
                return true;
            }
            seen.insert(key.clone());
        }
        let seen = Arc::clone(&self.throttle);
        let window = self.dedupe_window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            seen.lock().remove(&key);
        });
        false
    }
}
