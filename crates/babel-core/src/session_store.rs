use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::clock::SharedClock;
use crate::token::random_token;

/// Live anonymous session tokens with a sliding TTL.
///
/// Expiry is lazy: a stale entry is only removed when it is next looked up.
pub struct SessionStore {
    ttl: Duration,
    clock: SharedClock,
    entries: Mutex<HashMap<String, Instant>>,
}

impl SessionStore {
    pub fn new(ttl: Duration, clock: SharedClock) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint a fresh token and record it as live.
    pub fn issue(&self) -> String {
        let token = random_token();
        self.put(token.clone());
        token
    }

    pub fn put(&self, token: impl Into<String>) {
        let now = self.clock.now();
        self.entries.lock().insert(token.into(), now);
    }

    /// Whether `token` is live. Does not renew it.
    pub fn exists(&self, token: &str) -> bool {
        self.check(token, false)
    }

    /// Renew `token` if it is live; reports whether it was.
    pub fn touch(&self, token: &str) -> bool {
        self.check(token, true)
    }

    pub fn remove(&self, token: &str) -> bool {
        self.entries.lock().remove(token).is_some()
    }

    /// Entries currently held, including stale ones not yet looked at.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self, token: &str, renew: bool) -> bool {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let Some(renewed) = entries.get_mut(token) else {
            return false;
        };
        if now.saturating_duration_since(*renewed) > self.ttl {
            entries.remove(token);
            return false;
        }
        if renew {
            *renewed = now;
        }
        true
    }
}
