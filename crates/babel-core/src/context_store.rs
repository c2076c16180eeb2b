use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::clock::SharedClock;

/// Outcome of a single atomic context lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextLookup<V> {
    Live(V),
    /// Issued to this session once, TTL since lapsed.
    Expired,
    /// Never issued to this session.
    Unknown,
}

struct Entry<V> {
    value: V,
    renewed: Instant,
}

struct SessionContexts<V> {
    live: HashMap<String, Entry<V>>,
    tombstones: HashSet<String>,
}

impl<V> Default for SessionContexts<V> {
    fn default() -> Self {
        Self {
            live: HashMap::new(),
            tombstones: HashSet::new(),
        }
    }
}

impl<V> SessionContexts<V> {
    /// Move `id` to the tombstones if its TTL lapsed. Returns whether it is still live.
    fn settle(&mut self, id: &str, now: Instant, ttl: Duration) -> bool {
        let Some(entry) = self.live.get(id) else {
            return false;
        };
        if now.saturating_duration_since(entry.renewed) <= ttl {
            return true;
        }
        self.live.remove(id);
        self.tombstones.insert(id.to_string());
        false
    }
}

/// Per-session translation contexts with a sliding TTL and tombstones for expired ids.
///
/// Tombstones are kept for the life of the process.
pub struct ContextStore<V> {
    ttl: Duration,
    clock: SharedClock,
    sessions: Mutex<HashMap<String, SessionContexts<V>>>,
}

impl<V> ContextStore<V> {
    pub fn new(ttl: Duration, clock: SharedClock) -> Self {
        Self {
            ttl,
            clock,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn put(&self, session: &str, id: impl Into<String>, value: V) {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock();
        let id = id.into();
        let contexts = sessions.entry(session.to_string()).or_default();
        contexts.tombstones.remove(&id);
        contexts.live.insert(id, Entry { value, renewed: now });
    }

    /// Whether `id` is live for `session`. On expiry the id becomes a tombstone.
    pub fn exists(&self, session: &str, id: &str) -> bool {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock();
        sessions
            .get_mut(session)
            .is_some_and(|contexts| contexts.settle(id, now, self.ttl))
    }

    /// Renew `id` if it is still in the live map. Tombstoned or absent ids are left alone.
    ///
    /// No TTL check here: a caller that already found the id live may commit to it
    /// even if the clock moved past the TTL in between.
    pub fn touch(&self, session: &str, id: &str) {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock();
        if let Some(entry) = sessions
            .get_mut(session)
            .and_then(|contexts| contexts.live.get_mut(id))
        {
            entry.renewed = now;
        }
    }

    /// Answers from the tombstones only. Call after [`exists`](Self::exists) returned false.
    pub fn was_expired(&self, session: &str, id: &str) -> bool {
        self.sessions
            .lock()
            .get(session)
            .is_some_and(|contexts| contexts.tombstones.contains(id))
    }

    /// Live contexts currently held for `session`, stale ones included until looked at.
    pub fn live_count(&self, session: &str) -> usize {
        self.sessions
            .lock()
            .get(session)
            .map_or(0, |contexts| contexts.live.len())
    }
}

impl<V: Clone> ContextStore<V> {
    /// `exists`, value fetch and `was_expired` under one lock. Does not renew.
    pub fn lookup(&self, session: &str, id: &str) -> ContextLookup<V> {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock();
        let Some(contexts) = sessions.get_mut(session) else {
            return ContextLookup::Unknown;
        };
        if contexts.settle(id, now, self.ttl) {
            if let Some(entry) = contexts.live.get(id) {
                return ContextLookup::Live(entry.value.clone());
            }
        }
        if contexts.tombstones.contains(id) {
            ContextLookup::Expired
        } else {
            ContextLookup::Unknown
        }
    }
}
