//! In-memory session store.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;
use uuid::Uuid;

use crate::session::SessionStore;

#[derive(Debug)]
struct SessionEntry {
    attributes: HashMap<String, Value>,
    last_access: Instant,
}

impl SessionEntry {
    fn new() -> Self {
        Self {
            attributes: HashMap::new(),
            last_access: Instant::now(),
        }
    }
}

/// Concurrent map of session id -> attributes, with optional idle expiry.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, SessionEntry>,
    idle_timeout: Option<Duration>,
}

impl MemorySessionStore {
    pub fn new(idle_timeout: Option<Duration>) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_timeout,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn expired(&self, entry: &SessionEntry, now: Instant) -> bool {
        self.idle_timeout
            .is_some_and(|timeout| now.duration_since(entry.last_access) > timeout)
    }

    /// Run `f` on a live session, refreshing its access time.
    /// Expired sessions are removed instead.
    fn with_live<R>(&self, id: &str, f: impl FnOnce(&mut SessionEntry) -> R) -> Option<R> {
        let now = Instant::now();
        let result = {
            let mut entry = self.sessions.get_mut(id)?;
            if self.expired(&entry, now) {
                None
            } else {
                entry.last_access = now;
                Some(f(&mut entry))
            }
        };
        if result.is_none() {
            self.sessions.remove(id);
            tracing::debug!(session_id = %id, "Session expired");
        }
        result
    }
}

impl SessionStore for MemorySessionStore {
    fn create(&self) -> String {
        let id = Uuid::new_v4().simple().to_string();
        self.sessions.insert(id.clone(), SessionEntry::new());
        id
    }

    fn exists(&self, id: &str) -> bool {
        self.with_live(id, |_| ()).is_some()
    }

    fn get(&self, id: &str, name: &str) -> Option<Value> {
        self.with_live(id, |entry| entry.attributes.get(name).cloned())
            .flatten()
    }

    fn set(&self, id: &str, name: &str, value: Value) {
        self.with_live(id, |entry| {
            entry.attributes.insert(name.to_string(), value);
        });
    }

    fn remove(&self, id: &str, name: &str) -> Option<Value> {
        self.with_live(id, |entry| entry.attributes.remove(name))
            .flatten()
    }

    fn invalidate(&self, id: &str) {
        if self.sessions.remove(id).is_some() {
            tracing::debug!(session_id = %id, "Session invalidated");
        }
    }

    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| !self.expired(entry, now));
        before.saturating_sub(self.sessions.len())
    }
}
