//! Session subsystem.
//!
//! # Data Flow
//! ```text
//! Cookie header (session id)
//!     → RequestSession (per request, lazily creates)
//!     → SessionStore (shared, keyed by id)
//!     → Set-Cookie when a session created during dispatch is still alive
//! ```
//!
//! # Design Decisions
//! - The store is the only shared mutable state in the dispatch path
//! - No per-session locking; concurrent requests on one session race at
//!   attribute granularity
//! - Creation is explicit per call site: reads never create a session

pub mod memory;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

pub use memory::MemorySessionStore;

/// Storage backend for session attributes.
pub trait SessionStore: Send + Sync + 'static {
    /// Create an empty session and return its id.
    fn create(&self) -> String;

    /// True if the session exists and has not expired.
    fn exists(&self, id: &str) -> bool;

    fn get(&self, id: &str, name: &str) -> Option<Value>;

    /// Set an attribute. Ignored if the session does not exist.
    fn set(&self, id: &str, name: &str, value: Value);

    fn remove(&self, id: &str, name: &str) -> Option<Value>;

    fn invalidate(&self, id: &str);

    /// Drop expired sessions, returning how many were removed.
    fn purge_expired(&self) -> usize {
        0
    }
}

/// Handle to one client session.
#[derive(Clone)]
pub struct Session {
    id: String,
    store: Arc<dyn SessionStore>,
}

impl Session {
    pub fn new(id: impl Into<String>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            id: id.into(),
            store,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.store.get(&self.id, name)
    }

    pub fn set(&self, name: &str, value: impl Into<Value>) {
        self.store.set(&self.id, name, value.into());
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        self.store.remove(&self.id, name)
    }

    pub fn invalidate(&self) {
        self.store.invalidate(&self.id);
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("id", &self.id).finish()
    }
}

/// Session access for a single request.
pub struct RequestSession {
    store: Arc<dyn SessionStore>,
    incoming: Option<String>,
    created: Mutex<Option<String>>,
}

impl RequestSession {
    pub fn new(store: Arc<dyn SessionStore>, incoming: Option<String>) -> Self {
        Self {
            store,
            incoming,
            created: Mutex::new(None),
        }
    }

    fn created(&self) -> MutexGuard<'_, Option<String>> {
        self.created.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The current session, without creating one. A session invalidated
    /// earlier in the request no longer counts.
    pub fn existing(&self) -> Option<Session> {
        self.created()
            .as_deref()
            .or(self.incoming.as_deref())
            .filter(|id| self.store.exists(id))
            .map(|id| Session::new(id, self.store.clone()))
    }

    /// The current session, creating one if needed.
    pub fn get_or_create(&self) -> Session {
        if let Some(session) = self.existing() {
            return session;
        }
        let id = self.store.create();
        tracing::debug!(session_id = %id, "Session created");
        *self.created() = Some(id.clone());
        Session::new(id, self.store.clone())
    }

    /// Read an attribute without creating a session.
    pub fn attribute(&self, name: &str) -> Option<Value> {
        self.existing().and_then(|s| s.get(name))
    }

    /// Id of a session created during this request and still alive.
    pub fn created_id(&self) -> Option<String> {
        self.created()
            .clone()
            .filter(|id| self.store.exists(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Arc<dyn SessionStore> {
        Arc::new(MemorySessionStore::new(None))
    }

    #[test]
    fn test_reads_do_not_create() {
        let session = RequestSession::new(store(), None);
        assert!(session.existing().is_none());
        assert!(session.attribute("user").is_none());
        assert!(session.created_id().is_none());
    }

    #[test]
    fn test_get_or_create_is_stable() {
        let session = RequestSession::new(store(), Some("stale-id".into()));
        let first = session.get_or_create();
        let second = session.get_or_create();
        assert_eq!(first, second);
        assert_eq!(session.created_id().as_deref(), Some(first.id()));

        first.set("user", "alice");
        assert_eq!(session.attribute("user"), Some(Value::from("alice")));
    }

    #[test]
    fn test_existing_incoming_session_is_reused() {
        let store = store();
        let id = store.create();
        store.set(&id, "role", Value::from("admin"));

        let session = RequestSession::new(store, Some(id.clone()));
        assert_eq!(session.get_or_create().id(), id);
        assert!(session.created_id().is_none());
        assert_eq!(session.attribute("role"), Some(Value::from("admin")));
    }

    #[test]
    fn test_invalidated_new_session_is_forgotten() {
        let store = store();
        let session = RequestSession::new(store.clone(), None);
        let created = session.get_or_create();
        created.invalidate();

        assert!(session.existing().is_none());
        assert!(session.created_id().is_none());
        assert!(!store.exists(created.id()));

        let fresh = session.get_or_create();
        assert_ne!(fresh.id(), created.id());
        assert_eq!(session.created_id().as_deref(), Some(fresh.id()));
    }
}
