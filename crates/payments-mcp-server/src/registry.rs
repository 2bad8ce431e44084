//! Process-wide map from session id to live session.
//!
//! A registry is an explicit value owned by the transport; nothing here is a
//! global. Closed ids are remembered as tombstones so that a second close is
//! told apart from a close of an id that never existed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use payments_mcp::SessionHandler;
use thiserror::Error;

use crate::session::Session;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("session id already in use: {0}")]
    DuplicateSession(String),
}

/// Result of closing a session by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// This call removed and tore down the session
    Closed,
    /// The id was closed earlier; nothing to do
    AlreadyClosed,
    /// The id was never registered (or its tombstone expired)
    NotFound,
}

pub struct SessionRegistry<H> {
    sessions: DashMap<String, Arc<Session<H>>>,
    tombstones: DashMap<String, Instant>,
}

impl<H: SessionHandler> Default for SessionRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: SessionHandler> SessionRegistry<H> {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            tombstones: DashMap::new(),
        }
    }

    /// Insert a session and mark it open. Fails if the id is live or was
    /// closed before; the existing entry is left untouched.
    pub fn register(&self, session: Arc<Session<H>>) -> Result<(), RegistryError> {
        let id = session.id().to_string();
        match self.sessions.entry(id) {
            Entry::Occupied(entry) => Err(RegistryError::DuplicateSession(entry.key().clone())),
            Entry::Vacant(entry) => {
                if self.tombstones.contains_key(entry.key()) {
                    return Err(RegistryError::DuplicateSession(entry.key().clone()));
                }
                if !session.open() {
                    return Err(RegistryError::DuplicateSession(entry.key().clone()));
                }
                entry.insert(session);
                Ok(())
            }
        }
    }

    pub fn lookup(&self, id: &str) -> Option<Arc<Session<H>>> {
        self.sessions.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Take a session out of the registry and mark it closed, without
    /// running teardown. No-op for unknown ids.
    pub fn remove(&self, id: &str) -> Option<Arc<Session<H>>> {
        match self.sessions.entry(id.to_string()) {
            Entry::Vacant(_) => None,
            Entry::Occupied(entry) => {
                // Tombstone goes in while the entry is still locked, so a
                // concurrent closer sees either the session or its tombstone.
                self.tombstones.insert(id.to_string(), Instant::now());
                let session = entry.remove();
                session.mark_closed();
                Some(session)
            }
        }
    }

    /// Remove and tear down. Safe to call any number of times for the same id.
    pub async fn close(&self, id: &str) -> CloseOutcome {
        match self.remove(id) {
            Some(session) => {
                session.teardown().await;
                tracing::info!(
                    session_id = %id,
                    age_ms = session.age().as_millis() as u64,
                    "session closed"
                );
                CloseOutcome::Closed
            }
            None if self.was_closed(id) => CloseOutcome::AlreadyClosed,
            None => CloseOutcome::NotFound,
        }
    }

    /// Close every live session. Used on shutdown.
    pub async fn close_all(&self) -> usize {
        let ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        let mut closed = 0;
        for id in ids {
            if self.close(&id).await == CloseOutcome::Closed {
                closed += 1;
            }
        }
        closed
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn was_closed(&self, id: &str) -> bool {
        self.tombstones.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Forget tombstones older than `max_age`. Returns how many were dropped.
    pub fn purge_tombstones(&self, max_age: Duration) -> usize {
        let before = self.tombstones.len();
        self.tombstones.retain(|_, closed_at| closed_at.elapsed() < max_age);
        before.saturating_sub(self.tombstones.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionState;
    use futures::stream;
    use payments_mcp::{HandlerError, MessageStream};
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default, Clone)]
    struct Recorder {
        closes: Arc<AtomicUsize>,
    }

    impl SessionHandler for Recorder {
        async fn handle(&self, body: Value) -> Option<Value> {
            Some(body)
        }

        fn stream(&self) -> Result<MessageStream, HandlerError> {
            Ok(Box::pin(stream::empty()))
        }

        async fn close(&self) -> Result<(), HandlerError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn session(id: &str, handler: Recorder) -> Arc<Session<Recorder>> {
        Arc::new(Session::new(id, handler))
    }

    #[test]
    fn test_register_opens_session() {
        let registry = SessionRegistry::new();
        let s = session("a", Recorder::default());
        registry.register(Arc::clone(&s)).unwrap();
        assert_eq!(s.state(), SessionState::Open);
        assert!(registry.contains("a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_register_keeps_original() {
        let registry = SessionRegistry::new();
        let first = session("a", Recorder::default());
        registry.register(Arc::clone(&first)).unwrap();

        let err = registry.register(session("a", Recorder::default())).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateSession(ref id) if id == "a"));
        let current = registry.lookup("a").unwrap();
        assert!(Arc::ptr_eq(&current, &first));
    }

    #[tokio::test]
    async fn test_close_twice() {
        let registry = SessionRegistry::new();
        let handler = Recorder::default();
        registry.register(session("a", handler.clone())).unwrap();

        assert_eq!(registry.close("a").await, CloseOutcome::Closed);
        assert_eq!(registry.close("a").await, CloseOutcome::AlreadyClosed);
        assert_eq!(handler.closes.load(Ordering::SeqCst), 1);
        assert!(registry.lookup("a").is_none());
    }

    #[tokio::test]
    async fn test_close_unknown_id() {
        let registry: SessionRegistry<Recorder> = SessionRegistry::new();
        assert_eq!(registry.close("not-a-real-id").await, CloseOutcome::NotFound);
        assert!(!registry.was_closed("not-a-real-id"));
    }

    #[tokio::test]
    async fn test_closed_id_is_never_reused() {
        let registry = SessionRegistry::new();
        registry.register(session("a", Recorder::default())).unwrap();
        registry.close("a").await;
        assert!(registry.register(session("a", Recorder::default())).is_err());
    }

    #[tokio::test]
    async fn test_purge_tombstones() {
        let registry = SessionRegistry::new();
        registry.register(session("a", Recorder::default())).unwrap();
        registry.close("a").await;

        assert_eq!(registry.purge_tombstones(Duration::from_secs(3600)), 0);
        assert!(registry.was_closed("a"));
        assert_eq!(registry.purge_tombstones(Duration::ZERO), 1);
        assert_eq!(registry.close("a").await, CloseOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_close_all() {
        let registry = SessionRegistry::new();
        let handler = Recorder::default();
        for id in ["a", "b", "c"] {
            registry.register(session(id, handler.clone())).unwrap();
        }
        assert_eq!(registry.close_all().await, 3);
        assert!(registry.is_empty());
        assert_eq!(handler.closes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registration_and_close() {
        let registry = Arc::new(SessionRegistry::new());
        let handler = Recorder::default();

        let mut tasks = Vec::new();
        for i in 0..64 {
            let registry = Arc::clone(&registry);
            let handler = handler.clone();
            tasks.push(tokio::spawn(async move {
                let id = format!("s{i}");
                registry.register(session(&id, handler)).unwrap();
                id
            }));
        }
        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap());
        }
        assert_eq!(registry.len(), 64);

        // Every id closed from two tasks at once: exactly one wins.
        let mut closers = Vec::new();
        for id in ids.iter().chain(ids.iter()) {
            let registry = Arc::clone(&registry);
            let id = id.clone();
            closers.push(tokio::spawn(async move { registry.close(&id).await }));
        }
        let mut closed = 0;
        for closer in closers {
            match closer.await.unwrap() {
                CloseOutcome::Closed => closed += 1,
                CloseOutcome::AlreadyClosed => {}
                CloseOutcome::NotFound => panic!("tombstone missing"),
            }
        }
        assert_eq!(closed, 64);
        assert!(registry.is_empty());
        assert_eq!(handler.closes.load(Ordering::SeqCst), 64);
    }
}
