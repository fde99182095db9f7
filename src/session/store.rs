//! Session store: session id to session, with one lock per session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use log::{debug, info};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Session, SessionId};
use crate::graph::GraphLimits;
use crate::types::{now_micros, DEFAULT_HISTORY_DEPTH};

/// Shared handle to one session. Locking it serializes that session's
/// commands without blocking any other session.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Owns every live session.
///
/// The map itself sits behind a short-lived synchronous lock that is never
/// held across an await; all per-session waiting happens on the session's own
/// async lock.
pub struct SessionStore {
    sessions: std::sync::Mutex<HashMap<SessionId, SessionHandle>>,
    limits: GraphLimits,
    history_depth: usize,
    created: AtomicU64,
}

impl SessionStore {
    /// Create an empty store whose sessions use `limits` and keep
    /// `history_depth` undo steps.
    pub fn new(limits: GraphLimits, history_depth: usize) -> Self {
        Self {
            sessions: std::sync::Mutex::new(HashMap::new()),
            limits,
            history_depth,
            created: AtomicU64::new(0),
        }
    }

    /// Get the session for `id`, creating it on first use.
    ///
    /// Concurrent callers with the same id always receive the same handle;
    /// exactly one session is constructed.
    pub fn get_or_create(&self, id: &str) -> SessionHandle {
        let mut sessions = self.map();
        if let Some(session) = sessions.get(id) {
            return session.clone();
        }

        let session = Arc::new(Mutex::new(Session::new(
            SessionId::new(id),
            self.limits,
            self.history_depth,
        )));
        sessions.insert(SessionId::new(id), session.clone());
        self.created.fetch_add(1, Ordering::Relaxed);
        info!("Created session '{id}'");

        session
    }

    /// Get an existing session without creating one.
    pub fn get(&self, id: &str) -> Option<SessionHandle> {
        self.map().get(id).cloned()
    }

    /// Lock the session for `id`, creating it if needed.
    ///
    /// If the session is evicted while this call waits for its lock, a fresh
    /// session is created and locked instead, so the caller never mutates a
    /// session that is no longer in the store.
    pub async fn acquire(&self, id: &str) -> OwnedMutexGuard<Session> {
        loop {
            let guard = self.get_or_create(id).lock_owned().await;
            if !guard.is_closed() {
                return guard;
            }
            debug!("Session '{id}' closed while waiting; retrying");
        }
    }

    /// Clear the graph of an existing session. Returns false if the session
    /// does not exist or was already empty.
    pub async fn reset(&self, id: &str) -> bool {
        let Some(handle) = self.get(id) else {
            return false;
        };
        let mut session = handle.lock().await;
        !session.is_closed() && session.reset()
    }

    /// Remove a session immediately, waiting for any in-flight command on it.
    pub async fn close(&self, id: &str) -> bool {
        let Some(handle) = self.get(id) else {
            return false;
        };
        let mut session = handle.lock().await;
        if session.is_closed() {
            return false;
        }
        session.close();
        self.remove_if_same(id, &handle);
        info!("Closed session '{id}'");
        true
    }

    /// Remove sessions idle for at least `older_than`. Returns the evicted ids.
    ///
    /// Each candidate's lock is acquired before it is examined, so a session
    /// with a command in flight is only evicted after that command finishes
    /// and only if it is still idle afterwards.
    pub async fn evict_idle(&self, older_than: Duration) -> Vec<SessionId> {
        let candidates: Vec<(SessionId, SessionHandle)> = self
            .map()
            .iter()
            .map(|(id, handle)| (id.clone(), handle.clone()))
            .collect();

        let mut evicted = Vec::new();
        for (id, handle) in candidates {
            let mut session = handle.lock().await;
            if session.is_closed() || session.idle_for(Instant::now()) < older_than {
                continue;
            }
            session.close();
            self.remove_if_same(id.as_str(), &handle);
            let age = now_micros().saturating_sub(session.created_at()) / 1_000_000;
            info!("Evicted idle session '{id}' after {age}s");
            evicted.push(id);
        }
        evicted
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.map().len()
    }

    /// Whether there are no live sessions.
    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    /// Ids of live sessions, sorted.
    pub fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.map().keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Total sessions ever constructed by this store.
    pub fn created_count(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    /// Graph limits given to new sessions.
    pub fn limits(&self) -> GraphLimits {
        self.limits
    }

    fn remove_if_same(&self, id: &str, handle: &SessionHandle) {
        let mut sessions = self.map();
        if sessions.get(id).is_some_and(|h| Arc::ptr_eq(h, handle)) {
            sessions.remove(id);
        }
    }

    fn map(&self) -> MutexGuard<'_, HashMap<SessionId, SessionHandle>> {
        // The map is only ever left consistent, so a poisoned lock is still usable.
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(GraphLimits::default(), DEFAULT_HISTORY_DEPTH)
    }
}
