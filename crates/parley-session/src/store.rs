//! In-memory session store with per-key mutual exclusion.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parley_core::{AppId, Message, SessionError, SessionKey, SessionResult, UserId};
use std::ops::Deref;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::session::Session;

type SharedSession = Arc<Mutex<Session>>;

/// Concurrent, transient session store.
///
/// Cloning is cheap and every clone sees the same sessions. The map itself
/// is sharded, and each session sits behind its own async mutex, so work on
/// one session never blocks another.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<DashMap<SessionKey, SharedSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty session.
    ///
    /// # Errors
    ///
    /// [`SessionError::AlreadyExists`] if the key is taken.
    pub fn create_session(&self, key: &SessionKey) -> SessionResult<()> {
        match self.sessions.entry(key.clone()) {
            Entry::Occupied(_) => Err(SessionError::AlreadyExists(key.clone())),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(Session::new(key.clone()))));
                debug!(session = %key, "Created session");
                Ok(())
            }
        }
    }

    /// Create the session unless it exists. Returns `true` if it was created.
    pub fn get_or_create(&self, key: &SessionKey) -> bool {
        match self.sessions.entry(key.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(Session::new(key.clone()))));
                debug!(session = %key, "Created session on first access");
                true
            }
        }
    }

    // Clone the handle out so no shard lock is held across an await.
    fn shared(&self, key: &SessionKey) -> SessionResult<SharedSession> {
        self.sessions
            .get(key)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| SessionError::NotFound(key.clone()))
    }

    /// Append a message, waiting for any turn that holds the session lock.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotFound`] if the session was never created.
    pub async fn append(&self, key: &SessionKey, message: Message) -> SessionResult<()> {
        let session = self.shared(key)?;
        session.lock().await.push(message);
        Ok(())
    }

    /// Snapshot of the session's messages in append order.
    pub async fn history(&self, key: &SessionKey) -> SessionResult<Vec<Message>> {
        let session = self.shared(key)?;
        let history = session.lock().await.messages().to_vec();
        Ok(history)
    }

    /// Snapshot of the whole session.
    pub async fn get(&self, key: &SessionKey) -> Option<Session> {
        let session = self.shared(key).ok()?;
        let snapshot = session.lock().await.clone();
        Some(snapshot)
    }

    /// Take exclusive ownership of a session until the guard drops.
    ///
    /// Appends through [`append`](Self::append) and other `lock` calls on
    /// the same key wait; other keys are unaffected.
    pub async fn lock(&self, key: &SessionKey) -> SessionResult<SessionGuard> {
        let session = self.shared(key)?;
        let guard = session.lock_owned().await;
        Ok(SessionGuard { guard })
    }

    pub fn contains(&self, key: &SessionKey) -> bool {
        self.sessions.contains_key(key)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Keys of every session one user has in one app, sorted.
    pub fn sessions_for_user(&self, app_id: &AppId, user_id: &UserId) -> Vec<SessionKey> {
        let mut keys: Vec<SessionKey> = self
            .sessions
            .iter()
            .filter(|entry| &entry.key().app_id == app_id && &entry.key().user_id == user_id)
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        keys
    }
}

impl std::fmt::Debug for InMemorySessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySessionStore")
            .field("sessions", &self.sessions.len())
            .finish()
    }
}

/// Exclusive access to one session for the duration of a turn.
///
/// Dereferences to the [`Session`] for reads; the only write is
/// [`append`](SessionGuard::append).
pub struct SessionGuard {
    guard: OwnedMutexGuard<Session>,
}

impl SessionGuard {
    pub fn append(&mut self, message: Message) {
        self.guard.push(message);
    }

    /// Messages in append order.
    pub fn history(&self) -> &[Message] {
        self.guard.messages()
    }
}

impl Deref for SessionGuard {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.guard
    }
}

impl std::fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGuard")
            .field("session", &self.guard.key().to_string())
            .field("messages", &self.guard.len())
            .finish()
    }
}
