//! Per-session context handles.
//!
//! A [`ConversationContext`] has a single writer for the duration of a turn.
//! The store hands out one shared handle per session; callers lock it for the
//! whole turn so concurrent turns on the same conversation run one after the
//! other instead of interleaving their messages.

use crate::memory::ConversationContext;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared, lockable context for one session.
pub type SessionHandle = Arc<Mutex<ConversationContext>>;

/// Session id to context handle map.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the handle for `session_id`, creating an empty context on first use.
    pub fn get_or_create(&self, session_id: &str, user_id: &str) -> SessionHandle {
        if let Some(handle) = self.sessions.read().get(session_id) {
            return Arc::clone(handle);
        }

        let mut sessions = self.sessions.write();
        Arc::clone(sessions.entry(session_id.to_string()).or_insert_with(|| {
            Arc::new(Mutex::new(ConversationContext::new(session_id, user_id)))
        }))
    }

    /// Existing handle for `session_id`.
    pub fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.read().get(session_id).cloned()
    }

    /// Register an existing context, replacing any handle for the same session.
    pub fn insert(&self, context: ConversationContext) -> SessionHandle {
        let session_id = context.session_id().to_string();
        let handle = Arc::new(Mutex::new(context));
        self.sessions.write().insert(session_id, Arc::clone(&handle));
        handle
    }

    /// Drop the store's handle. Turns already holding the handle keep running.
    pub fn remove(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.write().remove(session_id)
    }

    /// Ids of all stored sessions, in no particular order.
    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }

    /// Number of stored sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether no session is stored.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
