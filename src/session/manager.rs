//! Session registry
//!
//! Maps session identifiers to live controllers. Each controller is
//! wrapped in a Tokio mutex so one session processes at most one query
//! at a time, while independent sessions proceed concurrently. Backend
//! resource caches live inside the controllers, so they are keyed per
//! session and can never leak across sessions.

use crate::session::controller::SessionController;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// Shared handle to one session's controller
pub type SessionHandle = Arc<Mutex<SessionController>>;

/// Registry of all live sessions
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionManager {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new session and return its id and handle
    pub async fn create(&self) -> (String, SessionHandle) {
        let id = Uuid::new_v4().to_string();
        let handle = Arc::new(Mutex::new(SessionController::new(id.clone())));
        self.sessions.write().await.insert(id.clone(), handle.clone());
        info!(session_id = %id, "Session created");
        (id, handle)
    }

    /// Look up a session by id
    pub async fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Remove a session, returning whether it existed
    ///
    /// Dropping the controller releases its cached resources.
    pub async fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            debug!(session_id = %id, "Session removed");
        }
        removed
    }

    /// Number of live sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no sessions are live
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
