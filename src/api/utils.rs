//! API utility functions
//!
//! Shared router state plus the input validation handlers run before
//! touching a session.

use crate::backends::BackendSet;
use crate::config::Config;
use crate::error::AppError;
use crate::services::UploadStore;
use crate::session::{SessionHandle, SessionManager};
use crate::websocket::SessionEvent;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

/// Maximum query length in characters
pub const MAX_QUERY_LENGTH: usize = 10_000; // 10KB max query length

/// Capacity of the session-event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Application-wide state shared by every handler
pub struct AppState {
    /// Session registry
    pub sessions: SessionManager,
    /// Tab-to-adapter registry
    pub backends: BackendSet,
    /// Upload blob store
    pub uploads: UploadStore,
    /// Loaded configuration
    pub config: Config,
    /// Session-event fanout for WebSocket clients
    pub events: broadcast::Sender<SessionEvent>,
}

/// Shared handle to the application state
pub type SharedState = Arc<AppState>;

impl AppState {
    /// Build the full application state from configuration
    pub fn new(config: Config) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            sessions: SessionManager::new(),
            backends: BackendSet::from_config(&config),
            uploads: UploadStore::new(config.storage.upload_dir.clone()),
            config,
            events,
        }
    }

    /// Publish a session event to connected WebSocket clients
    ///
    /// Send errors just mean nobody is listening.
    pub fn notify(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            trace!("No WebSocket clients subscribed");
        }
    }
}

/// Validate query text before it reaches the session
///
/// # Arguments
/// * `query` - Query string to validate
///
/// # Returns
/// * `Ok(())` - Query is valid
/// * `Err(AppError)` - Query is invalid (empty or too long)
pub fn validate_query(query: &str) -> Result<(), AppError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidQuery("Query cannot be empty".to_string()));
    }
    if trimmed.len() > MAX_QUERY_LENGTH {
        return Err(AppError::InvalidQuery(format!(
            "Query exceeds maximum length of {} characters",
            MAX_QUERY_LENGTH
        )));
    }
    Ok(())
}

/// Look up a session or fail with `SessionNotFound`
pub async fn lookup_session(state: &AppState, id: &str) -> Result<SessionHandle, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::SessionNotFound(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_query_accepts_normal_text() {
        assert!(validate_query("what is rust?").is_ok());
    }

    #[test]
    fn test_validate_query_rejects_empty() {
        assert!(matches!(
            validate_query("   "),
            Err(AppError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_validate_query_rejects_oversized() {
        let huge = "x".repeat(MAX_QUERY_LENGTH + 1);
        assert!(matches!(
            validate_query(&huge),
            Err(AppError::InvalidQuery(_))
        ));
    }
}
