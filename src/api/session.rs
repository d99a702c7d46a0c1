//! Session API endpoints
//!
//! Handles HTTP requests for session lifecycle: creation, tab selection,
//! history replay, and deletion.

use crate::api::utils::{lookup_session, SharedState};
use crate::error::AppError;
use crate::session::{TabId, Turn};
use crate::websocket::SessionEvent;
use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};

/// Request to select a tab
#[derive(Debug, Deserialize)]
pub struct SelectTabRequest {
    /// The tab to activate
    pub tab: TabId,
}

/// Session state response
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// Session unique identifier
    pub session_id: String,
    /// Currently active tab, if any was selected
    pub active_tab: Option<TabId>,
    /// Replayed message history in chronological order
    pub history: Vec<Turn>,
}

/// Tab selection response
#[derive(Debug, Serialize)]
pub struct SelectTabResponse {
    /// Session unique identifier
    pub session_id: String,
    /// The now-active tab
    pub tab: TabId,
    /// Whether the message log was reset by this selection
    pub reset: bool,
    /// Replayed message history after the selection
    pub history: Vec<Turn>,
}

/// POST /api/sessions - Create a new session
pub async fn create_session(State(state): State<SharedState>) -> Json<SessionResponse> {
    let (session_id, handle) = state.sessions.create().await;
    let session = handle.lock().await;
    Json(SessionResponse {
        session_id,
        active_tab: session.active_tab(),
        history: session.replay().cloned().collect(),
    })
}

/// GET /api/sessions/:id/history - Replay the session's message log
pub async fn get_history(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let handle = lookup_session(&state, &id).await?;
    let session = handle.lock().await;
    Ok(Json(SessionResponse {
        session_id: id,
        active_tab: session.active_tab(),
        history: session.replay().cloned().collect(),
    }))
}

/// PUT /api/sessions/:id/tab - Select the active tab
///
/// Selecting a different tab resets the message log to the greeting and
/// invalidates every cached backend resource; re-selecting the active
/// tab is a no-op.
pub async fn select_tab(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(request): Json<SelectTabRequest>,
) -> Result<Json<SelectTabResponse>, AppError> {
    let handle = lookup_session(&state, &id).await?;
    let mut session = handle.lock().await;

    let switch = session.select_tab(request.tab);
    state.notify(SessionEvent::TabSelected {
        session_id: id.clone(),
        tab: request.tab,
        reset: switch.reset_log(),
    });

    Ok(Json(SelectTabResponse {
        session_id: id,
        tab: request.tab,
        reset: switch.reset_log(),
        history: session.replay().cloned().collect(),
    }))
}

/// DELETE /api/sessions/:id - End a session
pub async fn delete_session(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !state.sessions.remove(&id).await {
        return Err(AppError::SessionNotFound(id));
    }
    Ok(Json(serde_json::json!({
        "message": "Session deleted successfully",
        "id": id
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::utils::AppState;
    use crate::config::Config;
    use crate::session::{Role, GREETING};
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn test_state() -> (SharedState, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::for_tests(temp_dir.path().to_path_buf());
        (Arc::new(AppState::new(config)), temp_dir)
    }

    #[tokio::test]
    async fn test_create_session_returns_greeting() {
        let (state, _temp_dir) = test_state().await;
        let response = create_session(State(state)).await.0;
        assert!(!response.session_id.is_empty());
        assert!(response.active_tab.is_none());
        assert_eq!(response.history.len(), 1);
        assert_eq!(response.history[0].role, Role::Assistant);
        assert_eq!(response.history[0].content, GREETING);
    }

    #[tokio::test]
    async fn test_select_tab_then_switch_resets_history() {
        let (state, _temp_dir) = test_state().await;
        let session_id = create_session(State(state.clone())).await.0.session_id;

        let first = select_tab(
            State(state.clone()),
            Path(session_id.clone()),
            Json(SelectTabRequest { tab: TabId::Chat }),
        )
        .await
        .unwrap()
        .0;
        assert!(!first.reset);
        assert_eq!(first.history.len(), 1);

        // Put some conversation into the log
        {
            let handle = state.sessions.get(&session_id).await.unwrap();
            let mut session = handle.lock().await;
            session.append_user("hello".to_string());
            session.append_assistant("hi".to_string());
        }

        let switched = select_tab(
            State(state.clone()),
            Path(session_id.clone()),
            Json(SelectTabRequest {
                tab: TabId::Document,
            }),
        )
        .await
        .unwrap()
        .0;
        assert!(switched.reset);
        assert_eq!(switched.history.len(), 1);
        assert_eq!(switched.history[0].content, GREETING);

        // Re-selecting the same tab is a no-op
        let unchanged = select_tab(
            State(state),
            Path(session_id),
            Json(SelectTabRequest {
                tab: TabId::Document,
            }),
        )
        .await
        .unwrap()
        .0;
        assert!(!unchanged.reset);
    }

    #[tokio::test]
    async fn test_get_history_unknown_session() {
        let (state, _temp_dir) = test_state().await;
        let result = get_history(State(state), Path("nonexistent".to_string())).await;
        assert!(matches!(
            result.unwrap_err(),
            AppError::SessionNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_delete_session() {
        let (state, _temp_dir) = test_state().await;
        let session_id = create_session(State(state.clone())).await.0.session_id;

        assert!(delete_session(State(state.clone()), Path(session_id.clone()))
            .await
            .is_ok());
        let result = delete_session(State(state), Path(session_id)).await;
        assert!(matches!(
            result.unwrap_err(),
            AppError::SessionNotFound(_)
        ));
    }
}
