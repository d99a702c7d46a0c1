//! Query API endpoint
//!
//! Runs one query through the session pipeline: validate input, resolve
//! or build the active tab's cached resource, append the user turn, call
//! the backend under a bounded wait, and append the assistant turn.
//!
//! Error policy: missing inputs stop the pipeline before anything is
//! logged; backend failures after the user turn is appended are recorded
//! as an assistant-role error turn so the log ordering stays intact. No
//! failure is fatal to the session.

use crate::api::utils::{lookup_session, validate_query, SharedState};
use crate::backends::{MemoryConfig, SourceRef};
use crate::error::AppError;
use crate::session::{Role, Turn};
use crate::websocket::SessionEvent;
use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Request to ask the active tab a question
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    /// The user's question
    pub message: String,
    /// Conversational memory policy for this query
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// Query response
#[derive(Debug, Serialize)]
pub struct AskResponse {
    /// The assistant turn recorded for this query
    pub response: String,
    /// Whether the backend answered (false when an error turn was recorded)
    pub success: bool,
    /// References backing the answer
    pub sources: Vec<SourceRef>,
}

/// POST /api/sessions/:id/ask - Run a query against the active tab
pub async fn ask(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    // Reject bad input before any log mutation
    validate_query(&request.message)?;
    request.memory.validate()?;

    let handle = lookup_session(&state, &id).await?;
    // Holding the lock for the whole pipeline serializes queries per session
    let mut session = handle.lock().await;

    let tab = session
        .active_tab()
        .ok_or_else(|| AppError::InvalidQuery("No tab selected yet".to_string()))?;
    let adapter = state.backends.get(tab).ok_or_else(|| {
        AppError::InvalidQuery(format!("The {} tab does not accept queries", tab.as_str()))
    })?;

    let timeout = Duration::from_secs(state.config.query.answer_timeout_secs);

    // Build the tab's resource at most once per activation, under the
    // same bounded wait as the answer call so a hung scrape or database
    // connect cannot wedge the session. A missing input stops here,
    // before the user turn is appended.
    if session.cached(tab).is_none() {
        let prepared = tokio::time::timeout(timeout, adapter.prepare(session.inputs()))
            .await
            .map_err(|_| {
                AppError::BackendUnavailable(format!(
                    "no response within {} seconds while preparing the {} tab",
                    timeout.as_secs(),
                    tab.as_str()
                ))
            })??;
        if let Some(resource) = prepared {
            session.store_resource(tab, resource);
        }
    }

    let history: Vec<Turn> = session.log().turns().to_vec();
    session.append_user(request.message.clone());
    state.notify(SessionEvent::TurnAppended {
        session_id: id.clone(),
        role: Role::User,
        content: request.message.clone(),
    });

    info!(
        session_id = %id,
        tab = tab.as_str(),
        query_len = request.message.len(),
        "Running query"
    );

    let outcome = tokio::time::timeout(
        timeout,
        adapter.answer(&request.message, request.memory, &history, session.cached(tab)),
    )
    .await;

    let (response, success, sources) = match outcome {
        Ok(Ok(answer)) => (answer.text, true, answer.sources),
        Ok(Err(e)) => {
            warn!(session_id = %id, tab = tab.as_str(), error = %e, "Backend answer failed");
            (format!("Sorry, I could not answer that. {}", e), false, Vec::new())
        }
        Err(_) => {
            warn!(
                session_id = %id,
                tab = tab.as_str(),
                timeout_secs = timeout.as_secs(),
                "Backend answer timed out"
            );
            (
                format!(
                    "Sorry, I could not answer that. {}",
                    AppError::BackendUnavailable(format!(
                        "no response within {} seconds",
                        timeout.as_secs()
                    ))
                ),
                false,
                Vec::new(),
            )
        }
    };

    session.append_assistant(response.clone());
    state.notify(SessionEvent::TurnAppended {
        session_id: id,
        role: Role::Assistant,
        content: response.clone(),
    });

    Ok(Json(AskResponse {
        response,
        success,
        sources,
    }))
}
