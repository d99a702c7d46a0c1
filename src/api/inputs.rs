//! Tab input API endpoints
//!
//! Manages the per-session inputs that back the Document and WebAccess
//! tabs: the website URL list and uploaded documents. Both survive tab
//! switches; changing either invalidates the owning tab's cached
//! resource so the next query rebuilds it.

use crate::api::utils::{lookup_session, SharedState};
use crate::error::AppError;
use crate::services::StoredDocument;
use crate::session::TabId;
use axum::{
    extract::{Multipart, Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Request to register a website URL
#[derive(Debug, Deserialize)]
pub struct AddUrlRequest {
    /// The URL to scrape for the WebAccess tab
    pub url: String,
}

/// The session's current URL list
#[derive(Debug, Serialize)]
pub struct UrlListResponse {
    /// Registered URLs in insertion order
    pub urls: Vec<String>,
}

/// Metadata for one uploaded document
#[derive(Debug, Serialize)]
pub struct DocumentInfo {
    /// Original upload filename
    pub name: String,
    /// Size in bytes
    pub size: u64,
}

/// The session's current document list
#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    /// Uploaded documents in upload order
    pub documents: Vec<DocumentInfo>,
}

/// Result of an upload request
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Documents stored by this request
    pub uploaded: Vec<DocumentInfo>,
}

fn validate_url(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim();
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        return Err(AppError::InvalidQuery(
            "URL must start with http:// or https://".to_string(),
        ));
    }
    let parsed = reqwest::Url::parse(trimmed)
        .map_err(|e| AppError::InvalidQuery(format!("Invalid URL: {}", e)))?;
    Ok(parsed.to_string())
}

/// POST /api/sessions/:id/urls - Add a website URL for the WebAccess tab
pub async fn add_url(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(request): Json<AddUrlRequest>,
) -> Result<Json<UrlListResponse>, AppError> {
    let url = validate_url(&request.url)?;
    let handle = lookup_session(&state, &id).await?;
    let mut session = handle.lock().await;

    if session.inputs_mut().add_url(url.clone()) {
        info!(session_id = %id, url = %url, "Registered website URL");
        session.invalidate(TabId::WebAccess);
    }

    Ok(Json(UrlListResponse {
        urls: session.inputs().urls().to_vec(),
    }))
}

/// GET /api/sessions/:id/urls - List registered website URLs
pub async fn list_urls(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<UrlListResponse>, AppError> {
    let handle = lookup_session(&state, &id).await?;
    let session = handle.lock().await;
    Ok(Json(UrlListResponse {
        urls: session.inputs().urls().to_vec(),
    }))
}

/// DELETE /api/sessions/:id/urls - Clear the website URL list
pub async fn clear_urls(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<UrlListResponse>, AppError> {
    let handle = lookup_session(&state, &id).await?;
    let mut session = handle.lock().await;
    session.inputs_mut().clear_urls();
    session.invalidate(TabId::WebAccess);
    info!(session_id = %id, "Cleared website URLs");
    Ok(Json(UrlListResponse { urls: Vec::new() }))
}

/// POST /api/sessions/:id/documents - Upload documents for the Document tab
pub async fn upload_documents(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let handle = lookup_session(&state, &id).await?;

    let mut stored: Vec<StoredDocument> = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidQuery(format!("Invalid multipart request: {}", e)))?
    {
        let name = match field.file_name() {
            Some(name) => name.to_string(),
            None => continue,
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to read upload '{}': {}", name, e)))?;
        let document = state.uploads.save(&name, &data).await?;
        info!(
            session_id = %id,
            name = %document.name,
            size = document.size,
            "Stored uploaded document"
        );
        stored.push(document);
    }

    if stored.is_empty() {
        return Err(AppError::NoInputProvided(
            "Please attach at least one document".to_string(),
        ));
    }

    let mut session = handle.lock().await;
    let uploaded = stored
        .iter()
        .map(|d| DocumentInfo {
            name: d.name.clone(),
            size: d.size,
        })
        .collect();
    for document in stored {
        session.inputs_mut().add_document(document);
    }
    session.invalidate(TabId::Document);

    Ok(Json(UploadResponse { uploaded }))
}

/// GET /api/sessions/:id/documents - List uploaded documents
pub async fn list_documents(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentListResponse>, AppError> {
    let handle = lookup_session(&state, &id).await?;
    let session = handle.lock().await;
    let documents = session
        .inputs()
        .documents()
        .iter()
        .map(|d| DocumentInfo {
            name: d.name.clone(),
            size: d.size,
        })
        .collect();
    Ok(Json(DocumentListResponse { documents }))
}
