//! Upload storage service
//!
//! Persists uploaded document blobs under the configured storage
//! directory. Stored names are qualified with a content hash so the same
//! filename with different content never collides and nothing is
//! silently overwritten.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// Hex characters of the content digest used in stored filenames
const DIGEST_PREFIX_LEN: usize = 8;

/// Record of one stored upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    /// Original upload filename
    pub name: String,
    /// Path of the stored blob
    pub path: PathBuf,
    /// Blob size in bytes
    pub size: u64,
}

/// Blob store rooted at the configured upload directory
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    /// Create a store rooted at the given directory
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Ensure the storage directory exists
    pub async fn ensure_dir(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to create upload directory: {}", e)))
    }

    /// Save an uploaded blob and return its record
    ///
    /// The stored filename is `{first 8 hex of sha256(content)}-{name}`
    /// with any path components stripped from the original name.
    pub async fn save(&self, original_name: &str, content: &[u8]) -> Result<StoredDocument, AppError> {
        let name = sanitize_filename(original_name)?;
        let digest = Sha256::digest(content);
        let prefix: String = digest
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<String>()
            .chars()
            .take(DIGEST_PREFIX_LEN)
            .collect();

        self.ensure_dir().await?;
        let path = self.root.join(format!("{}-{}", prefix, name));
        fs::write(&path, content)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to store {}: {}", name, e)))?;

        info!(name = %name, path = %path.display(), size = content.len(), "Upload stored");
        Ok(StoredDocument {
            name,
            path,
            size: content.len() as u64,
        })
    }
}

/// Strip path components and reject names that end up empty
fn sanitize_filename(original: &str) -> Result<String, AppError> {
    let name = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .trim()
        .to_string();
    if name.is_empty() || name == "." || name == ".." {
        return Err(AppError::Storage(format!(
            "Invalid upload filename: {:?}",
            original
        )));
    }
    Ok(name)
}
