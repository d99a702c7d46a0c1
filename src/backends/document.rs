//! Uploaded-document QA backend
//!
//! Builds a chunked corpus from the text of the session's stored uploads
//! and answers queries with the most relevant chunks as context. Rich
//! formats (PDF and friends) are extracted by the uploading client; this
//! side treats blobs as text.

use crate::backends::corpus::{Corpus, SourceDoc, TOP_K};
use crate::backends::llm::{ChatMessage, OllamaClient};
use crate::backends::{Answer, BackendAdapter, MemoryConfig, SourceRef, TabResource};
use crate::error::AppError;
use crate::session::controller::{TabId, TabInputs};
use crate::session::log::Turn;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

const CONTEXT_INSTRUCTIONS: &str = "You are a helpful assistant answering questions about uploaded \
documents. Use only the provided document excerpts to answer. If the excerpts do not contain the \
answer, say so.";

/// Document QA adapter
pub struct DocumentBackend {
    llm: Arc<OllamaClient>,
}

impl DocumentBackend {
    /// Create the adapter around a model client
    pub fn new(llm: Arc<OllamaClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl BackendAdapter for DocumentBackend {
    fn tab(&self) -> TabId {
        TabId::Document
    }

    async fn prepare(&self, inputs: &TabInputs) -> Result<Option<TabResource>, AppError> {
        if inputs.documents().is_empty() {
            return Err(AppError::NoInputProvided(
                "Please upload documents to continue".to_string(),
            ));
        }

        let mut docs = Vec::new();
        for document in inputs.documents() {
            match tokio::fs::read(&document.path).await {
                Ok(bytes) => docs.push(SourceDoc {
                    label: document.name.clone(),
                    text: String::from_utf8_lossy(&bytes).into_owned(),
                }),
                Err(e) => {
                    warn!(name = %document.name, error = %e, "Skipping unreadable document");
                }
            }
        }

        let corpus = Corpus::build(docs);
        if corpus.is_empty() {
            return Err(AppError::Storage(
                "None of the uploaded documents could be read".to_string(),
            ));
        }
        Ok(Some(TabResource::Corpus(Arc::new(corpus))))
    }

    async fn answer(
        &self,
        query: &str,
        memory: MemoryConfig,
        history: &[Turn],
        resource: Option<&TabResource>,
    ) -> Result<Answer, AppError> {
        let corpus = match resource {
            Some(TabResource::Corpus(corpus)) => corpus,
            _ => {
                return Err(AppError::Internal(anyhow::anyhow!(
                    "document resource missing"
                )))
            }
        };

        let selected = corpus.select(query, TOP_K);
        let mut context = String::new();
        for (idx, chunk) in selected.iter().enumerate() {
            context.push_str(&format!(
                "Excerpt {} (from {}):\n{}\n\n",
                idx + 1,
                chunk.label,
                chunk.text
            ));
        }

        let mut messages = vec![ChatMessage::system(CONTEXT_INSTRUCTIONS)];
        messages.extend(OllamaClient::history_messages(memory.window(history)));
        messages.push(ChatMessage::user(format!("{}Question: {}", context, query)));

        let text = self.llm.chat(messages).await?;
        let sources = selected
            .into_iter()
            .map(|chunk| SourceRef {
                label: chunk.label.clone(),
                excerpt: chunk.text.clone(),
            })
            .collect();
        Ok(Answer { text, sources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::uploads::StoredDocument;
    use mockito::Server;
    use serial_test::serial;
    use tempfile::tempdir;

    fn backend(llm_url: String) -> DocumentBackend {
        DocumentBackend::new(Arc::new(OllamaClient::with_base_url(
            llm_url,
            "llama3.1".to_string(),
        )))
    }

    #[tokio::test]
    async fn test_prepare_without_documents_is_no_input() {
        let backend = backend("http://127.0.0.1:1".to_string());
        let result = backend.prepare(&TabInputs::default()).await;
        assert!(matches!(result.unwrap_err(), AppError::NoInputProvided(_)));
    }

    #[tokio::test]
    async fn test_prepare_reads_stored_documents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "rust ownership rules explained").unwrap();

        let backend = backend("http://127.0.0.1:1".to_string());
        let mut inputs = TabInputs::default();
        inputs.add_document(StoredDocument {
            name: "notes.txt".to_string(),
            path,
            size: 30,
        });

        let resource = backend.prepare(&inputs).await.unwrap();
        match resource {
            Some(TabResource::Corpus(corpus)) => assert_eq!(corpus.len(), 1),
            other => panic!("Expected corpus resource, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_prepare_with_only_missing_files_is_storage_error() {
        let backend = backend("http://127.0.0.1:1".to_string());
        let mut inputs = TabInputs::default();
        inputs.add_document(StoredDocument {
            name: "gone.txt".to_string(),
            path: "/nonexistent/gone.txt".into(),
            size: 0,
        });

        let result = backend.prepare(&inputs).await;
        assert!(matches!(result.unwrap_err(), AppError::Storage(_)));
    }

    #[tokio::test]
    #[serial]
    async fn test_answer_cites_document_names() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body(
                r#"{"message": {"role": "assistant", "content": "Ownership moves values"}, "done": true}"#,
            )
            .create_async()
            .await;

        let backend = backend(server.url());
        let corpus = Corpus::build(vec![SourceDoc {
            label: "notes.txt".to_string(),
            text: "ownership moves values between bindings".to_string(),
        }]);
        let resource = TabResource::Corpus(Arc::new(corpus));

        let answer = backend
            .answer(
                "what does ownership do?",
                MemoryConfig::SlidingWindow { window_size: 5 },
                &[],
                Some(&resource),
            )
            .await
            .unwrap();

        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.sources[0].label, "notes.txt");
    }
}
