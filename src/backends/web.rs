//! Web page QA backend
//!
//! Fetches each user-supplied URL through a page-to-text reader proxy,
//! builds a chunked corpus from the extracted text, and answers queries
//! with the most relevant chunks as context. The corpus is the tab's
//! cached resource and is rebuilt when the URL set changes.

use crate::backends::corpus::{Corpus, SourceDoc, TOP_K};
use crate::backends::llm::{ChatMessage, OllamaClient};
use crate::backends::{Answer, BackendAdapter, MemoryConfig, SourceRef, TabResource};
use crate::error::AppError;
use crate::session::controller::{TabId, TabInputs};
use crate::session::log::Turn;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:88.0) Gecko/20100101 Firefox/88.0";

const CONTEXT_INSTRUCTIONS: &str = "You are a helpful assistant answering questions about web pages. \
Use only the provided page excerpts to answer. If the excerpts do not contain the answer, say so.";

/// Web-based QA adapter
pub struct WebAccessBackend {
    llm: Arc<OllamaClient>,
    http: reqwest::Client,
    reader_url: String,
}

impl WebAccessBackend {
    /// Create the adapter around a model client and a reader proxy URL
    pub fn new(llm: Arc<OllamaClient>, http: reqwest::Client, reader_url: String) -> Self {
        Self {
            llm,
            http,
            reader_url,
        }
    }

    /// Fetch one URL through the reader proxy and return its text
    async fn scrape(&self, url: &str) -> Result<String, AppError> {
        let target = format!("{}{}", self.reader_url, url);
        let response = self
            .http
            .get(&target)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|e| AppError::BackendUnavailable(format!("Failed to fetch {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::BackendUnavailable(format!(
                "Reader returned HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::BackendUnavailable(format!("Failed to read {}: {}", url, e)))
    }
}

#[async_trait]
impl BackendAdapter for WebAccessBackend {
    fn tab(&self) -> TabId {
        TabId::WebAccess
    }

    async fn prepare(&self, inputs: &TabInputs) -> Result<Option<TabResource>, AppError> {
        if inputs.urls().is_empty() {
            return Err(AppError::NoInputProvided(
                "Please enter a website URL to continue".to_string(),
            ));
        }

        let mut docs = Vec::new();
        for url in inputs.urls() {
            match self.scrape(url).await {
                Ok(text) => docs.push(SourceDoc {
                    label: url.clone(),
                    text,
                }),
                Err(e) => {
                    // One unreachable page should not sink the rest
                    warn!(url = %url, error = %e, "Skipping unreachable URL");
                }
            }
        }

        let corpus = Corpus::build(docs);
        if corpus.is_empty() {
            return Err(AppError::BackendUnavailable(
                "None of the provided URLs could be fetched".to_string(),
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
                    "web access resource missing"
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
        messages.push(ChatMessage::user(format!(
            "{}Question: {}",
            context, query
        )));

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
