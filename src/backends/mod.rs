//! Backend adapters
//!
//! One adapter per queryable tab, all exposing the same contract: an
//! optional `prepare` step that builds the tab's cached resource from the
//! session inputs, and an `answer` call that turns a query plus windowed
//! history into a response with sources. Generation is delegated to the
//! external LLM service; adapters only assemble context.

pub mod chat;
pub mod corpus;
pub mod document;
pub mod internet;
pub mod llm;
pub mod sql;
pub mod web;

use crate::config::Config;
use crate::error::AppError;
use crate::session::controller::{TabId, TabInputs};
use crate::session::log::Turn;
use async_trait::async_trait;
use corpus::Corpus;
use serde::{Deserialize, Serialize};
use sql::SqlHandle;
use std::collections::HashMap;
use std::sync::Arc;

/// User-selected policy for how much conversational context an adapter
/// retains
///
/// Unknown kinds are rejected at deserialization; a zero window size is
/// rejected by [`MemoryConfig::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MemoryConfig {
    /// Send the full conversation history
    FullHistory,
    /// Send only the last `window_size` user/assistant exchanges
    SlidingWindow {
        /// Number of exchanges to retain; must be at least 1
        window_size: u32,
    },
}

impl Default for MemoryConfig {
    fn default() -> Self {
        MemoryConfig::FullHistory
    }
}

impl MemoryConfig {
    /// Validate the configuration at the API boundary
    pub fn validate(&self) -> Result<(), AppError> {
        match self {
            MemoryConfig::FullHistory => Ok(()),
            MemoryConfig::SlidingWindow { window_size: 0 } => Err(AppError::InvalidQuery(
                "Sliding window size must be at least 1".to_string(),
            )),
            MemoryConfig::SlidingWindow { .. } => Ok(()),
        }
    }

    /// Apply the policy to a turn history
    ///
    /// A sliding window of `k` exchanges keeps the last `2 * k` turns.
    pub fn window<'a>(&self, turns: &'a [Turn]) -> &'a [Turn] {
        match self {
            MemoryConfig::FullHistory => turns,
            MemoryConfig::SlidingWindow { window_size } => {
                let keep = (*window_size as usize).saturating_mul(2);
                let start = turns.len().saturating_sub(keep);
                &turns[start..]
            }
        }
    }
}

/// A reference backing part of an answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Human-readable label (URL, filename, or query description)
    pub label: String,
    /// Excerpt of the referenced content
    pub excerpt: String,
}

/// Result of a backend answer call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// The assistant's reply text
    pub text: String,
    /// Ordered references backing the reply
    pub sources: Vec<SourceRef>,
}

impl Answer {
    /// An answer with no sources
    pub fn plain(text: String) -> Self {
        Self {
            text,
            sources: Vec::new(),
        }
    }
}

/// Opaque per-tab resource cached by the session controller between
/// queries and invalidated on tab change
#[derive(Debug, Clone)]
pub enum TabResource {
    /// Chunked retrieval corpus (Document and WebAccess tabs)
    Corpus(Arc<Corpus>),
    /// Live database pool plus schema snapshot (SQL tab)
    Sql(Arc<SqlHandle>),
}

impl TabResource {
    /// Release the resource on cache invalidation
    ///
    /// Corpora are plain memory and just drop. Database pools are closed
    /// in the background; if no runtime is available to schedule the
    /// close, the error is reported so the caller can log it, and the
    /// connections still close on drop.
    pub fn release(self) -> Result<(), AppError> {
        match self {
            TabResource::Corpus(_) => Ok(()),
            TabResource::Sql(handle) => {
                let pool = handle.pool().clone();
                match tokio::runtime::Handle::try_current() {
                    Ok(rt) => {
                        rt.spawn(async move { pool.close().await });
                        Ok(())
                    }
                    Err(_) => Err(AppError::StateResetFailure(
                        "no async runtime to close the database pool; connections close on drop"
                            .to_string(),
                    )),
                }
            }
        }
    }
}

/// Contract every tab backend implements
///
/// `answer` is retry-safe: adapters perform no partial external side
/// effects visible to the session controller. It may be long-running;
/// the caller bounds it with a timeout.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// The tab this adapter serves
    fn tab(&self) -> TabId;

    /// Build the tab's cached resource from the session inputs
    ///
    /// Returns `None` for tabs that need no resource. Fails with
    /// `NoInputProvided` when required inputs are missing, in which case
    /// `answer` must not be called.
    async fn prepare(&self, inputs: &TabInputs) -> Result<Option<TabResource>, AppError>;

    /// Answer a query using the windowed history and the prepared
    /// resource
    async fn answer(
        &self,
        query: &str,
        memory: MemoryConfig,
        history: &[Turn],
        resource: Option<&TabResource>,
    ) -> Result<Answer, AppError>;
}

/// Registry resolving a tab to its adapter
pub struct BackendSet {
    adapters: HashMap<TabId, Arc<dyn BackendAdapter>>,
}

impl BackendSet {
    /// Build the full adapter set from configuration
    pub fn from_config(config: &Config) -> Self {
        let llm = Arc::new(llm::OllamaClient::new(&config.llm));
        let http = reqwest::Client::new();

        let mut adapters: HashMap<TabId, Arc<dyn BackendAdapter>> = HashMap::new();
        adapters.insert(TabId::Chat, Arc::new(chat::ChatBackend::new(llm.clone())));
        adapters.insert(
            TabId::Document,
            Arc::new(document::DocumentBackend::new(llm.clone())),
        );
        adapters.insert(
            TabId::WebAccess,
            Arc::new(web::WebAccessBackend::new(
                llm.clone(),
                http.clone(),
                config.web.reader_url.clone(),
            )),
        );
        adapters.insert(
            TabId::Internet,
            Arc::new(internet::InternetBackend::new(
                llm.clone(),
                http,
                config.web.search_url.clone(),
            )),
        );
        adapters.insert(
            TabId::Sql,
            Arc::new(sql::SqlBackend::new(llm, config.sql.database_url.clone())),
        );
        Self { adapters }
    }

    /// Look up the adapter serving a tab
    ///
    /// Returns `None` for tabs that accept no queries (About).
    pub fn get(&self, tab: TabId) -> Option<Arc<dyn BackendAdapter>> {
        self.adapters.get(&tab).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::log::MessageLog;

    fn history_of(len: usize) -> MessageLog {
        let mut log = MessageLog::with_greeting();
        for i in 0..len {
            log.append_user(format!("q{}", i));
            log.append_assistant(format!("a{}", i));
        }
        log
    }

    #[test]
    fn test_full_history_keeps_everything() {
        let log = history_of(4);
        let memory = MemoryConfig::FullHistory;
        assert_eq!(memory.window(log.turns()).len(), 9);
    }

    #[test]
    fn test_sliding_window_keeps_last_exchanges() {
        let log = history_of(4);
        let memory = MemoryConfig::SlidingWindow { window_size: 2 };
        let window = memory.window(log.turns());
        assert_eq!(window.len(), 4);
        assert_eq!(window[0].content, "q2");
        assert_eq!(window[3].content, "a3");
    }

    #[test]
    fn test_sliding_window_larger_than_history() {
        let log = history_of(1);
        let memory = MemoryConfig::SlidingWindow { window_size: 10 };
        assert_eq!(memory.window(log.turns()).len(), 3);
    }

    #[test]
    fn test_zero_window_size_is_invalid() {
        let memory = MemoryConfig::SlidingWindow { window_size: 0 };
        assert!(matches!(
            memory.validate(),
            Err(AppError::InvalidQuery(_))
        ));
        assert!(MemoryConfig::FullHistory.validate().is_ok());
    }

    #[test]
    fn test_unknown_memory_kind_rejected_by_serde() {
        let result: Result<MemoryConfig, _> =
            serde_json::from_str(r#"{"kind": "episodic_memory"}"#);
        assert!(result.is_err());

        let parsed: MemoryConfig =
            serde_json::from_str(r#"{"kind": "sliding_window", "window_size": 5}"#).unwrap();
        assert_eq!(parsed, MemoryConfig::SlidingWindow { window_size: 5 });
    }
}
