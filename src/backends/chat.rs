//! Plain chatbot backend
//!
//! Sends the windowed conversation history and the new query straight to
//! the model. Needs no prepared resource and produces no sources.

use crate::backends::llm::{ChatMessage, OllamaClient};
use crate::backends::{Answer, BackendAdapter, MemoryConfig, TabResource};
use crate::error::AppError;
use crate::session::controller::{TabId, TabInputs};
use crate::session::log::Turn;
use async_trait::async_trait;
use std::sync::Arc;

/// Conversational chatbot adapter
pub struct ChatBackend {
    llm: Arc<OllamaClient>,
}

impl ChatBackend {
    /// Create the adapter around a model client
    pub fn new(llm: Arc<OllamaClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl BackendAdapter for ChatBackend {
    fn tab(&self) -> TabId {
        TabId::Chat
    }

    async fn prepare(&self, _inputs: &TabInputs) -> Result<Option<TabResource>, AppError> {
        Ok(None)
    }

    async fn answer(
        &self,
        query: &str,
        memory: MemoryConfig,
        history: &[Turn],
        _resource: Option<&TabResource>,
    ) -> Result<Answer, AppError> {
        let mut messages = OllamaClient::history_messages(memory.window(history));
        messages.push(ChatMessage::user(query));

        let text = self.llm.chat(messages).await?;
        Ok(Answer::plain(text))
    }
}
