//! Language model client
//!
//! Direct HTTP client for an Ollama-style `/api/chat` endpoint. Every
//! failure mode (connection refused, timeout, error status, malformed
//! body) maps to `BackendUnavailable` so the session pipeline can record
//! it as an assistant-role error turn.

use crate::config::LlmConfig;
use crate::error::AppError;
use crate::session::log::{Role, Turn};
use serde::{Deserialize, Serialize};

/// One message in a chat completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "system", "user", or "assistant"
    pub role: String,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// A system-role message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// A user-role message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// An assistant-role message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatApiRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatApiResponse {
    message: ChatMessage,
}

/// Client for the configured chat model
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    /// Create a client from configuration
    pub fn new(config: &LlmConfig) -> Self {
        Self::with_base_url(config.base_url.clone(), config.model.clone())
    }

    /// Create a client against an explicit base URL (used by tests)
    pub fn with_base_url(base_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            model,
        }
    }

    /// The configured model identifier
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run a non-streaming chat completion and return the reply text
    pub async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, AppError> {
        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        let request_body = ChatApiRequest {
            model: self.model.clone(),
            messages,
            stream: false,
        };

        tracing::debug!(
            url = %url,
            model = %self.model,
            message_count = request_body.messages.len(),
            "Calling chat model"
        );

        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                AppError::BackendUnavailable(format!("Model service unreachable: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            tracing::error!(
                status_code = status.as_u16(),
                error_body = %error_body,
                "Chat model returned error status"
            );
            return Err(AppError::BackendUnavailable(format!(
                "Model service returned HTTP {}: {}",
                status.as_u16(),
                error_body
            )));
        }

        let body: ChatApiResponse = response.json().await.map_err(|e| {
            AppError::BackendUnavailable(format!("Invalid model response: {}", e))
        })?;

        Ok(body.message.content)
    }

    /// Convert a turn history into chat messages
    pub fn history_messages(history: &[Turn]) -> Vec<ChatMessage> {
        history
            .iter()
            .map(|turn| match turn.role {
                Role::User => ChatMessage::user(turn.content.clone()),
                Role::Assistant => ChatMessage::assistant(turn.content.clone()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::log::MessageLog;
    use mockito::Server;
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    async fn test_chat_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .match_header("content-type", "application/json")
            .with_status(200)
            .with_body(
                r#"{
                    "model": "llama3.1",
                    "message": {"role": "assistant", "content": "Hello from the model"},
                    "done": true
                }"#,
            )
            .create_async()
            .await;

        let client = OllamaClient::with_base_url(server.url(), "llama3.1".to_string());
        let result = client.chat(vec![ChatMessage::user("hi")]).await;

        mock.assert_async().await;
        assert_eq!(result.unwrap(), "Hello from the model");
    }

    #[tokio::test]
    #[serial]
    async fn test_chat_error_status_is_backend_unavailable() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/chat")
            .with_status(500)
            .with_body("model crashed")
            .create_async()
            .await;

        let client = OllamaClient::with_base_url(server.url(), "llama3.1".to_string());
        let result = client.chat(vec![ChatMessage::user("hi")]).await;
        assert!(matches!(
            result.unwrap_err(),
            AppError::BackendUnavailable(_)
        ));
    }

    #[tokio::test]
    #[serial]
    async fn test_chat_malformed_body_is_backend_unavailable() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let client = OllamaClient::with_base_url(server.url(), "llama3.1".to_string());
        let result = client.chat(vec![ChatMessage::user("hi")]).await;
        assert!(matches!(
            result.unwrap_err(),
            AppError::BackendUnavailable(_)
        ));
    }

    #[tokio::test]
    async fn test_chat_unreachable_service() {
        // Nothing listens on this port
        let client =
            OllamaClient::with_base_url("http://127.0.0.1:1".to_string(), "llama3.1".to_string());
        let result = client.chat(vec![ChatMessage::user("hi")]).await;
        assert!(matches!(
            result.unwrap_err(),
            AppError::BackendUnavailable(_)
        ));
    }

    #[test]
    fn test_history_messages_preserves_roles() {
        let mut log = MessageLog::with_greeting();
        log.append_user("question".to_string());
        log.append_assistant("reply".to_string());

        let messages = OllamaClient::history_messages(log.turns());
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, "assistant");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content, "question");
        assert_eq!(messages[2].role, "assistant");
    }
}
