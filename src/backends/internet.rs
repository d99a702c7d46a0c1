//! Internet search backend
//!
//! Queries the DuckDuckGo Instant Answer API and has the model
//! synthesize a reply from the returned snippets in a single shot. Keeps
//! no conversation memory, matching the search agent it replaces.

use crate::backends::llm::{ChatMessage, OllamaClient};
use crate::backends::{Answer, BackendAdapter, MemoryConfig, SourceRef, TabResource};
use crate::error::AppError;
use crate::session::controller::{TabId, TabInputs};
use crate::session::log::Turn;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

/// Search results handed to the model per query
const MAX_RESULTS: usize = 5;

const SYNTHESIS_INSTRUCTIONS: &str = "You are a helpful assistant who answers questions using \
internet search results. Base your answer on the provided results and say when they are \
insufficient.";

#[derive(Debug, Deserialize)]
struct InstantAnswer {
    #[serde(default, rename = "AbstractText")]
    abstract_text: String,
    #[serde(default, rename = "AbstractURL")]
    abstract_url: String,
    #[serde(default, rename = "RelatedTopics")]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<RelatedTopic>,
    },
    Topic {
        #[serde(default, rename = "Text")]
        text: String,
        #[serde(default, rename = "FirstURL")]
        first_url: String,
    },
}

/// One flattened search result
#[derive(Debug, Clone)]
struct SearchResult {
    url: String,
    snippet: String,
}

/// Internet search QA adapter
pub struct InternetBackend {
    llm: Arc<OllamaClient>,
    http: reqwest::Client,
    search_url: String,
}

impl InternetBackend {
    /// Create the adapter around a model client and a search API URL
    pub fn new(llm: Arc<OllamaClient>, http: reqwest::Client, search_url: String) -> Self {
        Self {
            llm,
            http,
            search_url,
        }
    }

    /// Run an instant-answer search and flatten the results
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, AppError> {
        let response = self
            .http
            .get(self.search_url.trim_end_matches('/'))
            .query(&[("q", query), ("format", "json"), ("no_html", "1")])
            .send()
            .await
            .map_err(|e| {
                AppError::BackendUnavailable(format!("Search service unreachable: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::BackendUnavailable(format!(
                "Search service returned HTTP {}",
                status.as_u16()
            )));
        }

        let body: InstantAnswer = response.json().await.map_err(|e| {
            AppError::BackendUnavailable(format!("Invalid search response: {}", e))
        })?;

        let mut results = Vec::new();
        if !body.abstract_text.is_empty() {
            results.push(SearchResult {
                url: body.abstract_url,
                snippet: body.abstract_text,
            });
        }
        flatten_topics(&body.related_topics, &mut results);
        results.truncate(MAX_RESULTS);
        Ok(results)
    }
}

fn flatten_topics(topics: &[RelatedTopic], out: &mut Vec<SearchResult>) {
    for topic in topics {
        match topic {
            RelatedTopic::Topic { text, first_url } if !text.is_empty() => {
                out.push(SearchResult {
                    url: first_url.clone(),
                    snippet: text.clone(),
                });
            }
            RelatedTopic::Group { topics } => flatten_topics(topics, out),
            RelatedTopic::Topic { .. } => {}
        }
    }
}

#[async_trait]
impl BackendAdapter for InternetBackend {
    fn tab(&self) -> TabId {
        TabId::Internet
    }

    async fn prepare(&self, _inputs: &TabInputs) -> Result<Option<TabResource>, AppError> {
        Ok(None)
    }

    async fn answer(
        &self,
        query: &str,
        _memory: MemoryConfig,
        _history: &[Turn],
        _resource: Option<&TabResource>,
    ) -> Result<Answer, AppError> {
        let results = self.search(query).await?;

        let mut context = String::new();
        if results.is_empty() {
            context.push_str("No search results were found for this question.\n\n");
        }
        for (idx, result) in results.iter().enumerate() {
            context.push_str(&format!(
                "Result {} ({}):\n{}\n\n",
                idx + 1,
                result.url,
                result.snippet
            ));
        }

        let messages = vec![
            ChatMessage::system(SYNTHESIS_INSTRUCTIONS),
            ChatMessage::user(format!("{}Question: {}", context, query)),
        ];
        let text = self.llm.chat(messages).await?;

        let sources = results
            .into_iter()
            .map(|result| SourceRef {
                label: result.url,
                excerpt: result.snippet,
            })
            .collect();
        Ok(Answer { text, sources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serial_test::serial;

    const SEARCH_BODY: &str = r#"{
        "AbstractText": "Rust is a general-purpose programming language.",
        "AbstractURL": "https://en.wikipedia.org/wiki/Rust_(programming_language)",
        "RelatedTopics": [
            {"Text": "Cargo - the Rust package manager", "FirstURL": "https://example.com/cargo"},
            {"Topics": [
                {"Text": "Borrow checker", "FirstURL": "https://example.com/borrowck"}
            ]}
        ]
    }"#;

    #[tokio::test]
    #[serial]
    async fn test_answer_synthesizes_from_search_results() {
        let mut search_server = Server::new_async().await;
        let search_mock = search_server
            .mock("GET", "/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "what is rust".into()),
                Matcher::UrlEncoded("format".into(), "json".into()),
            ]))
            .with_status(200)
            .with_body(SEARCH_BODY)
            .create_async()
            .await;

        let mut llm_server = Server::new_async().await;
        let _llm_mock = llm_server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body(
                r#"{"message": {"role": "assistant", "content": "Rust is a language."}, "done": true}"#,
            )
            .create_async()
            .await;

        let backend = InternetBackend::new(
            Arc::new(OllamaClient::with_base_url(
                llm_server.url(),
                "llama3.1".to_string(),
            )),
            reqwest::Client::new(),
            search_server.url(),
        );

        let answer = backend
            .answer("what is rust", MemoryConfig::FullHistory, &[], None)
            .await
            .unwrap();

        search_mock.assert_async().await;
        assert_eq!(answer.text, "Rust is a language.");
        // Abstract plus both topics, nested group flattened
        assert_eq!(answer.sources.len(), 3);
        assert_eq!(
            answer.sources[0].label,
            "https://en.wikipedia.org/wiki/Rust_(programming_language)"
        );
        assert_eq!(answer.sources[2].label, "https://example.com/borrowck");
    }

    #[tokio::test]
    #[serial]
    async fn test_search_error_is_backend_unavailable() {
        let mut search_server = Server::new_async().await;
        let _mock = search_server
            .mock("GET", "/")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let backend = InternetBackend::new(
            Arc::new(OllamaClient::with_base_url(
                "http://127.0.0.1:1".to_string(),
                "llama3.1".to_string(),
            )),
            reqwest::Client::new(),
            search_server.url(),
        );

        let result = backend
            .answer("anything", MemoryConfig::FullHistory, &[], None)
            .await;
        assert!(matches!(
            result.unwrap_err(),
            AppError::BackendUnavailable(_)
        ));
    }
}
