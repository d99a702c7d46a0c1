//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults.

use std::env;
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Upload storage configuration
    pub storage: StorageConfig,
    /// Language model configuration
    pub llm: LlmConfig,
    /// Web access and internet search configuration
    pub web: WebConfig,
    /// SQL tab configuration
    pub sql: SqlConfig,
    /// Query pipeline configuration
    pub query: QueryConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

/// Upload storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory where uploaded document blobs are stored
    pub upload_dir: PathBuf,
}

/// Language model configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Base URL of the Ollama-style chat API
    pub base_url: String,
    /// Model identifier to request
    pub model: String,
}

/// Web access and internet search configuration
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Base URL of the page-to-text reader proxy
    pub reader_url: String,
    /// Base URL of the instant-answer search API
    pub search_url: String,
}

/// SQL tab configuration
#[derive(Debug, Clone)]
pub struct SqlConfig {
    /// SQLite database the SQL tab queries; the tab reports
    /// `NoInputProvided` when unset
    pub database_url: Option<String>,
}

/// Query pipeline configuration
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Bounded wait for a backend answer (in seconds)
    pub answer_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8080),
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            },
            storage: StorageConfig {
                upload_dir: env::var("UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./uploads")),
            },
            llm: LlmConfig {
                base_url: env::var("OLLAMA_URL")
                    .unwrap_or_else(|_| "http://localhost:11434".to_string()),
                model: env::var("LLM_MODEL").unwrap_or_else(|_| "llama3.1".to_string()),
            },
            web: WebConfig {
                reader_url: env::var("READER_URL")
                    .unwrap_or_else(|_| "https://r.jina.ai/".to_string()),
                search_url: env::var("SEARCH_URL")
                    .unwrap_or_else(|_| "https://api.duckduckgo.com/".to_string()),
            },
            sql: SqlConfig {
                database_url: env::var("SQL_DATABASE_URL").ok(),
            },
            query: QueryConfig {
                answer_timeout_secs: env::var("ANSWER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|t| t.parse().ok())
                    .unwrap_or(120),
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
impl Config {
    /// Configuration for tests, independent of the process environment
    pub(crate) fn for_tests(upload_dir: PathBuf) -> Self {
        Self {
            server: ServerConfig {
                port: 0,
                host: "127.0.0.1".to_string(),
            },
            storage: StorageConfig { upload_dir },
            llm: LlmConfig {
                base_url: "http://127.0.0.1:1".to_string(),
                model: "llama3.1".to_string(),
            },
            web: WebConfig {
                reader_url: "http://127.0.0.1:1/".to_string(),
                search_url: "http://127.0.0.1:1/".to_string(),
            },
            sql: SqlConfig { database_url: None },
            query: QueryConfig {
                answer_timeout_secs: 5,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "PORT",
            "HOST",
            "UPLOAD_DIR",
            "OLLAMA_URL",
            "LLM_MODEL",
            "READER_URL",
            "SEARCH_URL",
            "SQL_DATABASE_URL",
            "ANSWER_TIMEOUT_SECS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_config_defaults() {
        clear_env();
        let config = Config::from_env();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
        assert_eq!(config.llm.model, "llama3.1");
        assert_eq!(config.storage.upload_dir, PathBuf::from("./uploads"));
        assert!(config.sql.database_url.is_none());
        assert_eq!(config.query.answer_timeout_secs, 120);
    }

    #[test]
    #[serial]
    fn test_config_from_env_overrides() {
        clear_env();
        env::set_var("PORT", "9999");
        env::set_var("HOST", "127.0.0.1");
        env::set_var("LLM_MODEL", "mistral");
        env::set_var("SQL_DATABASE_URL", "sqlite:/tmp/etrade.db");
        env::set_var("ANSWER_TIMEOUT_SECS", "5");

        let config = Config::from_env();
        assert_eq!(config.server_addr(), "127.0.0.1:9999");
        assert_eq!(config.llm.model, "mistral");
        assert_eq!(
            config.sql.database_url.as_deref(),
            Some("sqlite:/tmp/etrade.db")
        );
        assert_eq!(config.query.answer_timeout_secs, 5);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_invalid_port_falls_back() {
        clear_env();
        env::set_var("PORT", "not-a-port");
        let config = Config::from_env();
        assert_eq!(config.server.port, 8080);
        clear_env();
    }
}
