//! SQL QA backend
//!
//! Natural-language question answering against a live SQLite database.
//! `prepare` connects a pool and snapshots the schema; `answer` has the
//! model generate a single SELECT from a few-shot prompt, executes it,
//! and has the model phrase the result. Anything but a lone SELECT is
//! rejected before touching the database.

use crate::backends::llm::{ChatMessage, OllamaClient};
use crate::backends::{Answer, BackendAdapter, MemoryConfig, SourceRef, TabResource};
use crate::error::AppError;
use crate::session::controller::{TabId, TabInputs};
use crate::session::log::Turn;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, SqlitePool, TypeInfo, ValueRef};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// Rows included in the phrasing prompt
const MAX_ROWS: usize = 20;

const GENERATION_INSTRUCTIONS: &str = "You translate questions into SQLite SQL. Reply with a \
single SELECT statement and nothing else. Never modify data.

Examples:
Question: Can you fetch the towns with city id 8 from the towns table?
SQLQuery: SELECT * FROM towns WHERE city_id = 8

Question: Can you bring the 5 highest total_price values from the orders table?
SQLQuery: SELECT total_price FROM orders ORDER BY total_price DESC LIMIT 5";

const PHRASING_INSTRUCTIONS: &str = "You answer questions about a SQL database. Given the \
question, the executed SQL, and the result rows, state the answer in plain language.";

/// One table in the schema snapshot
#[derive(Debug, Clone)]
pub struct TableInfo {
    /// Table name
    pub name: String,
    /// The table's CREATE statement
    pub create_sql: String,
}

/// Live database pool plus schema snapshot, cached per tab activation
#[derive(Debug)]
pub struct SqlHandle {
    pool: SqlitePool,
    tables: Vec<TableInfo>,
}

impl SqlHandle {
    /// The connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Snapshot of the user tables
    pub fn tables(&self) -> &[TableInfo] {
        &self.tables
    }
}

/// SQL QA adapter
pub struct SqlBackend {
    llm: Arc<OllamaClient>,
    database_url: Option<String>,
}

impl SqlBackend {
    /// Create the adapter around a model client and an optional database URL
    pub fn new(llm: Arc<OllamaClient>, database_url: Option<String>) -> Self {
        Self { llm, database_url }
    }
}

/// Strip code fences and trailing semicolons from a model-generated query
fn extract_sql(raw: &str) -> String {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```sql") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    let text = text.trim();
    let text = text.strip_prefix("SQLQuery:").unwrap_or(text).trim();
    // Keep only the first statement
    let text = text.split(';').next().unwrap_or(text).trim();
    text.to_string()
}

/// Reject anything but a single read-only SELECT
fn ensure_select(sql: &str) -> Result<(), AppError> {
    let lowered = sql.trim_start().to_lowercase();
    if lowered.starts_with("select") || lowered.starts_with("with") {
        Ok(())
    } else {
        Err(AppError::InvalidQuery(format!(
            "Generated query is not a read-only SELECT: {}",
            sql
        )))
    }
}

/// Render result rows as `column=value` lines for the phrasing prompt
fn render_rows(rows: &[SqliteRow]) -> String {
    if rows.is_empty() {
        return "(no rows)".to_string();
    }
    let mut lines = Vec::new();
    for row in rows.iter().take(MAX_ROWS) {
        let mut fields = Vec::new();
        for (idx, column) in row.columns().iter().enumerate() {
            fields.push(format!("{}={}", column.name(), render_value(row, idx)));
        }
        lines.push(fields.join(", "));
    }
    if rows.len() > MAX_ROWS {
        lines.push(format!("... ({} more rows)", rows.len() - MAX_ROWS));
    }
    lines.join("\n")
}

fn render_value(row: &SqliteRow, idx: usize) -> String {
    let raw = match row.try_get_raw(idx) {
        Ok(raw) => raw,
        Err(_) => return "?".to_string(),
    };
    if raw.is_null() {
        return "NULL".to_string();
    }
    match raw.type_info().name() {
        "INTEGER" => row
            .try_get::<i64, _>(idx)
            .map(|v| v.to_string())
            .unwrap_or_else(|_| "?".to_string()),
        "REAL" => row
            .try_get::<f64, _>(idx)
            .map(|v| v.to_string())
            .unwrap_or_else(|_| "?".to_string()),
        "TEXT" => row
            .try_get::<String, _>(idx)
            .unwrap_or_else(|_| "?".to_string()),
        "BLOB" => row
            .try_get::<Vec<u8>, _>(idx)
            .map(|v| format!("<{} bytes>", v.len()))
            .unwrap_or_else(|_| "<blob>".to_string()),
        other => format!("<{}>", other),
    }
}

#[async_trait]
impl BackendAdapter for SqlBackend {
    fn tab(&self) -> TabId {
        TabId::Sql
    }

    async fn prepare(&self, _inputs: &TabInputs) -> Result<Option<TabResource>, AppError> {
        let database_url = self.database_url.as_deref().ok_or_else(|| {
            AppError::NoInputProvided(
                "No database configured; set SQL_DATABASE_URL to use the SQL tab".to_string(),
            )
        })?;

        let connection_string = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite:{}", database_url)
        };

        let options = SqliteConnectOptions::from_str(&connection_string)
            .map_err(|e| AppError::BackendUnavailable(format!("Invalid database URL: {}", e)))?
            .read_only(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::BackendUnavailable(format!("Failed to connect to database: {}", e))
            })?;

        let rows = sqlx::query(
            "SELECT name, sql FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            AppError::BackendUnavailable(format!("Failed to read database schema: {}", e))
        })?;

        let tables: Vec<TableInfo> = rows
            .iter()
            .map(|row| TableInfo {
                name: row.get::<String, _>(0),
                create_sql: row.get::<Option<String>, _>(1).unwrap_or_default(),
            })
            .collect();

        info!(table_count = tables.len(), "Connected to SQL database");
        Ok(Some(TabResource::Sql(Arc::new(SqlHandle { pool, tables }))))
    }

    async fn answer(
        &self,
        query: &str,
        _memory: MemoryConfig,
        _history: &[Turn],
        resource: Option<&TabResource>,
    ) -> Result<Answer, AppError> {
        let handle = match resource {
            Some(TabResource::Sql(handle)) => handle,
            _ => return Err(AppError::Internal(anyhow::anyhow!("sql resource missing"))),
        };

        let schema = handle
            .tables()
            .iter()
            .map(|t| t.create_sql.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let generation = self
            .llm
            .chat(vec![
                ChatMessage::system(format!(
                    "{}\n\nDatabase schema:\n{}",
                    GENERATION_INSTRUCTIONS, schema
                )),
                ChatMessage::user(format!("Question: {}", query)),
            ])
            .await?;

        let sql = extract_sql(&generation);
        ensure_select(&sql)?;
        debug!(sql = %sql, "Executing generated SQL");

        let rows = sqlx::query(&sql)
            .fetch_all(handle.pool())
            .await
            .map_err(|e| {
                AppError::BackendUnavailable(format!("Database query failed: {}", e))
            })?;
        let rendered = render_rows(&rows);

        let text = self
            .llm
            .chat(vec![
                ChatMessage::system(PHRASING_INSTRUCTIONS),
                ChatMessage::user(format!(
                    "Question: {}\nSQL: {}\nResult rows:\n{}",
                    query, sql, rendered
                )),
            ])
            .await?;

        Ok(Answer {
            text,
            sources: vec![SourceRef {
                label: "sql".to_string(),
                excerpt: sql,
            }],
        })
    }
}
