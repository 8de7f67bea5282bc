//! SQLite Database
//!
//! Embedded job store using rusqlite with r2d2 connection pooling.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::models::job::{ConversationEntry, ConversationRole, Job, JobStatus};
use crate::storage::store::JobStore;
use crate::utils::error::{EngineError, EngineResult};
use crate::utils::paths::ensure_dir;

/// Raw job row from the database
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: String,
    pub workflow_type: String,
    pub description: String,
    pub status: String,
    pub output: Option<String>,
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}

/// Raw conversation row from the database
#[derive(Debug, Clone)]
pub struct ConversationRow {
    pub role: String,
    pub content: String,
    pub tool: Option<String>,
    pub args: Option<String>,
    pub result: Option<String>,
    pub success: Option<bool>,
    pub created_at: String,
}

const JOB_COLUMNS: &str = "id, workflow_type, description, status, output, error,
     created_at, updated_at, started_at, completed_at";

/// Type alias for the connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Database service for managing SQLite operations
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Create an in-memory database for testing.
    ///
    /// A single pooled connection so every caller sees the same memory db.
    pub fn new_in_memory() -> EngineResult<Self> {
        let manager = SqliteConnectionManager::memory().with_init(|c| c.execute_batch("PRAGMA foreign_keys = ON;"));
        Self::with_manager(manager, 1)
    }

    /// Open (or create) a database file with connection pooling
    pub fn new(db_path: &Path) -> EngineResult<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                ensure_dir(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(db_path).with_init(|c| {
            c.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")
        });
        Self::with_manager(manager, 10)
    }

    fn with_manager(manager: SqliteConnectionManager, max_size: u32) -> EngineResult<Self> {
        let pool = Pool::builder()
            .max_size(max_size)
            .build(manager)
            .map_err(|e| EngineError::database(format!("Failed to create connection pool: {}", e)))?;

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> EngineResult<()> {
        let conn = self.get_connection()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                workflow_type TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'pending',
                output TEXT,
                error TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                started_at TEXT,
                completed_at TEXT
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_jobs_created_at ON jobs(created_at DESC)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS conversation_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL DEFAULT '',
                tool TEXT,
                args TEXT,
                result TEXT,
                success INTEGER,
                created_at TEXT NOT NULL,
                FOREIGN KEY (job_id) REFERENCES jobs(id) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_conversation_job_id ON conversation_entries(job_id, id)",
            [],
        )?;

        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> EngineResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| EngineError::database(format!("Failed to get connection: {}", e)))
    }

    /// Check if the database is healthy
    pub fn is_healthy(&self) -> bool {
        if let Ok(conn) = self.pool.get() {
            conn.query_row("SELECT 1", [], |_| Ok(())).is_ok()
        } else {
            false
        }
    }

    // ========================================================================
    // Job Operations
    // ========================================================================

    /// Insert a new job record
    pub fn insert_job(&self, job: &Job) -> EngineResult<()> {
        let conn = self.get_connection()?;
        let output = job.output.as_ref().map(serde_json::to_string).transpose()?;
        conn.execute(
            "INSERT INTO jobs (id, workflow_type, description, status, output, error,
                               created_at, updated_at, started_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                job.id,
                job.workflow_type,
                job.description,
                job.status.to_string(),
                output,
                job.error,
                job.created_at.to_rfc3339(),
                job.updated_at.to_rfc3339(),
                job.started_at.map(|t| t.to_rfc3339()),
                job.completed_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    /// Get a single job by ID
    pub fn get_job_row(&self, id: &str) -> EngineResult<Option<JobRow>> {
        let conn = self.get_connection()?;
        Self::query_job_row(&conn, id)
    }

    fn query_job_row(conn: &Connection, id: &str) -> EngineResult<Option<JobRow>> {
        let row = conn
            .query_row(
                &format!("SELECT {} FROM jobs WHERE id = ?1", JOB_COLUMNS),
                params![id],
                Self::row_to_job_row,
            )
            .optional()?;
        Ok(row)
    }

    /// List all job rows, newest first
    pub fn list_job_rows(&self) -> EngineResult<Vec<JobRow>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM jobs ORDER BY created_at DESC",
            JOB_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], Self::row_to_job_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    fn row_to_job_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<JobRow> {
        Ok(JobRow {
            id: row.get(0)?,
            workflow_type: row.get(1)?,
            description: row.get(2)?,
            status: row.get(3)?,
            output: row.get(4)?,
            error: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
            started_at: row.get(8)?,
            completed_at: row.get(9)?,
        })
    }

    /// Apply a status transition inside one transaction
    pub fn transition_job(
        &self,
        id: &str,
        status: JobStatus,
        output: Option<Value>,
        error: Option<String>,
    ) -> EngineResult<Job> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;

        let mut job: Job = Self::query_job_row(&tx, id)?
            .ok_or_else(|| EngineError::not_found(format!("job {}", id)))?
            .try_into()?;
        let from = job.status;
        if !job.apply_status(status, output, error) {
            return Err(EngineError::InvalidTransition {
                from: from.to_string(),
                to: status.to_string(),
            });
        }

        let output = job.output.as_ref().map(serde_json::to_string).transpose()?;
        tx.execute(
            "UPDATE jobs SET status = ?2, output = ?3, error = ?4, updated_at = ?5,
                             started_at = ?6, completed_at = ?7
             WHERE id = ?1",
            params![
                job.id,
                job.status.to_string(),
                output,
                job.error,
                job.updated_at.to_rfc3339(),
                job.started_at.map(|t| t.to_rfc3339()),
                job.completed_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        tx.commit()?;
        Ok(job)
    }

    // ========================================================================
    // Conversation Operations
    // ========================================================================

    /// Append one conversation entry
    pub fn insert_conversation_entry(&self, job_id: &str, entry: &ConversationEntry) -> EngineResult<()> {
        let conn = self.get_connection()?;
        let args = entry.args.as_ref().map(serde_json::to_string).transpose()?;
        let result = entry.result.as_ref().map(serde_json::to_string).transpose()?;
        conn.execute(
            "INSERT INTO conversation_entries (job_id, role, content, tool, args, result, success, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                job_id,
                entry.role.to_string(),
                entry.content,
                entry.tool,
                args,
                result,
                entry.success,
                entry.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Conversation rows for a job in insertion order
    pub fn list_conversation_rows(&self, job_id: &str) -> EngineResult<Vec<ConversationRow>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT role, content, tool, args, result, success, created_at
             FROM conversation_entries WHERE job_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![job_id], |row| {
                Ok(ConversationRow {
                    role: row.get(0)?,
                    content: row.get(1)?,
                    tool: row.get(2)?,
                    args: row.get(3)?,
                    result: row.get(4)?,
                    success: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }
}

fn parse_time(value: &str) -> EngineResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| EngineError::database(format!("Invalid timestamp '{}': {}", value, e)))
}

fn parse_json(value: Option<String>) -> EngineResult<Option<Value>> {
    Ok(value.map(|v| serde_json::from_str(&v)).transpose()?)
}

impl TryFrom<JobRow> for Job {
    type Error = EngineError;

    fn try_from(row: JobRow) -> EngineResult<Self> {
        Ok(Job {
            status: row.status.parse().map_err(EngineError::database)?,
            output: parse_json(row.output)?,
            error: row.error,
            created_at: parse_time(&row.created_at)?,
            updated_at: parse_time(&row.updated_at)?,
            started_at: row.started_at.as_deref().map(parse_time).transpose()?,
            completed_at: row.completed_at.as_deref().map(parse_time).transpose()?,
            id: row.id,
            workflow_type: row.workflow_type,
            description: row.description,
        })
    }
}

impl TryFrom<ConversationRow> for ConversationEntry {
    type Error = EngineError;

    fn try_from(row: ConversationRow) -> EngineResult<Self> {
        Ok(ConversationEntry {
            role: row.role.parse::<ConversationRole>().map_err(EngineError::database)?,
            content: row.content,
            tool: row.tool,
            args: parse_json(row.args)?,
            result: parse_json(row.result)?,
            success: row.success,
            timestamp: parse_time(&row.created_at)?,
        })
    }
}

impl Database {
    /// Run a pooled SQLite call off the async worker threads
    async fn run_blocking<T, F>(&self, f: F) -> EngineResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> EngineResult<T> + Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| EngineError::database(format!("Database task failed: {}", e)))?
    }
}

#[async_trait]
impl JobStore for Database {
    async fn create_job(&self, job: &Job) -> EngineResult<()> {
        let job = job.clone();
        self.run_blocking(move |db| db.insert_job(&job)).await
    }

    async fn get_job(&self, job_id: &str) -> EngineResult<Option<Job>> {
        let job_id = job_id.to_string();
        self.run_blocking(move |db| db.get_job_row(&job_id)?.map(Job::try_from).transpose())
            .await
    }

    async fn list_jobs(&self) -> EngineResult<Vec<Job>> {
        self.run_blocking(|db| db.list_job_rows()?.into_iter().map(Job::try_from).collect())
            .await
    }

    async fn update_job_status(
        &self,
        job_id: &str,
        status: JobStatus,
        output: Option<Value>,
        error: Option<String>,
    ) -> EngineResult<Job> {
        let job_id = job_id.to_string();
        self.run_blocking(move |db| db.transition_job(&job_id, status, output, error))
            .await
    }

    async fn append_conversation(&self, job_id: &str, entry: &ConversationEntry) -> EngineResult<()> {
        let job_id = job_id.to_string();
        let entry = entry.clone();
        self.run_blocking(move |db| db.insert_conversation_entry(&job_id, &entry))
            .await
    }

    async fn conversation(&self, job_id: &str) -> EngineResult<Vec<ConversationEntry>> {
        let job_id = job_id.to_string();
        self.run_blocking(move |db| {
            db.list_conversation_rows(&job_id)?
                .into_iter()
                .map(ConversationEntry::try_from)
                .collect()
        })
        .await
    }
}
