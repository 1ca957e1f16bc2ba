//! `SQLite` implementation of [`IssueStore`].
//!
//! One connection is shared behind a mutex. Every operation runs on the
//! blocking pool so the async workers never wait on disk I/O.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use issues_lib::model::{format_timestamp, parse_timestamp};
use issues_lib::util::generate_id;
use issues_lib::{FieldValue, Issue, IssueChanges, IssueFilter, IssueStore, IssuesError};
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params, params_from_iter};

use crate::error::Result;
use crate::storage::schema::apply_schema;

const COLUMNS: &str = "id, project_name, issue_title, issue_text, created_on, updated_on, \
                       created_by, assigned_to, open, status_text";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed issue store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    prefix: String,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema application fails.
    pub fn open(path: &Path, prefix: impl Into<String>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        apply_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            prefix: prefix.into(),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory(prefix: impl Into<String>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            prefix: prefix.into(),
            path: None,
        })
    }

    /// Database file, `None` for in-memory databases.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> issues_lib::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| IssuesError::storage("sqlite connection lock poisoned"))?;
            f(&mut guard).map_err(|e| IssuesError::storage(e.to_string()))
        })
        .await
        .map_err(|e| IssuesError::storage(format!("sqlite task failed: {e}")))?
    }
}

/// Translate a filter into a `WHERE` clause and its bound values.
fn where_clause(filter: &IssueFilter) -> (String, Vec<Value>) {
    if filter.conditions().is_empty() {
        return ("1 = 1".to_string(), Vec::new());
    }

    let mut clauses = Vec::with_capacity(filter.conditions().len());
    let mut values = Vec::with_capacity(filter.conditions().len());
    for (idx, condition) in filter.conditions().iter().enumerate() {
        clauses.push(format!("{} = ?{}", condition.field.column(), idx + 1));
        values.push(sql_value(&condition.value));
    }
    (clauses.join(" AND "), values)
}

fn sql_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Text(text) => Value::Text(text.clone()),
        FieldValue::Bool(flag) => Value::Integer(i64::from(*flag)),
        FieldValue::Timestamp(ts) => Value::Text(format_timestamp(ts)),
    }
}

fn timestamp_column(row: &Row<'_>, idx: usize, name: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(name, &raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn issue_from_row(row: &Row<'_>) -> rusqlite::Result<Issue> {
    Ok(Issue {
        id: row.get(0)?,
        project_name: row.get(1)?,
        issue_title: row.get(2)?,
        issue_text: row.get(3)?,
        created_on: timestamp_column(row, 4, "created_on")?,
        updated_on: timestamp_column(row, 5, "updated_on")?,
        created_by: row.get(6)?,
        assigned_to: row.get(7)?,
        open: row.get::<_, i64>(8)? != 0,
        status_text: row.get(9)?,
    })
}

fn select_first(conn: &Connection, filter: &IssueFilter) -> rusqlite::Result<Option<Issue>> {
    let (clause, values) = where_clause(filter);
    let sql = format!("SELECT {COLUMNS} FROM issues WHERE {clause} ORDER BY seq LIMIT 1");
    conn.query_row(&sql, params_from_iter(values.iter()), issue_from_row)
        .optional()
}

fn id_exists(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    conn.prepare_cached("SELECT 1 FROM issues WHERE id = ?1")?
        .exists([id])
}

#[async_trait]
impl IssueStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn insert(&self, mut issue: Issue) -> issues_lib::Result<Issue> {
        let prefix = self.prefix.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if issue.id.is_empty() {
                let count: i64 = tx.query_row("SELECT count(*) FROM issues", [], |row| row.get(0))?;
                issue.id = generate_id(
                    &prefix,
                    &issue.project_name,
                    &issue.issue_title,
                    &issue.created_by,
                    issue.created_on,
                    usize::try_from(count).unwrap_or(usize::MAX),
                    |id| match id_exists(&tx, id) {
                        Ok(found) => found,
                        Err(e) => {
                            tracing::warn!(%id, error = %e, "id collision check failed");
                            false
                        }
                    },
                );
            }

            tx.execute(
                &format!(
                    "INSERT INTO issues ({COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ),
                params![
                    issue.id,
                    issue.project_name,
                    issue.issue_title,
                    issue.issue_text,
                    format_timestamp(&issue.created_on),
                    format_timestamp(&issue.updated_on),
                    issue.created_by,
                    issue.assigned_to,
                    issue.open,
                    issue.status_text,
                ],
            )?;
            tx.commit()?;

            tracing::trace!(id = %issue.id, project = %issue.project_name, "inserted issue");
            Ok(issue)
        })
        .await
    }

    async fn find_many(&self, filter: &IssueFilter) -> issues_lib::Result<Vec<Issue>> {
        let (clause, values) = where_clause(filter);
        self.with_conn(move |conn| {
            let sql = format!("SELECT {COLUMNS} FROM issues WHERE {clause} ORDER BY seq");
            let mut stmt = conn.prepare(&sql)?;
            let issues = stmt
                .query_map(params_from_iter(values.iter()), issue_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(issues)
        })
        .await
    }

    async fn find_one(&self, filter: &IssueFilter) -> issues_lib::Result<Option<Issue>> {
        let filter = filter.clone();
        self.with_conn(move |conn| select_first(conn, &filter)).await
    }

    async fn update_one(
        &self,
        filter: &IssueFilter,
        changes: &IssueChanges,
    ) -> issues_lib::Result<Option<Issue>> {
        let filter = filter.clone();
        let changes = changes.clone();
        self.with_conn(move |conn| {
            // Read, merge and write back under one write lock.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let Some(mut issue) = select_first(&tx, &filter)? else {
                return Ok(None);
            };
            changes.apply_to(&mut issue);

            tx.execute(
                "UPDATE issues SET issue_title = ?1, issue_text = ?2, created_by = ?3, \
                 assigned_to = ?4, status_text = ?5, open = ?6, updated_on = ?7 WHERE id = ?8",
                params![
                    issue.issue_title,
                    issue.issue_text,
                    issue.created_by,
                    issue.assigned_to,
                    issue.status_text,
                    issue.open,
                    format_timestamp(&issue.updated_on),
                    issue.id,
                ],
            )?;
            tx.commit()?;
            Ok(Some(issue))
        })
        .await
    }

    async fn delete_one(&self, filter: &IssueFilter) -> issues_lib::Result<u64> {
        let (clause, values) = where_clause(filter);
        self.with_conn(move |conn| {
            let sql = format!(
                "DELETE FROM issues WHERE seq = \
                 (SELECT seq FROM issues WHERE {clause} ORDER BY seq LIMIT 1)"
            );
            let removed = conn.execute(&sql, params_from_iter(values.iter()))?;
            Ok(u64::try_from(removed).unwrap_or(u64::MAX))
        })
        .await
    }

    async fn count(&self, filter: &IssueFilter) -> issues_lib::Result<u64> {
        let (clause, values) = where_clause(filter);
        self.with_conn(move |conn| {
            let sql = format!("SELECT count(*) FROM issues WHERE {clause}");
            let count: i64 =
                conn.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
        .await
    }
}
