//! Database schema for the `SQLite` issue store.

use rusqlite::Connection;

use crate::error::Result;

/// Current schema version, recorded in `PRAGMA user_version`.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// `seq` gives the insertion order; `id` is the public identifier.
/// Timestamps are RFC 3339 text at microsecond precision so that equality
/// filters compare exactly.
pub const SCHEMA_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS issues (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        project_name TEXT NOT NULL,
        issue_title TEXT NOT NULL,
        issue_text TEXT NOT NULL DEFAULT '',
        created_on TEXT NOT NULL,
        updated_on TEXT NOT NULL,
        created_by TEXT NOT NULL,
        assigned_to TEXT NOT NULL DEFAULT '',
        open INTEGER NOT NULL DEFAULT 1 CHECK (open IN (0, 1)),
        status_text TEXT NOT NULL DEFAULT ''
    );

    CREATE INDEX IF NOT EXISTS idx_issues_project ON issues(project_name, seq);
";

/// Apply the schema to the database.
///
/// # Errors
///
/// Returns an error if the SQL execution fails or the database was written
/// by a newer schema.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version > CURRENT_SCHEMA_VERSION {
        return Err(crate::error::TrackerError::config(format!(
            "database schema version {version} is newer than \
             supported version {CURRENT_SCHEMA_VERSION}"
        )));
    }

    conn.execute_batch(SCHEMA_SQL)?;
    conn.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    Ok(())
}
