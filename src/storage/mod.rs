//! Storage backends for the issue service.
//!
//! - [`sqlite`] - `SQLite` store (WAL mode, one connection on the blocking pool)
//! - [`schema`] - Table definitions and schema versioning
//!
//! The in-memory store lives in `issues_lib` alongside the port it implements.

pub mod schema;
pub mod sqlite;

use std::sync::Arc;

use issues_lib::{InMemoryStore, IssueStore};

use crate::config::{Config, StoreBackend};
use crate::error::Result;

pub use sqlite::SqliteStore;

/// Open the store selected by `config`.
///
/// # Errors
///
/// Returns an error if the `SQLite` database cannot be opened or migrated.
pub fn open_store(config: &Config) -> Result<Arc<dyn IssueStore>> {
    match config.store {
        StoreBackend::Memory => {
            tracing::debug!(prefix = %config.id_prefix, "using in-memory store");
            Ok(Arc::new(InMemoryStore::with_prefix(config.id_prefix.clone())))
        }
        StoreBackend::Sqlite => {
            tracing::debug!(path = %config.database.display(), "opening sqlite store");
            let store = SqliteStore::open(&config.database, config.id_prefix.clone())?;
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_store_selects_backend() {
        let dir = tempfile::tempdir().unwrap();

        let memory = open_store(&Config::default()).unwrap();
        assert_eq!(memory.backend(), "memory");

        let config = Config {
            store: StoreBackend::Sqlite,
            database: dir.path().join("issues.db"),
            ..Config::default()
        };
        let sqlite = open_store(&config).unwrap();
        assert_eq!(sqlite.backend(), "sqlite");
        assert!(config.database.exists());
    }

    #[test]
    fn test_open_store_reports_bad_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            store: StoreBackend::Sqlite,
            database: dir.path().join("missing").join("dir").join("issues.db"),
            ..Config::default()
        };
        assert!(open_store(&config).is_err());
    }
}
