//! Doctor command implementation.

use std::net::TcpListener;
use std::path::Path;

use issues_lib::IssueFilter;
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;

use crate::config::{Config, StoreBackend};
use crate::error::Result;
use crate::storage::open_store;
use crate::storage::schema::CURRENT_SCHEMA_VERSION;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Ok,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
struct DoctorReport {
    ok: bool,
    checks: Vec<CheckResult>,
}

fn push_check(
    checks: &mut Vec<CheckResult>,
    name: &str,
    status: CheckStatus,
    message: Option<String>,
    details: Option<serde_json::Value>,
) {
    checks.push(CheckResult {
        name: name.to_string(),
        status,
        message,
        details,
    });
}

fn has_error(checks: &[CheckResult]) -> bool {
    checks
        .iter()
        .any(|check| matches!(check.status, CheckStatus::Error))
}

fn render_text(report: &DoctorReport) -> String {
    let mut out = String::from("issue-tracker doctor\n");
    for check in &report.checks {
        let label = match check.status {
            CheckStatus::Ok => "OK",
            CheckStatus::Warn => "WARN",
            CheckStatus::Error => "ERROR",
        };
        if let Some(message) = &check.message {
            out.push_str(&format!("{label} {}: {}\n", check.name, message));
        } else {
            out.push_str(&format!("{label} {}\n", check.name));
        }
    }
    out
}

fn print_report(report: &DoctorReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        print!("{}", render_text(report));
    }
    Ok(())
}

fn check_bind(config: &Config, checks: &mut Vec<CheckResult>) {
    match TcpListener::bind(config.bind) {
        Ok(_) => push_check(
            checks,
            "server.bind",
            CheckStatus::Ok,
            Some(format!("{} is available", config.bind)),
            None,
        ),
        Err(err) => push_check(
            checks,
            "server.bind",
            CheckStatus::Warn,
            Some(format!("{} is not available: {err}", config.bind)),
            None,
        ),
    }
}

fn check_sqlite_file(path: &Path, checks: &mut Vec<CheckResult>) -> Result<()> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

    let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version == CURRENT_SCHEMA_VERSION {
        push_check(checks, "sqlite.schema", CheckStatus::Ok, None, None);
    } else {
        push_check(
            checks,
            "sqlite.schema",
            CheckStatus::Error,
            Some(format!(
                "schema version {version}, expected {CURRENT_SCHEMA_VERSION}"
            )),
            None,
        );
    }

    let result: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
    if result.trim().eq_ignore_ascii_case("ok") {
        push_check(checks, "sqlite.integrity_check", CheckStatus::Ok, None, None);
    } else {
        push_check(
            checks,
            "sqlite.integrity_check",
            CheckStatus::Error,
            Some(result),
            None,
        );
    }
    Ok(())
}

/// Collect the checks for `config` without printing them.
async fn collect_checks(config: &Config) -> Vec<CheckResult> {
    let mut checks = Vec::new();

    push_check(
        &mut checks,
        "config",
        CheckStatus::Ok,
        Some(format!("store={} bind={}", config.store, config.bind)),
        serde_json::to_value(config).ok(),
    );

    check_bind(config, &mut checks);

    // Opening the store would create a missing database.
    if config.store == StoreBackend::Sqlite && !config.database.exists() {
        push_check(
            &mut checks,
            "sqlite.file",
            CheckStatus::Error,
            Some(format!("database not found: {}", config.database.display())),
            Some(serde_json::json!({ "path": config.database.display().to_string() })),
        );
        return checks;
    }

    let store = match open_store(config) {
        Ok(store) => {
            push_check(
                &mut checks,
                "store.open",
                CheckStatus::Ok,
                Some(format!("{} store ready", store.backend())),
                None,
            );
            store
        }
        Err(err) => {
            push_check(
                &mut checks,
                "store.open",
                CheckStatus::Error,
                Some(err.to_string()),
                Some(serde_json::json!({ "backend": config.store.as_str() })),
            );
            return checks;
        }
    };

    if config.store == StoreBackend::Sqlite {
        if let Err(err) = check_sqlite_file(&config.database, &mut checks) {
            push_check(
                &mut checks,
                "sqlite.read_only",
                CheckStatus::Error,
                Some(format!("Failed to inspect database: {err}")),
                Some(serde_json::json!({ "path": config.database.display().to_string() })),
            );
        }
    }

    match store.count(&IssueFilter::default()).await {
        Ok(total) => push_check(
            &mut checks,
            "store.count",
            CheckStatus::Ok,
            Some(format!("{total} issues")),
            Some(serde_json::json!({ "issues": total })),
        ),
        Err(err) => push_check(
            &mut checks,
            "store.count",
            CheckStatus::Error,
            Some(err.to_string()),
            None,
        ),
    }

    checks
}

/// Execute the doctor command. Returns whether every check passed.
///
/// # Errors
///
/// Returns an error if report serialization fails.
pub async fn execute(config: &Config, json: bool) -> Result<bool> {
    let checks = collect_checks(config).await;
    let report = DoctorReport {
        ok: !has_error(&checks),
        checks,
    };
    print_report(&report, json)?;
    Ok(report.ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(checks: &[CheckResult]) -> Vec<&str> {
        checks.iter().map(|c| c.name.as_str()).collect()
    }

    fn free_port_config() -> Config {
        Config {
            bind: "127.0.0.1:0".parse().unwrap(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_memory_store_is_healthy() {
        let checks = collect_checks(&free_port_config()).await;
        assert!(!has_error(&checks));
        assert_eq!(names(&checks), ["config", "server.bind", "store.open", "store.count"]);
    }

    #[tokio::test]
    async fn test_sqlite_store_checks_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            store: StoreBackend::Sqlite,
            database: dir.path().join("issues.db"),
            ..free_port_config()
        };
        crate::storage::SqliteStore::open(&config.database, "is").unwrap();
        let checks = collect_checks(&config).await;
        assert!(!has_error(&checks), "{checks:?}");
        assert!(names(&checks).contains(&"sqlite.integrity_check"));
        assert!(names(&checks).contains(&"sqlite.schema"));
    }

    #[tokio::test]
    async fn test_missing_database_is_reported_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            store: StoreBackend::Sqlite,
            database: dir.path().join("issues.db"),
            ..free_port_config()
        };
        let checks = collect_checks(&config).await;
        assert!(has_error(&checks));
        assert_eq!(names(&checks).last(), Some(&"sqlite.file"));
        assert!(!config.database.exists());
    }

    #[tokio::test]
    async fn test_unopenable_database_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            store: StoreBackend::Sqlite,
            database: dir.path().join("not-a-db"),
            ..free_port_config()
        };
        std::fs::create_dir(&config.database).unwrap();
        let checks = collect_checks(&config).await;
        assert!(has_error(&checks));
        assert_eq!(names(&checks).last(), Some(&"store.open"));
    }

    #[test]
    fn test_text_report() {
        let mut checks = Vec::new();
        push_check(&mut checks, "config", CheckStatus::Ok, None, None);
        push_check(
            &mut checks,
            "server.bind",
            CheckStatus::Warn,
            Some("in use".to_string()),
            None,
        );
        let report = DoctorReport { ok: true, checks };
        assert_eq!(
            render_text(&report),
            "issue-tracker doctor\nOK config\nWARN server.bind: in use\n"
        );
    }
}
