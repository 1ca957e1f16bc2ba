//! Tracing subscriber setup.
//!
//! All diagnostics go to stderr. `RUST_LOG`, when set, overrides the
//! verbosity flags entirely.

use tracing_subscriber::EnvFilter;

/// Boxed error returned by `try_init` when a global subscriber already exists.
pub type InitError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Filter directives for a verbosity level.
#[must_use]
pub fn default_directives(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn,issue_tracker=info,issues_lib=info",
        1 => "info",
        2 => "debug,rusqlite=info",
        _ => "trace",
    }
}

fn build_filter(verbose: u8, quiet: bool) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(default_directives(verbose, quiet))
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(verbose: u8, quiet: bool, json: bool) -> Result<(), InitError> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(build_filter(verbose, quiet))
        .with_writer(std::io::stderr)
        .with_target(verbose > 0);

    if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
}
