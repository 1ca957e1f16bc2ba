//! `issue-tracker` - project-scoped issue tracker HTTP service.
//!
//! Issues are grouped by project and managed through a small JSON API,
//! backed by an in-memory store or a single `SQLite` file.

use issue_tracker::run;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
