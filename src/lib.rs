//! `issue_tracker` - project-scoped issue tracker service
//!
//! HTTP front end, configuration and storage backends around the
//! [`issues_lib`] core.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`cli`] - Command-line interface using clap
//! - [`config`] - Layered configuration (defaults, YAML, env, flags)
//! - [`error`] - Error types and handling
//! - [`logging`] - Tracing subscriber setup
//! - [`server`] - axum router, body extraction and handlers
//! - [`storage`] - Store selection and the `SQLite` backend

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod server;
pub mod storage;

pub use error::{Result, TrackerError};

/// Run the CLI application.
///
/// This is the main entry point called from `main()`.
///
/// # Errors
///
/// Returns an error if configuration, startup or the command itself fails.
pub fn run() -> anyhow::Result<()> {
    cli::run()
}
