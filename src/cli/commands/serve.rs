//! Serve command implementation.

use issues_lib::IssueService;

use crate::config::Config;
use crate::error::Result;
use crate::server::{self, AppState};
use crate::storage::open_store;

/// Open the configured store and serve HTTP until shutdown.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or the address cannot be bound.
pub async fn execute(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let state = AppState::new(IssueService::new(store));
    server::serve(config.bind, state).await
}
