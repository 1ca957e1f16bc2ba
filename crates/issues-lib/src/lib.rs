//! `issues-lib` - project-scoped issue tracking core.
//!
//! Validation, typed filters, partial updates and response mapping for a
//! single issue entity, over a pluggable async storage port. No HTTP and no
//! process state live here.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use issues_lib::{InMemoryStore, IssueService};
//!
//! # async fn demo() {
//! let service = IssueService::new(Arc::new(InMemoryStore::new()));
//!
//! let body = serde_json::json!({"issue_title": "Crash on save", "created_by": "ana"});
//! let created = service.create("editor", body.as_object().unwrap()).await;
//!
//! let open = service.list("editor", [("open", "true")]).await;
//! # let _ = (created, open);
//! # }
//! ```

pub mod error;
pub mod model;
pub mod query;
pub mod response;
pub mod service;
pub mod store;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod util;
pub mod validation;

pub use error::{IssuesError, Result};
pub use model::{FieldValue, Issue, IssueField, NewIssue};
pub use query::{IssueChanges, IssueFilter};
pub use response::ApiResponse;
pub use service::IssueService;
pub use store::{InMemoryStore, IssueStore};
pub use validation::{Payload, ValidationFailure};
