//! Uniform response bodies.
//!
//! Every operation answers with one of these shapes; failure is signalled
//! only by the presence of an `error` key.

use serde::Serialize;

use crate::model::Issue;

pub const UPDATED: &str = "successfully updated";
pub const DELETED: &str = "successfully deleted";
pub const COULD_NOT_UPDATE: &str = "could not update";
pub const COULD_NOT_DELETE: &str = "could not delete";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ApiResponse {
    /// A single persisted issue (create).
    Issue(Box<Issue>),

    /// Matching issues (list).
    Issues(Vec<Issue>),

    /// Successful update or delete.
    Outcome {
        result: &'static str,
        #[serde(rename = "_id")]
        id: String,
    },

    Error {
        error: String,
        #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
}

impl ApiResponse {
    #[must_use]
    pub fn outcome(result: &'static str, id: impl Into<String>) -> Self {
        Self::Outcome {
            result,
            id: id.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
            id: None,
        }
    }

    #[must_use]
    pub fn error_with_id(message: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
            id: Some(id.into()),
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}
