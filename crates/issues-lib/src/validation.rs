//! Request validation and normalization.
//!
//! These routines turn a raw JSON object payload into typed input for the
//! store, or a named failure reason. They never touch storage.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::{FieldKind, FieldValue, IssueField, NewIssue, parse_bool};
use crate::query::IssueChanges;

/// Raw request body: a JSON object (form bodies are converted to one).
pub type Payload = Map<String, Value>;

/// Why a payload was rejected before reaching the store.
///
/// The display strings are part of the wire contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("required field(s) missing")]
    RequiredFieldsMissing,

    #[error("missing _id")]
    MissingId,

    #[error("no update field(s) sent")]
    NoUpdateFields { id: String },
}

impl ValidationFailure {
    /// The identifier to echo back with the failure, if one was supplied.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::NoUpdateFields { id } => Some(id),
            Self::RequiredFieldsMissing | Self::MissingId => None,
        }
    }
}

/// Validate a create payload.
///
/// `issue_title` and `created_by` must be present, non-null and non-blank.
/// Optional text fields default to the empty string.
///
/// # Errors
///
/// Returns `RequiredFieldsMissing` if either required field is absent.
pub fn validate_create(payload: &Payload) -> Result<NewIssue, ValidationFailure> {
    let required = |field: IssueField| {
        text_field(payload, field)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ValidationFailure::RequiredFieldsMissing)
    };
    let issue_title = required(IssueField::IssueTitle)?;
    let created_by = required(IssueField::CreatedBy)?;

    let optional = |field: IssueField| text_field(payload, field).unwrap_or_default();

    Ok(NewIssue {
        issue_title,
        created_by,
        issue_text: optional(IssueField::IssueText),
        assigned_to: optional(IssueField::AssignedTo),
        status_text: optional(IssueField::StatusText),
    })
}

/// Validate an update payload into the target id and the fields to change.
///
/// Keys outside the schema, immutable fields and null values are dropped.
/// A payload that only carried such keys still counts as an update and
/// yields an empty change set, so the record is only re-stamped.
///
/// # Errors
///
/// Returns `MissingId` without an id, or `NoUpdateFields` when the payload
/// holds nothing besides the id.
pub fn validate_update(payload: &Payload) -> Result<(String, IssueChanges), ValidationFailure> {
    let id = extract_id(payload)?;
    if payload.keys().all(|key| is_id_key(key)) {
        return Err(ValidationFailure::NoUpdateFields { id });
    }

    let mut changes = IssueChanges::default();
    for (key, raw) in payload {
        let Ok(field) = key.parse::<IssueField>() else {
            continue;
        };
        if field == IssueField::Id {
            continue;
        }
        let value = match field.kind() {
            FieldKind::Text => text_value(raw).map(FieldValue::Text),
            FieldKind::Bool => bool_value(raw).map(FieldValue::Bool),
            FieldKind::Timestamp => None,
        };
        if let Some(value) = value {
            changes.set(field, value);
        }
    }
    Ok((id, changes))
}

/// Validate a delete payload into the target id.
///
/// # Errors
///
/// Returns `MissingId` without an id.
pub fn validate_delete(payload: &Payload) -> Result<String, ValidationFailure> {
    extract_id(payload)
}

fn is_id_key(key: &str) -> bool {
    key == "_id" || key == "id"
}

/// Read the identifier from `_id` (or `id`). Empty strings count as absent.
fn extract_id(payload: &Payload) -> Result<String, ValidationFailure> {
    payload
        .get("_id")
        .or_else(|| payload.get("id"))
        .and_then(text_value)
        .filter(|id| !id.is_empty())
        .ok_or(ValidationFailure::MissingId)
}

fn text_field(payload: &Payload, field: IssueField) -> Option<String> {
    payload.get(field.as_str()).and_then(text_value)
}

/// Scalars are accepted as text the way a form submission would render them.
fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn bool_value(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => parse_bool(s),
        _ => None,
    }
}
