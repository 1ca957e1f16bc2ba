//! Core data types for issues-lib.
//!
//! The serde layout is the wire format: field names are emitted exactly as
//! API clients expect them, with the identifier under `_id`.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::IssuesError;

/// Current time truncated to the microsecond precision used on the wire and
/// in every store, so that an emitted timestamp filters back to its record.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Render a timestamp in the canonical `2024-01-02T03:04:05.000006Z` form.
#[must_use]
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC 3339 timestamp into UTC at microsecond precision.
///
/// Finer digits are dropped so a filter compares the same way in every store.
///
/// # Errors
///
/// Returns `InvalidValue` when the input is not RFC 3339.
pub fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>, IssuesError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|ts| ts.with_timezone(&Utc).trunc_subsecs(6))
        .map_err(|e| IssuesError::invalid_value(field, e.to_string()))
}

mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp("timestamp", &raw).map_err(serde::de::Error::custom)
    }
}

/// A reported issue within a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Issue {
    /// Store-assigned identifier (e.g. "is-4k2q9").
    #[serde(rename = "_id")]
    pub id: String,

    /// Owning project; set from the request path and never changed.
    pub project_name: String,

    pub issue_title: String,

    #[serde(default)]
    pub issue_text: String,

    #[serde(with = "timestamp")]
    pub created_on: DateTime<Utc>,

    #[serde(with = "timestamp")]
    pub updated_on: DateTime<Utc>,

    /// Reporter.
    pub created_by: String,

    #[serde(default)]
    pub assigned_to: String,

    #[serde(default = "default_open")]
    pub open: bool,

    #[serde(default)]
    pub status_text: String,
}

const fn default_open() -> bool {
    true
}

impl Issue {
    /// Whether the stored value of `field` equals `value`.
    ///
    /// A value of the wrong kind for the field never matches.
    #[must_use]
    pub fn field_equals(&self, field: IssueField, value: &FieldValue) -> bool {
        match (field, value) {
            (IssueField::Id, FieldValue::Text(v)) => self.id == *v,
            (IssueField::ProjectName, FieldValue::Text(v)) => self.project_name == *v,
            (IssueField::IssueTitle, FieldValue::Text(v)) => self.issue_title == *v,
            (IssueField::IssueText, FieldValue::Text(v)) => self.issue_text == *v,
            (IssueField::CreatedBy, FieldValue::Text(v)) => self.created_by == *v,
            (IssueField::AssignedTo, FieldValue::Text(v)) => self.assigned_to == *v,
            (IssueField::StatusText, FieldValue::Text(v)) => self.status_text == *v,
            (IssueField::Open, FieldValue::Bool(v)) => self.open == *v,
            (IssueField::CreatedOn, FieldValue::Timestamp(v)) => self.created_on == *v,
            (IssueField::UpdatedOn, FieldValue::Timestamp(v)) => self.updated_on == *v,
            _ => false,
        }
    }
}

/// Validated input for creating an issue.
///
/// Carries only what a caller may choose; identity, project and timestamps
/// are assigned when the record is built.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewIssue {
    pub issue_title: String,
    pub created_by: String,
    pub issue_text: String,
    pub assigned_to: String,
    pub status_text: String,
}

impl NewIssue {
    /// Build the record to hand to a store. The id is left empty for the
    /// store to assign.
    #[must_use]
    pub fn into_issue(self, project: &str, created_on: DateTime<Utc>) -> Issue {
        Issue {
            id: String::new(),
            project_name: project.to_string(),
            issue_title: self.issue_title,
            issue_text: self.issue_text,
            created_on,
            updated_on: created_on,
            created_by: self.created_by,
            assigned_to: self.assigned_to,
            open: true,
            status_text: self.status_text,
        }
    }
}

/// Value type carried by an [`IssueField`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Bool,
    Timestamp,
}

/// Every field of the issue schema, named as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IssueField {
    Id,
    ProjectName,
    IssueTitle,
    IssueText,
    CreatedBy,
    AssignedTo,
    StatusText,
    Open,
    CreatedOn,
    UpdatedOn,
}

impl IssueField {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "_id",
            Self::ProjectName => "project_name",
            Self::IssueTitle => "issue_title",
            Self::IssueText => "issue_text",
            Self::CreatedBy => "created_by",
            Self::AssignedTo => "assigned_to",
            Self::StatusText => "status_text",
            Self::Open => "open",
            Self::CreatedOn => "created_on",
            Self::UpdatedOn => "updated_on",
        }
    }

    /// Column name used by relational stores.
    #[must_use]
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Id => "id",
            other => other.as_str(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        match self {
            Self::Open => FieldKind::Bool,
            Self::CreatedOn | Self::UpdatedOn => FieldKind::Timestamp,
            _ => FieldKind::Text,
        }
    }
}

impl fmt::Display for IssueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IssueField {
    type Err = IssuesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "_id" | "id" => Ok(Self::Id),
            "project_name" => Ok(Self::ProjectName),
            "issue_title" => Ok(Self::IssueTitle),
            "issue_text" => Ok(Self::IssueText),
            "created_by" => Ok(Self::CreatedBy),
            "assigned_to" => Ok(Self::AssignedTo),
            "status_text" => Ok(Self::StatusText),
            "open" => Ok(Self::Open),
            "created_on" => Ok(Self::CreatedOn),
            "updated_on" => Ok(Self::UpdatedOn),
            other => Err(IssuesError::InvalidFilter(format!("unknown field '{other}'"))),
        }
    }
}

/// A typed value for one issue field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    /// Coerce a raw query-string value to the type of `field`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` if `raw` is not a valid value of the field's kind.
    pub fn parse(field: IssueField, raw: &str) -> Result<Self, IssuesError> {
        match field.kind() {
            FieldKind::Text => Ok(Self::Text(raw.to_string())),
            FieldKind::Bool => parse_bool(raw)
                .map(Self::Bool)
                .ok_or_else(|| {
                    IssuesError::invalid_value(field.as_str(), "expected true or false")
                }),
            FieldKind::Timestamp => parse_timestamp(field.as_str(), raw).map(Self::Timestamp),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Timestamp(v) => write!(f, "{}", format_timestamp(v)),
        }
    }
}

/// Lenient boolean parsing shared by query strings and form bodies.
#[must_use]
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Issue {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        Issue {
            id: "is-abc".to_string(),
            ..NewIssue {
                issue_title: "Broken link".to_string(),
                created_by: "alice".to_string(),
                ..Default::default()
            }
            .into_issue("apitest", ts)
        }
    }

    #[test]
    fn test_serializes_wire_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["_id"], "is-abc");
        assert_eq!(json["project_name"], "apitest");
        assert_eq!(json["issue_text"], "");
        assert_eq!(json["open"], true);
        assert_eq!(json["created_on"], "2024-03-01T12:00:00.000000Z");
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_deserialize_roundtrip_preserves_timestamps() {
        let issue = sample();
        let text = serde_json::to_string(&issue).unwrap();
        let back: Issue = serde_json::from_str(&text).unwrap();
        assert_eq!(back, issue);
    }

    #[test]
    fn test_into_issue_applies_defaults() {
        let ts = now();
        let issue = NewIssue {
            issue_title: "T".to_string(),
            created_by: "U".to_string(),
            ..Default::default()
        }
        .into_issue("test", ts);
        assert!(issue.id.is_empty());
        assert!(issue.open);
        assert_eq!(issue.created_on, issue.updated_on);
        assert_eq!(issue.assigned_to, "");
    }

    #[test]
    fn test_field_from_str_accepts_id_alias() {
        assert_eq!("id".parse::<IssueField>().unwrap(), IssueField::Id);
        assert_eq!("_id".parse::<IssueField>().unwrap(), IssueField::Id);
        assert!(matches!(
            "priority".parse::<IssueField>(),
            Err(IssuesError::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_field_value_parse_coerces_by_kind() {
        assert_eq!(
            FieldValue::parse(IssueField::Open, "TRUE").unwrap(),
            FieldValue::Bool(true)
        );
        assert_eq!(
            FieldValue::parse(IssueField::Open, "0").unwrap(),
            FieldValue::Bool(false)
        );
        assert!(FieldValue::parse(IssueField::Open, "maybe").is_err());
        assert!(FieldValue::parse(IssueField::CreatedOn, "yesterday").is_err());
        assert_eq!(
            FieldValue::parse(IssueField::AssignedTo, "true").unwrap(),
            FieldValue::Text("true".to_string())
        );
    }

    #[test]
    fn test_field_equals_rejects_kind_mismatch() {
        let issue = sample();
        assert!(issue.field_equals(IssueField::Open, &FieldValue::Bool(true)));
        assert!(!issue.field_equals(IssueField::Open, &FieldValue::Text("true".into())));
        assert!(issue.field_equals(
            IssueField::CreatedBy,
            &FieldValue::Text("alice".into())
        ));
    }

    #[test]
    fn test_now_is_microsecond_aligned() {
        let ts = now();
        assert_eq!(ts.timestamp_subsec_nanos() % 1_000, 0);
        let text = format_timestamp(&ts);
        assert_eq!(parse_timestamp("t", &text).unwrap(), ts);
    }

    #[test]
    fn test_parse_timestamp_drops_sub_microsecond_digits() {
        let parsed = parse_timestamp("t", "2024-03-01T12:00:00.123456789Z").unwrap();
        assert_eq!(format_timestamp(&parsed), "2024-03-01T12:00:00.123456Z");
        assert_eq!(parsed.timestamp_subsec_nanos(), 123_456_000);
    }
}
