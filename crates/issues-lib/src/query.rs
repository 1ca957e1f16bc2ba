//! Filter and partial-update types for issue operations.

use chrono::{DateTime, Duration, Utc};

use crate::error::{IssuesError, Result};
use crate::model::{FieldValue, Issue, IssueField};

/// One field-equality constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub field: IssueField,
    pub value: FieldValue,
}

/// A conjunction of field-equality constraints.
///
/// Filters built by the service are always scoped by `project_name`; the
/// type itself does not require it so stores can reuse it for maintenance
/// queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueFilter {
    conditions: Vec<Condition>,
}

impl IssueFilter {
    /// Filter matching every issue in `project`.
    #[must_use]
    pub fn for_project(project: impl Into<String>) -> Self {
        Self::default().and(IssueField::ProjectName, FieldValue::Text(project.into()))
    }

    /// Filter matching a single issue by identity within `project`.
    #[must_use]
    pub fn scoped(project: impl Into<String>, id: impl Into<String>) -> Self {
        Self::for_project(project).with_id(id)
    }

    /// Add an equality constraint.
    #[must_use]
    pub fn and(mut self, field: IssueField, value: FieldValue) -> Self {
        self.conditions.push(Condition { field, value });
        self
    }

    #[must_use]
    pub fn with_id(self, id: impl Into<String>) -> Self {
        self.and(IssueField::Id, FieldValue::Text(id.into()))
    }

    /// Build a project-scoped filter from raw query-string pairs.
    ///
    /// Keys must name a schema field; values are coerced to the field's type.
    /// A `project_name` pair is skipped because the path segment always wins.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFilter` for an unknown key or a value that does not
    /// coerce to the field's type.
    pub fn from_query<I, K, V>(project: &str, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut filter = Self::for_project(project);
        for (key, raw) in pairs {
            let field: IssueField = key.as_ref().parse()?;
            if field == IssueField::ProjectName {
                continue;
            }
            let value = FieldValue::parse(field, raw.as_ref()).map_err(|e| match e {
                IssuesError::InvalidValue { field, reason } => {
                    IssuesError::InvalidFilter(format!("{field}: {reason}"))
                }
                other => other,
            })?;
            filter = filter.and(field, value);
        }
        Ok(filter)
    }

    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// The project this filter is scoped to, if any.
    #[must_use]
    pub fn project(&self) -> Option<&str> {
        self.conditions.iter().find_map(|c| match (&c.field, &c.value) {
            (IssueField::ProjectName, FieldValue::Text(p)) => Some(p.as_str()),
            _ => None,
        })
    }

    /// The identity constraint, if any.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.conditions.iter().find_map(|c| match (&c.field, &c.value) {
            (IssueField::Id, FieldValue::Text(id)) => Some(id.as_str()),
            _ => None,
        })
    }

    #[must_use]
    pub fn matches(&self, issue: &Issue) -> bool {
        self.conditions
            .iter()
            .all(|c| issue.field_equals(c.field, &c.value))
    }
}

/// Fields to replace on an existing issue.
///
/// Identity, project and creation time are deliberately absent: a change set
/// cannot express them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueChanges {
    pub issue_title: Option<String>,
    pub issue_text: Option<String>,
    pub created_by: Option<String>,
    pub assigned_to: Option<String>,
    pub status_text: Option<String>,
    pub open: Option<bool>,
    /// Modification stamp; set by the service before the store sees it.
    pub updated_on: Option<DateTime<Utc>>,
}

impl IssueChanges {
    /// Whether no caller field is set. The modification stamp does not count.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.issue_title.is_none()
            && self.issue_text.is_none()
            && self.created_by.is_none()
            && self.assigned_to.is_none()
            && self.status_text.is_none()
            && self.open.is_none()
    }

    #[must_use]
    pub fn stamped(mut self, at: DateTime<Utc>) -> Self {
        self.updated_on = Some(at);
        self
    }

    /// Set a field from its typed value. Non-updatable fields are ignored.
    pub fn set(&mut self, field: IssueField, value: FieldValue) {
        match (field, value) {
            (IssueField::IssueTitle, FieldValue::Text(v)) => self.issue_title = Some(v),
            (IssueField::IssueText, FieldValue::Text(v)) => self.issue_text = Some(v),
            (IssueField::CreatedBy, FieldValue::Text(v)) => self.created_by = Some(v),
            (IssueField::AssignedTo, FieldValue::Text(v)) => self.assigned_to = Some(v),
            (IssueField::StatusText, FieldValue::Text(v)) => self.status_text = Some(v),
            (IssueField::Open, FieldValue::Bool(v)) => self.open = Some(v),
            _ => {}
        }
    }

    /// Fields present in this change set, in schema order.
    #[must_use]
    pub fn fields(&self) -> Vec<IssueField> {
        let mut fields: Vec<IssueField> = Vec::new();
        let mut push = |present: bool, field: IssueField| {
            if present {
                fields.push(field);
            }
        };
        push(self.issue_title.is_some(), IssueField::IssueTitle);
        push(self.issue_text.is_some(), IssueField::IssueText);
        push(self.created_by.is_some(), IssueField::CreatedBy);
        push(self.assigned_to.is_some(), IssueField::AssignedTo);
        push(self.status_text.is_some(), IssueField::StatusText);
        push(self.open.is_some(), IssueField::Open);
        push(self.updated_on.is_some(), IssueField::UpdatedOn);
        fields
    }

    /// Merge into `issue`, replacing exactly the supplied fields.
    ///
    /// The stamp is moved forward past the record's current `updated_on` when
    /// the clock has not advanced, so `updated_on` strictly increases on
    /// every applied change.
    pub fn apply_to(&self, issue: &mut Issue) {
        if let Some(ref title) = self.issue_title {
            issue.issue_title.clone_from(title);
        }
        if let Some(ref text) = self.issue_text {
            issue.issue_text.clone_from(text);
        }
        if let Some(ref creator) = self.created_by {
            issue.created_by.clone_from(creator);
        }
        if let Some(ref assignee) = self.assigned_to {
            issue.assigned_to.clone_from(assignee);
        }
        if let Some(ref status) = self.status_text {
            issue.status_text.clone_from(status);
        }
        if let Some(open) = self.open {
            issue.open = open;
        }
        if let Some(at) = self.updated_on {
            issue.updated_on = next_stamp(issue.updated_on, at);
        }
    }
}

fn next_stamp(previous: DateTime<Utc>, requested: DateTime<Utc>) -> DateTime<Utc> {
    if requested > previous {
        requested
    } else {
        previous + Duration::microseconds(1)
    }
}
