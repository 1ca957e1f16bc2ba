//! Shared expectations for [`IssueStore`] implementations.
//!
//! Every backend should pass [`check_store_contract`]; it exercises the five
//! port operations the way the service drives them. Enable the `test-util`
//! feature to use it from another crate's tests.

use chrono::SecondsFormat;

use crate::model::{FieldValue, Issue, IssueField, NewIssue, now};
use crate::query::{IssueChanges, IssueFilter};
use crate::store::IssueStore;

/// Build an unsaved issue for `project`.
#[must_use]
pub fn sample_issue(project: &str, title: &str, creator: &str) -> Issue {
    NewIssue {
        issue_title: title.to_string(),
        created_by: creator.to_string(),
        ..Default::default()
    }
    .into_issue(project, now())
}

/// Run the port contract against `store`. The store must start empty.
///
/// # Panics
///
/// Panics when the store deviates from the contract.
pub async fn check_store_contract(store: &dyn IssueStore) {
    let first = store
        .insert(sample_issue("contract", "first", "alice"))
        .await
        .expect("insert first");
    let second = store
        .insert(sample_issue("contract", "second", "bob"))
        .await
        .expect("insert second");
    let elsewhere = store
        .insert(sample_issue("elsewhere", "third", "alice"))
        .await
        .expect("insert elsewhere");

    assert!(!first.id.is_empty(), "insert must assign an id");
    assert_ne!(first.id, second.id, "ids must be unique");
    assert_eq!(first.created_on, first.updated_on);

    // find_many: project scoping and insertion order
    let listed = store
        .find_many(&IssueFilter::for_project("contract"))
        .await
        .expect("find_many");
    assert_eq!(listed, vec![first.clone(), second.clone()]);

    // find_many: conjunction
    let by_creator = IssueFilter::for_project("contract")
        .and(IssueField::CreatedBy, FieldValue::Text("alice".into()));
    assert_eq!(
        store.find_many(&by_creator).await.expect("find_many"),
        vec![first.clone()]
    );

    // find_many: timestamps filter back to their record
    let by_created = IssueFilter::for_project("elsewhere")
        .and(IssueField::CreatedOn, FieldValue::Timestamp(elsewhere.created_on));
    assert_eq!(
        store.find_many(&by_created).await.expect("find_many"),
        vec![elsewhere.clone()]
    );
    let finer = elsewhere.created_on + chrono::Duration::nanoseconds(999);
    let by_finer = IssueFilter::from_query(
        "elsewhere",
        [("created_on", finer.to_rfc3339_opts(SecondsFormat::Nanos, true))],
    )
    .expect("nanosecond timestamp filter");
    assert_eq!(
        store.find_many(&by_finer).await.expect("find_many"),
        vec![elsewhere.clone()]
    );

    // find_one
    assert_eq!(
        store
            .find_one(&IssueFilter::scoped("contract", second.id.clone()))
            .await
            .expect("find_one"),
        Some(second.clone())
    );
    assert_eq!(
        store
            .find_one(&IssueFilter::scoped("contract", elsewhere.id.clone()))
            .await
            .expect("find_one"),
        None
    );

    // update_one: merge only supplied fields
    let changes = IssueChanges {
        status_text: Some("triaged".to_string()),
        open: Some(false),
        ..Default::default()
    }
    .stamped(now());
    let updated = store
        .update_one(&IssueFilter::scoped("contract", first.id.clone()), &changes)
        .await
        .expect("update_one")
        .expect("update_one should match");
    assert_eq!(updated.status_text, "triaged");
    assert!(!updated.open);
    assert_eq!(updated.issue_title, first.issue_title);
    assert_eq!(updated.created_by, first.created_by);
    assert_eq!(updated.project_name, first.project_name);
    assert_eq!(updated.created_on, first.created_on);
    assert!(updated.updated_on > first.updated_on);

    let closed =
        IssueFilter::for_project("contract").and(IssueField::Open, FieldValue::Bool(false));
    assert_eq!(
        store.find_many(&closed).await.expect("find_many"),
        vec![updated.clone()]
    );

    // update_one: wrong project or unknown id matches nothing
    assert!(
        store
            .update_one(&IssueFilter::scoped("elsewhere", first.id.clone()), &changes)
            .await
            .expect("update_one")
            .is_none()
    );
    assert!(
        store
            .update_one(&IssueFilter::scoped("contract", "no-such-id"), &changes)
            .await
            .expect("update_one")
            .is_none()
    );

    // delete_one
    assert_eq!(
        store
            .delete_one(&IssueFilter::scoped("elsewhere", first.id.clone()))
            .await
            .expect("delete_one"),
        0
    );
    assert_eq!(
        store
            .delete_one(&IssueFilter::scoped("contract", first.id.clone()))
            .await
            .expect("delete_one"),
        1
    );
    assert_eq!(
        store
            .find_many(&IssueFilter::for_project("contract"))
            .await
            .expect("find_many"),
        vec![second]
    );
    assert_eq!(
        store
            .count(&IssueFilter::for_project("elsewhere"))
            .await
            .expect("count"),
        1
    );
}
