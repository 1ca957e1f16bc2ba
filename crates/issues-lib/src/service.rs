//! Request handling: validation, store calls and response mapping.
//!
//! [`IssueService`] owns nothing but a handle to the store, so it can be
//! cloned into every concurrent request.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::model::now;
use crate::query::IssueFilter;
use crate::response::{ApiResponse, COULD_NOT_DELETE, COULD_NOT_UPDATE, DELETED, UPDATED};
use crate::store::IssueStore;
use crate::validation::{Payload, validate_create, validate_delete, validate_update};

/// Project-scoped issue operations over an injected store.
#[derive(Clone)]
pub struct IssueService {
    store: Arc<dyn IssueStore>,
}

impl IssueService {
    #[must_use]
    pub fn new(store: Arc<dyn IssueStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn IssueStore> {
        &self.store
    }

    /// List the issues of `project` matching every query pair.
    pub async fn list<I, K, V>(&self, project: &str, query: I) -> ApiResponse
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let filter = match IssueFilter::from_query(project, query) {
            Ok(filter) => filter,
            Err(e) => {
                debug!(project, error = %e, "rejected list filter");
                return ApiResponse::error(e.to_string());
            }
        };

        match self.store.find_many(&filter).await {
            Ok(issues) => {
                debug!(project, count = issues.len(), "listed issues");
                ApiResponse::Issues(issues)
            }
            Err(e) => {
                error!(project, error = %e, "list failed");
                ApiResponse::error(e.to_string())
            }
        }
    }

    /// Create an issue in `project` and return it as persisted.
    pub async fn create(&self, project: &str, payload: &Payload) -> ApiResponse {
        let new_issue = match validate_create(payload) {
            Ok(new_issue) => new_issue,
            Err(failure) => {
                debug!(project, reason = %failure, "rejected create");
                return ApiResponse::error(failure.to_string());
            }
        };

        match self.store.insert(new_issue.into_issue(project, now())).await {
            Ok(issue) => {
                debug!(project, id = %issue.id, "created issue");
                ApiResponse::Issue(Box::new(issue))
            }
            Err(e) => {
                error!(project, error = %e, "create failed");
                ApiResponse::error(e.to_string())
            }
        }
    }

    /// Merge the payload's fields into the issue named by its `_id`.
    ///
    /// A missing record and a store fault produce the same response body;
    /// only the log level tells them apart.
    pub async fn update(&self, project: &str, payload: &Payload) -> ApiResponse {
        let (id, changes) = match validate_update(payload) {
            Ok(validated) => validated,
            Err(failure) => {
                debug!(project, reason = %failure, "rejected update");
                return match failure.id() {
                    Some(id) => ApiResponse::error_with_id(failure.to_string(), id),
                    None => ApiResponse::error(failure.to_string()),
                };
            }
        };

        let fields = changes.fields();
        let scope = IssueFilter::scoped(project, id.clone());
        match self.store.update_one(&scope, &changes.stamped(now())).await {
            Ok(Some(_)) => {
                debug!(project, %id, ?fields, "updated issue");
                ApiResponse::outcome(UPDATED, id)
            }
            Ok(None) => {
                warn!(project, %id, "update matched no issue");
                ApiResponse::error_with_id(COULD_NOT_UPDATE, id)
            }
            Err(e) => {
                error!(project, %id, error = %e, "update failed");
                ApiResponse::error_with_id(COULD_NOT_UPDATE, id)
            }
        }
    }

    /// Delete the issue named by the payload's `_id`.
    pub async fn delete(&self, project: &str, payload: &Payload) -> ApiResponse {
        let id = match validate_delete(payload) {
            Ok(id) => id,
            Err(failure) => {
                debug!(project, reason = %failure, "rejected delete");
                return ApiResponse::error(failure.to_string());
            }
        };

        let scope = IssueFilter::scoped(project, id.clone());
        match self.store.delete_one(&scope).await {
            Ok(1) => {
                debug!(project, %id, "deleted issue");
                ApiResponse::outcome(DELETED, id)
            }
            Ok(_) => {
                warn!(project, %id, "delete matched no issue");
                ApiResponse::error_with_id(COULD_NOT_DELETE, id)
            }
            Err(e) => {
                error!(project, %id, error = %e, "delete failed");
                ApiResponse::error_with_id(COULD_NOT_DELETE, id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IssuesError, Result};
    use crate::model::Issue;
    use crate::query::IssueChanges;
    use crate::store::InMemoryStore;
    use async_trait::async_trait;
    use serde_json::{Value, json};

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn service() -> IssueService {
        IssueService::new(Arc::new(InMemoryStore::new()))
    }

    async fn create(service: &IssueService, project: &str, body: Value) -> Issue {
        match service.create(project, &payload(body)).await {
            ApiResponse::Issue(issue) => *issue,
            other => panic!("create failed: {other:?}"),
        }
    }

    async fn list(service: &IssueService, project: &str, query: &[(&str, &str)]) -> Vec<Issue> {
        match service.list(project, query.iter().copied()).await {
            ApiResponse::Issues(issues) => issues,
            other => panic!("list failed: {other:?}"),
        }
    }

    /// A store whose every operation fails.
    struct BrokenStore;

    #[async_trait]
    impl IssueStore for BrokenStore {
        fn backend(&self) -> &'static str {
            "broken"
        }
        async fn insert(&self, _: Issue) -> Result<Issue> {
            Err(IssuesError::storage("disk on fire"))
        }
        async fn find_many(&self, _: &IssueFilter) -> Result<Vec<Issue>> {
            Err(IssuesError::storage("disk on fire"))
        }
        async fn find_one(&self, _: &IssueFilter) -> Result<Option<Issue>> {
            Err(IssuesError::storage("disk on fire"))
        }
        async fn update_one(&self, _: &IssueFilter, _: &IssueChanges) -> Result<Option<Issue>> {
            Err(IssuesError::storage("disk on fire"))
        }
        async fn delete_one(&self, _: &IssueFilter) -> Result<u64> {
            Err(IssuesError::storage("disk on fire"))
        }
    }

    #[tokio::test]
    async fn test_create_echoes_fields() {
        let service = service();
        let issue = create(
            &service,
            "test",
            json!({"issue_title": "T", "created_by": "U", "assigned_to": "V"}),
        )
        .await;
        assert_eq!(issue.issue_title, "T");
        assert_eq!(issue.created_by, "U");
        assert_eq!(issue.assigned_to, "V");
        assert_eq!(issue.project_name, "test");
        assert!(issue.open);
        assert_eq!(issue.created_on, issue.updated_on);
        assert!(!issue.id.is_empty());
    }

    #[tokio::test]
    async fn test_create_missing_fields_persists_nothing() {
        let service = service();
        let response = service
            .create("test", &payload(json!({"issue_title": "T"})))
            .await;
        assert_eq!(response, ApiResponse::error("required field(s) missing"));
        assert!(list(&service, "test", &[]).await.is_empty());
    }

    #[tokio::test]
    async fn test_list_is_scoped_and_filtered() {
        let service = service();
        let a = create(
            &service,
            "p",
            json!({"issue_title": "a", "created_by": "u", "assigned_to": "x"}),
        )
        .await;
        let b = create(&service, "p", json!({"issue_title": "b", "created_by": "u"})).await;
        create(&service, "q", json!({"issue_title": "c", "created_by": "u"})).await;
        service
            .update("p", &payload(json!({"_id": b.id, "open": false})))
            .await;

        let all = list(&service, "p", &[]).await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, a.id);

        let open = list(&service, "p", &[("open", "true")]).await;
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, a.id);

        let both = list(&service, "p", &[("open", "true"), ("assigned_to", "y")]).await;
        assert!(both.is_empty());
    }

    #[tokio::test]
    async fn test_list_bad_filter_is_error_body() {
        let response = service().list("p", [("open", "perhaps")]).await;
        assert!(response.is_error());
    }

    #[tokio::test]
    async fn test_update_paths() {
        let service = service();
        let issue = create(&service, "p", json!({"issue_title": "a", "created_by": "u"})).await;

        assert_eq!(
            service.update("p", &payload(json!({"issue_text": "x"}))).await,
            ApiResponse::error("missing _id")
        );
        assert_eq!(
            service.update("p", &payload(json!({"_id": issue.id}))).await,
            ApiResponse::error_with_id("no update field(s) sent", issue.id.clone())
        );
        assert_eq!(
            service
                .update("p", &payload(json!({"_id": "is-nope", "issue_text": "x"})))
                .await,
            ApiResponse::error_with_id(COULD_NOT_UPDATE, "is-nope")
        );
        assert_eq!(
            service
                .update("q", &payload(json!({"_id": issue.id, "issue_text": "x"})))
                .await,
            ApiResponse::error_with_id(COULD_NOT_UPDATE, issue.id.clone())
        );
        assert_eq!(
            service
                .update("p", &payload(json!({"_id": issue.id, "issue_text": "x"})))
                .await,
            ApiResponse::outcome(UPDATED, issue.id.clone())
        );

        let after = list(&service, "p", &[]).await.remove(0);
        assert_eq!(after.issue_text, "x");
        assert_eq!(after.issue_title, issue.issue_title);
        assert_eq!(after.created_on, issue.created_on);
        assert!(after.updated_on > issue.updated_on);
    }

    #[tokio::test]
    async fn test_update_with_ignored_keys_only_restamps() {
        let service = service();
        let issue = create(&service, "p", json!({"issue_title": "a", "created_by": "u"})).await;

        for body in [
            json!({"_id": issue.id, "color": "blue"}),
            json!({"_id": issue.id, "issue_text": null}),
        ] {
            assert_eq!(
                service.update("p", &payload(body)).await,
                ApiResponse::outcome(UPDATED, issue.id.clone())
            );
        }

        let after = list(&service, "p", &[]).await.remove(0);
        assert_eq!(after.issue_text, issue.issue_text);
        assert_eq!(after.issue_title, issue.issue_title);
        assert!(after.updated_on > issue.updated_on);
    }

    #[tokio::test]
    async fn test_delete_paths() {
        let service = service();
        let issue = create(&service, "p", json!({"issue_title": "a", "created_by": "u"})).await;

        assert_eq!(
            service.delete("p", &Payload::new()).await,
            ApiResponse::error("missing _id")
        );
        assert_eq!(
            service.delete("q", &payload(json!({"_id": issue.id}))).await,
            ApiResponse::error_with_id(COULD_NOT_DELETE, issue.id.clone())
        );
        assert_eq!(
            service.delete("p", &payload(json!({"_id": issue.id}))).await,
            ApiResponse::outcome(DELETED, issue.id.clone())
        );
        assert!(list(&service, "p", &[]).await.is_empty());
    }

    #[tokio::test]
    async fn test_store_faults_map_to_bodies() {
        let service = IssueService::new(Arc::new(BrokenStore));

        assert_eq!(
            service.list("p", Vec::<(String, String)>::new()).await,
            ApiResponse::error("storage error: disk on fire")
        );
        assert_eq!(
            service
                .create("p", &payload(json!({"issue_title": "a", "created_by": "u"})))
                .await,
            ApiResponse::error("storage error: disk on fire")
        );
        assert_eq!(
            service
                .update("p", &payload(json!({"_id": "is-1", "open": false})))
                .await,
            ApiResponse::error_with_id(COULD_NOT_UPDATE, "is-1")
        );
        assert_eq!(
            service.delete("p", &payload(json!({"_id": "is-1"}))).await,
            ApiResponse::error_with_id(COULD_NOT_DELETE, "is-1")
        );
    }
}
