#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use issue_tracker::server::{AppState, router};
use issues_lib::{InMemoryStore, IssueService, IssueStore};
use serde_json::Value;
use tower::ServiceExt;

/// In-process application driven through the real router.
pub struct TestApp {
    router: Router,
    store: Arc<dyn IssueStore>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    pub fn memory() -> Self {
        Self::with_store(Arc::new(InMemoryStore::new()))
    }

    pub fn with_store(store: Arc<dyn IssueStore>) -> Self {
        let state = AppState::new(IssueService::new(Arc::clone(&store)));
        Self {
            router: router(state),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn IssueStore> {
        &self.store
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                panic!("non-JSON body ({e}): {}", String::from_utf8_lossy(&bytes))
            })
        };
        TestResponse { status, body }
    }

    pub async fn json(&self, method: Method, uri: &str, body: &Value) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");
        self.send(request).await
    }

    pub async fn form(&self, method: Method, uri: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .expect("request");
        self.send(request).await
    }

    pub async fn raw(
        &self,
        method: Method,
        uri: &str,
        content_type: Option<&str>,
        body: &str,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let request = builder.body(Body::from(body.to_string())).expect("request");
        self.send(request).await
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .expect("request");
        self.send(request).await
    }

    /// Create an issue and return the echoed record.
    pub async fn create(&self, project: &str, body: &Value) -> Value {
        let response = self
            .json(Method::POST, &format!("/api/issues/{project}"), body)
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert!(
            response.body.get("_id").is_some(),
            "create failed: {}",
            response.body
        );
        response.body
    }
}

/// The `_id` of a returned record.
pub fn id_of(record: &Value) -> String {
    record["_id"].as_str().expect("_id").to_string()
}

/// The `_id`s of a returned array, in order.
pub fn ids_of(records: &Value) -> Vec<String> {
    records
        .as_array()
        .expect("array body")
        .iter()
        .map(id_of)
        .collect()
}
