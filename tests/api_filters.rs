mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, id_of, ids_of};
use serde_json::{Value, json};

async fn seeded() -> (TestApp, Vec<Value>) {
    let app = TestApp::memory();
    let mut records = Vec::new();
    for (title, creator, assignee) in [
        ("Login broken", "ana", "bo"),
        ("Slow search", "bo", "bo"),
        ("Typo in footer", "ana", "cy"),
    ] {
        records.push(
            app.create(
                "filters",
                &json!({ "issue_title": title, "created_by": creator, "assigned_to": assignee }),
            )
            .await,
        );
    }
    // Close the second one.
    let closed = app
        .json(
            Method::PUT,
            "/api/issues/filters",
            &json!({ "_id": id_of(&records[1]), "open": false }),
        )
        .await;
    assert_eq!(closed.body["result"], "successfully updated");
    (app, records)
}

#[tokio::test]
async fn test_single_field_filter() {
    let (app, records) = seeded().await;
    let response = app.get("/api/issues/filters?created_by=ana").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        ids_of(&response.body),
        [id_of(&records[0]), id_of(&records[2])]
    );
}

#[tokio::test]
async fn test_filters_are_conjunctive() {
    let (app, records) = seeded().await;
    let response = app
        .get("/api/issues/filters?open=true&assigned_to=bo")
        .await;
    assert_eq!(ids_of(&response.body), [id_of(&records[0])]);

    let none = app
        .get("/api/issues/filters?created_by=bo&assigned_to=cy")
        .await;
    assert_eq!(none.body, json!([]));
}

#[tokio::test]
async fn test_open_filter_is_typed() {
    let (app, records) = seeded().await;
    let closed = app.get("/api/issues/filters?open=false").await;
    assert_eq!(ids_of(&closed.body), [id_of(&records[1])]);

    let numeric = app.get("/api/issues/filters?open=0").await;
    assert_eq!(ids_of(&numeric.body), [id_of(&records[1])]);
}

#[tokio::test]
async fn test_filter_by_id_and_encoded_values() {
    let (app, records) = seeded().await;
    let id = id_of(&records[2]);
    let by_id = app.get(&format!("/api/issues/filters?_id={id}")).await;
    assert_eq!(ids_of(&by_id.body), [id.clone()]);

    let by_title = app
        .get("/api/issues/filters?issue_title=Typo%20in%20footer")
        .await;
    assert_eq!(ids_of(&by_title.body), [id]);
}

#[tokio::test]
async fn test_timestamp_filter_round_trips() {
    let (app, records) = seeded().await;
    let created_on = records[0]["created_on"].as_str().unwrap();
    let response = app
        .get(&format!("/api/issues/filters?created_on={created_on}"))
        .await;
    assert!(ids_of(&response.body).contains(&id_of(&records[0])));

    // Digits past the microsecond do not change what matches.
    let finer = created_on.replace('Z', "999Z");
    let response = app
        .get(&format!("/api/issues/filters?created_on={finer}"))
        .await;
    assert!(ids_of(&response.body).contains(&id_of(&records[0])));
}

#[tokio::test]
async fn test_project_name_in_query_cannot_escape_scope() {
    let (app, _) = seeded().await;
    app.create("other", &json!({ "issue_title": "Elsewhere", "created_by": "ana" }))
        .await;

    let response = app.get("/api/issues/filters?project_name=other").await;
    let projects: Vec<&str> = response
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["project_name"].as_str().unwrap())
        .collect();
    assert_eq!(projects, ["filters", "filters", "filters"]);
}

#[tokio::test]
async fn test_bad_filters_return_error_body() {
    let (app, _) = seeded().await;

    let unknown = app.get("/api/issues/filters?priority=high").await;
    assert_eq!(unknown.status, StatusCode::OK);
    let message = unknown.body["error"].as_str().unwrap();
    assert!(message.starts_with("invalid filter"), "{message}");
    assert!(message.contains("priority"), "{message}");

    let bad_bool = app.get("/api/issues/filters?open=maybe").await;
    assert!(
        bad_bool.body["error"]
            .as_str()
            .unwrap()
            .starts_with("invalid filter: open")
    );

    let bad_time = app.get("/api/issues/filters?updated_on=yesterday").await;
    assert!(
        bad_time.body["error"]
            .as_str()
            .unwrap()
            .starts_with("invalid filter: updated_on")
    );
}

#[tokio::test]
async fn test_unknown_project_lists_empty() {
    let app = TestApp::memory();
    let response = app.get("/api/issues/nobody-here").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!([]));
}
