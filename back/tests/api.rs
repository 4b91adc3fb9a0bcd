use std::sync::Arc;

use api::v1::{Created, ErrorBody, Todo, TOTAL_COUNT_HEADER, TOTAL_PAGES_HEADER};
use axum::{
    body::Body,
    http::{self, Request, StatusCode},
    response::Response,
};
use http_body_util::BodyExt;
use todo_back::{app, AppState};
use tower::ServiceExt;

fn service() -> axum::Router {
    app(Arc::new(AppState::default())).unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn form_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            http::header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        )
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn create(app: &axum::Router, title: &str) -> Todo {
    let body = format!("title={}", title.replace(' ', "+"));
    let resp = app
        .clone()
        .oneshot(form_request("POST", "/todos", &body))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Created<Todo> = body_json(resp).await;
    created.data
}

fn header(resp: &Response, name: &str) -> String {
    resp.headers()[name].to_str().unwrap().to_string()
}

// --- list ---

#[tokio::test]
async fn list_empty_reports_zero_totals() {
    let resp = service().oneshot(get("/todos")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, TOTAL_COUNT_HEADER), "0");
    assert_eq!(header(&resp, TOTAL_PAGES_HEADER), "0");
    let todos: Vec<Todo> = body_json(resp).await;
    assert!(todos.is_empty());
}

#[tokio::test]
async fn list_filters_and_paginates() {
    let app = service();
    for title in ["Buy milk", "Buy bread", "Walk dog", "buy MILK again"] {
        create(&app, title).await;
    }

    let resp = app.clone().oneshot(get("/todos?q=milk")).await.unwrap();
    assert_eq!(header(&resp, TOTAL_COUNT_HEADER), "2");
    assert_eq!(header(&resp, TOTAL_PAGES_HEADER), "1");
    let todos: Vec<Todo> = body_json(resp).await;
    assert!(todos.iter().all(|t| t.title.to_lowercase().contains("milk")));

    let resp = app
        .clone()
        .oneshot(get("/todos?page=2&per_page=3"))
        .await
        .unwrap();
    assert_eq!(header(&resp, TOTAL_COUNT_HEADER), "4");
    assert_eq!(header(&resp, TOTAL_PAGES_HEADER), "2");
    let todos: Vec<Todo> = body_json(resp).await;
    assert_eq!(todos.len(), 1);
}

#[tokio::test]
async fn list_blank_query_is_unfiltered() {
    let app = service();
    create(&app, "Buy milk").await;
    create(&app, "Walk dog").await;

    let resp = app.oneshot(get("/todos?q=%20%20")).await.unwrap();
    assert_eq!(header(&resp, TOTAL_COUNT_HEADER), "2");
}

#[tokio::test]
async fn list_rejects_non_numeric_page() {
    let resp = service().oneshot(get("/todos?page=first")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- create / show ---

#[tokio::test]
async fn create_then_show_round_trips() {
    let app = service();
    let created = create(&app, "Buy milk").await;
    assert_eq!(created.title, "Buy milk");
    assert!(created.completed_at.is_none());
    assert_eq!(created.created_at, created.updated_at);

    let resp = app
        .oneshot(get(&format!("/todos/{}", created.id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let shown: Todo = body_json(resp).await;
    assert_eq!(shown, created);
}

#[tokio::test]
async fn create_rejects_empty_and_long_titles() {
    let app = service();

    let resp = app
        .clone()
        .oneshot(form_request("POST", "/todos", "title="))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let long = format!("title={}", "x".repeat(256));
    let resp = app
        .oneshot(form_request("POST", "/todos", &long))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorBody = body_json(resp).await;
    assert!(body.message.starts_with("title"));
}

#[tokio::test]
async fn show_unknown_id_is_not_found() {
    let resp = service()
        .oneshot(get("/todos/00000000-0000-0000-0000-000000000000"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: ErrorBody = body_json(resp).await;
    assert_eq!(body.message, "Not Found");
}

#[tokio::test]
async fn show_bad_uuid_returns_400() {
    let resp = service().oneshot(get("/todos/not-a-uuid")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- update ---

#[tokio::test]
async fn update_completes_and_clears() {
    let app = service();
    let todo = create(&app, "Buy milk").await;
    let uri = format!("/todos/{}", todo.id);

    let resp = app
        .clone()
        .oneshot(form_request(
            "PUT",
            &uri,
            "completedAt=2024-05-01T10%3A00%3A00.000Z",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let completed: Todo = body_json(resp).await;
    assert!(completed.is_completed());
    assert_eq!(completed.title, "Buy milk");
    assert!(completed.updated_at >= completed.created_at);

    let resp = app
        .oneshot(form_request("PUT", &uri, "completedAt=null"))
        .await
        .unwrap();
    let cleared: Todo = body_json(resp).await;
    assert!(cleared.completed_at.is_none());
}

#[tokio::test]
async fn update_title_only_leaves_completion() {
    let app = service();
    let todo = create(&app, "Buy milk").await;

    let resp = app
        .oneshot(form_request(
            "PUT",
            &format!("/todos/{}", todo.id),
            "title=Buy+oat+milk",
        ))
        .await
        .unwrap();
    let updated: Todo = body_json(resp).await;
    assert_eq!(updated.title, "Buy oat milk");
    assert_eq!(updated.completed_at, todo.completed_at);
}

#[tokio::test]
async fn update_rejects_bad_timestamp() {
    let app = service();
    let todo = create(&app, "Buy milk").await;

    let resp = app
        .oneshot(form_request(
            "PUT",
            &format!("/todos/{}", todo.id),
            "completedAt=tomorrow",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn update_unknown_id_is_not_found() {
    let resp = service()
        .oneshot(form_request(
            "PUT",
            "/todos/00000000-0000-0000-0000-000000000000",
            "title=x",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- destroy ---

#[tokio::test]
async fn destroy_removes_todo() {
    let app = service();
    let todo = create(&app, "Buy milk").await;
    let uri = format!("/todos/{}", todo.id);

    let resp = app
        .clone()
        .oneshot(Request::builder().method("DELETE").uri(&uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app.clone().oneshot(get(&uri)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app
        .oneshot(Request::builder().method("DELETE").uri(&uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- fallback ---

#[tokio::test]
async fn unknown_route_is_structured_not_found() {
    let resp = service().oneshot(get("/api/hello")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: ErrorBody = body_json(resp).await;
    assert_eq!(body.message, "Not Found");
}
