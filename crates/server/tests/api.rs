use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use migration::MigratorTrait;
use server::ServerState;

async fn app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = engine::Engine::builder()
        .database(db)
        .build()
        .await
        .unwrap();
    server::router(ServerState::new(engine, 5))
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn open(app: &Router, user: &str) {
    let (status, _) = call(app, Method::POST, "/accounts", Some(user), None).await;
    assert_eq!(status, StatusCode::CREATED);
}

async fn new_request(app: &Router, requester: &str, provider: &str) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/requests",
        Some(requester),
        Some(json!({ "provider_id": provider, "skill": "gardening", "message": "help?" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn missing_user_header_is_unauthorized() {
    let app = app().await;
    let (status, _) = call(&app, Method::GET, "/accounts/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, Method::GET, "/accounts/me", Some("  "), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn opening_an_account_grants_tokens() {
    let app = app().await;
    let (status, body) = call(&app, Method::POST, "/accounts", Some("alice"), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["account_id"], "alice");
    assert_eq!(body["balance"], 5);

    let (status, _) = call(&app, Method::POST, "/accounts", Some("alice"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call(&app, Method::GET, "/accounts/me", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], 5);

    let (status, _) = call(&app, Method::GET, "/accounts/me", Some("nobody"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn transfers_move_tokens_from_the_acting_user() {
    let app = app().await;
    open(&app, "alice").await;
    open(&app, "bob").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/transfers",
        Some("alice"),
        Some(json!({ "to": "bob", "amount": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["account_id"], "alice");
    assert_eq!(body["balance"], 3);

    let (status, _) = call(
        &app,
        Method::POST,
        "/transfers",
        Some("alice"),
        Some(json!({ "to": "bob", "amount": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = call(
        &app,
        Method::POST,
        "/transfers",
        Some("alice"),
        Some(json!({ "to": " ", "amount": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = call(&app, Method::GET, "/accounts/me", Some("bob"), None).await;
    assert_eq!(body["balance"], 7);
}

#[tokio::test]
async fn request_lifecycle_over_http() {
    let app = app().await;
    open(&app, "alice").await;
    open(&app, "bob").await;
    let id = new_request(&app, "alice", "bob").await;
    let uri = format!("/requests/{id}");

    let (status, body) = call(&app, Method::GET, "/requests/incoming", Some("bob"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["requests"][0]["id"], id.as_str());
    assert_eq!(body["requests"][0]["status"], "pending");

    let (_, body) = call(&app, Method::GET, "/requests/outgoing", Some("alice"), None).await;
    assert_eq!(body["requests"].as_array().unwrap().len(), 1);

    let (status, body) = call(
        &app,
        Method::PUT,
        &uri,
        Some("bob"),
        Some(json!({ "status": "accepted" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "accepted");

    let (status, body) = call(
        &app,
        Method::PUT,
        &uri,
        Some("bob"),
        Some(json!({ "status": "Completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");

    let (_, body) = call(&app, Method::GET, "/accounts/me", Some("alice"), None).await;
    assert_eq!(body["balance"], 4);
    let (_, body) = call(&app, Method::GET, "/accounts/me", Some("bob"), None).await;
    assert_eq!(body["balance"], 6);

    let (status, _) = call(
        &app,
        Method::PUT,
        &uri,
        Some("bob"),
        Some(json!({ "status": "declined" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn only_the_provider_may_update() {
    let app = app().await;
    open(&app, "alice").await;
    open(&app, "bob").await;
    let id = new_request(&app, "alice", "bob").await;
    let uri = format!("/requests/{id}");

    let (status, _) = call(
        &app,
        Method::PUT,
        &uri,
        Some("alice"),
        Some(json!({ "status": "accepted" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, Method::GET, &uri, Some("mallory"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&app, Method::GET, &uri, Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
}

#[tokio::test]
async fn unknown_status_is_rejected() {
    let app = app().await;
    open(&app, "alice").await;
    open(&app, "bob").await;
    let id = new_request(&app, "alice", "bob").await;

    let (status, _) = call(
        &app,
        Method::PUT,
        &format!("/requests/{id}"),
        Some("bob"),
        Some(json!({ "status": "cancelled" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn requests_to_unknown_users_are_not_found() {
    let app = app().await;
    open(&app, "alice").await;

    let (status, _) = call(
        &app,
        Method::POST,
        "/requests",
        Some("alice"),
        Some(json!({ "provider_id": "ghost", "skill": "gardening" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(
        &app,
        Method::GET,
        &format!("/requests/{}", uuid::Uuid::new_v4()),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
