#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use stockroom_api::config::ServerConfig;
use stockroom_api::router::build_app_router;
use stockroom_api::state::AppState;
use stockroom_events::{ActivityPersistence, EventBus};
use tokio::task::JoinHandle;

/// Test configuration with a short lock timeout.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        database_url: String::new(),
        db_max_connections: 5,
        ledger_lock_timeout_ms: 2000,
    }
}

/// Build the production router against the given pool.
pub fn build_test_app(pool: PgPool) -> Router {
    let state = AppState::new(pool, test_config(), Arc::new(EventBus::default()));
    build_app_router(state)
}

/// Like [`build_test_app`] but with activity persistence running.
///
/// The returned task finishes once every clone of the router is dropped.
pub fn build_test_app_with_activity(pool: PgPool) -> (Router, JoinHandle<()>) {
    let bus = Arc::new(EventBus::default());
    let task = tokio::spawn(ActivityPersistence::run(pool.clone(), bus.subscribe()));
    let state = AppState::new(pool, test_config(), bus);
    (build_app_router(state), task)
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, json_request("POST", uri, body)).await
}

pub async fn put_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, json_request("PUT", uri, body)).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send(app, Request::delete(uri).body(Body::empty()).unwrap()).await
}

/// `POST` with an `x-actor-id` header.
pub async fn post_json_as(
    app: Router,
    actor: i64,
    uri: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let mut request = json_request("POST", uri, body);
    request
        .headers_mut()
        .insert("x-actor-id", actor.to_string().parse().unwrap());
    send(app, request).await
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

/// Register an asset and return its id.
pub async fn create_asset(pool: &PgPool, name: &str, total_owned: i64) -> i64 {
    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/assets",
        serde_json::json!({ "name": name, "total_owned": total_owned }),
    )
    .await;
    body_json(response).await["data"]["id"].as_i64().unwrap()
}
