//! Integration tests for the client HTTP API.

mod common;

use activation_store::ActivationStore;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use code_relay::{
    api::{create_router, AppState},
    ProviderPoller,
};
use common::{poller_config, provider_client, subscription};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::MockServer;

/// Create a test app backed by an in-memory store.
async fn create_test_app() -> (Router, ActivationStore, MockServer) {
    let server = MockServer::start().await;
    let store = ActivationStore::new();
    let poller = ProviderPoller::new(store.clone(), provider_client(&server), poller_config());
    let app = create_router(AppState::new(store.clone(), poller));
    (app, store, server)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_root_banner() {
    let (app, _store, _server) = create_test_app().await;

    let response = app.oneshot(empty_request("GET", "/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"SMS code relay active");
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _store, _server) = create_test_app().await;

    let response = app.oneshot(empty_request("GET", "/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["sessions"], 0);
    assert_eq!(json["pollers"], 0);
}

#[tokio::test]
async fn test_get_activation_not_found() {
    let (app, _store, _server) = create_test_app().await;

    let response = app
        .oneshot(empty_request("GET", "/v1/activations/missing"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_put_activation_merges_fields() {
    let (app, store, _server) = create_test_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/v1/activations/A1",
            json!({"phoneNumber": "79123456789", "serviceName": "tg"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(json_request(
            "PUT",
            "/v1/activations/A1",
            json!({"serviceName": "telegram"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["id"], "A1");
    assert_eq!(json["phoneNumber"], "79123456789");
    assert_eq!(json["serviceName"], "telegram");
    assert!(json.get("subscription").is_none());

    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_subscription_attach_and_detach() {
    let (app, store, _server) = create_test_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/v1/activations/A1/subscription",
            subscription(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(store.get("A1").await.unwrap().subscription.is_some());

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", "/v1/activations/A1/subscription"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(store.get("A1").await.unwrap().subscription.is_none());

    let response = app
        .oneshot(empty_request("DELETE", "/v1/activations/A1/subscription"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_subscription_without_endpoint_rejected() {
    let (app, store, _server) = create_test_app().await;

    let response = app
        .oneshot(json_request(
            "PUT",
            "/v1/activations/A1/subscription",
            json!({"keys": {"auth": "x"}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INVALID_REQUEST");
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_submit_message_keyed_by_code() {
    let (app, store, _server) = create_test_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/activations/C3/messages",
            json!({"code": "1234", "text": "Your code is 1234"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["key"], "1234");
    assert_eq!(json["message"]["pushSent"], false);
    assert_eq!(json["message"]["source"], "client");

    // Same code again is refused without touching the stored message.
    store.mark_push_sent("C3", "1234").await.unwrap();
    let response = app
        .oneshot(json_request(
            "POST",
            "/v1/activations/C3/messages",
            json!({"code": "1234", "text": "different"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let message = store.get_message("C3", "1234").await.unwrap();
    assert!(message.push_sent);
    assert_eq!(message.text, "Your code is 1234");
}

#[tokio::test]
async fn test_submit_free_text_message_gets_generated_key() {
    let (app, store, _server) = create_test_app().await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/v1/activations/A1/messages",
            json!({"text": "Your login link"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    let key = json["key"].as_str().unwrap();
    assert!(key.starts_with("msg-"));
    assert!(json["message"].get("code").is_none());
    assert!(store.get_message("A1", key).await.is_some());
}

#[tokio::test]
async fn test_submit_empty_message_rejected() {
    let (app, _store, _server) = create_test_app().await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/v1/activations/A1/messages",
            json!({"code": "  ", "text": ""}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_activation() {
    let (app, store, _server) = create_test_app().await;
    store
        .put("A1", activation_store::SessionPatch::default())
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", "/v1/activations/A1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(store.get("A1").await.is_none());

    let response = app
        .oneshot(empty_request("DELETE", "/v1/activations/A1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
