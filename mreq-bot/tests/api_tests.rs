//! HTTP API integration tests

mod helpers;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use helpers::{create_test_dispatcher, song, ScriptedCatalogue};
use http_body_util::BodyExt;
use mreq_common::QualityTier;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

/// Test helper: router over a scripted catalogue
fn create_test_app() -> axum::Router {
    let catalogue = Arc::new(
        ScriptedCatalogue::new()
            .with_results("晴天", vec![song(186016, "晴天"), song(29822014, "晴天 (Live)")])
            .with_url(186016, QualityTier::Standard),
    );
    let (dispatcher, _, event_bus) = create_test_dispatcher(catalogue);
    mreq_bot::build_router(mreq_bot::AppState::new(Arc::new(dispatcher), event_bus))
}

fn dispatch_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/dispatch")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "mreq-bot");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["open_sessions"], 0);
}

#[tokio::test]
async fn test_dispatch_search_then_select() {
    let app = create_test_app();

    let response = app
        .clone()
        .oneshot(dispatch_request(json!({
            "conversation_key": "group:42",
            "text": "/点歌 晴天"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["matched"], true);
    assert_eq!(json["payload"]["kind"], "selection_prompt");
    assert_eq!(json["payload"]["candidates"][0]["index"], 1);
    assert_eq!(json["payload"]["candidates"][1]["song_id"], 29822014);
    assert!(json["text"].as_str().unwrap().contains("1. 晴天 - 周杰伦"));

    let response = app
        .oneshot(dispatch_request(json!({
            "conversation_key": "group:42",
            "text": "1"
        })))
        .await
        .unwrap();

    let json = body_json(response).await;
    assert_eq!(json["payload"]["kind"], "playback_card");
    assert_eq!(json["payload"]["tier"], "Standard");
    assert_eq!(json["payload"]["song_id"], 186016);
}

#[tokio::test]
async fn test_dispatch_unmatched_text() {
    let app = create_test_app();

    let response = app
        .oneshot(dispatch_request(json!({
            "conversation_key": "group:42",
            "text": "hello"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "matched": false }));
}

#[tokio::test]
async fn test_dispatch_rejects_empty_conversation_key() {
    let app = create_test_app();

    let response = app
        .oneshot(dispatch_request(json!({
            "conversation_key": "  ",
            "text": "/点歌 晴天"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_dispatch_rejects_malformed_body() {
    let app = create_test_app();

    let response = app
        .oneshot(dispatch_request(json!({ "text": "/点歌 晴天" })))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_event_stream_is_sse() {
    let app = create_test_app();

    let response = app
        .oneshot(Request::builder().uri("/events").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"));
}
