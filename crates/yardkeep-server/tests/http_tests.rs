//! Endpoint tests driving the router in-process

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use yardkeep_core::StoreConfig;
use yardkeep_server::{create_router, AppState};

fn app(dir: &tempfile::TempDir) -> Router {
    create_router(Arc::new(AppState::new(StoreConfig::in_dir(dir.path()))))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn command_body(part_number: &str, change: i64) -> Value {
    json!({
        "partNumber": part_number,
        "quantityChange": change,
        "yard": "Y1",
        "user": "U1",
        "timestamp": 1000
    })
}

#[tokio::test]
async fn test_command_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let (status, body) = send(&app, Method::POST, "/commands", Some(command_body("PN1", 5))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["command"]["partNumber"], "PN1");
    assert_eq!(body["command"]["description"], "");
    assert_eq!(body["command"]["remarks"], "");

    let (status, _) = send(&app, Method::POST, "/commands", Some(command_body("PN1", -8))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, log) = send(&app, Method::GET, "/commands", None).await;
    assert_eq!(log.as_array().unwrap().len(), 2);
    assert_eq!(log[1]["quantityChange"], -8);

    let (_, parts) = send(&app, Method::GET, "/inventory", None).await;
    assert_eq!(
        parts,
        json!([{"partNumber": "PN1", "description": "", "quantityOnHand": 0}])
    );
}

#[tokio::test]
async fn test_command_missing_field_is_400() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let mut body = command_body("PN1", 1);
    body.as_object_mut().unwrap().remove("user");

    let (status, body) = send(&app, Method::POST, "/commands", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Missing required fields");

    let (_, log) = send(&app, Method::GET, "/commands", None).await;
    assert_eq!(log, json!([]));
}

#[tokio::test]
async fn test_malformed_json_gets_json_error() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/inventory")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ nope"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_upsert_echoes_and_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let first = json!({"partNumber": "PN1", "description": "Bolt", "quantityOnHand": 3});
    let (status, body) = send(&app, Method::POST, "/inventory", Some(first.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "item": first}));

    let second = json!({"partNumber": "PN1", "quantityOnHand": 7});
    send(&app, Method::POST, "/inventory", Some(second)).await;

    let (_, parts) = send(&app, Method::GET, "/inventory", None).await;
    assert_eq!(
        parts,
        json!([{"partNumber": "PN1", "description": "", "quantityOnHand": 7}])
    );
}

#[tokio::test]
async fn test_upsert_requires_quantity() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let (status, _) = send(&app, Method::POST, "/inventory", Some(json!({"partNumber": "PN1"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);
    send(
        &app,
        Method::POST,
        "/inventory",
        Some(json!({"partNumber": "PN 1", "quantityOnHand": 1})),
    )
    .await;

    let (status, body) = send(&app, Method::DELETE, "/inventory?partNumber=PN9", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, Method::DELETE, "/inventory", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, Method::DELETE, "/inventory?partNumber=PN%201", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, parts) = send(&app, Method::GET, "/inventory", None).await;
    assert_eq!(parts, json!([]));
}

#[tokio::test]
async fn test_other_verbs_are_405() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let (status, body) = send(&app, Method::PUT, "/inventory", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, Method::DELETE, "/commands", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_options_preflight() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    for uri in ["/inventory", "/commands"] {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri(uri)
            .header(header::ORIGIN, "http://example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(bytes.is_empty());
    }

    // Bare OPTIONS without preflight headers
    let (status, body) = send(&app, Method::OPTIONS, "/commands", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_commands_all_land() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let mut handles = Vec::new();
    for _ in 0..20 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            send(&app, Method::POST, "/commands", Some(command_body("PN1", 1))).await
        }));
    }
    for handle in handles {
        let (status, _) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    let (_, commands) = send(&app, Method::GET, "/commands", None).await;
    assert_eq!(commands.as_array().unwrap().len(), 20);
    let (_, parts) = send(&app, Method::GET, "/inventory", None).await;
    assert_eq!(parts[0]["quantityOnHand"], 20);
}
