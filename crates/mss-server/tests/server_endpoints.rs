use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use mss_db_memory::InMemoryStorage;
use mss_server::{AppConfig, AppState, build_app};
use mss_storage::DynRepository;
use serde_json::{Value, json};
use tower::ServiceExt;

fn app() -> (Arc<InMemoryStorage>, Router) {
    let storage = Arc::new(InMemoryStorage::new());
    storage.bind_app("com.example.app", "Example");
    let repo: DynRepository = storage.clone();
    let state = AppState::new(repo, Duration::from_secs(5));
    (storage, build_app(&AppConfig::default(), state))
}

fn init_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/init")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn valid_body() -> Value {
    json!({
        "deviceId": "d1",
        "appId": "com.example.app",
        "version": "1.0",
        "deviceVersion": "14",
        "deviceType": "Android"
    })
}

#[tokio::test]
async fn init_returns_version_state() {
    let (storage, app) = app();

    let (status, body) = send(&app, init_request(valid_body())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], "1.0");
    assert_eq!(body["appId"], "com.example.app");
    assert_eq!(body["disabled"], false);
    assert!(body["id"].as_str().is_some_and(|id| !id.is_empty()));
    // Counters and device details stay internal
    assert!(body.get("disabledMessage").is_none());
    assert!(body.get("numOfAppLaunches").is_none());
    assert!(body.get("deviceId").is_none());

    storage
        .set_version_disabled("com.example.app", "1.0", true, Some("Update required"))
        .unwrap();
    let (status, body) = send(&app, init_request(valid_body())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["disabled"], true);
    assert_eq!(body["disabledMessage"], "Update required");
}

#[tokio::test]
async fn init_rejects_missing_fields() {
    let (_storage, app) = app();

    for field in ["deviceId", "appId", "version"] {
        let mut body = valid_body();
        body[field] = json!("");
        let (status, resp) = send(&app, init_request(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "empty {field}");
        assert_eq!(
            resp["message"],
            "version, appId and deviceId fields can't be empty"
        );
        assert_eq!(resp["code"], 400);
    }

    // Absent fields behave like empty ones
    let (status, _) = send(&app, init_request(json!({ "appId": "com.example.app" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn init_rejects_unbound_app() {
    let (storage, app) = app();

    let mut body = valid_body();
    body["appId"] = json!("com.unknown.app");
    let (status, resp) = send(&app, init_request(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "No bound app found for the sent App ID");

    storage.unbind_app("com.example.app").unwrap();
    let (status, resp) = send(&app, init_request(valid_body())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "No bound app found for the sent App ID");
}

#[tokio::test]
async fn init_hides_storage_failures() {
    let (storage, app) = app();
    storage.set_fail_version_writes(true);

    let (status, resp) = send(&app, init_request(valid_body())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = resp["message"].as_str().unwrap();
    assert!(!message.contains("injected"));
}

#[tokio::test]
async fn init_app_lookup_failure_is_a_server_error() {
    let (storage, app) = app();
    storage.set_fail_app_reads(true);

    let (status, resp) = send(&app, init_request(valid_body())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp["code"], 500);
    let message = resp["message"].as_str().unwrap();
    assert!(!message.contains("injected"));
    assert_ne!(message, "No bound app found for the sent App ID");
}

#[tokio::test]
async fn init_rejects_oversized_payloads() {
    let storage = Arc::new(InMemoryStorage::new());
    storage.bind_app("com.example.app", "Example");
    let repo: DynRepository = storage.clone();
    let mut cfg = AppConfig::default();
    cfg.server.body_limit_bytes = 64;
    let app = build_app(&cfg, AppState::new(repo, Duration::from_secs(5)));

    let mut body = valid_body();
    body["deviceType"] = json!("x".repeat(500));
    let (status, resp) = send(&app, init_request(body)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(resp["code"], 413);
    assert_eq!(storage.version_count(), 0);
}

#[tokio::test]
async fn init_rejects_malformed_payloads() {
    let (_storage, app) = app();

    let req = Request::builder()
        .method("POST")
        .uri("/api/init")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, resp) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["code"], 400);

    let req = Request::builder()
        .method("POST")
        .uri("/api/init")
        .body(Body::from(valid_body().to_string()))
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn request_id_is_propagated() {
    let (_storage, app) = app();

    let req = Request::builder()
        .uri("/healthz")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.headers()["x-request-id"], "abc-123");

    let req = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert!(resp.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn server_endpoints_work() {
    let (_storage, app) = app();

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    let base = format!("http://{addr}");
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/healthz")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let resp = client.get(format!("{base}/readyz")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ready");
    assert_eq!(body["backend"], "memory");

    let resp = client
        .post(format!("{base}/api/init"))
        .json(&valid_body())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["version"], "1.0");

    let _ = tx.send(());
    let _ = server.await;
}

#[tokio::test]
async fn memory_backend_binds_configured_apps() {
    let mut cfg = AppConfig::default();
    cfg.storage.bound_apps.push(mss_server::config::BoundAppConfig {
        app_id: "com.example.app".into(),
        app_name: "Example".into(),
    });

    let repo = mss_server::create_repository(&cfg).await.unwrap();
    assert_eq!(repo.backend_name(), "memory");
    assert!(repo.get_app("com.example.app").await.unwrap().is_found());
    assert!(repo.get_app("com.other.app").await.unwrap().is_absent());

    let server = mss_server::ServerBuilder::new()
        .with_config(cfg)
        .with_repository(repo)
        .build()
        .await;
    assert!(server.is_ok());
}
