//! Router-level checks for the REST front

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use permres::server::{router, AppState};
use permres::{GroupId, LmdbStore, Permission, PermissionId, Scope, StoreConfig, Subject, UserId};

fn setup() -> (TempDir, Arc<LmdbStore>, Router) {
    let dir = TempDir::new().unwrap();
    let mut config = StoreConfig::at(dir.path());
    config.map_size = 1 << 24;
    config.max_group_depth = 2;
    let store = Arc::new(LmdbStore::open(&config).unwrap());
    let app = router(Arc::new(AppState::new(store.clone())));
    (dir, store, app)
}

async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health() {
    let (_dir, _store, app) = setup();
    let resp = app.oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_resolve_empty_operations_is_bad_request() {
    let (_dir, _store, app) = setup();
    let (status, body) = post(app, "/resolve", json!({"subject": {"kind": "user", "id": 1}, "operations": []})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_resolve_returns_ordered_records() {
    let (_dir, store, app) = setup();
    store.add_user_to_group(UserId(1), GroupId(10)).unwrap();
    store
        .put_all(&[
            Permission::with_id(PermissionId(1), Subject::Group(GroupId(10)), Scope::Global, "/Doc", 1, true).unwrap(),
            Permission::with_id(PermissionId(2), Subject::User(UserId(1)), Scope::Global, "/Doc/Delete", 2, false)
                .unwrap(),
        ])
        .unwrap();

    let (status, body) = post(app, "/resolve", json!({"subject": {"kind": "user", "id": 1}, "operations": ["/Doc/Delete"]})).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<u64> = body["data"].as_array().unwrap().iter().map(|p| p["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![2, 1]);
}

#[tokio::test]
async fn test_decide_allowed() {
    let (_dir, store, app) = setup();
    store
        .put(&Permission::with_id(PermissionId(7), Subject::User(UserId(1)), Scope::Global, "/Doc", 1, true).unwrap())
        .unwrap();

    let (status, body) = post(app, "/decide", json!({"subject": {"kind": "user", "id": 1}, "operations": ["/Doc/Read"]})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["allowed"], json!(true));
    assert_eq!(body["data"]["fingerprint"].as_str().unwrap().len(), 64);
}

#[tokio::test]
async fn test_decide_with_deep_groups_is_unavailable() {
    let (_dir, store, app) = setup();
    store.add_user_to_group(UserId(1), GroupId(1)).unwrap();
    for i in 1..5u64 {
        store.add_group_to_group(GroupId(i), GroupId(i + 1)).unwrap();
    }

    let (status, body) = post(app, "/decide", json!({"subject": {"kind": "user", "id": 1}, "operations": ["/Doc"]})).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], json!(false));
}
