//! REST front for a resolver backed by [`LmdbStore`]
//!
//! Endpoints:
//!   GET    /health              - Liveness
//!   POST   /expand              - Expand operation names with ancestors
//!   POST   /resolve             - Ordered candidate permissions
//!   POST   /decide              - Effective decision plus cache fingerprint
//!   POST   /permissions         - Store a permission record
//!   DELETE /permissions/:id     - Remove a permission record
//!   POST   /members             - Add a user or group to a group
//!   POST   /entities-groups     - Add an entity to an entities group

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::{
    expand_operation_names, fingerprint, Decision, EntitiesGroupId, EntityKey, GroupId, LmdbStore, PermError,
    Permission, PermissionId, PermissionResolver, Scope, Subject, Target,
};

// ============================================================================
// State
// ============================================================================

pub struct AppState {
    store: Arc<LmdbStore>,
    resolver: PermissionResolver,
}

type Shared = State<Arc<AppState>>;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
struct ExpandReq {
    operations: Vec<String>,
}

#[derive(Deserialize)]
struct ResolveReq {
    subject: Subject,
    operations: Vec<String>,
    #[serde(default)]
    target: Target,
}

#[derive(Deserialize)]
struct PermissionReq {
    id: Option<PermissionId>,
    subject: Subject,
    scope: Scope,
    operation: String,
    level: i32,
    allow: bool,
}

#[derive(Deserialize)]
struct MemberReq {
    member: Subject,
    group: GroupId,
}

#[derive(Deserialize)]
struct EntitiesGroupReq {
    entity: EntityKey,
    group: EntitiesGroupId,
}

#[derive(Serialize)]
struct DecideRes {
    allowed: bool,
    decision: Decision,
    fingerprint: String,
}

#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    fn err(msg: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(msg.into()) }
    }
}

type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

// ============================================================================
// Helpers
// ============================================================================

/// HTTP status for a resolution error
pub fn status_of(e: &PermError) -> StatusCode {
    match e {
        PermError::InvalidArgument(_) | PermError::UnsupportedEntityType(_) => StatusCode::BAD_REQUEST,
        PermError::CollaboratorUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Run a store-touching call off the async workers
async fn blocking<T, F>(f: F) -> Reply<T>
where
    T: Send + 'static,
    F: FnOnce() -> crate::Result<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(Ok(v)) => (StatusCode::OK, Json(ApiResponse::ok(v))),
        Ok(Err(e)) => (status_of(&e), Json(ApiResponse::err(e.to_string()))),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiResponse::err(e.to_string()))),
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn get_health() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::ok("ok"))
}

async fn post_expand(Json(req): Json<ExpandReq>) -> Reply<Vec<String>> {
    match expand_operation_names(&req.operations) {
        Ok(v) => (StatusCode::OK, Json(ApiResponse::ok(v))),
        Err(e) => (status_of(&e), Json(ApiResponse::err(e.to_string()))),
    }
}

async fn post_resolve(State(s): Shared, Json(req): Json<ResolveReq>) -> Reply<Vec<Permission>> {
    blocking(move || s.resolver.resolve(&req.subject, &req.operations, req.target)).await
}

async fn post_decide(State(s): Shared, Json(req): Json<ResolveReq>) -> Reply<DecideRes> {
    blocking(move || {
        let decision = s.resolver.decide(&req.subject, &req.operations, req.target)?;
        Ok(DecideRes {
            allowed: decision.is_allowed(),
            decision,
            fingerprint: fingerprint(&req.subject, &req.operations, req.target)?,
        })
    })
    .await
}

async fn post_permission(State(s): Shared, Json(req): Json<PermissionReq>) -> Reply<Permission> {
    blocking(move || {
        let p = match req.id {
            Some(id) => Permission::with_id(id, req.subject, req.scope, &req.operation, req.level, req.allow)?,
            None => Permission::new(req.subject, req.scope, &req.operation, req.level, req.allow)?,
        };
        s.store.put(&p)?;
        Ok(p)
    })
    .await
}

async fn delete_permission(State(s): Shared, Path(id): Path<u64>) -> Reply<bool> {
    blocking(move || s.store.remove(PermissionId(id))).await
}

async fn post_member(State(s): Shared, Json(req): Json<MemberReq>) -> Reply<()> {
    blocking(move || match req.member {
        Subject::User(u) => s.store.add_user_to_group(u, req.group),
        Subject::Group(g) => s.store.add_group_to_group(g, req.group),
    })
    .await
}

async fn post_entities_group(State(s): Shared, Json(req): Json<EntitiesGroupReq>) -> Reply<()> {
    blocking(move || s.store.add_entity_to_group(req.entity, req.group)).await
}

// ============================================================================
// Router
// ============================================================================

impl AppState {
    pub fn new(store: Arc<LmdbStore>) -> Self {
        AppState { resolver: PermissionResolver::with_backend(store.clone()), store }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(get_health))
        .route("/expand", post(post_expand))
        .route("/resolve", post(post_resolve))
        .route("/decide", post(post_decide))
        .route("/permissions", post(post_permission))
        .route("/permissions/:id", delete(delete_permission))
        .route("/members", post(post_member))
        .route("/entities-groups", post(post_entities_group))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
