use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use rbac_console::errors::ConsoleError;
use rbac_console::models::{
    LoginRequest, PermissionCreateRequest, RolePermissionLink, RoleUpdateRequest, Verb,
};
use rbac_console::{ConsoleConfig, HttpGateway, MutationGateway};

/// Bodies received by the stub, keyed by "METHOD path".
type Captured = Arc<Mutex<Vec<(String, Value)>>>;

async fn list_or_get_role(Query(query): Query<HashMap<String, String>>) -> Response {
    match query.get("id").map(String::as_str) {
        None => Json(json!({ "data": [
            { "id": 1, "name": "Editor", "permissions": [{ "id": 3, "verb": "GET", "path": "/api/roles" }] },
            { "id": 2, "name": "Viewer" }
        ]}))
        .into_response(),
        Some("1") => Json(json!({ "data": {
            "id": 1,
            "name": "Editor",
            "description": "edits things",
            "permissions": [{ "id": 3, "verb": "GET", "path": "/api/roles" }],
            "users": [{ "id": 9, "email": "ada@example.com" }]
        }}))
        .into_response(),
        Some(_) => (StatusCode::NOT_FOUND, Json(json!({ "message": "role not found" }))).into_response(),
    }
}

async fn update_role(State(captured): State<Captured>, Json(body): Json<Value>) -> Response {
    captured.lock().await.push(("PATCH /api/roles".into(), body));
    Json(json!({ "data": null })).into_response()
}

async fn delete_role_permission(State(captured): State<Captured>, Json(body): Json<Value>) -> Response {
    captured.lock().await.push(("DELETE /api/rolepermissions".into(), body));
    Json(json!({ "data": null })).into_response()
}

async fn list_permissions() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "message": "db down" }))).into_response()
}

async fn create_permission() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "errors": [{ "code": "duplicate", "context": { "path": "/api/roles" } }] })),
    )
        .into_response()
}

async fn list_users() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": "no session" }))).into_response()
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] != "pw" {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "bad credentials" }))).into_response();
    }
    (
        [(header::SET_COOKIE, "session=abc123; Path=/")],
        Json(json!({ "data": { "id": 9, "email": body["email"], "roles": [] } })),
    )
        .into_response()
}

async fn current_user(headers: HeaderMap) -> Response {
    let has_session = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v.contains("session=abc123"));
    if !has_session {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({ "data": { "id": 9, "email": "ada@example.com", "username": "ada" } })).into_response()
}

async fn spawn_stub() -> Result<(SocketAddr, Captured)> {
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/api/roles", get(list_or_get_role).patch(update_role))
        .route("/api/rolepermissions", axum::routing::delete(delete_role_permission))
        .route("/api/permissions", get(list_permissions).post(create_permission))
        .route("/api/users", get(list_users))
        .route("/auth/login", post(login))
        .route("/auth/currentUser", get(current_user))
        .with_state(captured.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((addr, captured))
}

fn gateway_for(addr: SocketAddr) -> Result<HttpGateway> {
    let config = ConsoleConfig::new(format!("http://{addr}/")).with_timeout(Duration::from_secs(5));
    Ok(HttpGateway::new(&config)?)
}

#[tokio::test]
async fn unwraps_data_envelope() -> Result<()> {
    let (addr, _) = spawn_stub().await?;
    let gateway = gateway_for(addr)?;

    let roles = gateway.list_roles().await?;
    assert_eq!(roles.len(), 2);
    assert_eq!(roles[0].permissions[0].label(), "GET /api/roles");
    assert!(roles[1].permissions.is_empty());

    let role = gateway.get_role(1).await?;
    assert_eq!(role.description.as_deref(), Some("edits things"));
    assert_eq!(role.member_labels(), vec!["ADA@EXAMPLE.COM".to_string()]);
    Ok(())
}

#[tokio::test]
async fn maps_statuses_onto_error_kinds() -> Result<()> {
    let (addr, _) = spawn_stub().await?;
    let gateway = gateway_for(addr)?;

    let err = gateway.list_users().await.unwrap_err();
    assert!(matches!(err, ConsoleError::Auth(_)), "got {err:?}");

    let req = PermissionCreateRequest { verb: Verb::Get, path: "/api/roles".into() };
    match gateway.create_permission(&req).await.unwrap_err() {
        ConsoleError::Validation(items) => assert_eq!(items[0].code, "duplicate"),
        other => panic!("expected validation error, got {other:?}"),
    }

    let err = gateway.get_role(42).await.unwrap_err();
    assert!(matches!(err, ConsoleError::Unknown(ref m) if m == "404: role not found"), "got {err:?}");

    let err = gateway.list_permissions().await.unwrap_err();
    assert!(matches!(err, ConsoleError::Unknown(ref m) if m == "500: db down"), "got {err:?}");
    Ok(())
}

#[tokio::test]
async fn update_and_link_delete_send_json_bodies() -> Result<()> {
    let (addr, captured) = spawn_stub().await?;
    let gateway = gateway_for(addr)?;

    gateway
        .update_role(&RoleUpdateRequest { id: 1, permissions: vec![3, 5] })
        .await?;
    gateway
        .delete_role_permission(&RolePermissionLink { role_id: 1, permission_id: 3 })
        .await?;

    let got = captured.lock().await.clone();
    assert_eq!(
        got,
        vec![
            ("PATCH /api/roles".to_string(), json!({ "id": 1, "permissions": [3, 5] })),
            ("DELETE /api/rolepermissions".to_string(), json!({ "role_id": 1, "permission_id": 3 })),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn session_cookie_survives_between_calls() -> Result<()> {
    let (addr, _) = spawn_stub().await?;
    let gateway = gateway_for(addr)?;

    assert!(matches!(gateway.current_user().await, Err(ConsoleError::Auth(_))));

    let creds = LoginRequest { email: "ada@example.com".into(), password: "pw".into() };
    let user = gateway.login(&creds).await?;
    assert_eq!(user.id, 9);

    let current = gateway.current_user().await?;
    assert_eq!(current.display_key(), "ada@example.com");
    Ok(())
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let gateway = gateway_for(addr)?;
    let err = gateway.list_roles().await.unwrap_err();
    assert!(matches!(err, ConsoleError::Transport(_)), "got {err:?}");
    Ok(())
}
