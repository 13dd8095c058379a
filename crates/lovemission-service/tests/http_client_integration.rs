//! Integration tests for HttpService against an in-process fake backend.
//!
//! Each test spawns an axum server on 127.0.0.1:0 that speaks just enough of
//! the REST and auth dialect to exercise request shaping, headers, the
//! pending-only transition guard and error mapping.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use lovemission_core::task::Status;
use chrono::{Duration, Utc};
use lovemission_service::{AuthSession, HttpService, LoveService, ServiceError};
use serde_json::{json, Value};

const ANON: &str = "anon-key";

#[derive(Default)]
struct Fake {
    task: Value,
    queries: Vec<HashMap<String, String>>,
    patches: Vec<Value>,
    /// Refresh tokens are single use; each grant rotates this.
    refresh_token: String,
    refreshes: usize,
}

type Shared = Arc<Mutex<Fake>>;

fn pending_task() -> Value {
    json!({
        "id": 1,
        "title": "Buy milk",
        "description": null,
        "due_date": "2024-05-03",
        "assigned_to": "both",
        "created_by": 10,
        "status": "pending",
        "completed_at": null,
        "completed_by": null,
        "created_at": "2024-05-01T00:00:00+00:00",
        "updated_at": "2024-05-01T00:00:00+00:00"
    })
}

fn invalid_grant() -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid Refresh Token: Already Used"
        })),
    )
}

async fn token(
    State(state): State<Shared>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if headers.get("apikey").and_then(|v| v.to_str().ok()) != Some(ANON) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "msg": "no apikey" })));
    }
    match q.get("grant_type").map(String::as_str) {
        Some("refresh_token") => {
            let mut fake = state.lock().unwrap();
            if body["refresh_token"] != fake.refresh_token.as_str() {
                return invalid_grant();
            }
            fake.refreshes += 1;
            fake.refresh_token = format!("refresh-{}", fake.refreshes + 1);
            (
                StatusCode::OK,
                Json(json!({
                    "access_token": "access-1",
                    "refresh_token": fake.refresh_token,
                    "expires_in": 3600
                })),
            )
        }
        Some("password") if body["password"] == "secret" => (
            StatusCode::OK,
            Json(json!({
                "access_token": "access-1",
                "refresh_token": "refresh-1",
                "expires_in": 3600,
                "user": { "email": body["email"] }
            })),
        ),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })),
        ),
    }
}

async fn logout() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn get_tasks(
    State(state): State<Shared>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<Value> {
    let mut fake = state.lock().unwrap();
    fake.queries.push(q.clone());
    let task = fake.task.clone();
    let wanted_id = q.get("id").map(String::as_str);
    match wanted_id {
        Some("eq.1") | None => Json(json!([task])),
        Some(_) => Json(json!([])),
    }
}

async fn patch_tasks(
    State(state): State<Shared>,
    Query(q): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let mut fake = state.lock().unwrap();
    fake.queries.push(q.clone());
    fake.patches.push(body.clone());
    let only_pending = q.get("status").map(String::as_str) == Some("eq.pending");
    if only_pending && fake.task["status"] != "pending" {
        return Json(json!([]));
    }
    if let (Some(task), Some(patch)) = (fake.task.as_object_mut(), body.as_object()) {
        for (k, v) in patch {
            task.insert(k.clone(), v.clone());
        }
    }
    Json(json!([fake.task.clone()]))
}

async fn get_users(
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if auth != "Bearer access-1" {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "JWT expired" })));
    }
    match q.get("email").map(String::as_str) {
        Some("eq.a@example.com") => (
            StatusCode::OK,
            Json(json!([{
                "id": 10,
                "email": "a@example.com",
                "nickname": "A",
                "partner_id": 11,
                "fcmToken": null,
                "coin": 0
            }])),
        ),
        _ => (StatusCode::OK, Json(json!([]))),
    }
}

async fn spawn_server() -> (String, Shared) {
    let state: Shared = Arc::new(Mutex::new(Fake {
        task: pending_task(),
        refresh_token: "refresh-1".into(),
        ..Default::default()
    }));
    let router = Router::new()
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/logout", post(logout))
        .route("/rest/v1/tasks", get(get_tasks).patch(patch_tasks))
        .route("/rest/v1/users", get(get_users))
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{addr}"), state)
}

#[tokio::test]
async fn sign_in_then_authenticated_lookup() {
    let (url, _) = spawn_server().await;
    let svc = HttpService::new(&url, ANON);

    // Anonymous requests carry the anon key as bearer and get rejected here.
    let err = svc.get_user_by_email("a@example.com").await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(ref m) if m == "JWT expired"));

    let session = svc.sign_in("a@example.com", "secret").await.unwrap();
    assert_eq!(session.access_token, "access-1");
    assert_eq!(session.email, "a@example.com");

    let user = svc.get_user_by_email("a@example.com").await.unwrap();
    assert_eq!(user.id, 10);
    assert_eq!(user.partner_id, Some(11));

    let missing = svc.get_user_by_email("b@example.com").await.unwrap_err();
    assert!(matches!(missing, ServiceError::NotFound(_)));

    svc.sign_out().await.unwrap();
    assert!(svc.session().await.is_none());
}

#[tokio::test]
async fn bad_credentials_are_unauthorized() {
    let (url, _) = spawn_server().await;
    let svc = HttpService::new(&url, ANON);
    let err = svc.sign_in("a@example.com", "nope").await.unwrap_err();
    match err {
        ServiceError::Unauthorized(msg) => assert_eq!(msg, "Invalid login credentials"),
        other => panic!("expected Unauthorized, got {other:?}"),
    }
    assert!(svc.session().await.is_none());
}

#[tokio::test]
async fn my_tasks_sends_backend_filters() {
    let (url, state) = spawn_server().await;
    let svc = HttpService::new(&url, ANON);
    let tasks = svc.list_my_tasks(10).await.unwrap();
    assert_eq!(tasks.len(), 1);

    let fake = state.lock().unwrap();
    let q = fake.queries.last().unwrap();
    assert_eq!(q["status"], "eq.pending");
    assert_eq!(q["created_by"], "eq.10");
    assert_eq!(q["or"], "(assigned_to.eq.me,assigned_to.eq.both)");
    assert_eq!(q["order"], "created_at.desc");
}

#[tokio::test]
async fn complete_then_cancel_is_rejected() {
    let (url, state) = spawn_server().await;
    let svc = HttpService::new(&url, ANON);

    let done = svc.complete_task(1, 10).await.unwrap();
    assert_eq!(done.status, Status::Completed);
    assert_eq!(done.completed_by, Some(10));
    assert!(done.completed_at.is_some());
    {
        let fake = state.lock().unwrap();
        let patch = fake.patches.last().unwrap();
        assert_eq!(patch["status"], "completed");
        assert_eq!(patch["completed_by"], 10);
    }

    let err = svc.cancel_task(1).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    let fake = state.lock().unwrap();
    assert_eq!(fake.task["status"], "completed");
}

#[tokio::test]
async fn concurrent_requests_refresh_expired_session_once() {
    let (url, state) = spawn_server().await;
    let expired = AuthSession {
        access_token: "stale".into(),
        refresh_token: "refresh-1".into(),
        expires_at: Utc::now() - Duration::minutes(5),
        email: "a@example.com".into(),
    };
    let svc = HttpService::with_session(&url, ANON, expired);

    let (first, second) = tokio::join!(
        svc.get_user_by_email("a@example.com"),
        svc.get_user_by_email("a@example.com"),
    );
    assert_eq!(first.unwrap().id, 10);
    assert_eq!(second.unwrap().id, 10);
    assert_eq!(state.lock().unwrap().refreshes, 1);

    let session = svc.session().await.unwrap();
    assert_eq!(session.access_token, "access-1");
    assert_eq!(session.refresh_token, "refresh-2");
}
