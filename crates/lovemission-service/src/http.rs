use async_trait::async_trait;
use chrono::Utc;
use lovemission_core::mission::{CreateScheduledMission, ScheduledMission};
use lovemission_core::task::{CreateTask, Status, StatusChange, Task, UpdateTask};
use lovemission_core::task_history::{CreateTaskHistory, TaskHistory};
use lovemission_core::user::User;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::auth::{AuthErrorResponse, TokenResponse};
use crate::{AuthSession, LoveService, ServiceError};

const TASKS: &str = "tasks";
const TASK_HISTORIES: &str = "task_histories";
const USERS: &str = "users";
const MISSIONS: &str = "scheduledMissions";

type Params = Vec<(String, String)>;

fn eq(column: &str, value: impl ToString) -> (String, String) {
    (column.to_string(), format!("eq.{}", value.to_string()))
}

fn select_all() -> (String, String) {
    ("select".to_string(), "*".to_string())
}

fn newest_first() -> (String, String) {
    ("order".to_string(), "created_at.desc".to_string())
}

/// Filter for `list_tasks_for_user`.
pub(crate) fn tasks_for_user_params(user_id: i64) -> Params {
    vec![
        select_all(),
        (
            "or".to_string(),
            format!("(created_by.eq.{user_id},assigned_to.eq.me,assigned_to.eq.both)"),
        ),
        newest_first(),
    ]
}

/// Filter for `list_my_tasks`.
pub(crate) fn my_tasks_params(user_id: i64) -> Params {
    vec![
        select_all(),
        eq("status", Status::Pending.as_str()),
        (
            "or".to_string(),
            "(assigned_to.eq.me,assigned_to.eq.both)".to_string(),
        ),
        eq("created_by", user_id),
        newest_first(),
    ]
}

/// Conditional status update: only rows still pending match.
pub(crate) fn pending_task_params(id: i64) -> Params {
    vec![eq("id", id), eq("status", Status::Pending.as_str())]
}

#[derive(Serialize)]
struct NicknamePatch<'a> {
    nickname: &'a str,
}

#[derive(Serialize)]
struct PushTokenPatch<'a> {
    #[serde(rename = "fcmToken")]
    token: Option<&'a str>,
}

#[derive(Serialize)]
struct MissionPatch {
    completed: bool,
}

#[derive(Deserialize)]
struct PushTokenRow {
    #[serde(rename = "fcmToken", default)]
    token: Option<String>,
}

/// Async client for the hosted backend: REST tables under `/rest/v1` and
/// the auth service under `/auth/v1`.
pub struct HttpService {
    base_url: String,
    anon_key: String,
    client: Client,
    session: RwLock<Option<AuthSession>>,
}

impl HttpService {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            base_url,
            anon_key: anon_key.to_string(),
            client: Client::new(),
            session: RwLock::new(None),
        }
    }

    /// Resume a session persisted by an earlier run.
    pub fn with_session(base_url: &str, anon_key: &str, session: AuthSession) -> Self {
        let svc = Self::new(base_url, anon_key);
        Self {
            session: RwLock::new(Some(session)),
            ..svc
        }
    }

    pub async fn session(&self) -> Option<AuthSession> {
        self.session.read().await.clone()
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    /// Bearer token for the next request, refreshing the session first when
    /// it is about to expire. Falls back to the anon key when signed out.
    ///
    /// The expiry check is repeated under the write lock, so concurrent
    /// callers spend a rotating refresh token once and the rest reuse the
    /// fresh session.
    async fn bearer(&self) -> String {
        match self.session.read().await.as_ref() {
            None => return self.anon_key.clone(),
            Some(session) if !session.needs_refresh(Utc::now()) => {
                return session.access_token.clone();
            }
            Some(_) => {}
        }

        let mut guard = self.session.write().await;
        let Some(session) = guard.as_ref() else {
            return self.anon_key.clone();
        };
        if !session.needs_refresh(Utc::now()) {
            return session.access_token.clone();
        }
        match self.refresh_session(session).await {
            Ok(fresh) => {
                let token = fresh.access_token.clone();
                *guard = Some(fresh);
                token
            }
            Err(e) => {
                warn!("session refresh failed: {e}");
                session.access_token.clone()
            }
        }
    }

    async fn with_auth(&self, builder: RequestBuilder) -> RequestBuilder {
        let token = self.bearer().await;
        builder
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {token}"))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, ServiceError> {
        self.with_auth(builder)
            .await
            .send()
            .await
            .map_err(|e| ServiceError::Internal(format!("connection failed: {e}")))
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &Params,
    ) -> Result<Vec<T>, ServiceError> {
        debug!(table, ?params, "select");
        let builder = self.client.get(self.rest_url(table)).query(params);
        let resp = self.send(builder).await?;
        handle_response(resp).await
    }

    /// Select exactly one row; zero rows is `NotFound`.
    async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        mut params: Params,
        what: &str,
    ) -> Result<T, ServiceError> {
        params.push(("limit".to_string(), "1".to_string()));
        let rows: Vec<T> = self.select(table, &params).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ServiceError::NotFound(what.to_string()))
    }

    async fn insert<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<T, ServiceError> {
        debug!(table, "insert");
        let builder = self
            .client
            .post(self.rest_url(table))
            .header("Prefer", "return=representation")
            .json(body);
        let resp = self.send(builder).await?;
        let rows: Vec<T> = handle_response(resp).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ServiceError::Internal(format!("insert into {table} returned no row")))
    }

    async fn update<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        params: &Params,
        body: &B,
    ) -> Result<Vec<T>, ServiceError> {
        debug!(table, ?params, "update");
        let builder = self
            .client
            .patch(self.rest_url(table))
            .query(params)
            .header("Prefer", "return=representation")
            .json(body);
        let resp = self.send(builder).await?;
        handle_response(resp).await
    }

    /// PATCH without asking for the rows back.
    async fn update_minimal<B: Serialize + ?Sized>(
        &self,
        table: &str,
        params: &Params,
        body: &B,
    ) -> Result<(), ServiceError> {
        debug!(table, ?params, "update");
        let builder = self
            .client
            .patch(self.rest_url(table))
            .query(params)
            .header("Prefer", "return=minimal")
            .json(body);
        let resp = self.send(builder).await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(parse_error(resp).await)
        }
    }

    async fn delete_rows(&self, table: &str, params: &Params) -> Result<(), ServiceError> {
        debug!(table, ?params, "delete");
        let builder = self.client.delete(self.rest_url(table)).query(params);
        let resp = self.send(builder).await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(parse_error(resp).await)
        }
    }

    /// Status transition on a still-pending task. Zero matching rows means
    /// the task is gone or someone else already moved it.
    async fn transition(
        &self,
        id: i64,
        change: &StatusChange,
    ) -> Result<Task, ServiceError> {
        let rows: Vec<Task> = self.update(TASKS, &pending_task_params(id), change).await?;
        match rows.into_iter().next() {
            Some(task) => Ok(task),
            None => {
                let task = self.get_task(id).await?;
                Err(ServiceError::InvalidInput(format!(
                    "task {id} is {} and cannot become {}",
                    task.status.as_str(),
                    change.status.as_str()
                )))
            }
        }
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
        email: &str,
    ) -> Result<AuthSession, ServiceError> {
        let resp = self
            .client
            .post(format!("{}/auth/v1/token", self.base_url))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::Internal(format!("connection failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ServiceError::Internal(format!("read body: {e}")))?;

        if !status.is_success() {
            let msg = serde_json::from_str::<AuthErrorResponse>(&text)
                .ok()
                .and_then(AuthErrorResponse::message)
                .unwrap_or(text);
            return Err(ServiceError::Unauthorized(msg));
        }

        let token: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| ServiceError::Internal(format!("json decode: {e}")))?;
        Ok(token.into_session(email, Utc::now()))
    }

    async fn refresh_session(&self, session: &AuthSession) -> Result<AuthSession, ServiceError> {
        debug!("refreshing access token");
        self.token_grant(
            "refresh_token",
            serde_json::json!({ "refresh_token": session.refresh_token }),
            &session.email,
        )
        .await
    }
}

async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ServiceError> {
    let status = resp.status();
    if status.is_success() {
        resp.json::<T>()
            .await
            .map_err(|e| ServiceError::Internal(format!("json decode: {e}")))
    } else {
        Err(parse_error_with_status(status, resp).await)
    }
}

async fn parse_error(resp: reqwest::Response) -> ServiceError {
    let status = resp.status();
    parse_error_with_status(status, resp).await
}

async fn parse_error_with_status(status: StatusCode, resp: reqwest::Response) -> ServiceError {
    let body = resp.text().await.unwrap_or_default();
    let msg = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v["message"]
                .as_str()
                .or_else(|| v["error"].as_str())
                .map(String::from)
        })
        .unwrap_or(body);

    match status {
        StatusCode::NOT_FOUND | StatusCode::NOT_ACCEPTABLE => ServiceError::NotFound(msg),
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT => ServiceError::InvalidInput(msg),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ServiceError::Unauthorized(msg),
        _ => ServiceError::Internal(msg),
    }
}

#[async_trait]
impl LoveService for HttpService {
    async fn list_tasks(&self) -> Result<Vec<Task>, ServiceError> {
        self.select(TASKS, &vec![select_all(), newest_first()]).await
    }

    async fn list_tasks_for_user(&self, user_id: i64) -> Result<Vec<Task>, ServiceError> {
        self.select(TASKS, &tasks_for_user_params(user_id)).await
    }

    async fn list_my_tasks(&self, user_id: i64) -> Result<Vec<Task>, ServiceError> {
        self.select(TASKS, &my_tasks_params(user_id)).await
    }

    async fn get_task(&self, id: i64) -> Result<Task, ServiceError> {
        self.select_one(TASKS, vec![select_all(), eq("id", id)], &format!("task {id}"))
            .await
    }

    async fn create_task(&self, input: &CreateTask) -> Result<Task, ServiceError> {
        input.validate()?;
        self.insert(TASKS, input).await
    }

    async fn update_task(&self, id: i64, update: &UpdateTask) -> Result<Task, ServiceError> {
        let rows: Vec<Task> = self.update(TASKS, &vec![eq("id", id)], update).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ServiceError::NotFound(format!("task {id}")))
    }

    async fn delete_task(&self, id: i64) -> Result<(), ServiceError> {
        self.delete_rows(TASKS, &vec![eq("id", id)]).await
    }

    async fn complete_task(&self, id: i64, actor: i64) -> Result<Task, ServiceError> {
        let change = StatusChange::completion(actor, Utc::now());
        self.transition(id, &change).await
    }

    async fn cancel_task(&self, id: i64) -> Result<Task, ServiceError> {
        self.transition(id, &StatusChange::cancellation()).await
    }

    async fn list_histories_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<TaskHistory>, ServiceError> {
        self.select(
            TASK_HISTORIES,
            &vec![select_all(), eq("user_id", user_id), newest_first()],
        )
        .await
    }

    async fn list_histories_for_task(
        &self,
        task_id: i64,
    ) -> Result<Vec<TaskHistory>, ServiceError> {
        self.select(
            TASK_HISTORIES,
            &vec![select_all(), eq("task_id", task_id), newest_first()],
        )
        .await
    }

    async fn append_history(&self, input: &CreateTaskHistory) -> Result<TaskHistory, ServiceError> {
        self.insert(TASK_HISTORIES, input).await
    }

    async fn get_user(&self, id: i64) -> Result<User, ServiceError> {
        self.select_one(USERS, vec![select_all(), eq("id", id)], &format!("user {id}"))
            .await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, ServiceError> {
        self.select_one(
            USERS,
            vec![select_all(), eq("email", email)],
            &format!("user {email}"),
        )
        .await
    }

    async fn update_nickname(&self, id: i64, nickname: &str) -> Result<(), ServiceError> {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(ServiceError::InvalidInput("nickname is empty".into()));
        }
        self.update_minimal(USERS, &vec![eq("id", id)], &NicknamePatch { nickname })
            .await
    }

    async fn update_push_token(&self, id: i64, token: Option<&str>) -> Result<(), ServiceError> {
        self.update_minimal(USERS, &vec![eq("id", id)], &PushTokenPatch { token })
            .await
    }

    async fn partner_push_token(&self, partner_id: i64) -> Result<Option<String>, ServiceError> {
        let row: PushTokenRow = self
            .select_one(
                USERS,
                vec![
                    ("select".to_string(), "fcmToken".to_string()),
                    eq("id", partner_id),
                ],
                &format!("user {partner_id}"),
            )
            .await?;
        Ok(row.token.filter(|t| !t.is_empty()))
    }

    async fn list_missions_for_owner(
        &self,
        owner_id: i64,
    ) -> Result<Vec<ScheduledMission>, ServiceError> {
        self.select(MISSIONS, &vec![select_all(), eq("userId", owner_id)])
            .await
    }

    async fn create_mission(
        &self,
        input: &CreateScheduledMission,
    ) -> Result<ScheduledMission, ServiceError> {
        if input.title.trim().is_empty() {
            return Err(ServiceError::InvalidInput("mission title is empty".into()));
        }
        self.insert(MISSIONS, input).await
    }

    async fn complete_mission(&self, id: i64) -> Result<ScheduledMission, ServiceError> {
        let rows: Vec<ScheduledMission> = self
            .update(MISSIONS, &vec![eq("id", id)], &MissionPatch { completed: true })
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ServiceError::NotFound(format!("mission {id}")))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, ServiceError> {
        let session = self
            .token_grant(
                "password",
                serde_json::json!({ "email": email, "password": password }),
                email,
            )
            .await?;
        *self.session.write().await = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), ServiceError> {
        let Some(session) = self.session.write().await.take() else {
            return Ok(());
        };
        let resp = self
            .client
            .post(format!("{}/auth/v1/logout", self.base_url))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", session.access_token))
            .send()
            .await
            .map_err(|e| ServiceError::Internal(format!("connection failed: {e}")))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(parse_error(resp).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(params: &'a Params, key: &str) -> Vec<&'a str> {
        params
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[test]
    fn my_tasks_filter_shape() {
        let params = my_tasks_params(7);
        assert_eq!(lookup(&params, "status"), vec!["eq.pending"]);
        assert_eq!(lookup(&params, "created_by"), vec!["eq.7"]);
        assert_eq!(
            lookup(&params, "or"),
            vec!["(assigned_to.eq.me,assigned_to.eq.both)"]
        );
        assert_eq!(lookup(&params, "order"), vec!["created_at.desc"]);
    }

    #[test]
    fn tasks_for_user_filter_shape() {
        let params = tasks_for_user_params(3);
        assert_eq!(
            lookup(&params, "or"),
            vec!["(created_by.eq.3,assigned_to.eq.me,assigned_to.eq.both)"]
        );
    }

    #[test]
    fn transitions_only_match_pending_rows() {
        let params = pending_task_params(42);
        assert_eq!(lookup(&params, "id"), vec!["eq.42"]);
        assert_eq!(lookup(&params, "status"), vec!["eq.pending"]);
    }

    #[test]
    fn push_token_patch_uses_column_name() {
        let json = serde_json::to_value(PushTokenPatch { token: None }).unwrap();
        assert_eq!(json, serde_json::json!({ "fcmToken": null }));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let svc = HttpService::new("https://example.supabase.co/", "anon");
        assert_eq!(
            svc.rest_url(TASKS),
            "https://example.supabase.co/rest/v1/tasks"
        );
    }
}
