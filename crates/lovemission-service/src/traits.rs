use async_trait::async_trait;
use lovemission_core::mission::{CreateScheduledMission, ScheduledMission};
use lovemission_core::task::{CreateTask, Task, UpdateTask};
use lovemission_core::task_history::{CreateTaskHistory, TaskHistory};
use lovemission_core::user::User;
use lovemission_core::CoreError;
use thiserror::Error;

use crate::AuthSession;

#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CoreError> for ServiceError {
    fn from(e: CoreError) -> Self {
        ServiceError::InvalidInput(e.to_string())
    }
}

/// Remote data access for the app.
///
/// Each method is a single request/response round trip against the backend.
/// `HttpService` talks to the hosted backend, `MemoryService` keeps the
/// tables in process, and `CachedService` wraps either with a read-through
/// cache.
#[async_trait]
pub trait LoveService: Send + Sync {
    // -- Tasks --
    async fn list_tasks(&self) -> Result<Vec<Task>, ServiceError>;
    /// Tasks the user created, plus any assigned to "me" or "both".
    async fn list_tasks_for_user(&self, user_id: i64) -> Result<Vec<Task>, ServiceError>;
    /// Pending tasks the user created for themselves or for both.
    async fn list_my_tasks(&self, user_id: i64) -> Result<Vec<Task>, ServiceError>;
    async fn get_task(&self, id: i64) -> Result<Task, ServiceError>;
    async fn create_task(&self, input: &CreateTask) -> Result<Task, ServiceError>;
    async fn update_task(&self, id: i64, update: &UpdateTask) -> Result<Task, ServiceError>;
    async fn delete_task(&self, id: i64) -> Result<(), ServiceError>;
    /// Fails with `InvalidInput` unless the task is still pending.
    async fn complete_task(&self, id: i64, actor: i64) -> Result<Task, ServiceError>;
    /// Fails with `InvalidInput` unless the task is still pending.
    async fn cancel_task(&self, id: i64) -> Result<Task, ServiceError>;

    // -- Task histories --
    async fn list_histories_for_user(&self, user_id: i64)
        -> Result<Vec<TaskHistory>, ServiceError>;
    async fn list_histories_for_task(&self, task_id: i64)
        -> Result<Vec<TaskHistory>, ServiceError>;
    async fn append_history(&self, input: &CreateTaskHistory)
        -> Result<TaskHistory, ServiceError>;

    // -- Users --
    async fn get_user(&self, id: i64) -> Result<User, ServiceError>;
    async fn get_user_by_email(&self, email: &str) -> Result<User, ServiceError>;
    async fn update_nickname(&self, id: i64, nickname: &str) -> Result<(), ServiceError>;
    async fn update_push_token(&self, id: i64, token: Option<&str>) -> Result<(), ServiceError>;
    async fn partner_push_token(&self, partner_id: i64) -> Result<Option<String>, ServiceError>;

    // -- Scheduled missions --
    async fn list_missions_for_owner(
        &self,
        owner_id: i64,
    ) -> Result<Vec<ScheduledMission>, ServiceError>;
    async fn create_mission(
        &self,
        input: &CreateScheduledMission,
    ) -> Result<ScheduledMission, ServiceError>;
    async fn complete_mission(&self, id: i64) -> Result<ScheduledMission, ServiceError>;

    // -- Auth --
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, ServiceError>;
    async fn sign_out(&self) -> Result<(), ServiceError>;

    /// Forget any locally retained reads so the next calls go to the
    /// backend. Rows written from the partner's device only show up after
    /// this. No-op for services that keep nothing.
    fn invalidate_reads(&self) {}
}
