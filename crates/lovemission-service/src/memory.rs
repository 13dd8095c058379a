use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use lovemission_core::mission::{CreateScheduledMission, ScheduledMission};
use lovemission_core::task::{AssignedTo, CreateTask, Status, Task, UpdateTask};
use lovemission_core::task_history::{CreateTaskHistory, TaskHistory};
use lovemission_core::user::User;
use tokio::sync::RwLock;

use crate::{AuthSession, LoveService, ServiceError};

#[derive(Default)]
struct Tables {
    tasks: Vec<Task>,
    histories: Vec<TaskHistory>,
    users: Vec<User>,
    missions: Vec<ScheduledMission>,
    passwords: HashMap<String, String>,
    next_id: i64,
    session: Option<AuthSession>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn task_mut(&mut self, id: i64) -> Result<&mut Task, ServiceError> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| ServiceError::NotFound(format!("task {id}")))
    }

    fn user_mut(&mut self, id: i64) -> Result<&mut User, ServiceError> {
        self.users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| ServiceError::NotFound(format!("user {id}")))
    }
}

fn newest_first<T>(mut rows: Vec<T>, created: impl Fn(&T) -> chrono::DateTime<Utc>) -> Vec<T> {
    rows.sort_by_key(|r| std::cmp::Reverse(created(r)));
    rows
}

/// In-process backend with the same filters, orderings and transition
/// rules as the hosted one. Used for tests and offline runs.
#[derive(Default)]
pub struct MemoryService {
    tables: RwLock<Tables>,
}

impl MemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account. Partner links are set separately with
    /// [`MemoryService::link_partners`].
    pub async fn add_user(&self, email: &str, password: &str, nickname: Option<&str>) -> User {
        let mut tables = self.tables.write().await;
        let user = User {
            id: tables.next_id(),
            email: email.to_string(),
            nickname: nickname.map(String::from),
            partner_id: None,
            push_token: None,
            coin: 0,
        };
        tables.users.push(user.clone());
        tables
            .passwords
            .insert(email.to_string(), password.to_string());
        user
    }

    /// Link two users both ways.
    pub async fn link_partners(&self, a: i64, b: i64) -> Result<(), ServiceError> {
        let mut tables = self.tables.write().await;
        tables.user_mut(a)?.partner_id = Some(b);
        tables.user_mut(b)?.partner_id = Some(a);
        Ok(())
    }

    pub async fn current_session(&self) -> Option<AuthSession> {
        self.tables.read().await.session.clone()
    }

    async fn transition(
        &self,
        id: i64,
        apply: impl FnOnce(&mut Task) -> Result<(), lovemission_core::CoreError>,
    ) -> Result<Task, ServiceError> {
        let mut tables = self.tables.write().await;
        let task = tables.task_mut(id)?;
        apply(task)?;
        Ok(task.clone())
    }
}

#[async_trait]
impl LoveService for MemoryService {
    async fn list_tasks(&self) -> Result<Vec<Task>, ServiceError> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.tasks.clone(), |t| t.created_at))
    }

    async fn list_tasks_for_user(&self, user_id: i64) -> Result<Vec<Task>, ServiceError> {
        let tables = self.tables.read().await;
        let rows = tables
            .tasks
            .iter()
            .filter(|t| {
                t.created_by == user_id
                    || matches!(t.assigned_to, AssignedTo::Me | AssignedTo::Both)
            })
            .cloned()
            .collect();
        Ok(newest_first(rows, |t| t.created_at))
    }

    async fn list_my_tasks(&self, user_id: i64) -> Result<Vec<Task>, ServiceError> {
        let tables = self.tables.read().await;
        let rows = tables
            .tasks
            .iter()
            .filter(|t| {
                t.status == Status::Pending
                    && matches!(t.assigned_to, AssignedTo::Me | AssignedTo::Both)
                    && t.created_by == user_id
            })
            .cloned()
            .collect();
        Ok(newest_first(rows, |t| t.created_at))
    }

    async fn get_task(&self, id: i64) -> Result<Task, ServiceError> {
        let mut tables = self.tables.write().await;
        tables.task_mut(id).map(|t| t.clone())
    }

    async fn create_task(&self, input: &CreateTask) -> Result<Task, ServiceError> {
        input.validate()?;
        let mut tables = self.tables.write().await;
        // Rows created within the same instant still need a strict order.
        let now = Utc::now() + Duration::microseconds(tables.next_id);
        let task = Task {
            id: tables.next_id(),
            title: input.title.clone(),
            description: input.description.clone(),
            due_date: input.due_date.clone(),
            assigned_to: input.assigned_to,
            created_by: input.created_by,
            status: Status::Pending,
            completed_at: None,
            completed_by: None,
            created_at: now,
            updated_at: now,
        };
        tables.tasks.push(task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: i64, update: &UpdateTask) -> Result<Task, ServiceError> {
        let mut tables = self.tables.write().await;
        let task = tables.task_mut(id)?;
        update.apply(task, Utc::now());
        Ok(task.clone())
    }

    async fn delete_task(&self, id: i64) -> Result<(), ServiceError> {
        let mut tables = self.tables.write().await;
        tables.tasks.retain(|t| t.id != id);
        Ok(())
    }

    async fn complete_task(&self, id: i64, actor: i64) -> Result<Task, ServiceError> {
        self.transition(id, |t| t.mark_completed(actor, Utc::now()))
            .await
    }

    async fn cancel_task(&self, id: i64) -> Result<Task, ServiceError> {
        self.transition(id, |t| t.mark_cancelled(Utc::now())).await
    }

    async fn list_histories_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<TaskHistory>, ServiceError> {
        let tables = self.tables.read().await;
        let rows = tables
            .histories
            .iter()
            .filter(|h| h.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |h| h.created_at))
    }

    async fn list_histories_for_task(
        &self,
        task_id: i64,
    ) -> Result<Vec<TaskHistory>, ServiceError> {
        let tables = self.tables.read().await;
        let rows = tables
            .histories
            .iter()
            .filter(|h| h.task_id == task_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |h| h.created_at))
    }

    async fn append_history(&self, input: &CreateTaskHistory) -> Result<TaskHistory, ServiceError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now() + Duration::microseconds(tables.next_id);
        let row = TaskHistory {
            id: tables.next_id(),
            task_id: input.task_id,
            action: input.action,
            user_id: input.user_id,
            metadata: input.metadata.clone(),
            created_at: now,
        };
        tables.histories.push(row.clone());
        Ok(row)
    }

    async fn get_user(&self, id: i64) -> Result<User, ServiceError> {
        let mut tables = self.tables.write().await;
        tables.user_mut(id).map(|u| u.clone())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, ServiceError> {
        let tables = self.tables.read().await;
        tables
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("user {email}")))
    }

    async fn update_nickname(&self, id: i64, nickname: &str) -> Result<(), ServiceError> {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(ServiceError::InvalidInput("nickname is empty".into()));
        }
        let mut tables = self.tables.write().await;
        tables.user_mut(id)?.nickname = Some(nickname.to_string());
        Ok(())
    }

    async fn update_push_token(&self, id: i64, token: Option<&str>) -> Result<(), ServiceError> {
        let mut tables = self.tables.write().await;
        tables.user_mut(id)?.push_token = token.map(String::from);
        Ok(())
    }

    async fn partner_push_token(&self, partner_id: i64) -> Result<Option<String>, ServiceError> {
        let user = self.get_user(partner_id).await?;
        Ok(user.push_token.filter(|t| !t.is_empty()))
    }

    async fn list_missions_for_owner(
        &self,
        owner_id: i64,
    ) -> Result<Vec<ScheduledMission>, ServiceError> {
        let tables = self.tables.read().await;
        Ok(tables
            .missions
            .iter()
            .filter(|m| m.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn create_mission(
        &self,
        input: &CreateScheduledMission,
    ) -> Result<ScheduledMission, ServiceError> {
        if input.title.trim().is_empty() {
            return Err(ServiceError::InvalidInput("mission title is empty".into()));
        }
        let mut tables = self.tables.write().await;
        let mission = ScheduledMission {
            id: tables.next_id(),
            title: input.title.clone(),
            completed: false,
            kind: input.kind.as_str().to_string(),
            owner_id: input.owner_id,
        };
        tables.missions.push(mission.clone());
        Ok(mission)
    }

    async fn complete_mission(&self, id: i64) -> Result<ScheduledMission, ServiceError> {
        let mut tables = self.tables.write().await;
        let mission = tables
            .missions
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| ServiceError::NotFound(format!("mission {id}")))?;
        mission.completed = true;
        Ok(mission.clone())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, ServiceError> {
        let mut tables = self.tables.write().await;
        match tables.passwords.get(email) {
            Some(stored) if stored == password => {}
            _ => return Err(ServiceError::Unauthorized("Invalid login credentials".into())),
        }
        let session = AuthSession {
            access_token: format!("memory-access-{}", tables.next_id()),
            refresh_token: format!("memory-refresh-{}", tables.next_id()),
            expires_at: Utc::now() + Duration::hours(1),
            email: email.to_string(),
        };
        tables.session = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), ServiceError> {
        self.tables.write().await.session = None;
        Ok(())
    }
}
