//! Read-through cache in front of a [`LoveService`].
//!
//! Reads are cached per query shape. Concurrent reads for the same key share
//! a single backend round trip (moka runs one init future per key and parks
//! the other callers on it). Mutations invalidate exactly the entries they
//! can change; failed calls are never cached.

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lovemission_core::mission::{CreateScheduledMission, ScheduledMission};
use lovemission_core::task::{CreateTask, Task, UpdateTask};
use lovemission_core::task_history::{CreateTaskHistory, TaskHistory};
use lovemission_core::user::User;
use moka::future::Cache;
use tracing::{debug, warn};

use crate::{AuthSession, LoveService, ServiceError};

const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskListKey {
    All,
    ForUser(i64),
    Mine(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HistoryKey {
    ForUser(i64),
    ForTask(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UserKey {
    Id(i64),
    Email(String),
}

pub struct CachedService<S> {
    inner: S,
    task_lists: Cache<TaskListKey, Arc<Vec<Task>>>,
    tasks: Cache<i64, Task>,
    histories: Cache<HistoryKey, Arc<Vec<TaskHistory>>>,
    users: Cache<UserKey, User>,
    partner_tokens: Cache<i64, Option<String>>,
    missions: Cache<i64, Arc<Vec<ScheduledMission>>>,
}

fn build<K, V>(ttl: Duration, capacity: u64) -> Cache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    Cache::builder()
        .time_to_live(ttl)
        .max_capacity(capacity)
        .support_invalidation_closures()
        .build()
}

/// Look up `key`, running `load` on a miss. Errors pass through uncached.
async fn read_through<K, V, F>(cache: &Cache<K, V>, key: K, load: F) -> Result<V, ServiceError>
where
    K: Hash + Eq + Send + Sync + std::fmt::Debug + 'static,
    V: Clone + Send + Sync + 'static,
    F: Future<Output = Result<V, ServiceError>>,
{
    debug!(?key, "cache lookup");
    cache
        .try_get_with(key, load)
        .await
        .map_err(|e: Arc<ServiceError>| (*e).clone())
}

impl<S: LoveService> CachedService<S> {
    pub fn new(inner: S) -> Self {
        Self::with_ttl(inner, DEFAULT_TTL)
    }

    pub fn with_ttl(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            task_lists: build(ttl, 64),
            tasks: build(ttl, 1_000),
            histories: build(ttl, 256),
            users: build(ttl, 64),
            partner_tokens: build(ttl, 16),
            missions: build(ttl, 32),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Drop every cached entry.
    pub fn invalidate_all(&self) {
        self.task_lists.invalidate_all();
        self.tasks.invalidate_all();
        self.histories.invalidate_all();
        self.users.invalidate_all();
        self.partner_tokens.invalidate_all();
        self.missions.invalidate_all();
    }

    /// Every task list can change when any task row changes, since all of
    /// them filter on status or assignment.
    async fn invalidate_task(&self, id: i64) {
        self.task_lists.invalidate_all();
        self.tasks.invalidate(&id).await;
    }

    async fn invalidate_user(&self, id: i64) {
        if let Err(e) = self
            .users
            .invalidate_entries_if(move |key, user| user.id == id || *key == UserKey::Id(id))
        {
            warn!("user cache predicate rejected, clearing users: {e}");
            self.users.invalidate_all();
        }
        self.partner_tokens.invalidate(&id).await;
    }
}

#[async_trait]
impl<S: LoveService> LoveService for CachedService<S> {
    async fn list_tasks(&self) -> Result<Vec<Task>, ServiceError> {
        let rows = read_through(&self.task_lists, TaskListKey::All, async {
            self.inner.list_tasks().await.map(Arc::new)
        })
        .await?;
        Ok(rows.as_ref().clone())
    }

    async fn list_tasks_for_user(&self, user_id: i64) -> Result<Vec<Task>, ServiceError> {
        let rows = read_through(&self.task_lists, TaskListKey::ForUser(user_id), async {
            self.inner.list_tasks_for_user(user_id).await.map(Arc::new)
        })
        .await?;
        Ok(rows.as_ref().clone())
    }

    async fn list_my_tasks(&self, user_id: i64) -> Result<Vec<Task>, ServiceError> {
        let rows = read_through(&self.task_lists, TaskListKey::Mine(user_id), async {
            self.inner.list_my_tasks(user_id).await.map(Arc::new)
        })
        .await?;
        Ok(rows.as_ref().clone())
    }

    async fn get_task(&self, id: i64) -> Result<Task, ServiceError> {
        read_through(&self.tasks, id, self.inner.get_task(id)).await
    }

    async fn create_task(&self, input: &CreateTask) -> Result<Task, ServiceError> {
        let task = self.inner.create_task(input).await?;
        self.invalidate_task(task.id).await;
        Ok(task)
    }

    async fn update_task(&self, id: i64, update: &UpdateTask) -> Result<Task, ServiceError> {
        let result = self.inner.update_task(id, update).await;
        self.invalidate_task(id).await;
        result
    }

    async fn delete_task(&self, id: i64) -> Result<(), ServiceError> {
        let result = self.inner.delete_task(id).await;
        self.invalidate_task(id).await;
        result
    }

    async fn complete_task(&self, id: i64, actor: i64) -> Result<Task, ServiceError> {
        // A rejected transition means our copy was stale, so drop it either way.
        let result = self.inner.complete_task(id, actor).await;
        self.invalidate_task(id).await;
        result
    }

    async fn cancel_task(&self, id: i64) -> Result<Task, ServiceError> {
        let result = self.inner.cancel_task(id).await;
        self.invalidate_task(id).await;
        result
    }

    async fn list_histories_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<TaskHistory>, ServiceError> {
        let rows = read_through(&self.histories, HistoryKey::ForUser(user_id), async {
            self.inner.list_histories_for_user(user_id).await.map(Arc::new)
        })
        .await?;
        Ok(rows.as_ref().clone())
    }

    async fn list_histories_for_task(
        &self,
        task_id: i64,
    ) -> Result<Vec<TaskHistory>, ServiceError> {
        let rows = read_through(&self.histories, HistoryKey::ForTask(task_id), async {
            self.inner.list_histories_for_task(task_id).await.map(Arc::new)
        })
        .await?;
        Ok(rows.as_ref().clone())
    }

    async fn append_history(&self, input: &CreateTaskHistory) -> Result<TaskHistory, ServiceError> {
        let row = self.inner.append_history(input).await?;
        self.histories
            .invalidate(&HistoryKey::ForUser(input.user_id))
            .await;
        self.histories
            .invalidate(&HistoryKey::ForTask(input.task_id))
            .await;
        Ok(row)
    }

    async fn get_user(&self, id: i64) -> Result<User, ServiceError> {
        read_through(&self.users, UserKey::Id(id), self.inner.get_user(id)).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, ServiceError> {
        read_through(
            &self.users,
            UserKey::Email(email.to_string()),
            self.inner.get_user_by_email(email),
        )
        .await
    }

    async fn update_nickname(&self, id: i64, nickname: &str) -> Result<(), ServiceError> {
        self.inner.update_nickname(id, nickname).await?;
        self.invalidate_user(id).await;
        Ok(())
    }

    async fn update_push_token(&self, id: i64, token: Option<&str>) -> Result<(), ServiceError> {
        self.inner.update_push_token(id, token).await?;
        self.invalidate_user(id).await;
        Ok(())
    }

    async fn partner_push_token(&self, partner_id: i64) -> Result<Option<String>, ServiceError> {
        read_through(
            &self.partner_tokens,
            partner_id,
            self.inner.partner_push_token(partner_id),
        )
        .await
    }

    async fn list_missions_for_owner(
        &self,
        owner_id: i64,
    ) -> Result<Vec<ScheduledMission>, ServiceError> {
        let rows = read_through(&self.missions, owner_id, async {
            self.inner.list_missions_for_owner(owner_id).await.map(Arc::new)
        })
        .await?;
        Ok(rows.as_ref().clone())
    }

    async fn create_mission(
        &self,
        input: &CreateScheduledMission,
    ) -> Result<ScheduledMission, ServiceError> {
        let mission = self.inner.create_mission(input).await?;
        self.missions.invalidate(&input.owner_id).await;
        Ok(mission)
    }

    async fn complete_mission(&self, id: i64) -> Result<ScheduledMission, ServiceError> {
        let mission = self.inner.complete_mission(id).await?;
        self.missions.invalidate(&mission.owner_id).await;
        Ok(mission)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, ServiceError> {
        self.inner.sign_in(email, password).await
    }

    async fn sign_out(&self) -> Result<(), ServiceError> {
        let result = self.inner.sign_out().await;
        self.invalidate_all();
        result
    }

    fn invalidate_reads(&self) {
        debug!("dropping cached reads");
        self.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use lovemission_core::task::AssignedTo;

    use crate::MemoryService;

    /// Counts list_tasks round trips and slows them down so concurrent
    /// callers overlap.
    struct Counting {
        inner: MemoryService,
        list_calls: AtomicUsize,
        user_calls: AtomicUsize,
    }

    impl Counting {
        fn new() -> Self {
            Self {
                inner: MemoryService::new(),
                list_calls: AtomicUsize::new(0),
                user_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LoveService for Counting {
        async fn list_tasks(&self) -> Result<Vec<Task>, ServiceError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.inner.list_tasks().await
        }
        async fn list_tasks_for_user(&self, user_id: i64) -> Result<Vec<Task>, ServiceError> {
            self.inner.list_tasks_for_user(user_id).await
        }
        async fn list_my_tasks(&self, user_id: i64) -> Result<Vec<Task>, ServiceError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.list_my_tasks(user_id).await
        }
        async fn get_task(&self, id: i64) -> Result<Task, ServiceError> {
            self.inner.get_task(id).await
        }
        async fn create_task(&self, input: &CreateTask) -> Result<Task, ServiceError> {
            self.inner.create_task(input).await
        }
        async fn update_task(&self, id: i64, update: &UpdateTask) -> Result<Task, ServiceError> {
            self.inner.update_task(id, update).await
        }
        async fn delete_task(&self, id: i64) -> Result<(), ServiceError> {
            self.inner.delete_task(id).await
        }
        async fn complete_task(&self, id: i64, actor: i64) -> Result<Task, ServiceError> {
            self.inner.complete_task(id, actor).await
        }
        async fn cancel_task(&self, id: i64) -> Result<Task, ServiceError> {
            self.inner.cancel_task(id).await
        }
        async fn list_histories_for_user(
            &self,
            user_id: i64,
        ) -> Result<Vec<TaskHistory>, ServiceError> {
            self.inner.list_histories_for_user(user_id).await
        }
        async fn list_histories_for_task(
            &self,
            task_id: i64,
        ) -> Result<Vec<TaskHistory>, ServiceError> {
            self.inner.list_histories_for_task(task_id).await
        }
        async fn append_history(
            &self,
            input: &CreateTaskHistory,
        ) -> Result<TaskHistory, ServiceError> {
            self.inner.append_history(input).await
        }
        async fn get_user(&self, id: i64) -> Result<User, ServiceError> {
            self.user_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get_user(id).await
        }
        async fn get_user_by_email(&self, email: &str) -> Result<User, ServiceError> {
            self.user_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get_user_by_email(email).await
        }
        async fn update_nickname(&self, id: i64, nickname: &str) -> Result<(), ServiceError> {
            self.inner.update_nickname(id, nickname).await
        }
        async fn update_push_token(
            &self,
            id: i64,
            token: Option<&str>,
        ) -> Result<(), ServiceError> {
            self.inner.update_push_token(id, token).await
        }
        async fn partner_push_token(
            &self,
            partner_id: i64,
        ) -> Result<Option<String>, ServiceError> {
            self.inner.partner_push_token(partner_id).await
        }
        async fn list_missions_for_owner(
            &self,
            owner_id: i64,
        ) -> Result<Vec<ScheduledMission>, ServiceError> {
            self.inner.list_missions_for_owner(owner_id).await
        }
        async fn create_mission(
            &self,
            input: &CreateScheduledMission,
        ) -> Result<ScheduledMission, ServiceError> {
            self.inner.create_mission(input).await
        }
        async fn complete_mission(&self, id: i64) -> Result<ScheduledMission, ServiceError> {
            self.inner.complete_mission(id).await
        }
        async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, ServiceError> {
            self.inner.sign_in(email, password).await
        }
        async fn sign_out(&self) -> Result<(), ServiceError> {
            self.inner.sign_out().await
        }
    }

    fn create(title: &str) -> CreateTask {
        CreateTask {
            title: title.into(),
            description: None,
            due_date: None,
            assigned_to: AssignedTo::Both,
            created_by: 1,
        }
    }

    #[tokio::test]
    async fn repeated_reads_hit_cache() {
        let svc = CachedService::new(Counting::new());
        svc.list_tasks().await.unwrap();
        svc.list_tasks().await.unwrap();
        assert_eq!(svc.inner().list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_reads_share_one_round_trip() {
        let svc = CachedService::new(Counting::new());
        let (a, b, c) = tokio::join!(svc.list_tasks(), svc.list_tasks(), svc.list_tasks());
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(svc.inner().list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn task_mutation_invalidates_task_lists() {
        let svc = CachedService::new(Counting::new());
        assert!(svc.list_tasks().await.unwrap().is_empty());

        let task = svc.create_task(&create("Buy milk")).await.unwrap();
        let all = svc.list_tasks().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(svc.inner().list_calls.load(Ordering::SeqCst), 2);

        svc.complete_task(task.id, 1).await.unwrap();
        let all = svc.list_tasks().await.unwrap();
        assert!(!all[0].is_pending());
        assert_eq!(svc.inner().list_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn history_append_leaves_task_lists_cached() {
        let svc = CachedService::new(Counting::new());
        svc.list_tasks().await.unwrap();
        svc.append_history(&CreateTaskHistory::new(
            1,
            lovemission_core::HistoryAction::Created,
            1,
        ))
        .await
        .unwrap();
        svc.list_tasks().await.unwrap();
        assert_eq!(svc.inner().list_calls.load(Ordering::SeqCst), 1);
        assert_eq!(svc.list_histories_for_task(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn nickname_update_refreshes_email_lookup() {
        let svc = CachedService::new(Counting::new());
        let user = svc.inner().inner.add_user("a@example.com", "pw", Some("A")).await;

        let cached = svc.get_user_by_email("a@example.com").await.unwrap();
        assert_eq!(cached.nickname.as_deref(), Some("A"));

        svc.update_nickname(user.id, "Sweetie").await.unwrap();
        let fresh = svc.get_user_by_email("a@example.com").await.unwrap();
        assert_eq!(fresh.nickname.as_deref(), Some("Sweetie"));
        assert_eq!(svc.inner().user_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_reads_sees_writes_made_elsewhere() {
        let svc = CachedService::new(Counting::new());
        assert!(svc.list_tasks().await.unwrap().is_empty());

        // Written behind the cache, as the partner's device would.
        svc.inner().inner.create_task(&create("Water plants")).await.unwrap();
        assert!(svc.list_tasks().await.unwrap().is_empty());

        svc.invalidate_reads();
        assert_eq!(svc.list_tasks().await.unwrap().len(), 1);
        assert_eq!(svc.inner().list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let svc = CachedService::new(Counting::new());
        assert!(svc.get_user(1).await.is_err());
        svc.inner().inner.add_user("a@example.com", "pw", None).await;
        assert!(svc.get_user(1).await.is_ok());
    }

    #[tokio::test]
    async fn mission_completion_invalidates_owner_list() {
        let svc = CachedService::new(Counting::new());
        let m = svc
            .create_mission(&CreateScheduledMission {
                title: "Picnic".into(),
                kind: lovemission_core::MissionType::Daily,
                owner_id: 9,
            })
            .await
            .unwrap();
        assert!(!svc.list_missions_for_owner(9).await.unwrap()[0].completed);
        svc.complete_mission(m.id).await.unwrap();
        assert!(svc.list_missions_for_owner(9).await.unwrap()[0].completed);
    }
}
