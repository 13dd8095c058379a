use lovemission_core::task_history::TaskHistory;
use lovemission_core::user::User;
use lovemission_core::views::{self, HistoryBuckets};
use lovemission_service::ServiceError;
use tracing::warn;

use crate::context::AppContext;

/// Finished work: completed and cancelled tasks plus the user's audit trail.
pub struct HistoryScreen {
    ctx: AppContext,
    user: User,
    buckets: HistoryBuckets,
    activity: Vec<TaskHistory>,
}

impl HistoryScreen {
    pub fn new(ctx: AppContext, user: User) -> Self {
        Self {
            ctx,
            user,
            buckets: HistoryBuckets::default(),
            activity: Vec::new(),
        }
    }

    pub async fn on_focus(&mut self) {
        self.ctx.service.invalidate_reads();
        let (tasks, activity) = tokio::join!(
            self.ctx.service.list_tasks(),
            self.ctx.service.list_histories_for_user(self.user.id),
        );
        match tasks {
            Ok(rows) => self.buckets = views::history(&rows),
            Err(e) => warn!("loading task history: {e}"),
        }
        match activity {
            Ok(rows) => self.activity = rows,
            Err(e) => warn!(user_id = self.user.id, "loading activity: {e}"),
        }
    }

    pub fn buckets(&self) -> &HistoryBuckets {
        &self.buckets
    }

    /// The user's own audit rows, newest first.
    pub fn activity(&self) -> &[TaskHistory] {
        &self.activity
    }

    /// Audit trail of one task, newest first.
    pub async fn task_log(&self, task_id: i64) -> Result<Vec<TaskHistory>, ServiceError> {
        self.ctx.service.list_histories_for_task(task_id).await
    }
}
