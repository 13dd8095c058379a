use lovemission_core::task::Task;
use lovemission_core::user::User;
use lovemission_core::views;
use lovemission_service::ServiceError;
use tracing::{error, warn};

use super::{cancel_task, complete_task};
use crate::alert::{self, Alert};
use crate::context::AppContext;

/// Pending tasks the user created for themselves or for both.
pub struct MyTasksScreen {
    ctx: AppContext,
    user: User,
    tasks: Vec<Task>,
    alert: Option<Alert>,
}

impl MyTasksScreen {
    pub fn new(ctx: AppContext, user: User) -> Self {
        Self {
            ctx,
            user,
            tasks: Vec::new(),
            alert: None,
        }
    }

    pub async fn on_focus(&mut self) {
        self.ctx.service.invalidate_reads();
        self.refresh().await;
    }

    async fn refresh(&mut self) {
        match self.ctx.service.list_tasks_for_user(self.user.id).await {
            Ok(rows) => self.tasks = views::my_tasks(&rows, self.user.id),
            Err(e) => warn!(user_id = self.user.id, "loading my tasks: {e}"),
        }
    }

    pub async fn complete(&mut self, task_id: i64) -> bool {
        let result = complete_task(&self.ctx, self.user.id, task_id).await;
        self.finish(result, task_id, alert::TASK_COMPLETE_FAILED).await
    }

    pub async fn cancel(&mut self, task_id: i64) -> bool {
        let result = cancel_task(&self.ctx, self.user.id, task_id).await;
        self.finish(result, task_id, alert::TASK_CANCEL_FAILED).await
    }

    async fn finish(
        &mut self,
        result: Result<Task, ServiceError>,
        task_id: i64,
        failure: &str,
    ) -> bool {
        if let Err(e) = &result {
            error!(task_id, "updating task: {e}");
            self.alert = Some(Alert::error(failure));
        }
        self.refresh().await;
        result.is_ok()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn take_alert(&mut self) -> Option<Alert> {
        self.alert.take()
    }
}
