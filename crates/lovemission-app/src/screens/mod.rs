//! Per-screen state controllers.
//!
//! Each controller fetches on focus, keeps its rows in plain fields and
//! refetches after every mutation. Focusing drops cached reads first so
//! the partner's writes show up. Read failures are logged and leave the
//! previous state in place; write failures become an [`Alert`].
//!
//! [`Alert`]: crate::Alert

mod history;
mod my_tasks;
mod schedule;
mod settings;
mod shared_tasks;

pub use history::HistoryScreen;
pub use my_tasks::MyTasksScreen;
pub use schedule::ScheduleScreen;
pub use settings::SettingsScreen;
pub use shared_tasks::{NewTask, SharedTasksScreen, ViewMode};

use lovemission_core::task::Task;
use lovemission_core::task_history::{CreateTaskHistory, HistoryAction};
use lovemission_service::ServiceError;
use serde_json::json;
use tracing::warn;

use crate::context::AppContext;

/// Placeholder names used until (or instead of) a nickname.
pub const ME_PLACEHOLDER: &str = "Me";
pub const PARTNER_PLACEHOLDER: &str = "Partner";

/// Append an audit row. Failures are logged only.
pub(crate) async fn record(ctx: &AppContext, task: &Task, action: HistoryAction, user_id: i64) {
    let entry = CreateTaskHistory::new(task.id, action, user_id)
        .with_metadata(json!({ "title": task.title, "status": task.status }));
    if let Err(e) = ctx.service.append_history(&entry).await {
        warn!(task_id = task.id, %action, "appending task history: {e}");
    }
}

pub(crate) async fn complete_task(
    ctx: &AppContext,
    actor: i64,
    task_id: i64,
) -> Result<Task, ServiceError> {
    let task = ctx.service.complete_task(task_id, actor).await?;
    record(ctx, &task, HistoryAction::Completed, actor).await;
    Ok(task)
}

pub(crate) async fn cancel_task(
    ctx: &AppContext,
    actor: i64,
    task_id: i64,
) -> Result<Task, ServiceError> {
    let task = ctx.service.cancel_task(task_id).await?;
    record(ctx, &task, HistoryAction::Cancelled, actor).await;
    Ok(task)
}
