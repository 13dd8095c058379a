use chrono::NaiveDate;
use lovemission_core::task::{AssignedTo, CreateTask, Task};
use lovemission_core::task_history::HistoryAction;
use lovemission_core::user::{display_name, User};
use lovemission_core::views::{self, CalendarView};
use lovemission_service::ServiceError;
use tracing::{error, warn};

use super::{cancel_task, complete_task, record, ME_PLACEHOLDER, PARTNER_PLACEHOLDER};
use crate::alert::{self, Alert};
use crate::context::AppContext;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    List,
    Calendar,
}

/// Input of the "add task" form.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub assigned_to: AssignedTo,
}

/// The couple's shared board, as a list or a calendar.
pub struct SharedTasksScreen {
    ctx: AppContext,
    user: User,
    partner: Option<User>,
    tasks: Vec<Task>,
    mode: ViewMode,
    selected_date: Option<NaiveDate>,
    alert: Option<Alert>,
}

impl SharedTasksScreen {
    pub fn new(ctx: AppContext, user: User) -> Self {
        Self {
            ctx,
            user,
            partner: None,
            tasks: Vec::new(),
            mode: ViewMode::default(),
            selected_date: None,
            alert: None,
        }
    }

    /// Fetch tasks and the partner record side by side.
    pub async fn on_focus(&mut self) {
        self.ctx.service.invalidate_reads();
        let (tasks, partner) = tokio::join!(self.ctx.service.list_tasks(), self.fetch_partner());
        self.apply_tasks(tasks);
        match partner {
            Some(Ok(p)) => self.partner = Some(p),
            Some(Err(e)) => warn!(user_id = self.user.id, "loading partner: {e}"),
            None => {}
        }
    }

    async fn fetch_partner(&self) -> Option<Result<User, ServiceError>> {
        let partner_id = self.user.partner_id?;
        Some(self.ctx.service.get_user(partner_id).await)
    }

    async fn refresh(&mut self) {
        let tasks = self.ctx.service.list_tasks().await;
        self.apply_tasks(tasks);
    }

    fn apply_tasks(&mut self, fetched: Result<Vec<Task>, ServiceError>) {
        match fetched {
            Ok(rows) => self.tasks = views::shared_tasks(&rows),
            Err(e) => warn!("loading shared tasks: {e}"),
        }
    }

    pub async fn create(&mut self, draft: NewTask) -> bool {
        let input = CreateTask {
            title: draft.title.trim().to_string(),
            description: draft.description.filter(|d| !d.trim().is_empty()),
            due_date: draft.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
            assigned_to: draft.assigned_to,
            created_by: self.user.id,
        };
        let ok = match self.ctx.service.create_task(&input).await {
            Ok(task) => {
                record(&self.ctx, &task, HistoryAction::Created, self.user.id).await;
                self.alert = Some(Alert::success(alert::TASK_CREATED));
                true
            }
            Err(e) => {
                error!(title = %input.title, "creating task: {e}");
                self.alert = Some(Alert::error(alert::TASK_CREATE_FAILED));
                false
            }
        };
        self.refresh().await;
        ok
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
        let ok = match result {
            Ok(_) => true,
            Err(e) => {
                error!(task_id, "updating task: {e}");
                self.alert = Some(Alert::error(failure));
                false
            }
        };
        self.refresh().await;
        ok
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Rows to list: everything in list mode, the selected day's tasks in
    /// calendar mode once a day is picked.
    pub fn visible_tasks(&self) -> Vec<Task> {
        match (self.mode, self.selected_date) {
            (ViewMode::Calendar, Some(day)) => views::tasks_due_on(&self.tasks, day),
            _ => self.tasks.clone(),
        }
    }

    pub fn calendar(&self) -> CalendarView {
        views::calendar(&self.tasks, self.selected_date)
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ViewMode) {
        self.mode = mode;
    }

    pub fn select_date(&mut self, day: Option<NaiveDate>) {
        self.selected_date = day;
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.selected_date
    }

    pub fn my_name(&self) -> &str {
        display_name(Some(&self.user), ME_PLACEHOLDER)
    }

    pub fn partner_name(&self) -> &str {
        display_name(self.partner.as_ref(), PARTNER_PLACEHOLDER)
    }

    /// Badge text for a task. Assignment is stored relative to the creator,
    /// so tasks the partner created read the other way round.
    pub fn assignment_label(&self, task: &Task) -> String {
        if task.created_by == self.user.id {
            task.assigned_to.label_for(self.my_name(), self.partner_name())
        } else {
            task.assigned_to.label_for(self.partner_name(), self.my_name())
        }
    }

    pub fn alert(&self) -> Option<&Alert> {
        self.alert.as_ref()
    }

    pub fn take_alert(&mut self) -> Option<Alert> {
        self.alert.take()
    }
}
