use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Who is responsible for completing a task, relative to its creator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignedTo {
    #[serde(alias = "self")]
    Me,
    Partner,
    Both,
}

impl AssignedTo {
    pub const ALL: &[AssignedTo] = &[AssignedTo::Me, AssignedTo::Partner, AssignedTo::Both];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssignedTo::Me => "me",
            AssignedTo::Partner => "partner",
            AssignedTo::Both => "both",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AssignedTo::Me => "Me",
            AssignedTo::Partner => "Partner",
            AssignedTo::Both => "Together",
        }
    }

    /// Badge label using the couple's nicknames.
    pub fn label_for(&self, my_name: &str, partner_name: &str) -> String {
        match self {
            AssignedTo::Me => my_name.to_string(),
            AssignedTo::Partner => partner_name.to_string(),
            AssignedTo::Both => self.display_name().to_string(),
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "me" | "self" => Some(AssignedTo::Me),
            "partner" => Some(AssignedTo::Partner),
            "both" => Some(AssignedTo::Both),
            _ => None,
        }
    }
}

impl fmt::Display for AssignedTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Completed,
    Cancelled,
}

impl Status {
    pub const ALL: &[Status] = &[Status::Pending, Status::Completed, Status::Cancelled];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Completed => "completed",
            Status::Cancelled => "cancelled",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Completed => "Completed",
            Status::Cancelled => "Cancelled",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Status::Pending),
            "completed" => Some(Status::Completed),
            "cancelled" => Some(Status::Cancelled),
            _ => None,
        }
    }

    /// Only `pending` tasks move, and only forward.
    pub fn can_transition_to(&self, next: Status) -> bool {
        matches!(
            (self, next),
            (Status::Pending, Status::Completed) | (Status::Pending, Status::Cancelled)
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    pub assigned_to: AssignedTo,
    pub created_by: i64,
    pub status: Status,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn is_pending(&self) -> bool {
        self.status == Status::Pending
    }

    /// Calendar day of the due date. The backend stores either a bare
    /// `YYYY-MM-DD` or a full timestamp; only the part before `T` counts.
    pub fn due_day(&self) -> Option<NaiveDate> {
        let raw = self.due_date.as_deref()?;
        let day = raw.split('T').next()?;
        NaiveDate::parse_from_str(day.trim(), "%Y-%m-%d").ok()
    }

    /// Completion fields are populated if and only if the task is completed.
    pub fn completion_consistent(&self) -> bool {
        let stamped = self.completed_at.is_some() && self.completed_by.is_some();
        let blank = self.completed_at.is_none() && self.completed_by.is_none();
        match self.status {
            Status::Completed => stamped,
            Status::Pending | Status::Cancelled => blank,
        }
    }

    pub fn check_transition(&self, next: Status) -> Result<(), CoreError> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(CoreError::InvalidTransition {
                id: self.id,
                from: self.status,
                to: next,
            })
        }
    }

    /// Apply a completion in place, stamping the actor and time.
    pub fn mark_completed(&mut self, actor: i64, at: DateTime<Utc>) -> Result<(), CoreError> {
        self.check_transition(Status::Completed)?;
        self.status = Status::Completed;
        self.completed_at = Some(at);
        self.completed_by = Some(actor);
        self.updated_at = at;
        Ok(())
    }

    pub fn mark_cancelled(&mut self, at: DateTime<Utc>) -> Result<(), CoreError> {
        self.check_transition(Status::Cancelled)?;
        self.status = Status::Cancelled;
        self.updated_at = at;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    pub assigned_to: AssignedTo,
    pub created_by: i64,
}

impl CreateTask {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.title.trim().is_empty() {
            return Err(CoreError::InvalidInput("task title is empty".into()));
        }
        if let Some(due) = self.due_date.as_deref() {
            let day = due.split('T').next().unwrap_or_default();
            if NaiveDate::parse_from_str(day, "%Y-%m-%d").is_err() {
                return Err(CoreError::InvalidInput(format!("bad due date: {due}")));
            }
        }
        Ok(())
    }
}

/// Partial update of the editable columns. Nullable columns use
/// `Option<Option<_>>` so that "leave alone" and "set to null" stay
/// distinct. Status and completion fields are not editable; they only move
/// through a [`StatusChange`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateTask {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<AssignedTo>,
}

impl UpdateTask {
    pub fn apply(&self, task: &mut Task, at: DateTime<Utc>) {
        if let Some(ref title) = self.title {
            task.title = title.clone();
        }
        if let Some(ref description) = self.description {
            task.description = description.clone();
        }
        if let Some(ref due_date) = self.due_date {
            task.due_date = due_date.clone();
        }
        if let Some(assigned_to) = self.assigned_to {
            task.assigned_to = assigned_to;
        }
        task.updated_at = at;
    }
}

/// Wire patch for a pending task's one-way move to a terminal status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusChange {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_by: Option<i64>,
}

impl StatusChange {
    pub fn completion(actor: i64, at: DateTime<Utc>) -> Self {
        Self {
            status: Status::Completed,
            completed_at: Some(at),
            completed_by: Some(actor),
        }
    }

    pub fn cancellation() -> Self {
        Self {
            status: Status::Cancelled,
            completed_at: None,
            completed_by: None,
        }
    }
}
