use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Created,
    Completed,
    Cancelled,
    Updated,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Created => "created",
            HistoryAction::Completed => "completed",
            HistoryAction::Cancelled => "cancelled",
            HistoryAction::Updated => "updated",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "created" => Some(HistoryAction::Created),
            "completed" => Some(HistoryAction::Completed),
            "cancelled" => Some(HistoryAction::Cancelled),
            "updated" => Some(HistoryAction::Updated),
            _ => None,
        }
    }
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only audit row. Never updated or deleted by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskHistory {
    pub id: i64,
    pub task_id: i64,
    pub action: HistoryAction,
    pub user_id: i64,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskHistory {
    pub task_id: i64,
    pub action: HistoryAction,
    pub user_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl CreateTaskHistory {
    pub fn new(task_id: i64, action: HistoryAction, user_id: i64) -> Self {
        Self {
            task_id,
            action,
            user_id,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
