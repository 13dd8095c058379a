use std::fmt;

/// Outcome message a screen wants shown to the user.
///
/// Write failures surface one generic message per action; the underlying
/// error only goes to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    Success(String),
    Error(String),
}

impl Alert {
    pub fn success(msg: impl Into<String>) -> Self {
        Alert::Success(msg.into())
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Alert::Error(msg.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Alert::Error(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Alert::Success(m) | Alert::Error(m) => m,
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alert::Success(m) => write!(f, "ok: {m}"),
            Alert::Error(m) => write!(f, "error: {m}"),
        }
    }
}

pub const TASK_CREATED: &str = "Task added.";
pub const TASK_CREATE_FAILED: &str = "Could not add the task.";
pub const TASK_COMPLETE_FAILED: &str = "Could not complete the task.";
pub const TASK_CANCEL_FAILED: &str = "Could not cancel the task.";
pub const MISSION_CREATED: &str = "Mission scheduled.";
pub const MISSION_CREATE_FAILED: &str = "Could not schedule the mission.";
pub const MISSION_COMPLETE_FAILED: &str = "Could not complete the mission.";
pub const NICKNAME_UPDATED: &str = "Nickname updated.";
pub const NICKNAME_UPDATE_FAILED: &str = "Could not update the nickname.";
pub const NICKNAME_EMPTY: &str = "Please enter a nickname.";
