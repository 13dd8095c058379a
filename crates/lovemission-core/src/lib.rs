pub mod error;
pub mod mission;
pub mod session;
pub mod task;
pub mod task_history;
pub mod theme;
pub mod user;
pub mod views;

pub use error::CoreError;
pub use mission::{MissionType, ScheduledMission};
pub use session::Destination;
pub use task::{AssignedTo, Status, Task};
pub use task_history::{HistoryAction, TaskHistory};
pub use theme::{Palette, ThemeMode};
pub use user::User;
