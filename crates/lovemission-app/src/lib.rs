pub mod alert;
pub mod config;
pub mod context;
pub mod error;
pub mod push;
pub mod screens;
pub mod session;
pub mod theme;

pub use alert::Alert;
pub use config::AppConfig;
pub use context::AppContext;
pub use error::AppError;
pub use session::{Resolution, SessionManager};
pub use theme::ThemeState;
