mod auth;
mod cache;
mod http;
mod memory;
mod traits;

pub use auth::AuthSession;
pub use cache::CachedService;
pub use http::HttpService;
pub use memory::MemoryService;
pub use traits::{LoveService, ServiceError};
