use lovemission_service::ServiceError;
use lovemission_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("session encoding: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("{0}")]
    Precondition(String),
}
