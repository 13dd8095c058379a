use thiserror::Error;

use crate::task::Status;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("task {id} cannot move from {from} to {to}")]
    InvalidTransition { id: i64, from: Status, to: Status },
}
