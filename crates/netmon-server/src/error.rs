use netmon_storage::error::StorageError;
use thiserror::Error;

/// Errors surfaced by the alert manager.
#[derive(Error, Debug)]
pub enum ManagerError {
    /// Input failed validation before anything was written.
    #[error("Validation: {0}")]
    Validation(String),

    /// The requested lifecycle change is not allowed from the alert's
    /// current state.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, ManagerError>;
