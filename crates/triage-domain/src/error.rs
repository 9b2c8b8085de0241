use thiserror::Error;

/// The error taxonomy for ticket-system operations. Validation and
/// authorization failures are detected before any storage call; `Io`
/// covers the storage layer itself.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing/empty/oversized required field
    #[error("validation error: {0}")]
    Validation(String),

    /// Actor lacks permission for the requested ticket/message operation
    #[error("forbidden: {0}")]
    Authorization(String),

    /// Referenced ticket/message/account does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    /// No active session / invalid credentials
    #[error("authentication required: {0}")]
    Auth(String),

    /// Resource already exists (e.g. duplicate account email)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Store or file storage call failed
    #[error("storage error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, Error>;
