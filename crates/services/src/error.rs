//! Shared error types for the services crate.

use thiserror::Error;

use crate::transport::TransportError;
use storage::repository::StorageError;

/// Errors emitted by `TestEngine`.
///
/// `NotRegistered`, `EmptyTaskBank` and `NoActiveSession` are normal
/// user-visible outcomes; the engine has already told the user about them
/// by the time it returns, so callers only log. None of these are ever
/// fatal to the process.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    #[error("user is not registered")]
    NotRegistered,

    #[error("task bank is empty")]
    EmptyTaskBank,

    #[error("no active session for user")]
    NoActiveSession,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors emitted by `RegistrationService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistrationError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
