//! The module contains the errors the engine can throw.
//!
//! Errors fall in a few families:
//!
//! - validation ([`InvalidAmount`], [`SelfTransfer`], [`SelfRequest`],
//!   [`InvalidSkill`], [`InvalidTransition`], [`InvalidStatus`]);
//! - lookups ([`AccountNotFound`], [`RequestNotFound`], [`UnknownUser`]);
//! - state ([`InsufficientFunds`], [`AlreadyTerminal`], [`Unauthorized`]);
//! - completion ([`CompletionFailed`] is recoverable, while
//!   [`InconsistentCompletion`] needs an operator to reconcile);
//! - infrastructure ([`Timeout`] is the only retryable one, [`Database`]).
//!
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`SelfTransfer`]: EngineError::SelfTransfer
//!  [`SelfRequest`]: EngineError::SelfRequest
//!  [`InvalidSkill`]: EngineError::InvalidSkill
//!  [`InvalidTransition`]: EngineError::InvalidTransition
//!  [`InvalidStatus`]: EngineError::InvalidStatus
//!  [`AccountNotFound`]: EngineError::AccountNotFound
//!  [`RequestNotFound`]: EngineError::RequestNotFound
//!  [`UnknownUser`]: EngineError::UnknownUser
//!  [`InsufficientFunds`]: EngineError::InsufficientFunds
//!  [`AlreadyTerminal`]: EngineError::AlreadyTerminal
//!  [`Unauthorized`]: EngineError::Unauthorized
//!  [`CompletionFailed`]: EngineError::CompletionFailed
//!  [`InconsistentCompletion`]: EngineError::InconsistentCompletion
//!  [`Timeout`]: EngineError::Timeout
//!  [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

use crate::RequestStatus;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Cannot transfer tokens to the same account \"{0}\"")]
    SelfTransfer(String),
    #[error("Account \"{0}\" not found!")]
    AccountNotFound(String),
    #[error("Account \"{0}\" already present!")]
    AccountAlreadyExists(String),
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("Cannot request a skill from yourself")]
    SelfRequest,
    #[error("Invalid skill: {0}")]
    InvalidSkill(String),
    #[error("Unknown user \"{0}\"")]
    UnknownUser(String),
    #[error("Request \"{0}\" not found!")]
    RequestNotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Request is already {0}")]
    AlreadyTerminal(RequestStatus),
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: RequestStatus,
        to: RequestStatus,
    },
    #[error("Invalid status: {0}")]
    InvalidStatus(String),
    #[error("Failed to complete request: {0}")]
    CompletionFailed(Box<EngineError>),
    #[error(
        "request {request_id} moved {amount} tokens from \"{requester_id}\" to \
         \"{provider_id}\" but is not marked completed: {reason}"
    )]
    InconsistentCompletion {
        request_id: Uuid,
        requester_id: String,
        provider_id: String,
        amount: i64,
        reason: String,
    },
    #[error("Timed out: {0}")]
    Timeout(String),
    #[error(transparent)]
    Database(DbErr),
}

impl EngineError {
    /// Whether the same call may succeed if issued again unchanged.
    ///
    /// Only timeouts qualify, including a completion whose payment timed out.
    /// Any other [`CompletionFailed`](Self::CompletionFailed) can be retried
    /// once its cause is resolved, which is a caller decision.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::CompletionFailed(reason) => reason.is_retryable(),
            _ => false,
        }
    }

    /// The transfer failure wrapped by a `CompletionFailed`.
    pub fn completion_reason(&self) -> Option<&EngineError> {
        match self {
            Self::CompletionFailed(reason) => Some(reason),
            _ => None,
        }
    }
}

impl From<DbErr> for EngineError {
    fn from(value: DbErr) -> Self {
        match value {
            // The pool could not hand out a connection in time.
            DbErr::ConnectionAcquire(err) => Self::Timeout(err.to_string()),
            other => Self::Database(other),
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::SelfTransfer(a), Self::SelfTransfer(b)) => a == b,
            (Self::AccountNotFound(a), Self::AccountNotFound(b)) => a == b,
            (Self::AccountAlreadyExists(a), Self::AccountAlreadyExists(b)) => a == b,
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::SelfRequest, Self::SelfRequest) => true,
            (Self::InvalidSkill(a), Self::InvalidSkill(b)) => a == b,
            (Self::UnknownUser(a), Self::UnknownUser(b)) => a == b,
            (Self::RequestNotFound(a), Self::RequestNotFound(b)) => a == b,
            (Self::Unauthorized(a), Self::Unauthorized(b)) => a == b,
            (Self::AlreadyTerminal(a), Self::AlreadyTerminal(b)) => a == b,
            (
                Self::InvalidTransition { from: a, to: x },
                Self::InvalidTransition { from: b, to: y },
            ) => a == b && x == y,
            (Self::InvalidStatus(a), Self::InvalidStatus(b)) => a == b,
            (Self::CompletionFailed(a), Self::CompletionFailed(b)) => a == b,
            (
                Self::InconsistentCompletion { request_id: a, .. },
                Self::InconsistentCompletion { request_id: b, .. },
            ) => a == b,
            (Self::Timeout(a), Self::Timeout(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
