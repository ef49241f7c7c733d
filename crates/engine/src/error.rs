//! The module contains the errors the engine can raise.
//!
//! Validation errors ([`InvalidAmount`], [`InvalidAccount`]) are raised before
//! any mutation. [`InsufficientFunds`] and [`AmountOutOfRange`] abort the
//! atomic unit they occur in. [`Busy`] is the only retryable class.
//!
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`InvalidAccount`]: EngineError::InvalidAccount
//!  [`InsufficientFunds`]: EngineError::InsufficientFunds
//!  [`AmountOutOfRange`]: EngineError::AmountOutOfRange
//!  [`Busy`]: EngineError::Busy
use sea_orm::{ConnAcquireErr, DbErr};
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid account or currency: {0}")]
    InvalidAccount(String),
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("Amount out of range: {0}")]
    AmountOutOfRange(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Ledger busy, retry later: {0}")]
    Busy(String),
    #[error(transparent)]
    Database(DbErr),
}

impl From<DbErr> for EngineError {
    /// Classifies database errors so that lock contention surfaces as the
    /// retryable [`EngineError::Busy`] instead of a generic store failure.
    fn from(err: DbErr) -> Self {
        match err {
            DbErr::ConnectionAcquire(ConnAcquireErr::Timeout) => {
                Self::Busy("timed out waiting for a database connection".to_string())
            }
            err if err.to_string().contains("database is locked") => Self::Busy(err.to_string()),
            err => Self::Database(err),
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidAccount(a), Self::InvalidAccount(b)) => a == b,
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::AmountOutOfRange(a), Self::AmountOutOfRange(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::Busy(a), Self::Busy(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
