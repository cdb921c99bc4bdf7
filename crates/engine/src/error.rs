//! The module contains the errors the ledger engine can throw.
//!
//! Every operation recovers its failures at the boundary and reports one of
//! these variants; nothing in the engine is fatal to the process. A failed
//! database commit surfaces as [`Database`] and leaves no partial effects.
//!
//! [`Database`]: LedgerError::Database
use sea_orm::DbErr;
use thiserror::Error;

/// Ledger engine custom errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("\"{0}\" not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid account kind: {0}")]
    InvalidKind(String),
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("Invalid code: {0}")]
    InvalidCode(String),
    #[error("Invalid pin: {0}")]
    InvalidPin(String),
    #[error("Incorrect pin")]
    IncorrectPin,
    #[error("Account disabled: {0}")]
    AccountDisabled(String),
    #[error("Transaction already reverted: {0}")]
    AlreadyReverted(String),
    #[error("Transaction cannot be reverted: {0}")]
    NotRevertible(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for LedgerError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidInput(a), Self::InvalidInput(b)) => a == b,
            (Self::InvalidKind(a), Self::InvalidKind(b)) => a == b,
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::InvalidCode(a), Self::InvalidCode(b)) => a == b,
            (Self::InvalidPin(a), Self::InvalidPin(b)) => a == b,
            (Self::IncorrectPin, Self::IncorrectPin) => true,
            (Self::AccountDisabled(a), Self::AccountDisabled(b)) => a == b,
            (Self::AlreadyReverted(a), Self::AlreadyReverted(b)) => a == b,
            (Self::NotRevertible(a), Self::NotRevertible(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
