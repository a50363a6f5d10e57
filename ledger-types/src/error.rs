//! Error types for the ledger core.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use utoipa::ToSchema;

use crate::domain::{AccountId, PaymentId};

/// Domain-level errors (business rule violations and broken invariants).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Amount cannot be negative")]
    NegativeAmount,

    #[error("'amount' field value must be greater than zero")]
    NonPositiveAmount(i64),

    #[error("Not Enough Balance ('amount' greater than netBalance)")]
    InsufficientNetBalance { available: i64, requested: i64 },

    #[error("'payerId' is not one of your accounts")]
    PayerNotOwned(AccountId),

    #[error("Payer account not exists")]
    PayerNotFound(AccountId),

    #[error("Payee account not exists")]
    PayeeNotFound(AccountId),

    #[error("'payeeId' must differ from 'payerId' for an internal transfer")]
    SameAccountTransfer(AccountId),

    #[error("'comment' must be at most 100 characters, got {0}")]
    CommentTooLong(usize),

    #[error("Payment not exists")]
    PaymentNotFound(PaymentId),

    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Reserved amount of account {0} would become negative")]
    NegativeReserved(AccountId),

    #[error("Amount overflow")]
    AmountOverflow,

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl DomainError {
    /// Structured report for errors the caller can fix. `None` for broken
    /// invariants, which are internal failures.
    pub fn validation_detail(&self) -> Option<ValidationDetail> {
        let (path, value) = match self {
            DomainError::NegativeAmount => ("amount", Value::Null),
            DomainError::NonPositiveAmount(amount) => ("amount", json!(amount)),
            DomainError::InsufficientNetBalance { available, .. } => {
                ("netBalance", json!(available))
            }
            DomainError::PayerNotOwned(id) | DomainError::PayerNotFound(id) => {
                ("payerId", json!(id))
            }
            DomainError::PayeeNotFound(id) | DomainError::SameAccountTransfer(id) => {
                ("payeeId", json!(id))
            }
            DomainError::CommentTooLong(len) => ("comment", json!(len)),
            DomainError::PaymentNotFound(id) => ("paymentId", json!(id)),
            DomainError::ValidationError(_) => {
                return Some(ValidationDetail::new(self.to_string(), &[], Value::Null));
            }
            DomainError::AccountNotFound(_)
            | DomainError::NegativeReserved(_)
            | DomainError::AmountOverflow => return None,
        };
        Some(ValidationDetail::new(self.to_string(), &[path], value))
    }
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Contract violation: {0}")]
    ContractViolation(String),
}

/// One offending field of a rejected request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ValidationDetail {
    pub message: String,
    /// Path of the offending field, outermost first.
    pub path: Vec<String>,
    #[schema(value_type = Object)]
    pub value: Value,
}

impl ValidationDetail {
    pub fn new(message: impl Into<String>, path: &[&str], value: Value) -> Self {
        Self {
            message: message.into(),
            path: path.iter().map(|p| p.to_string()).collect(),
            value,
        }
    }
}

/// A resolve request that lost to an earlier, incompatible transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConflictKind {
    #[error("Cannot approve a payment that has already been cancelled")]
    CannotApprove,

    #[error("Cannot cancel a payment that has already been approved")]
    CannotCancel,
}

/// Application-level errors, mapped to HTTP statuses at the boundary.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{}", .0.first().map(|d| d.message.as_str()).unwrap_or("Validation failed"))]
    Validation(Vec<ValidationDetail>),

    #[error(transparent)]
    Conflict(#[from] ConflictKind),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Detail is for logs only; callers see an opaque message.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>, path: &[&str], value: Value) -> Self {
        AppError::Validation(vec![ValidationDetail::new(message, path, value)])
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, AppError::Internal(_))
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err.validation_detail() {
            Some(detail) => AppError::Validation(vec![detail]),
            None => AppError::Internal(err.to_string()),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(e) => e.into(),
            RepoError::NotFound => AppError::Internal("Entity not found".into()),
            RepoError::Database(e)
            | RepoError::Transaction(e)
            | RepoError::ContractViolation(e) => AppError::Internal(e),
        }
    }
}
