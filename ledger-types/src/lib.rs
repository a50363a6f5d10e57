//! # Ledger Types
//!
//! Domain types and port traits for the payment ledger core.
//! This crate has no IO dependencies: data structures, the payment
//! state machine, and the trait definitions adapters implement.
//!
//! ## Architecture
//!
//! - `domain/` - Accounts, payments, money, callers and the transition rules
//! - `ports/` - Traits the storage adapters must implement
//! - `dto/` - Request/response shapes for the API boundary
//! - `error/` - Domain, repository and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

pub use domain::{
    Account, AccountId, ApiKey, ApiKeyId, BalanceAdjustment, Caller, Currency, Money, Payment,
    PaymentId, PaymentMethod, PaymentStatus, PaymentSystem, Resolution, Role, Scope, Settlement,
    UserId,
};
pub use dto::*;
pub use error::{AppError, ConflictKind, DomainError, RepoError, ValidationDetail};
pub use ports::{ApiKeyRepository, LedgerRepository};
