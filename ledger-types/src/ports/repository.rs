//! Ledger repository port.
//!
//! Adapters implement the account ledger, the payment record store and the
//! transaction coordinator behind this one trait, so that every multi-step
//! mutation runs inside a single storage transaction.

use crate::domain::{Account, AccountId, Currency, Payment, PaymentId, Scope, Settlement, UserId};
use crate::error::RepoError;

#[async_trait::async_trait]
pub trait LedgerRepository: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────────
    // Account Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Opens an account with zero balance and zero reserved.
    async fn create_account(&self, owner_id: UserId, currency: Currency)
    -> Result<Account, RepoError>;

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, RepoError>;

    async fn list_accounts(&self, scope: Scope) -> Result<Vec<Account>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Payment reads (scoped)
    // ─────────────────────────────────────────────────────────────────────────────

    /// Looks a payment up; `Scope::Owner` only sees payments whose payer or
    /// payee account the user owns.
    async fn get_payment(&self, id: PaymentId, scope: Scope)
    -> Result<Option<Payment>, RepoError>;

    async fn list_payments(&self, scope: Scope) -> Result<Vec<Payment>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Payment transitions (MUST be atomic)
    // ─────────────────────────────────────────────────────────────────────────────

    /// Persists a `Created` payment together with its opening hold.
    ///
    /// The hold is a single conditional increment of the payer's `reserved`
    /// guarded by `balance - reserved >= amount`; concurrent creates from
    /// the same payer can therefore never over-commit its funds. Fails with
    /// `DomainError::InsufficientNetBalance`, `PayerNotFound` or
    /// `PayeeNotFound` and leaves nothing behind.
    async fn open_payment(&self, payment: &Payment) -> Result<(), RepoError>;

    /// Applies `settlement` in one atomic scope: moves the payment from
    /// `expected` to `target` only if it is still `expected`, then applies
    /// every balance adjustment.
    ///
    /// Returns the number of payment rows the guarded transition matched.
    /// `0` means the status had already moved and nothing was written.
    async fn settle_payment(&self, settlement: &Settlement) -> Result<u64, RepoError>;
}
