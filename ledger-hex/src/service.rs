//! Payment Application Service
//!
//! Orchestrates the payment state machine through the repository port.
//! Business rules that need no storage live on the domain types; this
//! layer adds the caller-dependent ones (ownership, read scoping) and
//! turns the repository's guarded-update result into conflicts.

use ledger_types::{
    Account, AppError, Caller, CreatePaymentRequest, Currency, DomainError, LedgerRepository,
    Payment, PaymentId, Resolution, Role, UserId,
};

/// Application service for the ledger core.
///
/// Generic over `R: LedgerRepository` - the adapter is injected at compile time.
pub struct PaymentService<R: LedgerRepository> {
    repo: R,
}

impl<R: LedgerRepository> PaymentService<R> {
    /// Creates a new payment service with the given repository.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Account Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Opens an account with zero balance for `owner_id`.
    #[tracing::instrument(skip(self), fields(owner_id = %owner_id, currency = %currency.code()))]
    pub async fn create_account(
        &self,
        owner_id: UserId,
        currency: Currency,
    ) -> Result<Account, AppError> {
        let account = self
            .repo
            .create_account(owner_id, currency)
            .await
            .map_err(|e| at_boundary("create_account", e.into()))?;

        tracing::info!(account_id = %account.id, "account created");
        Ok(account)
    }

    /// Accounts visible to `caller`: all of them for back office, own ones
    /// for clients.
    #[tracing::instrument(skip(self), fields(user_id = %caller.user_id, role = %caller.role))]
    pub async fn list_accounts(&self, caller: &Caller) -> Result<Vec<Account>, AppError> {
        self.repo
            .list_accounts(caller.scope())
            .await
            .map_err(|e| at_boundary("list_accounts", e.into()))
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Payment Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Creates a payment in `Created`.
    ///
    /// Internal transfers reserve the amount on the payer in the same
    /// atomic unit that records the payment.
    #[tracing::instrument(
        skip(self, req),
        fields(user_id = %caller.user_id, payer_id = %req.payer_id, amount = req.amount)
    )]
    pub async fn create_payment(
        &self,
        caller: &Caller,
        req: CreatePaymentRequest,
    ) -> Result<Payment, AppError> {
        self.open(caller, req)
            .await
            .map_err(|e| at_boundary("create_payment", e))
    }

    async fn open(&self, caller: &Caller, req: CreatePaymentRequest) -> Result<Payment, AppError> {
        let payment = req.into_payment()?;

        if caller.role == Role::Restricted {
            let owned = self
                .repo
                .get_account(payment.payer_id)
                .await?
                .is_some_and(|payer| payer.owner_id == caller.user_id);
            if !owned {
                return Err(DomainError::PayerNotOwned(payment.payer_id).into());
            }
        }

        self.repo.open_payment(&payment).await?;

        tracing::info!(
            payment_id = %payment.id,
            system = payment.payment_system.as_str(),
            amount = %payment.amount,
            "payment created"
        );
        Ok(payment)
    }

    /// Moves a `Created` payment to `Approved` and settles its funds.
    /// Approving an approved payment is a no-op.
    #[tracing::instrument(skip(self), fields(user_id = %caller.user_id, payment_id = %id))]
    pub async fn approve_payment(&self, caller: &Caller, id: PaymentId) -> Result<(), AppError> {
        self.resolve(caller, id, Resolution::Approve)
            .await
            .map_err(|e| at_boundary("approve_payment", e))
    }

    /// Moves a `Created` payment to `Cancelled` and releases its hold.
    /// Cancelling a cancelled payment is a no-op.
    #[tracing::instrument(skip(self), fields(user_id = %caller.user_id, payment_id = %id))]
    pub async fn cancel_payment(&self, caller: &Caller, id: PaymentId) -> Result<(), AppError> {
        self.resolve(caller, id, Resolution::Cancel)
            .await
            .map_err(|e| at_boundary("cancel_payment", e))
    }

    async fn resolve(
        &self,
        caller: &Caller,
        id: PaymentId,
        resolution: Resolution,
    ) -> Result<(), AppError> {
        let payment = self
            .repo
            .get_payment(id, caller.scope())
            .await?
            .ok_or(DomainError::PaymentNotFound(id))?;

        if payment.status == resolution.target() {
            tracing::debug!(status = %payment.status, "already resolved, nothing to do");
            return Ok(());
        }

        let matched = self
            .repo
            .settle_payment(&payment.settlement(resolution))
            .await?;
        if matched == 0 {
            return Err(resolution.conflict().into());
        }

        tracing::info!(payment_id = %id, status = %resolution.target(), "payment resolved");
        Ok(())
    }

    /// Payments visible to `caller`.
    #[tracing::instrument(skip(self), fields(user_id = %caller.user_id, role = %caller.role))]
    pub async fn list_payments(&self, caller: &Caller) -> Result<Vec<Payment>, AppError> {
        self.repo
            .list_payments(caller.scope())
            .await
            .map_err(|e| at_boundary("list_payments", e.into()))
    }

    /// One payment, if `caller` may see it.
    #[tracing::instrument(skip(self), fields(user_id = %caller.user_id, payment_id = %id))]
    pub async fn get_payment(&self, caller: &Caller, id: PaymentId) -> Result<Payment, AppError> {
        let found = self
            .repo
            .get_payment(id, caller.scope())
            .await
            .map_err(|e| at_boundary("get_payment", e.into()))?;

        found.ok_or_else(|| at_boundary("get_payment", DomainError::PaymentNotFound(id).into()))
    }
}

/// Logs an error leaving the core. Internal failures carry their detail
/// only into the log.
fn at_boundary(operation: &'static str, err: AppError) -> AppError {
    match &err {
        AppError::Internal(detail) => {
            tracing::error!(operation, error = %detail, "ledger operation failed");
        }
        AppError::Conflict(kind) => tracing::warn!(operation, %kind, "transition conflict"),
        other => tracing::warn!(operation, error = %other, "request rejected"),
    }
    err
}
