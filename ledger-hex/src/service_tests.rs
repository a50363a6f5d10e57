//! PaymentService unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use ledger_types::{
        Account, AccountId, AppError, BalanceAdjustment, Caller, ConflictKind,
        CreatePaymentRequest, Currency, DomainError, LedgerRepository, Payment, PaymentId,
        PaymentMethod, PaymentStatus, PaymentSystem, RepoError, Role, Scope, Settlement, UserId,
    };

    use crate::PaymentService;

    #[derive(Default, Clone)]
    struct State {
        accounts: HashMap<AccountId, Account>,
        payments: HashMap<PaymentId, Payment>,
    }

    /// In-memory repository for testing the service layer.
    ///
    /// Each atomic unit works on a copy of the state under one lock and
    /// swaps it in only when every step succeeded.
    pub struct MockRepo {
        state: Mutex<State>,
        fail_reads: bool,
    }

    impl MockRepo {
        pub fn new() -> Self {
            Self {
                state: Mutex::new(State::default()),
                fail_reads: false,
            }
        }

        fn broken() -> Self {
            Self {
                state: Mutex::new(State::default()),
                fail_reads: true,
            }
        }

        /// Credits `amount` straight onto an account.
        fn fund(&self, id: AccountId, amount: i64) {
            let mut state = self.state.lock().unwrap();
            let account = state.accounts.get_mut(&id).unwrap();
            account.apply(&BalanceAdjustment::new(id, amount, 0)).unwrap();
        }

        fn owns(state: &State, owner: UserId, account_id: AccountId) -> bool {
            state
                .accounts
                .get(&account_id)
                .is_some_and(|a| a.owner_id == owner)
        }

        fn visible(state: &State, scope: Scope, payment: &Payment) -> bool {
            match scope {
                Scope::All => true,
                Scope::Owner(owner) => {
                    Self::owns(state, owner, payment.payer_id)
                        || Self::owns(state, owner, payment.payee_id)
                }
            }
        }
    }

    #[async_trait]
    impl LedgerRepository for MockRepo {
        async fn create_account(
            &self,
            owner_id: UserId,
            currency: Currency,
        ) -> Result<Account, RepoError> {
            let account = Account::new(owner_id, currency);
            self.state
                .lock()
                .unwrap()
                .accounts
                .insert(account.id, account.clone());
            Ok(account)
        }

        async fn get_account(&self, id: AccountId) -> Result<Option<Account>, RepoError> {
            Ok(self.state.lock().unwrap().accounts.get(&id).cloned())
        }

        async fn list_accounts(&self, scope: Scope) -> Result<Vec<Account>, RepoError> {
            if self.fail_reads {
                return Err(RepoError::Database("connection reset by peer".into()));
            }
            let state = self.state.lock().unwrap();
            Ok(state
                .accounts
                .values()
                .filter(|a| match scope {
                    Scope::All => true,
                    Scope::Owner(owner) => a.owner_id == owner,
                })
                .cloned()
                .collect())
        }

        async fn get_payment(
            &self,
            id: PaymentId,
            scope: Scope,
        ) -> Result<Option<Payment>, RepoError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .payments
                .get(&id)
                .filter(|p| Self::visible(&state, scope, p))
                .cloned())
        }

        async fn list_payments(&self, scope: Scope) -> Result<Vec<Payment>, RepoError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .payments
                .values()
                .filter(|p| Self::visible(&state, scope, p))
                .cloned()
                .collect())
        }

        async fn open_payment(&self, payment: &Payment) -> Result<(), RepoError> {
            let mut guard = self.state.lock().unwrap();
            let mut next = guard.clone();

            let payer = next
                .accounts
                .get_mut(&payment.payer_id)
                .ok_or(DomainError::PayerNotFound(payment.payer_id))?;
            if let Some(hold) = payment.opening_hold() {
                if payer.net_balance() < hold.reserved_delta {
                    return Err(DomainError::InsufficientNetBalance {
                        available: payer.net_balance(),
                        requested: hold.reserved_delta,
                    }
                    .into());
                }
                payer.apply(&hold)?;
            }
            if !next.accounts.contains_key(&payment.payee_id) {
                return Err(DomainError::PayeeNotFound(payment.payee_id).into());
            }
            next.payments.insert(payment.id, payment.clone());

            *guard = next;
            Ok(())
        }

        async fn settle_payment(&self, settlement: &Settlement) -> Result<u64, RepoError> {
            let mut guard = self.state.lock().unwrap();
            let mut next = guard.clone();

            let payment = next
                .payments
                .get_mut(&settlement.payment_id)
                .ok_or(RepoError::NotFound)?;
            if payment.status != settlement.expected {
                return Ok(0);
            }
            payment.status = settlement.target;

            for adjustment in &settlement.adjustments {
                let account = next
                    .accounts
                    .get_mut(&adjustment.account_id)
                    .ok_or(DomainError::AccountNotFound(adjustment.account_id))?;
                account.apply(adjustment)?;
            }

            *guard = next;
            Ok(1)
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Fixtures
    // ─────────────────────────────────────────────────────────────────────────

    struct World {
        service: PaymentService<MockRepo>,
        back_office: Caller,
        alice: Caller,
        bob: Caller,
        a: AccountId,
        b: AccountId,
    }

    /// Alice owns `a` with balance 100.00, Bob owns the empty `b`.
    async fn world() -> World {
        let service = PaymentService::new(MockRepo::new());
        let alice = Caller::new(UserId::new(), Role::Restricted);
        let bob = Caller::new(UserId::new(), Role::Restricted);

        let a = service
            .create_account(alice.user_id, Currency::USD)
            .await
            .unwrap()
            .id;
        let b = service
            .create_account(bob.user_id, Currency::USD)
            .await
            .unwrap()
            .id;
        service.repo().fund(a, 10_000);

        World {
            service,
            back_office: Caller::new(UserId::new(), Role::Privileged),
            alice,
            bob,
            a,
            b,
        }
    }

    fn transfer(payer: AccountId, payee: AccountId, amount: i64) -> CreatePaymentRequest {
        CreatePaymentRequest {
            payer_id: payer,
            payee_id: payee,
            payment_system: PaymentSystem::Internal,
            payment_method: PaymentMethod::Pmb,
            amount,
            currency: Currency::USD,
            comment: None,
        }
    }

    fn card_payment(payer: AccountId, payee: AccountId, amount: i64) -> CreatePaymentRequest {
        CreatePaymentRequest {
            payment_system: PaymentSystem::Ingenico,
            payment_method: PaymentMethod::MasterCard,
            ..transfer(payer, payee, amount)
        }
    }

    async fn balances(service: &PaymentService<MockRepo>, id: AccountId) -> (i64, i64) {
        let account = service.repo().get_account(id).await.unwrap().unwrap();
        assert_eq!(account.net_balance(), account.balance() - account.reserved());
        assert!(account.reserved() >= 0);
        (account.balance(), account.reserved())
    }

    async fn status(service: &PaymentService<MockRepo>, id: PaymentId) -> PaymentStatus {
        service
            .repo()
            .get_payment(id, Scope::All)
            .await
            .unwrap()
            .unwrap()
            .status
    }

    fn first_path(err: &AppError) -> Vec<String> {
        match err {
            AppError::Validation(details) => details[0].path.clone(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accounts
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_create_account_starts_empty() {
        let service = PaymentService::new(MockRepo::new());
        let owner = UserId::new();

        let account = service.create_account(owner, Currency::EUR).await.unwrap();

        assert_eq!(account.owner_id, owner);
        assert_eq!(account.balance(), 0);
        assert_eq!(account.reserved(), 0);
        assert!(account.enabled);
    }

    #[tokio::test]
    async fn test_list_accounts_is_scoped() {
        let w = world().await;

        assert_eq!(w.service.list_accounts(&w.back_office).await.unwrap().len(), 2);

        let mine = w.service.list_accounts(&w.alice).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, w.a);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Create
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_create_transfer_reserves_amount() {
        let w = world().await;

        let payment = w
            .service
            .create_payment(&w.alice, transfer(w.a, w.b, 4_000))
            .await
            .unwrap();

        assert_eq!(payment.status, PaymentStatus::Created);
        assert_eq!(balances(&w.service, w.a).await, (10_000, 4_000));
        assert_eq!(balances(&w.service, w.b).await, (0, 0));
    }

    #[tokio::test]
    async fn test_create_transfer_over_net_balance_fails() {
        let w = world().await;

        let err = w
            .service
            .create_payment(&w.alice, transfer(w.a, w.b, 15_000))
            .await
            .unwrap_err();

        assert_eq!(first_path(&err), vec!["netBalance".to_string()]);
        assert_eq!(balances(&w.service, w.a).await, (10_000, 0));
        assert!(w.service.list_payments(&w.back_office).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_counts_existing_holds() {
        let w = world().await;
        w.service
            .create_payment(&w.alice, transfer(w.a, w.b, 7_000))
            .await
            .unwrap();

        let err = w
            .service
            .create_payment(&w.alice, transfer(w.a, w.b, 4_000))
            .await
            .unwrap_err();

        assert_eq!(first_path(&err), vec!["netBalance".to_string()]);
        assert_eq!(balances(&w.service, w.a).await, (10_000, 7_000));
    }

    #[tokio::test]
    async fn test_create_non_positive_amount_fails() {
        let w = world().await;

        for amount in [0, -100] {
            let err = w
                .service
                .create_payment(&w.alice, transfer(w.a, w.b, amount))
                .await
                .unwrap_err();
            assert_eq!(first_path(&err), vec!["amount".to_string()]);
            assert_eq!(
                err.to_string(),
                "'amount' field value must be greater than zero"
            );
        }
    }

    #[tokio::test]
    async fn test_client_cannot_pay_from_foreign_account() {
        let w = world().await;

        let err = w
            .service
            .create_payment(&w.bob, transfer(w.a, w.b, 100))
            .await
            .unwrap_err();

        assert_eq!(first_path(&err), vec!["payerId".to_string()]);
        assert_eq!(err.to_string(), "'payerId' is not one of your accounts");
        assert_eq!(balances(&w.service, w.a).await, (10_000, 0));
    }

    #[tokio::test]
    async fn test_back_office_may_pay_from_any_account() {
        let w = world().await;

        let payment = w
            .service
            .create_payment(&w.back_office, transfer(w.a, w.b, 100))
            .await
            .unwrap();

        assert_eq!(payment.payer_id, w.a);
        assert_eq!(balances(&w.service, w.a).await, (10_000, 100));
    }

    #[tokio::test]
    async fn test_create_external_skips_balance_check() {
        let w = world().await;

        // Bob's account is empty; a card payment still records.
        let payment = w
            .service
            .create_payment(&w.bob, card_payment(w.b, w.a, 50_000))
            .await
            .unwrap();

        assert_eq!(payment.status, PaymentStatus::Created);
        assert_eq!(balances(&w.service, w.b).await, (0, 0));
    }

    #[tokio::test]
    async fn test_create_to_unknown_payee_fails() {
        let w = world().await;

        let err = w
            .service
            .create_payment(&w.alice, transfer(w.a, AccountId::new(), 100))
            .await
            .unwrap_err();

        assert_eq!(first_path(&err), vec!["payeeId".to_string()]);
        assert_eq!(balances(&w.service, w.a).await, (10_000, 0));
    }

    #[tokio::test]
    async fn test_transfer_to_same_account_fails() {
        let w = world().await;

        let err = w
            .service
            .create_payment(&w.alice, transfer(w.a, w.a, 100))
            .await
            .unwrap_err();

        assert_eq!(first_path(&err), vec!["payeeId".to_string()]);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Approve
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_approve_transfer_then_approve_again() {
        let w = world().await;
        let payment = w
            .service
            .create_payment(&w.alice, transfer(w.a, w.b, 4_000))
            .await
            .unwrap();
        assert_eq!(balances(&w.service, w.a).await, (10_000, 4_000));

        w.service
            .approve_payment(&w.back_office, payment.id)
            .await
            .unwrap();

        assert_eq!(balances(&w.service, w.a).await, (6_000, 0));
        assert_eq!(balances(&w.service, w.b).await, (4_000, 0));
        assert_eq!(status(&w.service, payment.id).await, PaymentStatus::Approved);

        w.service
            .approve_payment(&w.back_office, payment.id)
            .await
            .unwrap();

        assert_eq!(balances(&w.service, w.a).await, (6_000, 0));
        assert_eq!(balances(&w.service, w.b).await, (4_000, 0));
    }

    #[tokio::test]
    async fn test_approve_external_credits_payee_only() {
        let w = world().await;
        let payment = w
            .service
            .create_payment(&w.bob, card_payment(w.b, w.a, 2_500))
            .await
            .unwrap();

        w.service
            .approve_payment(&w.back_office, payment.id)
            .await
            .unwrap();

        assert_eq!(balances(&w.service, w.a).await, (12_500, 0));
        assert_eq!(balances(&w.service, w.b).await, (0, 0));
    }

    #[tokio::test]
    async fn test_approve_cancelled_payment_conflicts() {
        let w = world().await;
        let payment = w
            .service
            .create_payment(&w.alice, transfer(w.a, w.b, 4_000))
            .await
            .unwrap();
        w.service.cancel_payment(&w.alice, payment.id).await.unwrap();

        let result = w.service.approve_payment(&w.back_office, payment.id).await;

        assert!(matches!(
            result,
            Err(AppError::Conflict(ConflictKind::CannotApprove))
        ));
        assert_eq!(balances(&w.service, w.a).await, (10_000, 0));
        assert_eq!(balances(&w.service, w.b).await, (0, 0));
        assert_eq!(status(&w.service, payment.id).await, PaymentStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_approve_unknown_payment_fails() {
        let w = world().await;

        let err = w
            .service
            .approve_payment(&w.back_office, PaymentId::new())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Payment not exists");
        assert_eq!(first_path(&err), vec!["paymentId".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_approvals_settle_once() {
        let w = world().await;
        let payment = w
            .service
            .create_payment(&w.alice, transfer(w.a, w.b, 4_000))
            .await
            .unwrap();
        let service = Arc::new(w.service);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            let caller = w.back_office;
            handles.push(tokio::spawn(async move {
                service.approve_payment(&caller, payment.id).await
            }));
        }

        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) | Err(AppError::Conflict(ConflictKind::CannotApprove)) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(balances(&service, w.a).await, (6_000, 0));
        assert_eq!(balances(&service, w.b).await, (4_000, 0));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cancel
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_cancel_transfer_releases_hold_then_cancel_again() {
        let w = world().await;
        let payment = w
            .service
            .create_payment(&w.alice, transfer(w.a, w.b, 4_000))
            .await
            .unwrap();

        w.service.cancel_payment(&w.alice, payment.id).await.unwrap();

        assert_eq!(balances(&w.service, w.a).await, (10_000, 0));
        assert_eq!(status(&w.service, payment.id).await, PaymentStatus::Cancelled);

        w.service.cancel_payment(&w.alice, payment.id).await.unwrap();
        assert_eq!(balances(&w.service, w.a).await, (10_000, 0));
    }

    #[tokio::test]
    async fn test_cancel_approved_payment_conflicts() {
        let w = world().await;
        let payment = w
            .service
            .create_payment(&w.alice, transfer(w.a, w.b, 4_000))
            .await
            .unwrap();
        w.service
            .approve_payment(&w.back_office, payment.id)
            .await
            .unwrap();

        let result = w.service.cancel_payment(&w.alice, payment.id).await;

        assert!(matches!(
            result,
            Err(AppError::Conflict(ConflictKind::CannotCancel))
        ));
        assert_eq!(balances(&w.service, w.a).await, (6_000, 0));
        assert_eq!(balances(&w.service, w.b).await, (4_000, 0));
    }

    #[tokio::test]
    async fn test_cancel_external_has_no_balance_effect() {
        let w = world().await;
        let payment = w
            .service
            .create_payment(&w.bob, card_payment(w.b, w.a, 2_500))
            .await
            .unwrap();

        w.service.cancel_payment(&w.bob, payment.id).await.unwrap();

        assert_eq!(balances(&w.service, w.a).await, (10_000, 0));
        assert_eq!(balances(&w.service, w.b).await, (0, 0));
        assert_eq!(status(&w.service, payment.id).await, PaymentStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_stranger_cannot_see_or_cancel_payment() {
        let w = world().await;
        let payment = w
            .service
            .create_payment(&w.alice, transfer(w.a, w.b, 4_000))
            .await
            .unwrap();
        let stranger = Caller::new(UserId::new(), Role::Restricted);

        let err = w
            .service
            .cancel_payment(&stranger, payment.id)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Payment not exists");
        assert_eq!(balances(&w.service, w.a).await, (10_000, 4_000));
        assert_eq!(status(&w.service, payment.id).await, PaymentStatus::Created);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_payment_reads_are_scoped() {
        let w = world().await;
        let payment = w
            .service
            .create_payment(&w.alice, transfer(w.a, w.b, 100))
            .await
            .unwrap();
        let stranger = Caller::new(UserId::new(), Role::Restricted);

        for caller in [&w.alice, &w.bob, &w.back_office] {
            assert_eq!(w.service.list_payments(caller).await.unwrap().len(), 1);
            let seen = w.service.get_payment(caller, payment.id).await.unwrap();
            assert_eq!(seen.id, payment.id);
        }

        assert!(w.service.list_payments(&stranger).await.unwrap().is_empty());
        let err = w
            .service
            .get_payment(&stranger, payment.id)
            .await
            .unwrap_err();
        assert_eq!(first_path(&err), vec!["paymentId".to_string()]);
    }

    #[tokio::test]
    async fn test_storage_failure_is_internal() {
        let service = PaymentService::new(MockRepo::broken());
        let caller = Caller::new(UserId::new(), Role::Privileged);

        let err = service.list_accounts(&caller).await.unwrap_err();

        assert!(err.is_internal());
    }
}
