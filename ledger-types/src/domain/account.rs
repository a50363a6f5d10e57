//! Account domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::money::Currency;
use super::payment::BalanceAdjustment;
use crate::error::DomainError;

uuid_id!(
    /// Unique identifier for an Account.
    AccountId
);

uuid_id!(
    /// Identifier of the user an account belongs to.
    UserId
);

/// A ledger account.
///
/// `balance` and `reserved` are in hundredths of `currency`. Neither is
/// writable by callers; they move only through payment transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub owner_id: UserId,
    balance: i64,
    reserved: i64,
    pub currency: Currency,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Opens an empty, enabled account.
    pub fn new(owner_id: UserId, currency: Currency) -> Self {
        let now = Utc::now();
        Self {
            id: AccountId::new(),
            owner_id,
            balance: 0,
            reserved: 0,
            currency,
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstructs an account from stored fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: AccountId,
        owner_id: UserId,
        balance: i64,
        reserved: i64,
        currency: Currency,
        enabled: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if reserved < 0 {
            return Err(DomainError::NegativeReserved(id));
        }
        Ok(Self {
            id,
            owner_id,
            balance,
            reserved,
            currency,
            enabled,
            created_at,
            updated_at,
        })
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn reserved(&self) -> i64 {
        self.reserved
    }

    /// Funds available to the owner: `balance - reserved`.
    pub fn net_balance(&self) -> i64 {
        self.balance - self.reserved
    }

    /// Applies both deltas of `adjustment`, or neither.
    pub fn apply(&mut self, adjustment: &BalanceAdjustment) -> Result<(), DomainError> {
        if adjustment.account_id != self.id {
            return Err(DomainError::AccountNotFound(adjustment.account_id));
        }

        let balance = self
            .balance
            .checked_add(adjustment.balance_delta)
            .ok_or(DomainError::AmountOverflow)?;
        let reserved = self
            .reserved
            .checked_add(adjustment.reserved_delta)
            .ok_or(DomainError::AmountOverflow)?;

        if reserved < 0 {
            return Err(DomainError::NegativeReserved(self.id));
        }

        self.balance = balance;
        self.reserved = reserved;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn funded(balance: i64) -> Account {
        let mut account = Account::new(UserId::new(), Currency::USD);
        account
            .apply(&BalanceAdjustment::new(account.id, balance, 0))
            .unwrap();
        account
    }

    #[test]
    fn test_account_creation() {
        let owner = UserId::new();
        let account = Account::new(owner, Currency::EUR);
        assert_eq!(account.owner_id, owner);
        assert_eq!(account.balance(), 0);
        assert_eq!(account.reserved(), 0);
        assert_eq!(account.currency, Currency::EUR);
        assert!(account.enabled);
    }

    #[test]
    fn test_net_balance_is_derived() {
        let mut account = funded(10_000);
        account
            .apply(&BalanceAdjustment::new(account.id, 0, 4_000))
            .unwrap();
        assert_eq!(account.net_balance(), 6_000);
        assert_eq!(account.net_balance(), account.balance() - account.reserved());
    }

    #[test]
    fn test_negative_reserved_is_rejected_and_nothing_changes() {
        let mut account = funded(500);
        let before = account.clone();

        let result = account.apply(&BalanceAdjustment::new(account.id, -100, -1));

        assert!(matches!(result, Err(DomainError::NegativeReserved(_))));
        assert_eq!(account.balance(), before.balance());
        assert_eq!(account.reserved(), before.reserved());
    }

    #[test]
    fn test_adjustment_for_another_account_is_rejected() {
        let mut account = funded(500);
        let stray = BalanceAdjustment::new(AccountId::new(), 100, 0);
        assert!(matches!(
            account.apply(&stray),
            Err(DomainError::AccountNotFound(_))
        ));
    }

    #[test]
    fn test_overflow_is_rejected() {
        let mut account = funded(i64::MAX);
        let result = account.apply(&BalanceAdjustment::new(account.id, 1, 0));
        assert!(matches!(result, Err(DomainError::AmountOverflow)));
    }

    #[test]
    fn test_from_parts_refuses_negative_reserved() {
        let now = Utc::now();
        let result = Account::from_parts(
            AccountId::new(),
            UserId::new(),
            0,
            -5,
            Currency::USD,
            true,
            now,
            now,
        );
        assert!(matches!(result, Err(DomainError::NegativeReserved(_))));
    }
}
