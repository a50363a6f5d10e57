//! Payment domain model and its state machine.
//!
//! A payment is born `Created` and leaves that state exactly once, to
//! `Approved` or `Cancelled`. The functions here are pure: they decide
//! which transition is legal and which balance adjustments must commit
//! atomically with it. Storage adapters carry those decisions out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::account::AccountId;
use super::money::Money;
use crate::error::{ConflictKind, DomainError};

pub const MAX_COMMENT_LEN: usize = 100;

uuid_id!(
    /// Unique identifier for a Payment.
    PaymentId
);

/// Rail a payment is settled through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum PaymentSystem {
    /// Funds move between two accounts of this ledger.
    Internal,
    Ingenico,
    YandexMoney,
}

impl PaymentSystem {
    pub fn is_internal(&self) -> bool {
        matches!(self, PaymentSystem::Internal)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentSystem::Internal => "internal",
            PaymentSystem::Ingenico => "ingenico",
            PaymentSystem::YandexMoney => "yandexMoney",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "internal" => Some(PaymentSystem::Internal),
            "ingenico" => Some(PaymentSystem::Ingenico),
            "yandexMoney" => Some(PaymentSystem::YandexMoney),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Pmb,
    MasterCard,
    VisaCard,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Pmb => "pmb",
            PaymentMethod::MasterCard => "mastercard",
            PaymentMethod::VisaCard => "visacard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pmb" => Some(PaymentMethod::Pmb),
            "mastercard" => Some(PaymentMethod::MasterCard),
            "visacard" => Some(PaymentMethod::VisaCard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Created,
    Approved,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Created => "created",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(PaymentStatus::Created),
            "approved" => Some(PaymentStatus::Approved),
            "cancelled" => Some(PaymentStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Created)
    }

    /// Only `Created -> Approved` and `Created -> Cancelled` exist.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Created, PaymentStatus::Approved)
                | (PaymentStatus::Created, PaymentStatus::Cancelled)
        )
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two ways a `Created` payment can be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Approve,
    Cancel,
}

impl Resolution {
    pub fn target(&self) -> PaymentStatus {
        match self {
            Resolution::Approve => PaymentStatus::Approved,
            Resolution::Cancel => PaymentStatus::Cancelled,
        }
    }

    /// Error reported when the guarded transition matches nothing.
    pub fn conflict(&self) -> ConflictKind {
        match self {
            Resolution::Approve => ConflictKind::CannotApprove,
            Resolution::Cancel => ConflictKind::CannotCancel,
        }
    }
}

/// Signed change to one account's `balance` and `reserved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceAdjustment {
    pub account_id: AccountId,
    pub balance_delta: i64,
    pub reserved_delta: i64,
}

impl BalanceAdjustment {
    pub fn new(account_id: AccountId, balance_delta: i64, reserved_delta: i64) -> Self {
        Self {
            account_id,
            balance_delta,
            reserved_delta,
        }
    }
}

/// Everything that must commit in one atomic scope to resolve a payment:
/// the compare-and-swap on the status and the balance adjustments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub payment_id: PaymentId,
    pub expected: PaymentStatus,
    pub target: PaymentStatus,
    pub adjustments: Vec<BalanceAdjustment>,
}

impl Settlement {
    /// Account ids touched, sorted and deduplicated. Adapters lock rows in
    /// this order.
    pub fn account_ids(&self) -> Vec<AccountId> {
        let mut ids: Vec<AccountId> = self.adjustments.iter().map(|a| a.account_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

/// A recorded payment between two ledger accounts or from an external rail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub payer_id: AccountId,
    pub payee_id: AccountId,
    pub payment_system: PaymentSystem,
    pub payment_method: PaymentMethod,
    pub amount: Money,
    pub comment: Option<String>,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a new payment in status `Created`.
    ///
    /// # Validation
    /// - amount must be greater than zero
    /// - an internal transfer cannot pay into its own payer account
    /// - comment is at most 100 characters
    pub fn new(
        payer_id: AccountId,
        payee_id: AccountId,
        payment_system: PaymentSystem,
        payment_method: PaymentMethod,
        amount: Money,
        comment: Option<String>,
    ) -> Result<Self, DomainError> {
        if amount.is_zero() {
            return Err(DomainError::NonPositiveAmount(amount.amount()));
        }
        if payment_system.is_internal() && payer_id == payee_id {
            return Err(DomainError::SameAccountTransfer(payer_id));
        }
        if let Some(text) = &comment {
            let len = text.chars().count();
            if len > MAX_COMMENT_LEN {
                return Err(DomainError::CommentTooLong(len));
            }
        }

        let now = Utc::now();
        Ok(Self {
            id: PaymentId::new(),
            payer_id,
            payee_id,
            payment_system,
            payment_method,
            amount,
            comment,
            status: PaymentStatus::Created,
            created_at: now,
            updated_at: now,
        })
    }

    /// Reconstructs a payment from stored fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: PaymentId,
        payer_id: AccountId,
        payee_id: AccountId,
        payment_system: PaymentSystem,
        payment_method: PaymentMethod,
        amount: Money,
        comment: Option<String>,
        status: PaymentStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            payer_id,
            payee_id,
            payment_system,
            payment_method,
            amount,
            comment,
            status,
            created_at,
            updated_at,
        }
    }

    pub fn is_internal(&self) -> bool {
        self.payment_system.is_internal()
    }

    /// Hold placed on the payer when an internal transfer is created.
    ///
    /// External payments reserve nothing: their funds never sat in a
    /// ledger account.
    pub fn opening_hold(&self) -> Option<BalanceAdjustment> {
        self.is_internal()
            .then(|| BalanceAdjustment::new(self.payer_id, 0, self.amount.amount()))
    }

    /// Guarded transition and balance effects for `resolution`.
    ///
    /// The guard always expects `Created`; whether the stored row still
    /// matches is for the adapter's conditional update to decide.
    ///
    /// Approving an external payment credits the payee without any
    /// precondition on the payer: external funds are assumed to have been
    /// received by the time a back-office caller approves.
    pub fn settlement(&self, resolution: Resolution) -> Settlement {
        let amount = self.amount.amount();
        let adjustments = match (resolution, self.is_internal()) {
            (Resolution::Approve, true) => vec![
                BalanceAdjustment::new(self.payer_id, -amount, -amount),
                BalanceAdjustment::new(self.payee_id, amount, 0),
            ],
            (Resolution::Approve, false) => vec![BalanceAdjustment::new(self.payee_id, amount, 0)],
            (Resolution::Cancel, true) => vec![BalanceAdjustment::new(self.payer_id, 0, -amount)],
            (Resolution::Cancel, false) => Vec::new(),
        };

        Settlement {
            payment_id: self.id,
            expected: PaymentStatus::Created,
            target: resolution.target(),
            adjustments,
        }
    }
}
