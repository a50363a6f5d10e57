//! Data Transfer Objects (DTOs) for requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    Account, AccountId, ApiKeyId, Currency, Money, Payment, PaymentId, PaymentMethod,
    PaymentStatus, PaymentSystem, Role, UserId,
};
use crate::error::DomainError;

// ─────────────────────────────────────────────────────────────────────────────
// Account DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to open an account for the calling user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    #[serde(default = "default_currency")]
    pub currency: Currency,
}

fn default_currency() -> Currency {
    Currency::USD
}

/// Account as shown to callers. Amounts are in hundredths.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: AccountId,
    pub owner_id: UserId,
    #[schema(example = 10000)]
    pub balance: i64,
    #[schema(example = 4000)]
    pub reserved: i64,
    /// `balance - reserved`
    #[schema(example = 6000)]
    pub net_balance: i64,
    pub currency: Currency,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            owner_id: account.owner_id,
            balance: account.balance(),
            reserved: account.reserved(),
            net_balance: account.net_balance(),
            currency: account.currency,
            enabled: account.enabled,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Payment DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to create a payment. Shape is checked by deserialization; the
/// business rules are checked by the service.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub payer_id: AccountId,
    pub payee_id: AccountId,
    pub payment_system: PaymentSystem,
    pub payment_method: PaymentMethod,
    /// Amount in hundredths of `currency`
    #[schema(example = 4000)]
    pub amount: i64,
    pub currency: Currency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "Dinner split", max_length = 100)]
    pub comment: Option<String>,
}

impl CreatePaymentRequest {
    /// Builds the `Created` payment this request describes.
    pub fn into_payment(self) -> Result<Payment, DomainError> {
        if self.amount <= 0 {
            return Err(DomainError::NonPositiveAmount(self.amount));
        }
        let amount = Money::new(self.amount, self.currency)?;
        Payment::new(
            self.payer_id,
            self.payee_id,
            self.payment_system,
            self.payment_method,
            amount,
            self.comment,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: PaymentId,
    pub payer_id: AccountId,
    pub payee_id: AccountId,
    pub payment_system: PaymentSystem,
    pub payment_method: PaymentMethod,
    #[schema(example = 4000)]
    pub amount: i64,
    pub currency: Currency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            payer_id: payment.payer_id,
            payee_id: payment.payee_id,
            payment_system: payment.payment_system,
            payment_method: payment.payment_method,
            amount: payment.amount.amount(),
            currency: payment.amount.currency(),
            comment: payment.comment,
            status: payment.status,
            created_at: payment.created_at,
            updated_at: payment.updated_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API key DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to issue an API key.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyRequest {
    #[schema(example = "mobile-app")]
    pub name: String,
    pub role: Role,
    /// User the key acts as; a fresh user is created when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

/// Newly issued key. The raw key is returned only here.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyResponse {
    pub id: ApiKeyId,
    pub name: String,
    pub user_id: UserId,
    pub role: Role,
    #[schema(example = "sk_abc123xyz...")]
    pub api_key: String,
}
