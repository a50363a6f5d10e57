//! Domain models for the ledger core.

#[macro_use]
mod ids;

pub mod account;
pub mod api_key;
pub mod caller;
pub mod money;
pub mod payment;

pub use account::{Account, AccountId, UserId};
pub use api_key::{ApiKey, ApiKeyId};
pub use caller::{Caller, Role, Scope};
pub use money::{Currency, Money};
pub use payment::{
    BalanceAdjustment, Payment, PaymentId, PaymentMethod, PaymentStatus, PaymentSystem, Resolution,
    Settlement,
};
