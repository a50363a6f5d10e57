//! Type-safe monetary value with embedded currency.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::error::DomainError;

/// Currencies an account or payment can be denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    EUR,
    RUB,
    USD,
    CHF,
    JPY,
    CNY,
    TRY,
}

impl Currency {
    pub const ALL: [Currency; 7] = [
        Currency::EUR,
        Currency::RUB,
        Currency::USD,
        Currency::CHF,
        Currency::JPY,
        Currency::CNY,
        Currency::TRY,
    ];

    /// Number of fractional digits the ledger keeps for this currency.
    pub fn decimal_places(&self) -> u8 {
        2
    }

    /// ISO 4217 code, also used as the stored representation.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::EUR => "EUR",
            Currency::RUB => "RUB",
            Currency::USD => "USD",
            Currency::CHF => "CHF",
            Currency::JPY => "JPY",
            Currency::CNY => "CNY",
            Currency::TRY => "TRY",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Non-negative amount of money with embedded currency.
///
/// The amount is held in hundredths of the currency unit so that every
/// value with two fractional digits is represented exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: i64,
    currency: Currency,
}

impl Money {
    /// Creates a new Money value.
    pub fn new(amount: i64, currency: Currency) -> Result<Self, DomainError> {
        if amount < 0 {
            return Err(DomainError::NegativeAmount);
        }
        Ok(Self { amount, currency })
    }

    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: 0,
            currency,
        }
    }

    /// Returns the amount in hundredths.
    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:02} {}",
            self.amount / 100,
            self.amount % 100,
            self.currency
        )
    }
}
