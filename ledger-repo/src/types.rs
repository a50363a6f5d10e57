//! Database row types and their conversion into domain values.
//!
//! SQLite stores ids and timestamps as TEXT; PostgreSQL uses native UUID
//! and TIMESTAMPTZ columns. Each backend gets its own row module so both
//! features can be enabled in one build.

use ledger_types::{
    Currency, Money, PaymentMethod, PaymentStatus, PaymentSystem, RepoError, Role,
};

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn parse_currency(s: &str) -> Result<Currency, RepoError> {
    Currency::from_code(s).ok_or_else(|| RepoError::Database(format!("Unknown currency: {}", s)))
}

pub fn parse_status(s: &str) -> Result<PaymentStatus, RepoError> {
    PaymentStatus::parse(s)
        .ok_or_else(|| RepoError::Database(format!("Unknown payment status: {}", s)))
}

pub fn parse_system(s: &str) -> Result<PaymentSystem, RepoError> {
    PaymentSystem::parse(s)
        .ok_or_else(|| RepoError::Database(format!("Unknown payment system: {}", s)))
}

pub fn parse_method(s: &str) -> Result<PaymentMethod, RepoError> {
    PaymentMethod::parse(s)
        .ok_or_else(|| RepoError::Database(format!("Unknown payment method: {}", s)))
}

pub fn parse_role(s: &str) -> Result<Role, RepoError> {
    Role::parse(s).ok_or_else(|| RepoError::Database(format!("Unknown role: {}", s)))
}

pub fn parse_money(amount: i64, currency: &str) -> Result<Money, RepoError> {
    Money::new(amount, parse_currency(currency)?).map_err(RepoError::Domain)
}

// ─────────────────────────────────────────────────────────────────────────────
// SQLite rows
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "sqlite")]
pub mod sqlite {
    use chrono::{DateTime, Utc};
    use sqlx::FromRow;
    use uuid::Uuid;

    use ledger_types::{
        Account, AccountId, ApiKey, ApiKeyId, Payment, PaymentId, RepoError, Scope, UserId,
    };

    use super::{parse_currency, parse_method, parse_money, parse_role, parse_status, parse_system};

    pub fn parse_uuid(s: &str) -> Result<Uuid, RepoError> {
        Uuid::parse_str(s).map_err(|e| RepoError::Database(e.to_string()))
    }

    pub fn parse_time(s: &str) -> Result<DateTime<Utc>, RepoError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| RepoError::Database(e.to_string()))
    }

    /// Owner filter bound into scoped queries; `NULL` matches everything.
    pub fn owner_filter(scope: Scope) -> Option<String> {
        match scope {
            Scope::All => None,
            Scope::Owner(user) => Some(user.to_string()),
        }
    }

    #[derive(FromRow)]
    pub struct DbAccount {
        pub id: String,
        pub owner_id: String,
        pub balance: i64,
        pub reserved: i64,
        pub currency: String,
        pub enabled: bool,
        pub created_at: String,
        pub updated_at: String,
    }

    impl DbAccount {
        pub fn into_domain(self) -> Result<Account, RepoError> {
            Account::from_parts(
                AccountId::from_uuid(parse_uuid(&self.id)?),
                UserId::from_uuid(parse_uuid(&self.owner_id)?),
                self.balance,
                self.reserved,
                parse_currency(&self.currency)?,
                self.enabled,
                parse_time(&self.created_at)?,
                parse_time(&self.updated_at)?,
            )
            .map_err(RepoError::Domain)
        }
    }

    #[derive(FromRow)]
    pub struct DbPayment {
        pub id: String,
        pub payer_id: String,
        pub payee_id: String,
        pub payment_system: String,
        pub payment_method: String,
        pub amount: i64,
        pub currency: String,
        pub comment: Option<String>,
        pub status: String,
        pub created_at: String,
        pub updated_at: String,
    }

    impl DbPayment {
        pub fn into_domain(self) -> Result<Payment, RepoError> {
            Ok(Payment::from_parts(
                PaymentId::from_uuid(parse_uuid(&self.id)?),
                AccountId::from_uuid(parse_uuid(&self.payer_id)?),
                AccountId::from_uuid(parse_uuid(&self.payee_id)?),
                parse_system(&self.payment_system)?,
                parse_method(&self.payment_method)?,
                parse_money(self.amount, &self.currency)?,
                self.comment,
                parse_status(&self.status)?,
                parse_time(&self.created_at)?,
                parse_time(&self.updated_at)?,
            ))
        }
    }

    #[derive(FromRow)]
    pub struct DbApiKey {
        pub id: String,
        pub name: String,
        pub key_hash: String,
        pub user_id: String,
        pub role: String,
        pub is_active: bool,
        pub created_at: String,
    }

    impl DbApiKey {
        pub fn into_domain(self) -> Result<ApiKey, RepoError> {
            Ok(ApiKey {
                id: ApiKeyId::from_uuid(parse_uuid(&self.id)?),
                name: self.name,
                key_hash: self.key_hash,
                user_id: UserId::from_uuid(parse_uuid(&self.user_id)?),
                role: parse_role(&self.role)?,
                is_active: self.is_active,
                created_at: parse_time(&self.created_at)?,
            })
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL rows
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "postgres")]
pub mod pg {
    use chrono::{DateTime, Utc};
    use sqlx::FromRow;
    use uuid::Uuid;

    use ledger_types::{
        Account, AccountId, ApiKey, ApiKeyId, Payment, PaymentId, RepoError, Scope, UserId,
    };

    use super::{parse_currency, parse_method, parse_money, parse_role, parse_status, parse_system};

    /// Owner filter bound into scoped queries; `NULL` matches everything.
    pub fn owner_filter(scope: Scope) -> Option<Uuid> {
        match scope {
            Scope::All => None,
            Scope::Owner(user) => Some(user.into_uuid()),
        }
    }

    #[derive(FromRow)]
    pub struct DbAccount {
        pub id: Uuid,
        pub owner_id: Uuid,
        pub balance: i64,
        pub reserved: i64,
        pub currency: String,
        pub enabled: bool,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    impl DbAccount {
        pub fn into_domain(self) -> Result<Account, RepoError> {
            Account::from_parts(
                AccountId::from_uuid(self.id),
                UserId::from_uuid(self.owner_id),
                self.balance,
                self.reserved,
                parse_currency(&self.currency)?,
                self.enabled,
                self.created_at,
                self.updated_at,
            )
            .map_err(RepoError::Domain)
        }
    }

    #[derive(FromRow)]
    pub struct DbPayment {
        pub id: Uuid,
        pub payer_id: Uuid,
        pub payee_id: Uuid,
        pub payment_system: String,
        pub payment_method: String,
        pub amount: i64,
        pub currency: String,
        pub comment: Option<String>,
        pub status: String,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    impl DbPayment {
        pub fn into_domain(self) -> Result<Payment, RepoError> {
            Ok(Payment::from_parts(
                PaymentId::from_uuid(self.id),
                AccountId::from_uuid(self.payer_id),
                AccountId::from_uuid(self.payee_id),
                parse_system(&self.payment_system)?,
                parse_method(&self.payment_method)?,
                parse_money(self.amount, &self.currency)?,
                self.comment,
                parse_status(&self.status)?,
                self.created_at,
                self.updated_at,
            ))
        }
    }

    #[derive(FromRow)]
    pub struct DbApiKey {
        pub id: Uuid,
        pub name: String,
        pub key_hash: String,
        pub user_id: Uuid,
        pub role: String,
        pub is_active: bool,
        pub created_at: DateTime<Utc>,
    }

    impl DbApiKey {
        pub fn into_domain(self) -> Result<ApiKey, RepoError> {
            Ok(ApiKey {
                id: ApiKeyId::from_uuid(self.id),
                name: self.name,
                key_hash: self.key_hash,
                user_id: UserId::from_uuid(self.user_id),
                role: parse_role(&self.role)?,
                is_active: self.is_active,
                created_at: self.created_at,
            })
        }
    }
}
