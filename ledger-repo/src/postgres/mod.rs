//! PostgreSQL repository adapter.
//!
//! Atomic units run at READ COMMITTED. Double resolution is prevented by
//! the conditional status update, over-commitment by the conditional
//! reservation, and settlements lock their account rows in id order
//! before adjusting them.

mod accounts;
mod payments;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};

use ledger_types::{
    Account, AccountId, ApiKey, ApiKeyRepository, Currency, DomainError, LedgerRepository,
    Payment, PaymentId, RepoError, Role, Scope, Settlement, UserId,
};

use crate::security::{generate_api_key, hash_api_key};
use crate::types::pg::DbApiKey;

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Repository
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL repository with row-level locking.
pub struct PostgresRepo {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

/// Runs all database migrations.
async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    execute_migration(
        pool,
        include_str!("../../migrations/0001_create_ledger_pg.sql"),
        "0001",
    )
    .await?;

    execute_migration(
        pool,
        include_str!("../../migrations/0002_create_api_keys_pg.sql"),
        "0002",
    )
    .await?;

    Ok(())
}

impl PostgresRepo {
    /// Creates a new PostgreSQL repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the database schema (for testing with existing pool).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        run_migrations(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))
    }

    /// Opens a transaction for one atomic unit.
    async fn begin(&self) -> Result<Transaction<'static, Postgres>, RepoError> {
        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL READ COMMITTED")
            .execute(&mut *db_tx)
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        Ok(db_tx)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ledger implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl LedgerRepository for PostgresRepo {
    async fn create_account(
        &self,
        owner_id: UserId,
        currency: Currency,
    ) -> Result<Account, RepoError> {
        let account = Account::new(owner_id, currency);

        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;
        accounts::insert(&mut conn, &account).await?;

        Ok(account)
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, RepoError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;
        accounts::get(&mut conn, id).await
    }

    async fn list_accounts(&self, scope: Scope) -> Result<Vec<Account>, RepoError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;
        accounts::list(&mut conn, scope).await
    }

    async fn get_payment(&self, id: PaymentId, scope: Scope) -> Result<Option<Payment>, RepoError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;
        payments::get_scoped(&mut conn, id, scope).await
    }

    async fn list_payments(&self, scope: Scope) -> Result<Vec<Payment>, RepoError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;
        payments::list_scoped(&mut conn, scope).await
    }

    async fn open_payment(&self, payment: &Payment) -> Result<(), RepoError> {
        let now = Utc::now();
        let mut db_tx = self.begin().await?;

        match payment.opening_hold() {
            Some(hold) => {
                let reserved =
                    accounts::reserve(&mut db_tx, hold.account_id, hold.reserved_delta, now)
                        .await?;
                if !reserved {
                    let payer = accounts::get(&mut db_tx, payment.payer_id)
                        .await?
                        .ok_or(DomainError::PayerNotFound(payment.payer_id))?;
                    return Err(DomainError::InsufficientNetBalance {
                        available: payer.net_balance(),
                        requested: hold.reserved_delta,
                    }
                    .into());
                }
            }
            None => {
                if accounts::get(&mut db_tx, payment.payer_id).await?.is_none() {
                    return Err(DomainError::PayerNotFound(payment.payer_id).into());
                }
            }
        }

        if accounts::get(&mut db_tx, payment.payee_id).await?.is_none() {
            return Err(DomainError::PayeeNotFound(payment.payee_id).into());
        }

        payments::insert(&mut db_tx, payment).await?;

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        Ok(())
    }

    async fn settle_payment(&self, settlement: &Settlement) -> Result<u64, RepoError> {
        let now = Utc::now();
        let mut db_tx = self.begin().await?;

        // Holds the payment row lock until commit; a concurrent resolve
        // blocks here and then matches zero rows.
        let matched = payments::transition(
            &mut db_tx,
            settlement.payment_id,
            settlement.expected,
            settlement.target,
            now,
        )
        .await?;

        if matched == 0 {
            return Ok(0);
        }

        accounts::lock(&mut db_tx, &settlement.account_ids()).await?;

        for adjustment in &settlement.adjustments {
            let account = accounts::adjust(&mut db_tx, adjustment, now).await?;
            tracing::debug!(
                account_id = %account.id,
                balance = account.balance(),
                reserved = account.reserved(),
                "account adjusted"
            );
        }

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        Ok(matched)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API keys
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl ApiKeyRepository for PostgresRepo {
    async fn find_active_key(&self, key_hash: &str) -> Result<Option<ApiKey>, RepoError> {
        let row: Option<DbApiKey> = sqlx::query_as(
            r#"SELECT id, name, key_hash, user_id, role, is_active, created_at
               FROM api_keys
               WHERE key_hash = $1 AND is_active = TRUE"#,
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbApiKey::into_domain).transpose()
    }

    async fn create_api_key(
        &self,
        name: &str,
        user_id: UserId,
        role: Role,
    ) -> Result<(ApiKey, String), RepoError> {
        let raw_key = generate_api_key();
        let api_key = ApiKey::new(name.to_string(), hash_api_key(&raw_key), user_id, role);

        sqlx::query(
            r#"INSERT INTO api_keys (id, name, key_hash, user_id, role, is_active, created_at)
               VALUES ($1, $2, $3, $4, $5, TRUE, $6)"#,
        )
        .bind(api_key.id.into_uuid())
        .bind(&api_key.name)
        .bind(&api_key.key_hash)
        .bind(api_key.user_id.into_uuid())
        .bind(api_key.role.as_str())
        .bind(api_key.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok((api_key, raw_key))
    }

    async fn count_api_keys(&self) -> Result<i64, RepoError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM api_keys WHERE is_active = TRUE")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(row.0)
    }
}
