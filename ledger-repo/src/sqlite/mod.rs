//! SQLite repository adapter.
//!
//! Each atomic unit is one `BEGIN IMMEDIATE` transaction, so SQLite's
//! database write lock is taken before the first read and held until
//! commit. A deferred transaction that reads first cannot upgrade to the
//! write lock while another writer is active and fails with SQLITE_BUSY
//! without waiting. Any early return drops the transaction, which rolls
//! it back.
#![allow(clippy::collapsible_if)]

mod accounts;
mod payments;

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use ledger_types::{
    Account, AccountId, ApiKey, ApiKeyRepository, Currency, DomainError, LedgerRepository,
    Payment, PaymentId, RepoError, Role, Scope, Settlement, UserId,
};

use crate::security::{generate_api_key, hash_api_key};
use crate::types::sqlite::DbApiKey;

/// How long a unit waits for the write lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const MIGRATIONS: [(&str, &str); 2] = [
    ("0001", include_str!("../../migrations/0001_create_ledger.sql")),
    ("0002", include_str!("../../migrations/0002_create_api_keys.sql")),
];

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite repository implementation.
pub struct SqliteRepo {
    pool: SqlitePool,
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            let path = path.split('?').next().unwrap_or(path);
            if !is_in_memory(database_url) {
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let mut options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);
        if !is_in_memory(database_url) {
            // Readers do not block on the writer holding the lock.
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // Every connection to `:memory:` is a separate database, so an
        // in-memory pool must stay on one connection for its whole life.
        let pool_options = if is_in_memory(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };
        let pool = pool_options.connect_with(options).await?;

        let repo = Self { pool };
        repo.create_schema().await?;
        Ok(repo)
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Opens an atomic unit holding the database write lock.
    async fn begin_immediate(&self) -> Result<Transaction<'static, Sqlite>, RepoError> {
        self.pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))
    }

    /// Creates the database schema.
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        for (name, ddl) in MIGRATIONS {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(|e| RepoError::Database(format!("Migration {} failed: {}", name, e)))?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ledger implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl LedgerRepository for SqliteRepo {
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

        let mut db_tx = self.begin_immediate().await?;

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

        let mut db_tx = self.begin_immediate().await?;

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
impl ApiKeyRepository for SqliteRepo {
    async fn find_active_key(&self, key_hash: &str) -> Result<Option<ApiKey>, RepoError> {
        let row: Option<DbApiKey> = sqlx::query_as(
            r#"SELECT id, name, key_hash, user_id, role, is_active, created_at
               FROM api_keys
               WHERE key_hash = ? AND is_active = 1"#,
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
               VALUES (?, ?, ?, ?, ?, 1, ?)"#,
        )
        .bind(api_key.id.to_string())
        .bind(&api_key.name)
        .bind(&api_key.key_hash)
        .bind(api_key.user_id.to_string())
        .bind(api_key.role.as_str())
        .bind(api_key.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok((api_key, raw_key))
    }

    async fn count_api_keys(&self) -> Result<i64, RepoError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM api_keys WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(row.0)
    }
}
