//! Account ledger on PostgreSQL.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use ledger_types::{Account, AccountId, BalanceAdjustment, DomainError, RepoError, Scope};

use crate::types::pg::{DbAccount, owner_filter};

pub async fn insert(conn: &mut PgConnection, account: &Account) -> Result<(), RepoError> {
    sqlx::query(
        r#"INSERT INTO accounts (id, owner_id, balance, reserved, currency, enabled, created_at, updated_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
    )
    .bind(account.id.into_uuid())
    .bind(account.owner_id.into_uuid())
    .bind(account.balance())
    .bind(account.reserved())
    .bind(account.currency.code())
    .bind(account.enabled)
    .bind(account.created_at)
    .bind(account.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| RepoError::Database(e.to_string()))?;

    Ok(())
}

pub async fn get(conn: &mut PgConnection, id: AccountId) -> Result<Option<Account>, RepoError> {
    let row: Option<DbAccount> = sqlx::query_as(
        r#"SELECT id, owner_id, balance, reserved, currency, enabled, created_at, updated_at
           FROM accounts WHERE id = $1"#,
    )
    .bind(id.into_uuid())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| RepoError::Database(e.to_string()))?;

    row.map(DbAccount::into_domain).transpose()
}

pub async fn list(conn: &mut PgConnection, scope: Scope) -> Result<Vec<Account>, RepoError> {
    let rows: Vec<DbAccount> = sqlx::query_as(
        r#"SELECT id, owner_id, balance, reserved, currency, enabled, created_at, updated_at
           FROM accounts
           WHERE $1::uuid IS NULL OR owner_id = $1
           ORDER BY created_at DESC"#,
    )
    .bind(owner_filter(scope))
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| RepoError::Database(e.to_string()))?;

    rows.into_iter().map(DbAccount::into_domain).collect()
}

const LOCK_ACCOUNTS: &str =
    "SELECT id FROM accounts WHERE id = ANY($1) ORDER BY id FOR NO KEY UPDATE";

/// Takes row locks on `ids` in id order so that concurrent settlements
/// never wait on each other in a cycle.
///
/// `FOR NO KEY UPDATE` is the lock the following `adjust` UPDATEs take
/// anyway. It leaves `FOR KEY SHARE` free, which a concurrent payment
/// insert needs on its payee row for the foreign key check.
pub async fn lock(conn: &mut PgConnection, ids: &[AccountId]) -> Result<(), RepoError> {
    let ids: Vec<Uuid> = ids.iter().map(|id| id.into_uuid()).collect();

    sqlx::query(LOCK_ACCOUNTS)
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

    Ok(())
}

/// Increases `reserved` by `amount` only if the net balance covers it.
///
/// Under READ COMMITTED a blocked UPDATE re-evaluates its WHERE clause
/// against the committed row, so two concurrent reservations cannot both
/// pass the guard on the same funds.
pub async fn reserve(
    conn: &mut PgConnection,
    id: AccountId,
    amount: i64,
    now: DateTime<Utc>,
) -> Result<bool, RepoError> {
    let result = sqlx::query(
        r#"UPDATE accounts SET reserved = reserved + $1, updated_at = $2
           WHERE id = $3 AND balance - reserved >= $1"#,
    )
    .bind(amount)
    .bind(now)
    .bind(id.into_uuid())
    .execute(&mut *conn)
    .await
    .map_err(|e| RepoError::Database(e.to_string()))?;

    Ok(result.rows_affected() == 1)
}

/// Applies both deltas of `adjustment` in one write and returns the account.
pub async fn adjust(
    conn: &mut PgConnection,
    adjustment: &BalanceAdjustment,
    now: DateTime<Utc>,
) -> Result<Account, RepoError> {
    let row: Option<DbAccount> = sqlx::query_as(
        r#"UPDATE accounts
           SET balance = balance + $1, reserved = reserved + $2, updated_at = $3
           WHERE id = $4 AND reserved + $2 >= 0
           RETURNING id, owner_id, balance, reserved, currency, enabled, created_at, updated_at"#,
    )
    .bind(adjustment.balance_delta)
    .bind(adjustment.reserved_delta)
    .bind(now)
    .bind(adjustment.account_id.into_uuid())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| RepoError::Database(e.to_string()))?;

    match row {
        Some(row) => row.into_domain(),
        None => match get(conn, adjustment.account_id).await? {
            None => Err(RepoError::Domain(DomainError::AccountNotFound(
                adjustment.account_id,
            ))),
            Some(account) => {
                tracing::error!(
                    account_id = %account.id,
                    reserved = account.reserved(),
                    reserved_delta = adjustment.reserved_delta,
                    "adjustment would make reserved negative"
                );
                Err(RepoError::ContractViolation(format!(
                    "reserved of account {} would become negative",
                    account.id
                )))
            }
        },
    }
}
