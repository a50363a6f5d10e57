//! Account ledger on SQLite.
//!
//! Every function takes an open connection so the coordinator can run it
//! inside its transaction.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use ledger_types::{Account, AccountId, BalanceAdjustment, DomainError, RepoError, Scope};

use crate::types::sqlite::{DbAccount, owner_filter};

pub async fn insert(conn: &mut SqliteConnection, account: &Account) -> Result<(), RepoError> {
    sqlx::query(
        r#"INSERT INTO accounts (id, owner_id, balance, reserved, currency, enabled, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(account.id.to_string())
    .bind(account.owner_id.to_string())
    .bind(account.balance())
    .bind(account.reserved())
    .bind(account.currency.code())
    .bind(account.enabled)
    .bind(account.created_at.to_rfc3339())
    .bind(account.updated_at.to_rfc3339())
    .execute(&mut *conn)
    .await
    .map_err(|e| RepoError::Database(e.to_string()))?;

    Ok(())
}

pub async fn get(conn: &mut SqliteConnection, id: AccountId) -> Result<Option<Account>, RepoError> {
    let row: Option<DbAccount> = sqlx::query_as(
        r#"SELECT id, owner_id, balance, reserved, currency, enabled, created_at, updated_at
           FROM accounts WHERE id = ?"#,
    )
    .bind(id.to_string())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| RepoError::Database(e.to_string()))?;

    row.map(DbAccount::into_domain).transpose()
}

pub async fn list(conn: &mut SqliteConnection, scope: Scope) -> Result<Vec<Account>, RepoError> {
    let rows: Vec<DbAccount> = sqlx::query_as(
        r#"SELECT id, owner_id, balance, reserved, currency, enabled, created_at, updated_at
           FROM accounts
           WHERE ?1 IS NULL OR owner_id = ?1
           ORDER BY created_at DESC"#,
    )
    .bind(owner_filter(scope))
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| RepoError::Database(e.to_string()))?;

    rows.into_iter().map(DbAccount::into_domain).collect()
}

/// Increases `reserved` by `amount` only if the net balance covers it.
///
/// Check and increment are one statement, so no concurrent reservation can
/// slip in between them. Returns `false` when the guard did not match
/// (unknown account or insufficient net balance).
pub async fn reserve(
    conn: &mut SqliteConnection,
    id: AccountId,
    amount: i64,
    now: DateTime<Utc>,
) -> Result<bool, RepoError> {
    let result = sqlx::query(
        r#"UPDATE accounts SET reserved = reserved + ?1, updated_at = ?2
           WHERE id = ?3 AND balance - reserved >= ?1"#,
    )
    .bind(amount)
    .bind(now.to_rfc3339())
    .bind(id.to_string())
    .execute(&mut *conn)
    .await
    .map_err(|e| RepoError::Database(e.to_string()))?;

    Ok(result.rows_affected() == 1)
}

/// Applies both deltas of `adjustment` in one write and returns the account.
///
/// A negative resulting `reserved` never reaches the row; it fails as a
/// contract violation.
pub async fn adjust(
    conn: &mut SqliteConnection,
    adjustment: &BalanceAdjustment,
    now: DateTime<Utc>,
) -> Result<Account, RepoError> {
    let row: Option<DbAccount> = sqlx::query_as(
        r#"UPDATE accounts
           SET balance = balance + ?1, reserved = reserved + ?2, updated_at = ?3
           WHERE id = ?4 AND reserved + ?2 >= 0
           RETURNING id, owner_id, balance, reserved, currency, enabled, created_at, updated_at"#,
    )
    .bind(adjustment.balance_delta)
    .bind(adjustment.reserved_delta)
    .bind(now.to_rfc3339())
    .bind(adjustment.account_id.to_string())
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
