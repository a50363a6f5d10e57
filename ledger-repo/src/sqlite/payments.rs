//! Payment record store on SQLite.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use ledger_types::{Payment, PaymentId, PaymentStatus, RepoError, Scope};

use crate::types::sqlite::{DbPayment, owner_filter};

pub async fn insert(conn: &mut SqliteConnection, payment: &Payment) -> Result<(), RepoError> {
    sqlx::query(
        r#"INSERT INTO payments (id, payer_id, payee_id, payment_system, payment_method, amount, currency, comment, status, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(payment.id.to_string())
    .bind(payment.payer_id.to_string())
    .bind(payment.payee_id.to_string())
    .bind(payment.payment_system.as_str())
    .bind(payment.payment_method.as_str())
    .bind(payment.amount.amount())
    .bind(payment.amount.currency().code())
    .bind(&payment.comment)
    .bind(payment.status.as_str())
    .bind(payment.created_at.to_rfc3339())
    .bind(payment.updated_at.to_rfc3339())
    .execute(&mut *conn)
    .await
    .map_err(|e| RepoError::Database(e.to_string()))?;

    Ok(())
}

/// Compare-and-swap on the status column.
///
/// Returns the number of rows moved: `1` if the payment was `expected`,
/// `0` otherwise.
pub async fn transition(
    conn: &mut SqliteConnection,
    id: PaymentId,
    expected: PaymentStatus,
    target: PaymentStatus,
    now: DateTime<Utc>,
) -> Result<u64, RepoError> {
    let result = sqlx::query(
        r#"UPDATE payments SET status = ?, updated_at = ? WHERE id = ? AND status = ?"#,
    )
    .bind(target.as_str())
    .bind(now.to_rfc3339())
    .bind(id.to_string())
    .bind(expected.as_str())
    .execute(&mut *conn)
    .await
    .map_err(|e| RepoError::Database(e.to_string()))?;

    Ok(result.rows_affected())
}

pub async fn get_scoped(
    conn: &mut SqliteConnection,
    id: PaymentId,
    scope: Scope,
) -> Result<Option<Payment>, RepoError> {
    let row: Option<DbPayment> = sqlx::query_as(
        r#"SELECT id, payer_id, payee_id, payment_system, payment_method, amount, currency, comment, status, created_at, updated_at
           FROM payments
           WHERE id = ?1
             AND (?2 IS NULL
                  OR payer_id IN (SELECT id FROM accounts WHERE owner_id = ?2)
                  OR payee_id IN (SELECT id FROM accounts WHERE owner_id = ?2))"#,
    )
    .bind(id.to_string())
    .bind(owner_filter(scope))
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| RepoError::Database(e.to_string()))?;

    row.map(DbPayment::into_domain).transpose()
}

pub async fn list_scoped(
    conn: &mut SqliteConnection,
    scope: Scope,
) -> Result<Vec<Payment>, RepoError> {
    let rows: Vec<DbPayment> = sqlx::query_as(
        r#"SELECT id, payer_id, payee_id, payment_system, payment_method, amount, currency, comment, status, created_at, updated_at
           FROM payments
           WHERE ?1 IS NULL
              OR payer_id IN (SELECT id FROM accounts WHERE owner_id = ?1)
              OR payee_id IN (SELECT id FROM accounts WHERE owner_id = ?1)
           ORDER BY created_at DESC"#,
    )
    .bind(owner_filter(scope))
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| RepoError::Database(e.to_string()))?;

    rows.into_iter().map(DbPayment::into_domain).collect()
}
