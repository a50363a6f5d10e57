//! Payment record store on PostgreSQL.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use ledger_types::{Payment, PaymentId, PaymentStatus, RepoError, Scope};

use crate::types::pg::{DbPayment, owner_filter};

pub async fn insert(conn: &mut PgConnection, payment: &Payment) -> Result<(), RepoError> {
    sqlx::query(
        r#"INSERT INTO payments (id, payer_id, payee_id, payment_system, payment_method, amount, currency, comment, status, created_at, updated_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"#,
    )
    .bind(payment.id.into_uuid())
    .bind(payment.payer_id.into_uuid())
    .bind(payment.payee_id.into_uuid())
    .bind(payment.payment_system.as_str())
    .bind(payment.payment_method.as_str())
    .bind(payment.amount.amount())
    .bind(payment.amount.currency().code())
    .bind(&payment.comment)
    .bind(payment.status.as_str())
    .bind(payment.created_at)
    .bind(payment.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| RepoError::Database(e.to_string()))?;

    Ok(())
}

/// Compare-and-swap on the status column. Returns the rows moved, 0 or 1.
pub async fn transition(
    conn: &mut PgConnection,
    id: PaymentId,
    expected: PaymentStatus,
    target: PaymentStatus,
    now: DateTime<Utc>,
) -> Result<u64, RepoError> {
    let result = sqlx::query(
        r#"UPDATE payments SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4"#,
    )
    .bind(target.as_str())
    .bind(now)
    .bind(id.into_uuid())
    .bind(expected.as_str())
    .execute(&mut *conn)
    .await
    .map_err(|e| RepoError::Database(e.to_string()))?;

    Ok(result.rows_affected())
}

pub async fn get_scoped(
    conn: &mut PgConnection,
    id: PaymentId,
    scope: Scope,
) -> Result<Option<Payment>, RepoError> {
    let row: Option<DbPayment> = sqlx::query_as(
        r#"SELECT id, payer_id, payee_id, payment_system, payment_method, amount, currency, comment, status, created_at, updated_at
           FROM payments
           WHERE id = $1
             AND ($2::uuid IS NULL
                  OR payer_id IN (SELECT id FROM accounts WHERE owner_id = $2)
                  OR payee_id IN (SELECT id FROM accounts WHERE owner_id = $2))"#,
    )
    .bind(id.into_uuid())
    .bind(owner_filter(scope))
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| RepoError::Database(e.to_string()))?;

    row.map(DbPayment::into_domain).transpose()
}

pub async fn list_scoped(conn: &mut PgConnection, scope: Scope) -> Result<Vec<Payment>, RepoError> {
    let rows: Vec<DbPayment> = sqlx::query_as(
        r#"SELECT id, payer_id, payee_id, payment_system, payment_method, amount, currency, comment, status, created_at, updated_at
           FROM payments
           WHERE $1::uuid IS NULL
              OR payer_id IN (SELECT id FROM accounts WHERE owner_id = $1)
              OR payee_id IN (SELECT id FROM accounts WHERE owner_id = $1)
           ORDER BY created_at DESC"#,
    )
    .bind(owner_filter(scope))
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| RepoError::Database(e.to_string()))?;

    rows.into_iter().map(DbPayment::into_domain).collect()
}
