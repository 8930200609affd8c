//! Status Record Repository
//!
//! Append-only: rows are inserted once, already carrying their ledger
//! reference, and never change afterwards.

use super::RepoResult;
use shared::models::StatusRecord;
use sqlx::{SqliteConnection, SqlitePool};

const COLUMNS: &str =
    "id, order_id, status, note, location, timestamp, storage_id, ledger_tx_ref, idempotency_key";

/// Fields of a record about to be inserted
#[derive(Debug, Clone)]
pub struct NewStatusRecord<'a> {
    pub order_id: i64,
    pub status: &'a str,
    pub note: &'a str,
    pub location: &'a str,
    pub timestamp: i64,
    pub storage_id: Option<i64>,
    /// Empty when no ledger is configured
    pub ledger_tx_ref: &'a str,
    pub idempotency_key: Option<&'a str>,
}

pub async fn insert(conn: &mut SqliteConnection, data: &NewStatusRecord<'_>) -> RepoResult<StatusRecord> {
    let record = sqlx::query_as::<_, StatusRecord>(&format!(
        "INSERT INTO status_record (order_id, status, note, location, timestamp, storage_id, ledger_tx_ref, idempotency_key) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) RETURNING {COLUMNS}"
    ))
    .bind(data.order_id)
    .bind(data.status)
    .bind(data.note)
    .bind(data.location)
    .bind(data.timestamp)
    .bind(data.storage_id)
    .bind(data.ledger_tx_ref)
    .bind(data.idempotency_key)
    .fetch_one(&mut *conn)
    .await?;
    Ok(record)
}

/// Timeline order (oldest first), ties broken by insertion order
pub async fn find_by_order_asc(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<StatusRecord>> {
    let records = sqlx::query_as::<_, StatusRecord>(&format!(
        "SELECT {COLUMNS} FROM status_record WHERE order_id = ? ORDER BY timestamp ASC, id ASC"
    ))
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(records)
}

/// Newest first, for history views
pub async fn find_by_order_desc(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<StatusRecord>> {
    let records = sqlx::query_as::<_, StatusRecord>(&format!(
        "SELECT {COLUMNS} FROM status_record WHERE order_id = ? ORDER BY timestamp DESC, id DESC"
    ))
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(records)
}

pub async fn find_by_idempotency_key(pool: &SqlitePool, key: &str) -> RepoResult<Option<StatusRecord>> {
    let record = sqlx::query_as::<_, StatusRecord>(&format!(
        "SELECT {COLUMNS} FROM status_record WHERE idempotency_key = ?"
    ))
    .bind(key)
    .fetch_optional(pool)
    .await?;
    Ok(record)
}

pub async fn count_by_order(pool: &SqlitePool, order_id: i64) -> RepoResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM status_record WHERE order_id = ?")
        .bind(order_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}
