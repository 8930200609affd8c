//! Status Event Processor
//!
//! Appends one record to an order's history. Redelivered broker messages
//! are recognised by their idempotency key; direct calls carry no key and
//! every call appends.

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{StatusRecord, StatusUpdateInput};
use shared::util::{now_millis, parse_rfc3339_millis};

use super::OrderPipeline;
use crate::db::repository::status_record::NewStatusRecord;
use crate::db::repository::{order, status_record, storage};

/// Result of recording a status event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusOutcome {
    /// A new record was committed
    Recorded(StatusRecord),
    /// The idempotency key was seen before; nothing was written
    Duplicate(StatusRecord),
}

impl StatusOutcome {
    pub fn record(&self) -> &StatusRecord {
        match self {
            Self::Recorded(r) | Self::Duplicate(r) => r,
        }
    }

    pub fn into_record(self) -> StatusRecord {
        match self {
            Self::Recorded(r) | Self::Duplicate(r) => r,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}

/// Validated status event
#[derive(Debug)]
struct StatusEvent {
    order_id: i64,
    status: String,
    note: String,
    location: String,
    storage_id: Option<i64>,
    timestamp: i64,
}

fn validate(input: StatusUpdateInput) -> AppResult<StatusEvent> {
    let order_id = match input.order_id {
        Some(id) if id > 0 => id,
        Some(id) => {
            return Err(AppError::validation(format!("order_id must be positive, got {id}")));
        }
        None => return Err(AppError::with_message(ErrorCode::RequiredField, "order_id is required")),
    };

    // Stored and hashed exactly as received
    if input.order_status.trim().is_empty() {
        return Err(AppError::with_message(ErrorCode::RequiredField, "order_status is required"));
    }

    let timestamp = match input.timestamp_history.as_deref().map(str::trim) {
        None | Some("") => now_millis(),
        Some(raw) => parse_rfc3339_millis(raw).map_err(|e| {
            AppError::with_message(ErrorCode::InvalidTimestamp, format!("Invalid timestamp_history: {e}"))
                .with_detail("timestamp_history", raw)
        })?,
    };

    Ok(StatusEvent {
        order_id,
        status: input.order_status,
        note: input.note,
        location: input.order_location,
        storage_id: input.storage_id,
        timestamp,
    })
}

impl OrderPipeline {
    /// Validate, persist and anchor a status change, then notify the customer
    pub async fn record_status(
        &self,
        input: StatusUpdateInput,
        idempotency_key: Option<&str>,
    ) -> AppResult<StatusOutcome> {
        let event = validate(input)?;

        if let Some(key) = idempotency_key
            && let Some(existing) = status_record::find_by_idempotency_key(self.pool(), key).await?
        {
            tracing::info!(order_id = existing.order_id, key, "Duplicate status event skipped");
            return Ok(StatusOutcome::Duplicate(existing));
        }

        if !order::exists(self.pool(), event.order_id).await? {
            return Err(AppError::with_message(
                ErrorCode::OrderNotFound,
                format!("Order {} not found", event.order_id),
            ));
        }

        if let Some(storage_id) = event.storage_id
            && !storage::exists(self.pool(), storage_id).await?
        {
            return Err(AppError::with_message(
                ErrorCode::StorageNotFound,
                format!("Unknown storage_id {storage_id}"),
            )
            .with_detail("storage_id", storage_id));
        }

        let tx_ref = self
            .anchor_fields(event.order_id, &event.status, event.timestamp, &event.location)
            .await?;

        let new = NewStatusRecord {
            order_id: event.order_id,
            status: &event.status,
            note: &event.note,
            location: &event.location,
            timestamp: event.timestamp,
            storage_id: event.storage_id,
            ledger_tx_ref: &tx_ref,
            idempotency_key,
        };

        let mut conn = self
            .pool()
            .acquire()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;
        let inserted = status_record::insert(&mut *conn, &new).await;
        drop(conn);

        let record = match inserted {
            Ok(record) => record,
            Err(e) => {
                let e = AppError::from(e);
                // A concurrent redelivery won the insert; its digest was anchored twice
                if let (ErrorCode::AlreadyExists, Some(key)) = (e.code, idempotency_key)
                    && let Some(existing) = status_record::find_by_idempotency_key(self.pool(), key).await?
                {
                    tracing::warn!(order_id = existing.order_id, key, tx_ref = %tx_ref, "Duplicate status event anchored twice");
                    return Ok(StatusOutcome::Duplicate(existing));
                }
                if !tx_ref.is_empty() {
                    tracing::error!(order_id = event.order_id, tx_ref = %tx_ref, error = %e, "Record not persisted after anchoring");
                }
                return Err(e);
            }
        };

        tracing::info!(
            order_id = record.order_id,
            record_id = record.id,
            status = %record.status,
            anchored = !record.ledger_tx_ref.is_empty(),
            "Status recorded"
        );

        self.notifier.status_changed(&record).await;

        Ok(StatusOutcome::Recorded(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(order_id: Option<i64>, status: &str) -> StatusUpdateInput {
        StatusUpdateInput {
            order_id,
            order_status: status.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn requires_order_id_and_status() {
        let err = validate(input(None, "SHIPPED")).unwrap_err();
        assert_eq!(err.code, ErrorCode::RequiredField);

        let err = validate(input(Some(1), "  ")).unwrap_err();
        assert_eq!(err.code, ErrorCode::RequiredField);

        let err = validate(input(Some(-4), "SHIPPED")).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert!(err.is_client_error());
    }

    #[test]
    fn timestamp_defaults_to_receipt_time() {
        let before = now_millis();
        let event = validate(input(Some(1), "SHIPPED")).unwrap();
        assert!(event.timestamp >= before);
        assert!(event.timestamp <= now_millis());
    }

    #[test]
    fn explicit_timestamp_is_parsed() {
        let mut raw = input(Some(1), "SHIPPED");
        raw.timestamp_history = Some("2024-05-01T10:30:00+02:00".into());
        let event = validate(raw).unwrap();
        assert_eq!(event.status, "SHIPPED");
        assert_eq!(event.timestamp, parse_rfc3339_millis("2024-05-01T08:30:00Z").unwrap());
    }

    #[test]
    fn status_is_kept_verbatim() {
        let event = validate(input(Some(1), " Shipped \t")).unwrap();
        assert_eq!(event.status, " Shipped \t");
    }

    #[test]
    fn invalid_timestamp_is_a_client_error() {
        let mut raw = input(Some(1), "SHIPPED");
        raw.timestamp_history = Some("yesterday".into());
        let err = validate(raw).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTimestamp);
        assert!(err.is_client_error());
    }
}
