//! Verification Engine
//!
//! Recomputes the digest of every persisted record (timeline order) and
//! looks for it in the ledger's digest list. Matching is a linear scan,
//! first match wins, and matched ledger entries are not consumed, so the
//! ledger's own ordering and duplicates never affect the outcome.

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{StatusRecord, VerificationStatus, VerificationVerdict};
use sqlx::SqlitePool;
use std::collections::HashSet;

use crate::db::repository::status_record;
use crate::ledger::{Digest, SharedLedger, compute_digest};

#[derive(Clone)]
pub struct VerificationEngine {
    pool: SqlitePool,
    ledger: Option<SharedLedger>,
}

impl VerificationEngine {
    pub fn new(pool: SqlitePool, ledger: Option<SharedLedger>) -> Self {
        Self { pool, ledger }
    }

    pub async fn verify(&self, order_id: i64) -> AppResult<VerificationVerdict> {
        let records = status_record::find_by_order_asc(&self.pool, order_id).await?;
        if records.is_empty() {
            return Err(AppError::with_message(
                ErrorCode::StatusHistoryNotFound,
                format!("No status history for order {order_id}"),
            ));
        }

        let Some(ledger) = &self.ledger else {
            return Ok(unavailable(order_id, &records));
        };

        let digests = ledger.get_digests(order_id).await?;
        let verdict = reconcile(order_id, &records, &digests, ledger.contract_address());

        tracing::info!(
            order_id,
            status = %verdict.status,
            verified = verdict.verified_count,
            total = verdict.total_records,
            ledger = verdict.ledger_digest_count,
            "Order verified against ledger"
        );
        if verdict.duplicate_ledger_digests > 0 {
            tracing::warn!(
                order_id,
                duplicates = verdict.duplicate_ledger_digests,
                "Ledger holds duplicate digests"
            );
        }

        Ok(verdict)
    }
}

fn transaction_refs(records: &[StatusRecord]) -> Vec<String> {
    records.iter().map(|r| r.ledger_tx_ref.clone()).collect()
}

fn unavailable(order_id: i64, records: &[StatusRecord]) -> VerificationVerdict {
    VerificationVerdict {
        order_id,
        verified: false,
        status: VerificationStatus::LedgerUnavailable,
        message: "Ledger is not configured".to_string(),
        total_records: records.len(),
        ledger_digest_count: 0,
        verified_count: 0,
        duplicate_ledger_digests: 0,
        mismatch_details: Vec::new(),
        transaction_refs: transaction_refs(records),
        contract_address: None,
    }
}

/// Classification of match counts, checked in this order
pub fn classify(matched: usize, total: usize, ledger_count: usize) -> VerificationStatus {
    if matched == total && total == ledger_count {
        VerificationStatus::Verified
    } else if matched == 0 {
        VerificationStatus::NotVerified
    } else if matched < total {
        VerificationStatus::PartiallyVerified
    } else if ledger_count > total {
        VerificationStatus::ExtraHashes
    } else {
        VerificationStatus::Mismatch
    }
}

fn message(status: VerificationStatus, matched: usize, total: usize) -> String {
    match status {
        VerificationStatus::Verified => "All order updates are verified on the ledger".to_string(),
        VerificationStatus::NotVerified => "No updates found on the ledger".to_string(),
        VerificationStatus::PartiallyVerified => {
            format!("Only {matched} out of {total} updates are verified")
        }
        VerificationStatus::ExtraHashes => "More hashes on the ledger than in the database".to_string(),
        VerificationStatus::Mismatch => "Database and ledger data mismatch".to_string(),
        VerificationStatus::LedgerUnavailable => "Ledger is not configured".to_string(),
    }
}

/// Surplus entries in the ledger list (`len - distinct`)
fn duplicate_count(digests: &[Digest]) -> usize {
    let distinct: HashSet<&Digest> = digests.iter().collect();
    digests.len() - distinct.len()
}

/// Compare records (timeline order) with the ledger's digest list
pub fn reconcile(
    order_id: i64,
    records: &[StatusRecord],
    ledger_digests: &[Digest],
    contract_address: Option<String>,
) -> VerificationVerdict {
    let mut matched = 0;
    let mut mismatch_details = Vec::new();

    for (idx, record) in records.iter().enumerate() {
        let digest = compute_digest(record);
        if ledger_digests.iter().any(|d| *d == digest) {
            matched += 1;
        } else {
            mismatch_details.push(format!(
                "Update #{} ({}) not found on ledger",
                idx + 1,
                record.status
            ));
        }
    }

    let total = records.len();
    let ledger_count = ledger_digests.len();
    let status = classify(matched, total, ledger_count);

    VerificationVerdict {
        order_id,
        verified: status == VerificationStatus::Verified,
        status,
        message: message(status, matched, total),
        total_records: total,
        ledger_digest_count: ledger_count,
        verified_count: matched,
        duplicate_ledger_digests: duplicate_count(ledger_digests),
        mismatch_details,
        transaction_refs: transaction_refs(records),
        contract_address,
    }
}
