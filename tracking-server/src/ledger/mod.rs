//! Ledger capability
//!
//! The ledger is an append-only, per-order list of digests kept by an
//! external contract. The service only needs two operations:
//!
//! | Operation | Contract call | Notes |
//! |-----------|---------------|-------|
//! | [`Ledger::store_digest`] | `storeUpdateHash(uint256, bytes32)` | blocking, fee-incurring, returns tx ref |
//! | [`Ledger::get_digests`] | `getUpdateHash(uint256) view` | ordered by anchoring, not by timeline |
//!
//! Implementations are injected as `Arc<dyn Ledger>`; `None` means
//! ledger-less mode (records persist with an empty tx ref).

pub mod digest;
pub mod evm;
pub mod memory;

pub use digest::{Digest, compute_digest, digest_fields};
pub use evm::EvmLedger;
pub use memory::MemoryLedger;

use async_trait::async_trait;
use shared::error::{AppError, ErrorCode};
use shared::models::LedgerStatus;
use std::sync::Arc;
use thiserror::Error;

/// Ledger error types
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Ledger RPC error: {0}")]
    Rpc(String),

    #[error("Ledger transaction failed: {0}")]
    Transaction(String),

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("Nonce conflict: {0}")]
    NonceConflict(String),

    #[error("Invalid ledger configuration: {0}")]
    Config(String),

    #[error("Order id {0} cannot be anchored")]
    InvalidOrderId(i64),
}

impl LedgerError {
    /// Classify a raw RPC/send error message
    pub fn from_send_error(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("insufficient funds") {
            Self::InsufficientFunds(message)
        } else if lower.contains("nonce") || lower.contains("replacement transaction underpriced") {
            Self::NonceConflict(message)
        } else {
            Self::Rpc(message)
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let code = match &err {
            LedgerError::Rpc(_) => ErrorCode::LedgerRequestFailed,
            LedgerError::Transaction(_) => ErrorCode::LedgerTransactionFailed,
            LedgerError::InsufficientFunds(_) => ErrorCode::LedgerInsufficientFunds,
            LedgerError::NonceConflict(_) => ErrorCode::LedgerNonceConflict,
            LedgerError::Config(_) => ErrorCode::LedgerConfigInvalid,
            LedgerError::InvalidOrderId(_) => ErrorCode::ValueOutOfRange,
        };
        AppError::with_message(code, err.to_string())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Digest storage/retrieval over any ledger client
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Append `digest` to the order's list; returns the transaction reference
    async fn store_digest(&self, order_id: i64, digest: Digest) -> LedgerResult<String>;

    /// Full digest list for the order, in anchoring order
    async fn get_digests(&self, order_id: i64) -> LedgerResult<Vec<Digest>>;

    /// Contract address reported in verdicts
    fn contract_address(&self) -> Option<String> {
        None
    }

    /// Connection snapshot for `GET /ledger/status`
    async fn status(&self) -> LedgerStatus;
}

pub type SharedLedger = Arc<dyn Ledger>;

/// Anchor a digest, logging the outcome
pub async fn anchor(ledger: &dyn Ledger, order_id: i64, digest: Digest) -> LedgerResult<String> {
    let started = std::time::Instant::now();
    match ledger.store_digest(order_id, digest).await {
        Ok(tx_ref) => {
            tracing::info!(
                order_id,
                digest = %digest,
                tx_ref = %tx_ref,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Digest anchored"
            );
            Ok(tx_ref)
        }
        Err(e) => {
            tracing::error!(order_id, digest = %digest, error = %e, "Failed to anchor digest");
            Err(e)
        }
    }
}
