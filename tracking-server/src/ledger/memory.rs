//! In-process ledger
//!
//! Keeps per-order digest lists in memory. Used by tests and by local runs
//! that want anchoring semantics without a chain.

use async_trait::async_trait;
use dashmap::DashMap;
use shared::models::LedgerStatus;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use super::{Digest, Ledger, LedgerError, LedgerResult};

#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: DashMap<i64, Vec<Digest>>,
    tx_counter: AtomicU64,
    fail_stores: AtomicBool,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a digest directly (simulates anchoring done elsewhere)
    pub fn push(&self, order_id: i64, digest: Digest) {
        self.entries.entry(order_id).or_default().push(digest);
    }

    /// Digests currently stored for an order
    pub fn digests(&self, order_id: i64) -> Vec<Digest> {
        self.entries
            .get(&order_id)
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    /// Make every following `store_digest` fail with an RPC error
    pub fn set_failing(&self, failing: bool) {
        self.fail_stores.store(failing, Ordering::SeqCst);
    }

    pub fn store_count(&self) -> u64 {
        self.tx_counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn store_digest(&self, order_id: i64, digest: Digest) -> LedgerResult<String> {
        if order_id < 0 {
            return Err(LedgerError::InvalidOrderId(order_id));
        }
        if self.fail_stores.load(Ordering::SeqCst) {
            return Err(LedgerError::Rpc("memory ledger is failing".into()));
        }
        self.push(order_id, digest);
        let n = self.tx_counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("0x{:064x}", n))
    }

    async fn get_digests(&self, order_id: i64) -> LedgerResult<Vec<Digest>> {
        Ok(self.digests(order_id))
    }

    fn contract_address(&self) -> Option<String> {
        Some("memory".to_string())
    }

    async fn status(&self) -> LedgerStatus {
        LedgerStatus {
            connected: true,
            network: "memory".to_string(),
            contract_address: self.contract_address(),
            block_number: Some(self.store_count()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::digest_fields;

    #[tokio::test]
    async fn stores_in_append_order() {
        let ledger = MemoryLedger::new();
        let a = digest_fields(1, "A", 0, "X");
        let b = digest_fields(1, "B", 0, "X");
        let tx1 = ledger.store_digest(1, b).await.unwrap();
        let tx2 = ledger.store_digest(1, a).await.unwrap();
        assert_ne!(tx1, tx2);
        assert_eq!(ledger.get_digests(1).await.unwrap(), vec![b, a]);
        assert!(ledger.get_digests(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failing_mode_rejects_stores() {
        let ledger = MemoryLedger::new();
        ledger.set_failing(true);
        let err = ledger
            .store_digest(1, digest_fields(1, "A", 0, "X"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Rpc(_)));
        assert!(ledger.digests(1).is_empty());
    }
}
