//! Order tracking pipeline
//!
//! - **status**: status-change events → anchored [`StatusRecord`](shared::models::StatusRecord)
//! - **creation**: order-created events → order, products and the initial record
//! - **verify**: reconcile persisted history with the ledger
//!
//! # Write path
//!
//! ```text
//! validate → check order → digest → storeDigest → INSERT record (with tx ref) → notify
//!                                      │                  │
//!                      failure: nothing written   failure: orphan digest on the ledger
//! ```
//!
//! The ledger round trip can take seconds, so no SQLite transaction is open
//! while it runs; concurrent events for any order keep writing. The broker
//! listeners and the HTTP handlers call the same functions.

pub mod creation;
pub mod status;
pub mod verify;

pub use creation::CreationOutcome;
pub use status::StatusOutcome;
pub use verify::{VerificationEngine, reconcile};

use shared::error::AppResult;
use sqlx::SqlitePool;

use crate::ledger::{self, SharedLedger, digest_fields};
use crate::notification::Notifier;

/// Dependencies shared by both processors
#[derive(Clone)]
pub struct OrderPipeline {
    pool: SqlitePool,
    ledger: Option<SharedLedger>,
    notifier: Notifier,
}

impl OrderPipeline {
    pub fn new(pool: SqlitePool, ledger: Option<SharedLedger>, notifier: Notifier) -> Self {
        Self {
            pool,
            ledger,
            notifier,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn ledger(&self) -> Option<&SharedLedger> {
        self.ledger.as_ref()
    }

    /// Anchor the digest of a record that has not been written yet
    ///
    /// Must be called with no transaction open. Without a ledger the
    /// returned tx ref is empty.
    pub(crate) async fn anchor_fields(
        &self,
        order_id: i64,
        status: &str,
        timestamp: i64,
        location: &str,
    ) -> AppResult<String> {
        let Some(ledger) = &self.ledger else {
            return Ok(String::new());
        };
        let digest = digest_fields(order_id, status, timestamp, location);
        Ok(ledger::anchor(ledger.as_ref(), order_id, digest).await?)
    }
}
