//! Verification verdict (`GET /order/verify/{order_id}`)
//!
//! | Status | Condition |
//! |--------|-----------|
//! | `VERIFIED` | every record matched and record count == ledger digest count |
//! | `NOT_VERIFIED` | no record matched |
//! | `PARTIALLY_VERIFIED` | some but not all records matched |
//! | `EXTRA_HASHES` | every record matched, ledger holds more digests |
//! | `MISMATCH` | any other combination |
//! | `LEDGER_UNAVAILABLE` | no ledger configured |

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Verified,
    PartiallyVerified,
    NotVerified,
    ExtraHashes,
    Mismatch,
    LedgerUnavailable,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "VERIFIED",
            Self::PartiallyVerified => "PARTIALLY_VERIFIED",
            Self::NotVerified => "NOT_VERIFIED",
            Self::ExtraHashes => "EXTRA_HASHES",
            Self::Mismatch => "MISMATCH",
            Self::LedgerUnavailable => "LEDGER_UNAVAILABLE",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reconciliation report of an order's local history against the ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerificationVerdict {
    pub order_id: i64,
    pub verified: bool,
    pub status: VerificationStatus,
    pub message: String,
    pub total_records: usize,
    pub ledger_digest_count: usize,
    pub verified_count: usize,
    /// Ledger digests that appear more than once (reported, not penalized)
    pub duplicate_ledger_digests: usize,
    /// "Update #n (STATUS) not found on ledger", 1-based in timeline order
    pub mismatch_details: Vec<String>,
    /// Ledger transaction reference per local record, timeline order (may be empty strings)
    pub transaction_refs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
}
