//! Canonical digest of a status record
//!
//! ```text
//! SHA-256( "{order_id}|{status}|{timestamp}|{location}" )
//! ```
//!
//! `timestamp` is RFC3339 in UTC with whole seconds (`2024-05-01T08:30:00Z`).
//! Row id, note, storage reference and ledger reference are not part of the
//! digest, so the value can be recomputed from any persisted record.

use sha2::{Digest as _, Sha256};
use shared::models::StatusRecord;
use shared::util::{millis_to_rfc3339, strip_hex_prefix};
use std::fmt;

/// 32-byte SHA-256 digest
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lower-case hex without prefix
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse 64 hex chars, with or without `0x`
    pub fn from_hex(value: &str) -> Option<Self> {
        let raw = strip_hex_prefix(value);
        let bytes = hex::decode(raw).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }
}

impl From<[u8; 32]> for Digest {
    fn from(value: [u8; 32]) -> Self {
        Self(value)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self)
    }
}

/// Canonical string fed into the hash
pub fn canonical_string(order_id: i64, status: &str, timestamp_millis: i64, location: &str) -> String {
    format!(
        "{}|{}|{}|{}",
        order_id,
        status,
        millis_to_rfc3339(timestamp_millis),
        location
    )
}

pub fn digest_fields(order_id: i64, status: &str, timestamp_millis: i64, location: &str) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(canonical_string(order_id, status, timestamp_millis, location).as_bytes());
    Digest(hasher.finalize().into())
}

pub fn compute_digest(record: &StatusRecord) -> Digest {
    digest_fields(
        record.order_id,
        &record.status,
        record.timestamp,
        &record.location,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::Digest as _;
    use shared::util::parse_rfc3339_millis;

    fn record(status: &str, ts: &str, location: &str) -> StatusRecord {
        StatusRecord {
            id: 10,
            order_id: 1,
            status: status.into(),
            note: "note".into(),
            location: location.into(),
            timestamp: parse_rfc3339_millis(ts).unwrap(),
            storage_id: Some(3),
            ledger_tx_ref: "0xabc".into(),
            idempotency_key: None,
        }
    }

    #[test]
    fn canonical_string_layout() {
        let r = record("SHIPPED", "2024-05-01T08:30:00Z", "Warehouse B");
        assert_eq!(
            canonical_string(r.order_id, &r.status, r.timestamp, &r.location),
            "1|SHIPPED|2024-05-01T08:30:00Z|Warehouse B"
        );
    }

    #[test]
    fn digest_matches_sha256_of_canonical_string() {
        let r = record("SHIPPED", "2024-05-01T08:30:00Z", "Warehouse B");
        let expected = Sha256::digest(b"1|SHIPPED|2024-05-01T08:30:00Z|Warehouse B");
        assert_eq!(compute_digest(&r).as_bytes().as_slice(), expected.as_slice());
    }

    #[test]
    fn digest_ignores_row_id_note_and_references() {
        let a = record("SHIPPED", "2024-05-01T08:30:00Z", "B");
        let mut b = a.clone();
        b.id = 99;
        b.note = "different".into();
        b.storage_id = None;
        b.ledger_tx_ref = String::new();
        assert_eq!(compute_digest(&a), compute_digest(&b));
    }

    #[test]
    fn digest_is_offset_independent() {
        let utc = record("SHIPPED", "2024-05-01T08:30:00Z", "B");
        let cest = record("SHIPPED", "2024-05-01T10:30:00+02:00", "B");
        assert_eq!(compute_digest(&utc), compute_digest(&cest));
    }

    #[test]
    fn digest_changes_with_any_hashed_field() {
        let base = record("SHIPPED", "2024-05-01T08:30:00Z", "B");
        let status = record("DELIVERED", "2024-05-01T08:30:00Z", "B");
        let time = record("SHIPPED", "2024-05-01T08:30:01Z", "B");
        let location = record("SHIPPED", "2024-05-01T08:30:00Z", "C");
        assert_ne!(compute_digest(&base), compute_digest(&status));
        assert_ne!(compute_digest(&base), compute_digest(&time));
        assert_ne!(compute_digest(&base), compute_digest(&location));
    }

    #[test]
    fn hex_parsing_accepts_prefix() {
        let d = digest_fields(1, "A", 0, "X");
        assert_eq!(Digest::from_hex(&d.to_string()), Some(d));
        assert_eq!(Digest::from_hex(&d.to_hex()), Some(d));
        assert_eq!(Digest::from_hex("0x1234"), None);
    }
}
