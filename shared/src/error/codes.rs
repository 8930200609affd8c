//! Unified error codes
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Order / status history errors
//! - 5xxx: Storage (warehouse) errors
//! - 7xxx: Ledger errors
//! - 8xxx: Messaging errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so that API clients can
/// match on them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order has no products
    OrderEmpty = 4002,
    /// Order has no status history
    StatusHistoryNotFound = 4003,
    /// Timestamp is not valid RFC3339
    InvalidTimestamp = 4004,
    /// Tracking code collision
    TrackingCodeExists = 4006,

    // ==================== 5xxx: Storage ====================
    /// Storage (warehouse) not found
    StorageNotFound = 5001,

    // ==================== 7xxx: Ledger ====================
    /// Ledger RPC request failed
    LedgerRequestFailed = 7002,
    /// Ledger transaction was rejected or reverted
    LedgerTransactionFailed = 7003,
    /// Signing account cannot pay fees
    LedgerInsufficientFunds = 7004,
    /// Nonce conflict on the signing account
    LedgerNonceConflict = 7005,
    /// Ledger configuration is invalid (key, address, url)
    LedgerConfigInvalid = 7006,

    // ==================== 8xxx: Messaging ====================
    /// Broker is not connected
    BrokerUnavailable = 8001,
    /// Publish failed
    PublishFailed = 8002,
    /// Subscribe failed
    SubscribeFailed = 8003,
    /// Message payload could not be decoded
    MalformedPayload = 8004,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Operation timeout
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
    /// Encoding error
    EncodingError = 9006,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderEmpty => "Order must contain at least one product",
            ErrorCode::StatusHistoryNotFound => "No order history found",
            ErrorCode::InvalidTimestamp => "Timestamp must be RFC3339",
            ErrorCode::TrackingCodeExists => "Tracking code already exists",

            // Storage
            ErrorCode::StorageNotFound => "Storage not found",

            // Ledger
            ErrorCode::LedgerRequestFailed => "Ledger request failed",
            ErrorCode::LedgerTransactionFailed => "Ledger transaction failed",
            ErrorCode::LedgerInsufficientFunds => "Insufficient funds for ledger transaction",
            ErrorCode::LedgerNonceConflict => "Ledger nonce conflict, retry later",
            ErrorCode::LedgerConfigInvalid => "Ledger configuration is invalid",

            // Messaging
            ErrorCode::BrokerUnavailable => "Message broker is not available",
            ErrorCode::PublishFailed => "Failed to publish message",
            ErrorCode::SubscribeFailed => "Failed to subscribe to topic",
            ErrorCode::MalformedPayload => "Message payload is malformed",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::EncodingError => "Encoding error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderEmpty),
            4003 => Ok(ErrorCode::StatusHistoryNotFound),
            4004 => Ok(ErrorCode::InvalidTimestamp),
            4006 => Ok(ErrorCode::TrackingCodeExists),

            // Storage
            5001 => Ok(ErrorCode::StorageNotFound),

            // Ledger
            7002 => Ok(ErrorCode::LedgerRequestFailed),
            7003 => Ok(ErrorCode::LedgerTransactionFailed),
            7004 => Ok(ErrorCode::LedgerInsufficientFunds),
            7005 => Ok(ErrorCode::LedgerNonceConflict),
            7006 => Ok(ErrorCode::LedgerConfigInvalid),

            // Messaging
            8001 => Ok(ErrorCode::BrokerUnavailable),
            8002 => Ok(ErrorCode::PublishFailed),
            8003 => Ok(ErrorCode::SubscribeFailed),
            8004 => Ok(ErrorCode::MalformedPayload),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::NetworkError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),
            9006 => Ok(ErrorCode::EncodingError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::OrderNotFound.code(), 4001);
        assert_eq!(ErrorCode::StorageNotFound.code(), 5001);
        assert_eq!(ErrorCode::TrackingCodeExists.code(), 4006);
        assert_eq!(ErrorCode::LedgerRequestFailed.code(), 7002);
        assert_eq!(ErrorCode::MalformedPayload.code(), 8004);
        assert_eq!(ErrorCode::DatabaseError.code(), 9002);
    }

    #[test]
    fn test_try_from_known_codes() {
        assert_eq!(ErrorCode::try_from(4003), Ok(ErrorCode::StatusHistoryNotFound));
        assert_eq!(ErrorCode::try_from(7004), Ok(ErrorCode::LedgerInsufficientFunds));
    }

    #[test]
    fn test_try_from_unknown_codes() {
        assert_eq!(ErrorCode::try_from(999), Err(InvalidErrorCode(999)));
        assert_eq!(ErrorCode::try_from(1001), Err(InvalidErrorCode(1001)));
        assert_eq!(ErrorCode::try_from(10000), Err(InvalidErrorCode(10000)));
    }

    #[test]
    fn test_serde_as_number() {
        let json = serde_json::to_string(&ErrorCode::OrderNotFound).unwrap();
        assert_eq!(json, "4001");
        let code: ErrorCode = serde_json::from_str("7002").unwrap();
        assert_eq!(code, ErrorCode::LedgerRequestFailed);
        assert!(serde_json::from_str::<ErrorCode>("1234").is_err());
    }

    #[test]
    fn test_invalid_error_code_display() {
        assert_eq!(InvalidErrorCode(999).to_string(), "invalid error code: 999");
    }
}
