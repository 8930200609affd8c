//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::OrderNotFound
            | Self::StatusHistoryNotFound
            | Self::StorageNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::AlreadyExists | Self::TrackingCodeExists => StatusCode::CONFLICT,

            // 502 Bad Gateway (upstream ledger / broker rejected the call)
            Self::LedgerRequestFailed
            | Self::LedgerTransactionFailed
            | Self::LedgerInsufficientFunds
            | Self::PublishFailed => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable (transient errors, client can retry)
            Self::LedgerNonceConflict
            | Self::BrokerUnavailable
            | Self::SubscribeFailed
            | Self::NetworkError
            | Self::TimeoutError => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            Self::Unknown
            | Self::LedgerConfigInvalid
            | Self::InternalError
            | Self::DatabaseError
            | Self::ConfigError
            | Self::EncodingError => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (default for validation errors)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_status() {
        assert_eq!(ErrorCode::Success.http_status(), StatusCode::OK);
    }

    #[test]
    fn test_not_found_status() {
        assert_eq!(ErrorCode::OrderNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::StatusHistoryNotFound.http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ErrorCode::StorageNotFound.http_status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_client_errors() {
        assert_eq!(
            ErrorCode::ValidationFailed.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::MalformedPayload.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ErrorCode::OrderEmpty.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::TrackingCodeExists.http_status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_ledger_errors_are_server_errors() {
        for code in [
            ErrorCode::LedgerRequestFailed,
            ErrorCode::LedgerTransactionFailed,
            ErrorCode::LedgerInsufficientFunds,
            ErrorCode::LedgerNonceConflict,
            ErrorCode::LedgerConfigInvalid,
        ] {
            assert!(code.http_status().is_server_error(), "{code:?}");
        }
    }

    #[test]
    fn test_internal_error_status() {
        assert_eq!(
            ErrorCode::DatabaseError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
