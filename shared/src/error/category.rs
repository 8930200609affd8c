//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// - 0xxx: General errors
/// - 4xxx: Order errors
/// - 5xxx: Storage (warehouse) errors
/// - 7xxx: Ledger errors
/// - 8xxx: Messaging errors
/// - everything else: System errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Order errors (4xxx)
    Order,
    /// Storage errors (5xxx)
    Storage,
    /// Ledger errors (7xxx)
    Ledger,
    /// Messaging errors (8xxx)
    Messaging,
    /// System errors (9xxx)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            4000..5000 => Self::Order,
            5000..6000 => Self::Storage,
            7000..8000 => Self::Ledger,
            8000..9000 => Self::Messaging,
            _ => Self::System,
        }
    }

    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Order => "order",
            Self::Storage => "storage",
            Self::Ledger => "ledger",
            Self::Messaging => "messaging",
            Self::System => "system",
        }
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_code() {
        assert_eq!(ErrorCategory::from_code(0), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(999), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(4001), ErrorCategory::Order);
        assert_eq!(ErrorCategory::from_code(5001), ErrorCategory::Storage);
        assert_eq!(ErrorCategory::from_code(7005), ErrorCategory::Ledger);
        assert_eq!(ErrorCategory::from_code(8004), ErrorCategory::Messaging);
        assert_eq!(ErrorCategory::from_code(9001), ErrorCategory::System);
        assert_eq!(ErrorCategory::from_code(10000), ErrorCategory::System);
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::NotFound.category(), ErrorCategory::General);
        assert_eq!(ErrorCode::OrderNotFound.category(), ErrorCategory::Order);
        assert_eq!(ErrorCode::LedgerNonceConflict.category(), ErrorCategory::Ledger);
        assert_eq!(ErrorCode::PublishFailed.category(), ErrorCategory::Messaging);
        assert_eq!(ErrorCode::DatabaseError.category(), ErrorCategory::System);
    }

    #[test]
    fn test_category_serialize() {
        let json = serde_json::to_string(&ErrorCategory::Ledger).unwrap();
        assert_eq!(json, "\"ledger\"");
        let category: ErrorCategory = serde_json::from_str("\"messaging\"").unwrap();
        assert_eq!(category, ErrorCategory::Messaging);
    }
}
