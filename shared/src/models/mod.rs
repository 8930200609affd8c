//! Data models
//!
//! Shared between tracking-server and API clients.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY); timestamps are Unix millis.

pub mod ledger;
pub mod notification;
pub mod order;
pub mod status_record;
pub mod storage;
pub mod verification;

// Re-exports
pub use ledger::*;
pub use notification::*;
pub use order::*;
pub use status_record::*;
pub use storage::*;
pub use verification::*;
