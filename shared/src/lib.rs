//! Shared types for the order tracking service
//!
//! Wire payloads, persisted models, verification verdicts, notification
//! records and the unified error system used by `tracking-server` and by
//! anything that talks to its HTTP API.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
