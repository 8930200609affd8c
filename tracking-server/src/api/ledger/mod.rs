//! Ledger status API Module

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

/// Ledger router
pub fn router() -> Router<ServerState> {
    Router::new().route("/ledger/status", get(handler::status))
}
