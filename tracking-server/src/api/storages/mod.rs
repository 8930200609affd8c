//! Storage (warehouse) API Module

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

/// Storage router
pub fn router() -> Router<ServerState> {
    Router::new().route("/storages", get(handler::list))
}
