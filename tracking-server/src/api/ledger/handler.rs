//! Ledger API Handlers

use axum::{Json, extract::State};
use shared::models::LedgerStatus;

use crate::core::ServerState;

/// Connection snapshot of the configured ledger
///
/// Always 200; an unconfigured or unreachable ledger is reported in the body.
pub async fn status(State(state): State<ServerState>) -> Json<LedgerStatus> {
    let status = match &state.ledger {
        Some(ledger) => ledger.status().await,
        None => LedgerStatus {
            connected: false,
            error: Some("Ledger is not configured".to_string()),
            ..Default::default()
        },
    };
    Json(status)
}
