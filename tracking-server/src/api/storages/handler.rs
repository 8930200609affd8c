//! Storage API Handlers

use axum::{Json, extract::State};
use shared::models::Storage;

use crate::core::ServerState;
use crate::db::repository::storage;
use crate::utils::AppResult;

/// List all storages ordered by id
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Storage>>> {
    let storages = storage::find_all(state.pool()).await?;
    Ok(Json(storages))
}
