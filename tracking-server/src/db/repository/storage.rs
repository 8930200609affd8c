//! Storage (warehouse) Repository

use super::RepoResult;
use shared::models::Storage;
use sqlx::SqlitePool;

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Storage>> {
    let storages = sqlx::query_as::<_, Storage>(
        "SELECT id, name, address, latitude, longitude, created_at FROM storage ORDER BY id ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(storages)
}

pub async fn exists(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM storage WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

pub async fn create(
    pool: &SqlitePool,
    name: &str,
    address: &str,
    latitude: f64,
    longitude: f64,
) -> RepoResult<Storage> {
    let now = shared::util::now_millis();
    let storage = sqlx::query_as::<_, Storage>(
        "INSERT INTO storage (name, address, latitude, longitude, created_at) VALUES (?1, ?2, ?3, ?4, ?5) RETURNING id, name, address, latitude, longitude, created_at",
    )
    .bind(name)
    .bind(address)
    .bind(latitude)
    .bind(longitude)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(storage)
}
