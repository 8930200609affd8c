//! Order Repository

use super::RepoResult;
use shared::models::{CreateOrderInput, Order, OrderProduct, ProductInput};
use sqlx::{SqliteConnection, SqlitePool};

const ORDER_COLUMNS: &str = "id, customer_id, seller_id, seller_address, seller_latitude, seller_longitude, delivery_address, delivery_latitude, delivery_longitude, tracking_code, delivery_estimate, price, created_at";

/// Insert the order row (products are inserted separately)
pub async fn insert(
    conn: &mut SqliteConnection,
    input: &CreateOrderInput,
    tracking_code: &str,
    delivery_estimate: i64,
    created_at: i64,
) -> RepoResult<Order> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "INSERT INTO orders (customer_id, seller_id, seller_address, seller_latitude, seller_longitude, delivery_address, delivery_latitude, delivery_longitude, tracking_code, delivery_estimate, price, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12) RETURNING {ORDER_COLUMNS}"
    ))
    .bind(input.customer_id)
    .bind(input.seller_id)
    .bind(&input.seller_address)
    .bind(input.seller_latitude)
    .bind(input.seller_longitude)
    .bind(&input.delivery_address)
    .bind(input.delivery_latitude)
    .bind(input.delivery_longitude)
    .bind(tracking_code)
    .bind(delivery_estimate)
    .bind(input.price)
    .bind(created_at)
    .fetch_one(&mut *conn)
    .await?;
    Ok(order)
}

pub async fn insert_products(
    conn: &mut SqliteConnection,
    order_id: i64,
    products: &[ProductInput],
) -> RepoResult<()> {
    for p in products {
        sqlx::query("INSERT INTO order_product (order_id, product_id, quantity) VALUES (?1, ?2, ?3)")
            .bind(order_id)
            .bind(p.product_id)
            .bind(p.quantity)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(order)
}

pub async fn find_products(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<OrderProduct>> {
    let products = sqlx::query_as::<_, OrderProduct>(
        "SELECT order_id, product_id, quantity FROM order_product WHERE order_id = ? ORDER BY rowid",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(products)
}

pub async fn exists(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM orders WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

/// Remove an order whose initial record could not be written; products cascade
pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<()> {
    sqlx::query("DELETE FROM orders WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Customer that owns the order
pub async fn customer_id(pool: &SqlitePool, order_id: i64) -> RepoResult<Option<i64>> {
    let customer: Option<i64> = sqlx::query_scalar("SELECT customer_id FROM orders WHERE id = ?")
        .bind(order_id)
        .fetch_optional(pool)
        .await?;
    Ok(customer)
}
