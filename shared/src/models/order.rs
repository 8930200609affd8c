//! Order Model

use serde::{Deserialize, Serialize};

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    pub customer_id: i64,
    pub seller_id: i64,
    pub seller_address: String,
    pub seller_latitude: f64,
    pub seller_longitude: f64,
    pub delivery_address: String,
    pub delivery_latitude: f64,
    pub delivery_longitude: f64,
    /// Public tracking code (UUID v4, unique)
    pub tracking_code: String,
    /// Estimated delivery time (Unix millis)
    pub delivery_estimate: i64,
    pub price: f64,
    pub created_at: i64,
}

/// Order line (product reference only, the catalogue lives elsewhere)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderProduct {
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
}

/// Order with its product lines
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub products: Vec<OrderProduct>,
}

/// Product line in an order-created payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductInput {
    pub product_id: i64,
    pub quantity: i64,
}

/// Order-created event payload (`checkout_orders` topic, `POST /order/add`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateOrderInput {
    pub customer_id: i64,
    pub seller_id: i64,
    #[serde(default)]
    pub seller_address: String,
    #[serde(default)]
    pub seller_latitude: f64,
    #[serde(default)]
    pub seller_longitude: f64,
    #[serde(default)]
    pub delivery_address: String,
    #[serde(default)]
    pub delivery_latitude: f64,
    #[serde(default)]
    pub delivery_longitude: f64,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub products: Vec<ProductInput>,
}
