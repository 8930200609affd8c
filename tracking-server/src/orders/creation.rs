//! Order Creation Processor
//!
//! A short transaction writes the order and its product lines. The initial
//! `PROCESSING` record (located at the seller) is then anchored like any
//! other record and inserted with its tx ref. If anchoring or that insert
//! fails the order is deleted again, so callers never see an order without
//! its initial record after an error.
//!
//! The broker message id rides on the initial record, so a redelivered
//! order event resolves to the order created the first time.

use chrono::Duration;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    CreateOrderInput, INITIAL_NOTE, INITIAL_STATUS, Order, OrderDetail, OrderProduct, StatusRecord,
};
use shared::util::now_millis;
use uuid::Uuid;

use super::OrderPipeline;
use crate::db::repository::{RepoError, order};
use crate::db::repository::status_record::{self, NewStatusRecord};

/// Delivery estimate offset from creation time
pub const DELIVERY_ESTIMATE_HOURS: i64 = 48;

#[derive(Debug, Clone, PartialEq)]
pub enum CreationOutcome {
    Created(OrderDetail),
    /// The idempotency key was seen before; the earlier order is returned
    Duplicate(OrderDetail),
}

impl CreationOutcome {
    pub fn detail(&self) -> &OrderDetail {
        match self {
            Self::Created(d) | Self::Duplicate(d) => d,
        }
    }

    pub fn into_detail(self) -> OrderDetail {
        match self {
            Self::Created(d) | Self::Duplicate(d) => d,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}

fn validate(input: &CreateOrderInput) -> AppResult<()> {
    if input.customer_id <= 0 {
        return Err(AppError::with_message(ErrorCode::RequiredField, "customer_id is required"));
    }
    if input.seller_id <= 0 {
        return Err(AppError::with_message(ErrorCode::RequiredField, "seller_id is required"));
    }
    if input.products.is_empty() {
        return Err(AppError::new(ErrorCode::OrderEmpty));
    }
    for (idx, product) in input.products.iter().enumerate() {
        if product.product_id <= 0 {
            return Err(AppError::validation(format!("products[{idx}].product_id is required")));
        }
        if product.quantity <= 0 {
            return Err(AppError::with_message(
                ErrorCode::ValueOutOfRange,
                format!("products[{idx}].quantity must be positive"),
            )
            .with_detail("quantity", product.quantity));
        }
    }
    Ok(())
}

/// The only UNIQUE column on `orders` is the tracking code
fn insert_error(err: RepoError, tracking_code: &str) -> AppError {
    match err {
        RepoError::Duplicate(_) => {
            AppError::new(ErrorCode::TrackingCodeExists).with_detail("tracking_code", tracking_code)
        }
        other => other.into(),
    }
}

impl OrderPipeline {
    /// Create an order with its initial anchored status record, then notify the customer
    pub async fn create_order(
        &self,
        input: CreateOrderInput,
        idempotency_key: Option<&str>,
    ) -> AppResult<CreationOutcome> {
        validate(&input)?;

        if let Some(key) = idempotency_key
            && let Some(existing) = status_record::find_by_idempotency_key(self.pool(), key).await?
        {
            tracing::info!(order_id = existing.order_id, key, "Duplicate order event skipped");
            let detail = self.order_detail(existing.order_id).await?;
            return Ok(CreationOutcome::Duplicate(detail));
        }

        let created_at = now_millis();
        let delivery_estimate = created_at + Duration::hours(DELIVERY_ESTIMATE_HOURS).num_milliseconds();
        let tracking_code = Uuid::new_v4().to_string();

        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        let order = order::insert(&mut *tx, &input, &tracking_code, delivery_estimate, created_at)
            .await
            .map_err(|e| insert_error(e, &tracking_code))?;
        order::insert_products(&mut *tx, order.id, &input.products).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        let record = match self.write_initial_record(&order, created_at, idempotency_key).await {
            Ok(record) => record,
            Err(e) => {
                if let Err(cleanup) = order::delete(self.pool(), order.id).await {
                    tracing::error!(order_id = order.id, error = %cleanup, "Failed to remove order without initial record");
                }
                // A concurrent redelivery created the order first
                if let (ErrorCode::AlreadyExists, Some(key)) = (e.code, idempotency_key)
                    && let Some(existing) = status_record::find_by_idempotency_key(self.pool(), key).await?
                {
                    let detail = self.order_detail(existing.order_id).await?;
                    return Ok(CreationOutcome::Duplicate(detail));
                }
                return Err(e);
            }
        };

        tracing::info!(
            order_id = order.id,
            customer_id = order.customer_id,
            tracking_code = %order.tracking_code,
            products = input.products.len(),
            anchored = !record.ledger_tx_ref.is_empty(),
            "Order created"
        );

        self.notifier.order_created(&order).await;

        let products = input
            .products
            .iter()
            .map(|p| OrderProduct {
                order_id: order.id,
                product_id: p.product_id,
                quantity: p.quantity,
            })
            .collect();
        Ok(CreationOutcome::Created(OrderDetail { order, products }))
    }

    /// Anchor and insert the initial `PROCESSING` record of a committed order
    async fn write_initial_record(
        &self,
        order: &Order,
        created_at: i64,
        idempotency_key: Option<&str>,
    ) -> AppResult<StatusRecord> {
        let tx_ref = self
            .anchor_fields(order.id, INITIAL_STATUS, created_at, &order.seller_address)
            .await?;

        let initial = NewStatusRecord {
            order_id: order.id,
            status: INITIAL_STATUS,
            note: INITIAL_NOTE,
            location: &order.seller_address,
            timestamp: created_at,
            storage_id: None,
            ledger_tx_ref: &tx_ref,
            idempotency_key,
        };

        let mut conn = self
            .pool()
            .acquire()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;
        Ok(status_record::insert(&mut *conn, &initial).await?)
    }

    /// Order with its product lines
    pub async fn order_detail(&self, order_id: i64) -> AppResult<OrderDetail> {
        let order = order::find_by_id(self.pool(), order_id)
            .await?
            .ok_or_else(|| AppError::with_message(ErrorCode::OrderNotFound, format!("Order {order_id} not found")))?;
        let products = order::find_products(self.pool(), order_id).await?;
        Ok(OrderDetail { order, products })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::ProductInput;

    fn input(products: Vec<ProductInput>) -> CreateOrderInput {
        CreateOrderInput {
            customer_id: 1,
            seller_id: 2,
            seller_address: "Depot".into(),
            seller_latitude: 0.0,
            seller_longitude: 0.0,
            delivery_address: "Home".into(),
            delivery_latitude: 0.0,
            delivery_longitude: 0.0,
            price: 10.0,
            products,
        }
    }

    #[test]
    fn rejects_empty_orders() {
        let err = validate(&input(vec![])).unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderEmpty);
        assert!(err.is_client_error());
    }

    #[test]
    fn rejects_missing_ids_and_bad_quantities() {
        let mut missing_customer = input(vec![ProductInput { product_id: 1, quantity: 1 }]);
        missing_customer.customer_id = 0;
        assert_eq!(validate(&missing_customer).unwrap_err().code, ErrorCode::RequiredField);

        let bad_product = input(vec![ProductInput { product_id: 0, quantity: 1 }]);
        assert_eq!(validate(&bad_product).unwrap_err().code, ErrorCode::ValidationFailed);

        let bad_quantity = input(vec![ProductInput { product_id: 3, quantity: 0 }]);
        assert_eq!(validate(&bad_quantity).unwrap_err().code, ErrorCode::ValueOutOfRange);
    }

    #[test]
    fn tracking_code_collision_has_its_own_code() {
        let err = insert_error(RepoError::Duplicate("UNIQUE constraint failed: orders.tracking_code".into()), "abc");
        assert_eq!(err.code, ErrorCode::TrackingCodeExists);
        assert!(err.is_client_error());

        let err = insert_error(RepoError::Database("disk I/O error".into()), "abc");
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn accepts_complete_order() {
        assert!(validate(&input(vec![ProductInput { product_id: 3, quantity: 2 }])).is_ok());
    }
}
