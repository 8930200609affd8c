//! Order API Module
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /order/add | POST | 同步创建订单 (含初始 PROCESSING 记录) |
//! | /order/{id} | GET | 订单详情 (含商品) |
//! | /order/history/add | POST | 追加状态记录 (与 orders_status 主题同一处理流程) |
//! | /order/history/{order_id} | GET | 状态历史 (新→旧) |
//! | /order/verify/{order_id} | GET | 与账本核验 |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/order", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/add", post(handler::create))
        .route("/history/add", post(handler::add_history))
        .route("/history/{order_id}", get(handler::history))
        .route("/verify/{order_id}", get(handler::verify))
        .route("/{id}", get(handler::get_by_id))
}
