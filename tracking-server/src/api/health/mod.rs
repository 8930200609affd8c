//! 健康检查路由
//!
//! # 路由列表
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /health | GET | 简单健康检查 |
//! | /health/detailed | GET | 详细健康检查 (数据库/账本/消息代理) |
//!
//! # 响应示例
//!
//! ```json
//! {
//!   "status": "healthy",
//!   "version": "0.1.0",
//!   "ledger_enabled": true,
//!   "messaging_enabled": false
//! }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use std::time::SystemTime;

use crate::core::ServerState;

/// 健康检查路由
pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/detailed", get(detailed_health))
}

/// 简单健康检查响应
#[derive(Serialize)]
pub struct HealthResponse {
    /// 状态 (healthy)
    status: &'static str,
    /// 版本号
    version: &'static str,
    /// 是否锚定到账本
    ledger_enabled: bool,
    /// 是否连接消息代理
    messaging_enabled: bool,
}

/// 详细健康检查响应
#[derive(Serialize)]
pub struct DetailedHealthResponse {
    status: &'static str,
    version: &'static str,
    /// 运行时间 (秒)
    uptime_seconds: u64,
    /// 各组件检查结果
    checks: HealthChecks,
}

/// 健康检查详情
#[derive(Serialize)]
pub struct HealthChecks {
    database: CheckResult,
    ledger: CheckResult,
    broker: CheckResult,
}

/// 单项检查结果
#[derive(Serialize)]
pub struct CheckResult {
    /// 状态 (ok | disabled | error)
    status: &'static str,
    /// 延迟 (毫秒)
    latency_ms: Option<u64>,
    /// 错误信息
    message: Option<String>,
}

impl CheckResult {
    fn ok() -> Self {
        Self {
            status: "ok",
            latency_ms: None,
            message: None,
        }
    }

    fn ok_with_latency(latency_ms: u64) -> Self {
        Self {
            status: "ok",
            latency_ms: Some(latency_ms),
            message: None,
        }
    }

    fn disabled(message: impl Into<String>) -> Self {
        Self {
            status: "disabled",
            latency_ms: None,
            message: Some(message.into()),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            latency_ms: None,
            message: Some(message.into()),
        }
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

// 服务器启动时间 (懒加载静态变量)
static START_TIME: std::sync::OnceLock<SystemTime> = std::sync::OnceLock::new();

fn get_uptime_seconds() -> u64 {
    let start = START_TIME.get_or_init(SystemTime::now);
    SystemTime::now()
        .duration_since(*start)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// 基础健康检查
pub async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        ledger_enabled: state.ledger.is_some(),
        messaging_enabled: state.broker.is_some(),
    })
}

/// 包含组件状态的详细健康检查
///
/// 未配置的账本/代理报告为 disabled，不影响整体状态。
pub async fn detailed_health(State(state): State<ServerState>) -> Json<DetailedHealthResponse> {
    let database = match state.db.ping().await {
        Ok(latency) => CheckResult::ok_with_latency(latency.as_millis() as u64),
        Err(e) => CheckResult::error(format!("Database error: {}", e)),
    };

    let ledger = match &state.ledger {
        Some(ledger) => {
            let started = std::time::Instant::now();
            let status = ledger.status().await;
            if status.connected {
                CheckResult::ok_with_latency(started.elapsed().as_millis() as u64)
            } else {
                CheckResult::error(status.error.unwrap_or_else(|| "Ledger unreachable".to_string()))
            }
        }
        None => CheckResult::disabled("Ledger is not configured"),
    };

    let broker = match &state.broker {
        Some(_) => CheckResult::ok(),
        None => CheckResult::disabled("Running without messaging"),
    };

    let degraded = database.is_error() || ledger.is_error() || broker.is_error();

    Json(DetailedHealthResponse {
        status: if degraded { "degraded" } else { "healthy" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: get_uptime_seconds(),
        checks: HealthChecks {
            database,
            ledger,
            broker,
        },
    })
}
