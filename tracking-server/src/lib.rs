//! Order Tracking Server - 订单追踪与账本锚定服务
//!
//! # 架构概述
//!
//! 状态变更和新订单以事件形式进入 (消息代理或 HTTP)，持久化为不可变的
//! 状态记录，每条记录的 SHA-256 摘要锚定到外部账本合约；核验引擎将本地
//! 历史与账本摘要逐条比对。
//!
//! # 模块结构
//!
//! ```text
//! tracking-server/src/
//! ├── core/          # 配置、状态、服务器、后台任务
//! ├── db/            # SQLite 连接池、迁移、仓储函数
//! ├── ledger/        # 账本能力 (EVM 合约 / 内存)、规范摘要
//! ├── message/       # 消息代理抽象 (NATS JetStream / 内存)、处理器、监听循环
//! ├── orders/        # 状态事件、订单创建、核验引擎
//! ├── notification   # 通知构建与发布
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 日志、错误类型
//! ```

pub mod api;
pub mod core;
pub mod db;
pub mod ledger;
pub mod message;
pub mod notification;
pub mod orders;
pub mod utils;

// Re-export 公共类型
pub use core::{Config, Server, ServerState};
pub use ledger::{Ledger, MemoryLedger};
pub use message::{Broker, MemoryBroker};
pub use orders::{OrderPipeline, VerificationEngine};
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 按配置初始化日志 (级别、JSON、滚动文件)
pub fn setup_environment(config: &Config) {
    init_logger_with_file(
        Some(&config.log_level),
        config.log_json,
        config.log_dir.as_deref(),
    );
}

pub fn print_banner() {
    println!(
        r#"
  _                  _    _
 | |_ _ __ __ _  ___| | _(_)_ __   __ _
 | __| '__/ _` |/ __| |/ / | '_ \ / _` |
 | |_| | | (_| | (__|   <| | | | | (_| |
  \__|_|  \__,_|\___|_|\_\_|_| |_|\__, |
                                  |___/
    "#
    );
}
