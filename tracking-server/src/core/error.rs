//! 服务器启动/运行错误
//!
//! 请求级错误走 [`shared::error::AppError`]；这里只覆盖进程级失败。

use shared::error::AppError;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("初始化失败: {0}")]
    Startup(#[from] AppError),

    #[error("无法绑定 {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("内部服务器错误: {0}")]
    Internal(#[from] anyhow::Error),
}

/// 进程级 Result 类型别名
pub type Result<T> = std::result::Result<T, ServerError>;
