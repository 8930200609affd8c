use shared::util::strip_hex_prefix;
use std::path::PathBuf;

/// 服务配置 - 追踪服务的所有配置项
///
/// # 环境变量
///
/// 启动时先加载 `.env`，然后读取以下环境变量：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/tracking | 工作目录 (数据库、日志) |
/// | DATABASE_PATH | {WORK_DIR}/tracking.db | SQLite 数据库文件 |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | NATS_URL | (无) | 消息代理地址，未设置时不启用消息 |
/// | STATUS_TOPIC | orders_status | 状态变更事件主题 |
/// | ORDER_TOPIC | checkout_orders | 新订单事件主题 |
/// | NOTIFICATION_TOPIC | notifications | 通知发布主题 |
/// | CONSUMER_NAME | tracking-server | 持久消费者名称 |
/// | MAX_DELIVERIES | 5 | 单条消息最大投递次数，超出后进入死信 |
/// | ACK_WAIT_MS | 30000 | 未确认消息的重投等待时间 |
/// | LEDGER_RPC_URL | (无) | 账本 RPC 地址 |
/// | LEDGER_PRIVATE_KEY | (无) | 签名私钥 (可带 0x 前缀) |
/// | LEDGER_CONTRACT_ADDRESS | (无) | 合约地址 |
/// | LEDGER_CHAIN_ID | 11155111 | 链 ID |
/// | LEDGER_NETWORK | sepolia | 网络名称 (仅用于展示) |
/// | FRONTEND_BASE_URL | http://localhost:5173 | 通知中的订单链接前缀 |
/// | SHUTDOWN_TIMEOUT_MS | 10000 | 关闭超时 |
/// | LOG_LEVEL | info | 日志级别 (RUST_LOG 优先) |
/// | LOG_JSON | false | JSON 格式日志 |
/// | LOG_DIR | (无) | 日志文件目录 (按天滚动) |
///
/// 账本只有在 URL、私钥、合约地址都设置时才启用，否则进入无账本模式。
///
/// # 示例
///
/// ```ignore
/// NATS_URL=nats://localhost:4222 HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录
    pub work_dir: String,
    /// 数据库路径 (为空时使用 work_dir/tracking.db)
    pub database_path: Option<String>,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,

    // === 消息 ===
    /// 消息代理地址
    pub nats_url: Option<String>,
    pub status_topic: String,
    pub order_topic: String,
    pub notification_topic: String,
    pub consumer_name: String,
    /// 最大投递次数
    pub max_deliveries: u32,
    /// 重投等待 (毫秒)
    pub ack_wait_ms: u64,

    // === 账本 ===
    pub ledger: Option<LedgerConfig>,

    /// 通知链接前缀
    pub frontend_base_url: String,
    /// 关闭超时时间 (毫秒)
    pub shutdown_timeout_ms: u64,

    // === 日志 ===
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
}

/// 账本连接配置
#[derive(Clone)]
pub struct LedgerConfig {
    pub rpc_url: String,
    /// 十六进制私钥，不含 0x 前缀
    pub private_key: String,
    pub contract_address: String,
    pub chain_id: u64,
    pub network: String,
}

impl std::fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &"<redacted>")
            .field("contract_address", &self.contract_address)
            .field("chain_id", &self.chain_id)
            .field("network", &self.network)
            .finish()
    }
}

impl LedgerConfig {
    /// 从环境变量加载账本配置，缺少任一必填项返回 None
    pub fn from_env() -> Option<Self> {
        let rpc_url = non_empty_var("LEDGER_RPC_URL")?;
        let private_key = non_empty_var("LEDGER_PRIVATE_KEY")?;
        let contract_address = non_empty_var("LEDGER_CONTRACT_ADDRESS")?;

        Some(Self {
            rpc_url,
            private_key: strip_hex_prefix(&private_key).to_string(),
            contract_address,
            chain_id: std::env::var("LEDGER_CHAIN_ID")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(11_155_111),
            network: std::env::var("LEDGER_NETWORK").unwrap_or_else(|_| "sepolia".into()),
        })
    }
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/tracking".into()),
            database_path: non_empty_var("DATABASE_PATH"),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),

            nats_url: non_empty_var("NATS_URL"),
            status_topic: std::env::var("STATUS_TOPIC").unwrap_or_else(|_| "orders_status".into()),
            order_topic: std::env::var("ORDER_TOPIC")
                .unwrap_or_else(|_| "checkout_orders".into()),
            notification_topic: std::env::var("NOTIFICATION_TOPIC")
                .unwrap_or_else(|_| "notifications".into()),
            consumer_name: std::env::var("CONSUMER_NAME")
                .unwrap_or_else(|_| "tracking-server".into()),
            max_deliveries: std::env::var("MAX_DELIVERIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            ack_wait_ms: std::env::var("ACK_WAIT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30_000),

            ledger: LedgerConfig::from_env(),

            frontend_base_url: std::env::var("FRONTEND_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
            shutdown_timeout_ms: std::env::var("SHUTDOWN_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000),

            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: std::env::var("LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            log_dir: non_empty_var("LOG_DIR"),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景：不连接消息代理，不启用账本
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.database_path = None;
        config.http_port = http_port;
        config.nats_url = None;
        config.ledger = None;
        config
    }

    /// 数据库文件路径
    pub fn database_path(&self) -> PathBuf {
        match &self.database_path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(&self.work_dir).join("tracking.db"),
        }
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
