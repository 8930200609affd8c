//! 服务器状态

use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::{Config, Result, ServerError};
use crate::db::DbService;
use crate::ledger::{EvmLedger, SharedLedger};
use crate::message::{
    ConsumerSettings, MessageHandler, MessageProcessor, NatsBroker, OrderEventProcessor,
    SharedBroker, StatusEventProcessor,
};
use crate::notification::{NotificationBuilder, Notifier, StoreCustomerLookup};
use crate::orders::{OrderPipeline, VerificationEngine};

/// 账本连接巡检周期
const LEDGER_HEALTH_INTERVAL: Duration = Duration::from_secs(60);

/// 服务器状态 - 持有所有服务的共享引用
///
/// 所有字段都是 Arc/池句柄，Clone 成本极低。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | db | DbService | SQLite 连接池 |
/// | ledger | Option<SharedLedger> | 账本 (None = 不锚定) |
/// | broker | Option<SharedBroker> | 消息代理 (None = 无消息模式) |
/// | pipeline | OrderPipeline | 订单/状态处理流水线 |
/// | verifier | VerificationEngine | 账本核验 |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub db: DbService,
    pub ledger: Option<SharedLedger>,
    pub broker: Option<SharedBroker>,
    pub pipeline: OrderPipeline,
    pub verifier: VerificationEngine,
}

impl ServerState {
    /// 用已就绪的组件组装状态 (测试中注入内存账本/代理)
    pub fn new(
        config: Config,
        db: DbService,
        ledger: Option<SharedLedger>,
        broker: Option<SharedBroker>,
    ) -> Self {
        let notifier = Notifier::new(
            NotificationBuilder::new(config.frontend_base_url.clone()),
            Arc::new(StoreCustomerLookup::new(db.pool.clone())),
            broker.clone(),
            config.notification_topic.clone(),
        );
        let pipeline = OrderPipeline::new(db.pool.clone(), ledger.clone(), notifier);
        let verifier = VerificationEngine::new(db.pool.clone(), ledger.clone());

        Self {
            config,
            db,
            ledger,
            broker,
            pipeline,
            verifier,
        }
    }

    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 数据库 (DATABASE_PATH 或 work_dir/tracking.db，自动迁移)
    /// 2. 账本 (未配置时跳过锚定)
    /// 3. 消息代理 (连接失败时降级为无消息模式)
    pub async fn initialize(config: &Config) -> Result<Self> {
        // 1. Database
        let db = DbService::new(&config.database_path()).await?;

        // 2. Ledger
        let ledger: Option<SharedLedger> = match &config.ledger {
            Some(ledger_config) => {
                let ledger = EvmLedger::new(ledger_config.clone())
                    .map_err(|e| ServerError::Config(e.to_string()))?;
                tracing::info!(
                    network = %ledger_config.network,
                    chain_id = ledger_config.chain_id,
                    contract = %ledger_config.contract_address,
                    wallet = %ledger.wallet_address(),
                    "⛓️ Ledger anchoring enabled"
                );
                Some(Arc::new(ledger))
            }
            None => {
                tracing::warn!("Ledger not configured, records will not be anchored");
                None
            }
        };

        // 3. Broker
        let broker: Option<SharedBroker> = match &config.nats_url {
            Some(url) => {
                let settings = ConsumerSettings {
                    consumer_name: config.consumer_name.clone(),
                    ack_wait: Duration::from_millis(config.ack_wait_ms),
                    max_deliveries: config.max_deliveries,
                };
                match NatsBroker::connect(url, settings).await {
                    Ok(broker) => Some(Arc::new(broker)),
                    Err(e) => {
                        tracing::error!(error = %e, "Broker unavailable, running without messaging");
                        None
                    }
                }
            }
            None => {
                tracing::warn!("NATS_URL not set, running without messaging");
                None
            }
        };

        Ok(Self::new(config.clone(), db, ledger, broker))
    }

    /// 启动后台任务
    ///
    /// - 每个订阅主题一个监听器 (MessageHandler)
    /// - 账本连接定时巡检
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();

        if let Some(broker) = &self.broker {
            let listeners: [(&'static str, String, Arc<dyn MessageProcessor>); 2] = [
                (
                    "status_listener",
                    self.config.status_topic.clone(),
                    Arc::new(StatusEventProcessor::new(self.pipeline.clone())),
                ),
                (
                    "order_listener",
                    self.config.order_topic.clone(),
                    Arc::new(OrderEventProcessor::new(self.pipeline.clone())),
                ),
            ];

            for (name, topic, processor) in listeners {
                let broker = broker.clone();
                let max_deliveries = self.config.max_deliveries;
                tasks.spawn(name, TaskKind::Listener, move |shutdown| {
                    MessageHandler::new(broker, topic, processor, max_deliveries, shutdown).run()
                });
            }
        }

        if let Some(ledger) = &self.ledger {
            let ledger = ledger.clone();
            tasks.spawn_periodic("ledger_health", LEDGER_HEALTH_INTERVAL, move || {
                let ledger = ledger.clone();
                async move {
                    let status = ledger.status().await;
                    if status.connected {
                        tracing::debug!(
                            block = ?status.block_number,
                            balance = ?status.wallet_balance,
                            "Ledger connection healthy"
                        );
                    } else {
                        tracing::warn!(error = ?status.error, "Ledger connection unhealthy");
                    }
                }
            });
        }

        tasks.log_summary();
        tasks
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db.pool
    }
}
