pub mod bootstrap;
pub mod decoder;
pub mod dispatcher;
pub mod registry;
pub mod session;

pub use bootstrap::{load_initial, FileStrategyStore, StrategyStore};
pub use decoder::decode_message;
pub use dispatcher::{dispatch_batch, DispatchState, Dispatcher, LoggingTickHandler, TickHandler};
pub use registry::SubscriptionRegistry;
pub use session::StreamSession;

use std::sync::Arc;

use log::{error, warn};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::core::config::ReconnectConfig;
use crate::core::error::ListenerError;
use crate::core::websocket::ConnectionState;
use crate::strategies::StrategyHandle;

/// 行情监听器
///
/// 进程级单例，由组合根显式构造后注入给需要订阅/退订的调用方；
/// 生命周期: init（加载初始订阅）→ start_listening（连接并启动分发循环）→ shutdown。
pub struct Listener {
    registry: Arc<SubscriptionRegistry>,
    session: Arc<StreamSession>,
    handler: Arc<dyn TickHandler>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    listener_task: Mutex<Option<JoinHandle<()>>>,
}

impl Listener {
    /// 创建监听器，此时尚未建立连接
    pub fn new(
        connect_url: String,
        reconnect: ReconnectConfig,
        handler: Arc<dyn TickHandler>,
    ) -> Self {
        let registry = Arc::new(SubscriptionRegistry::new());
        let session = Arc::new(StreamSession::new(
            connect_url,
            registry.clone(),
            reconnect,
        ));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            registry,
            session,
            handler,
            shutdown_tx,
            shutdown_rx,
            listener_task: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// 当前连接状态
    pub fn connection_state(&self) -> ConnectionState {
        self.session.state()
    }

    /// 从持久化层加载初始活跃策略
    pub async fn init(&self, store: &dyn StrategyStore) -> Result<usize, ListenerError> {
        bootstrap::load_initial(store, &self.registry).await
    }

    /// 建立连接（含订阅重放）并启动分发循环任务
    pub async fn start_listening(&self) -> Result<(), ListenerError> {
        self.session.connect().await?;

        let dispatcher = Dispatcher::new(
            self.session.clone(),
            self.registry.clone(),
            self.handler.clone(),
            self.shutdown_rx.clone(),
        );
        let task = tokio::spawn(async move {
            if let Err(e) = dispatcher.run().await {
                error!("❌ 分发循环异常退出: {}", e);
            }
        });
        *self.listener_task.lock().await = Some(task);
        Ok(())
    }

    /// 策略激活钩子
    ///
    /// 加入订阅表并即时下发新产生的订阅消息；
    /// 同一(symbol, owner)已有订阅时返回false，由调用方转成用户提示。
    pub async fn on_strategy_activated(&self, handle: StrategyHandle) -> bool {
        let added = self.registry.subscribe(handle).await;
        if added {
            self.flush_pending().await;
        }
        added
    }

    /// 策略停用钩子
    ///
    /// 移除订阅；symbol下最后一条被移除时即时下发退订消息。
    pub async fn on_strategy_deactivated(
        &self,
        symbol: &str,
        owner_id: i64,
        strategy_id: Option<i64>,
    ) -> bool {
        let removed = self.registry.unsubscribe(symbol, owner_id, strategy_id).await;
        self.flush_pending().await;
        removed
    }

    /// 将累计的控制消息发往会话；未连接时由会话记录日志后丢弃
    async fn flush_pending(&self) {
        for msg in self.registry.drain_pending().await {
            if let Err(e) = self.session.send(&msg).await {
                warn!("⚠️ 控制消息发送失败: {}", e);
            }
        }
    }

    /// 关停监听器：终止分发循环并关闭连接
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.listener_task.lock().await.take() {
            let _ = task.await;
        }
        let _ = self.session.close().await;
    }
}
