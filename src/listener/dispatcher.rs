use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use tokio::sync::watch;

use crate::core::error::ListenerError;
use crate::core::types::Tick;
use crate::core::websocket::SocketEvent;
use crate::listener::decoder::decode_message;
use crate::listener::registry::SubscriptionRegistry;
use crate::listener::session::StreamSession;
use crate::strategies::StrategyHandle;

/// 每笔信号的处理回调，由策略子系统实现
#[async_trait]
pub trait TickHandler: Send + Sync {
    async fn handle_tick(&self, tick: &Tick, strategy: &StrategyHandle) -> anyhow::Result<()>;
}

/// 仅记录日志的默认处理器
pub struct LoggingTickHandler;

#[async_trait]
impl TickHandler for LoggingTickHandler {
    async fn handle_tick(&self, tick: &Tick, strategy: &StrategyHandle) -> anyhow::Result<()> {
        info!(
            "💱 {} - {} (strategy_id={} owner={})",
            tick.symbol, tick.price, strategy.id, strategy.owner_id
        );
        Ok(())
    }
}

/// 分发循环状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Connected,
    Processing,
    Closed,
}

/// 行情分发循环
///
/// 从会话读取消息、解码、按symbol查订阅表并逐个调用处理器；
/// 连接中断走会话的重连流程，主动关停是进入Closed的唯一途径。
pub struct Dispatcher {
    session: Arc<StreamSession>,
    registry: Arc<SubscriptionRegistry>,
    handler: Arc<dyn TickHandler>,
    shutdown: watch::Receiver<bool>,
    state: DispatchState,
}

impl Dispatcher {
    pub fn new(
        session: Arc<StreamSession>,
        registry: Arc<SubscriptionRegistry>,
        handler: Arc<dyn TickHandler>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            session,
            registry,
            handler,
            shutdown,
            state: DispatchState::Idle,
        }
    }

    /// 运行分发循环，直到主动关停或重连次数耗尽
    pub async fn run(mut self) -> Result<(), ListenerError> {
        info!("🔗 分发循环启动");
        self.state = DispatchState::Connected;

        'outer: loop {
            if *self.shutdown.borrow() {
                break;
            }

            let event = tokio::select! {
                _ = self.shutdown.changed() => break 'outer,
                event = self.session.receive() => event,
            };

            match event {
                Ok(SocketEvent::Text(text)) => {
                    self.state = DispatchState::Processing;
                    match decode_message(&text) {
                        Ok(ticks) => {
                            dispatch_batch(&self.registry, self.handler.as_ref(), &ticks).await;
                        }
                        Err(e) => {
                            // 单条消息解码失败只丢弃该条
                            debug!("丢弃无法解码的消息: {}", e);
                        }
                    }
                    self.state = DispatchState::Connected;
                }
                Ok(SocketEvent::Ignored) => {}
                Ok(SocketEvent::Closed) => {
                    warn!("📡 行情连接已断开，进入重连流程");
                    tokio::select! {
                        _ = self.shutdown.changed() => break 'outer,
                        result = self.session.reconnect_and_replay() => result?,
                    }
                }
                Err(e) => {
                    warn!("📡 行情接收出错: {}，进入重连流程", e);
                    tokio::select! {
                        _ = self.shutdown.changed() => break 'outer,
                        result = self.session.reconnect_and_replay() => result?,
                    }
                }
            }
        }

        debug!("分发循环状态: {:?} -> {:?}", self.state, DispatchState::Closed);
        self.state = DispatchState::Closed;
        info!("🔚 分发循环已关闭");
        Ok(())
    }
}

/// 将一批tick按symbol分发给订阅的策略
///
/// 单个策略处理失败只记录日志，不影响同一tick的其余策略，
/// 也不影响后续tick。
pub async fn dispatch_batch(
    registry: &SubscriptionRegistry,
    handler: &dyn TickHandler,
    ticks: &[Tick],
) {
    for tick in ticks {
        let matched = registry.lookup(&tick.symbol).await;
        for strategy in matched {
            if let Err(e) = handler.handle_tick(tick, &strategy).await {
                let err = ListenerError::HandlerError(e.to_string());
                error!(
                    "❌ 策略处理失败: strategy_id={} symbol={} err={}",
                    strategy.id, tick.symbol, err
                );
            }
        }
    }
}
