use std::sync::Arc;

use log::{info, warn};

use crate::core::config::ReconnectConfig;
use crate::core::error::ListenerError;
use crate::core::types::ControlMessage;
use crate::core::websocket::{
    ConnectionState, FeedWebSocketClient, ReconnectManager, SocketEvent, WebSocketClient,
};
use crate::listener::registry::SubscriptionRegistry;

/// 行情源会话
///
/// 持有唯一的上游连接；建立连接后、消费任何tick之前，
/// 先把订阅表的全部订阅消息重放一遍，断线重连后同样如此。
pub struct StreamSession {
    client: FeedWebSocketClient,
    registry: Arc<SubscriptionRegistry>,
    reconnect: ReconnectManager,
}

impl StreamSession {
    pub fn new(
        url: String,
        registry: Arc<SubscriptionRegistry>,
        reconnect_config: ReconnectConfig,
    ) -> Self {
        Self {
            client: FeedWebSocketClient::new(url),
            registry,
            reconnect: ReconnectManager::new(reconnect_config),
        }
    }

    /// 建立连接并重放当前全部订阅
    pub async fn connect(&self) -> Result<(), ListenerError> {
        self.client.connect().await?;
        self.replay_subscriptions().await?;
        self.reconnect.reset().await;
        Ok(())
    }

    /// 重发订阅表当前的全部订阅消息
    async fn replay_subscriptions(&self) -> Result<(), ListenerError> {
        let messages = self.registry.all_subscription_messages().await;
        info!("📡 重放订阅: 共{}个symbol", messages.len());
        for msg in messages {
            self.client.send(msg.to_text()?).await?;
        }
        Ok(())
    }

    /// 发送单条控制消息；未连接时记录日志后丢弃
    pub async fn send(&self, message: &ControlMessage) -> Result<(), ListenerError> {
        if self.client.get_state() != ConnectionState::Connected {
            warn!("⚠️ 行情源未连接，丢弃控制消息: {:?}", message);
            return Ok(());
        }
        self.client.send(message.to_text()?).await
    }

    /// 读取下一个入站事件
    pub async fn receive(&self) -> Result<SocketEvent, ListenerError> {
        self.client.receive().await
    }

    /// 断线后重连并重放订阅
    ///
    /// 按指数退避循环，直到成功或超出配置的次数上限；
    /// 上限耗尽时返回ReconnectExhausted。
    pub async fn reconnect_and_replay(&self) -> Result<(), ListenerError> {
        let _ = self.client.disconnect().await;

        loop {
            self.reconnect.wait_before_retry().await?;

            match self.client.connect().await {
                Ok(()) => match self.replay_subscriptions().await {
                    Ok(()) => {
                        self.reconnect.reset().await;
                        info!("✅ 重连成功，订阅已重放");
                        return Ok(());
                    }
                    Err(e) => {
                        warn!("⚠️ 重连后重放订阅失败: {}", e);
                        let _ = self.client.disconnect().await;
                    }
                },
                Err(e) => {
                    warn!("⚠️ 重连失败: {}", e);
                }
            }
        }
    }

    /// 关闭会话
    pub async fn close(&self) -> Result<(), ListenerError> {
        self.client.disconnect().await
    }

    /// 当前连接状态
    pub fn state(&self) -> ConnectionState {
        self.client.get_state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ControlAction;
    use crate::strategies::{GridParams, GridType, StrategyHandle, StrategySpec};
    use chrono::Utc;
    use futures_util::StreamExt;
    use std::collections::HashSet;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message;

    fn handle(id: i64, owner_id: i64, symbol: &str) -> StrategyHandle {
        StrategyHandle {
            id,
            owner_id,
            symbol: symbol.to_string(),
            created_at: Utc::now(),
            spec: StrategySpec::Grid(GridParams {
                upper_bound: 200.0,
                lower_bound: 100.0,
                grid_count: 5,
                grid_type: GridType::Arithmetic,
                max_drawdown: 0.2,
                principal_balance: 10_000.0,
            }),
        }
    }

    fn test_reconnect_config() -> ReconnectConfig {
        ReconnectConfig {
            initial_delay_ms: 10,
            max_delay_ms: 50,
            backoff_factor: 2.0,
            jitter: false,
            max_attempts: Some(3),
        }
    }

    /// 本地WebSocket服务端：接受一个连接，收齐expected条消息后返回
    async fn accept_and_collect(listener: TcpListener, expected: usize) -> Vec<String> {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        let mut received = Vec::new();
        while received.len() < expected {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => received.push(text),
                Some(Ok(_)) => {}
                _ => break,
            }
        }
        received
    }

    #[tokio::test]
    async fn test_connect_replays_all_subscriptions() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(accept_and_collect(listener, 2));

        let registry = Arc::new(SubscriptionRegistry::new());
        registry.subscribe(handle(1, 100, "TSLA")).await;
        registry.subscribe(handle(2, 101, "TSLA")).await;
        registry.subscribe(handle(3, 102, "GOOG")).await;

        let session = StreamSession::new(
            format!("ws://{}", addr),
            registry,
            test_reconnect_config(),
        );
        session.connect().await.unwrap();

        // TSLA两条策略只产生一条订阅消息，GOOG一条
        let received = server.await.unwrap();
        let mut symbols = HashSet::new();
        for text in &received {
            let msg: ControlMessage = serde_json::from_str(text).unwrap();
            assert_eq!(msg.action, ControlAction::Subscribe);
            symbols.insert(msg.symbol.clone());
        }
        assert_eq!(
            symbols,
            HashSet::from(["TSLA".to_string(), "GOOG".to_string()])
        );

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_send_without_connection_is_logged_noop() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let session = StreamSession::new(
            "ws://127.0.0.1:1".to_string(),
            registry,
            test_reconnect_config(),
        );

        // 未连接时发送不报错
        let result = session.send(&ControlMessage::subscribe("AAPL")).await;
        assert!(result.is_ok());
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_reconnect_exhausts_against_dead_endpoint() {
        let registry = Arc::new(SubscriptionRegistry::new());
        // 先占住端口再释放，保证无人监听
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let session = StreamSession::new(
            format!("ws://{}", addr),
            registry,
            test_reconnect_config(),
        );

        match session.reconnect_and_replay().await {
            Err(ListenerError::ReconnectExhausted(3)) => {}
            other => panic!("应耗尽重连次数: {:?}", other),
        }
    }
}
