/// 行情源WebSocket连接模块 - 支持自动重连与心跳应答
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, trace, warn};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{sleep, Duration};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::core::config::ReconnectConfig;
use crate::core::error::ListenerError;

pub type Result<T> = std::result::Result<T, ListenerError>;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;
type WsReader = SplitStream<WsStream>;

// ============= WebSocket基础定义 =============

/// WebSocket连接状态
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Reconnecting,
    Error(String),
}

/// 一次接收的结果
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    /// 一条文本消息
    Text(String),
    /// 非数据帧（心跳应答等），调用方可忽略
    Ignored,
    /// 对端关闭或流结束
    Closed,
}

// ============= WebSocket Trait定义 =============

/// WebSocket客户端trait
#[async_trait]
pub trait WebSocketClient: Send + Sync {
    /// 连接到WebSocket服务器
    async fn connect(&self) -> Result<()>;

    /// 断开连接
    async fn disconnect(&self) -> Result<()>;

    /// 发送文本消息
    async fn send(&self, message: String) -> Result<()>;

    /// 接收下一个事件
    async fn receive(&self) -> Result<SocketEvent>;

    /// 获取连接状态
    fn get_state(&self) -> ConnectionState;
}

// ============= 基础WebSocket客户端实现 =============

/// 行情源WebSocket客户端
///
/// 读写两个半边分别持锁，接收阻塞期间仍可发送控制消息。
#[derive(Clone)]
pub struct FeedWebSocketClient {
    url: String,
    state: Arc<RwLock<ConnectionState>>,
    writer: Arc<Mutex<Option<WsWriter>>>,
    reader: Arc<Mutex<Option<WsReader>>>,
}

impl FeedWebSocketClient {
    pub fn new(url: String) -> Self {
        Self {
            url,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            writer: Arc::new(Mutex::new(None)),
            reader: Arc::new(Mutex::new(None)),
        }
    }

    /// 日志中隐去query部分（token在其中）
    fn display_url(&self) -> &str {
        self.url.split('?').next().unwrap_or(&self.url)
    }
}

#[async_trait]
impl WebSocketClient for FeedWebSocketClient {
    async fn connect(&self) -> Result<()> {
        *self.state.write().await = ConnectionState::Connecting;

        info!("🔌 正在连接行情源: {}", self.display_url());

        match connect_async(&self.url).await {
            Ok((ws_stream, _)) => {
                let (writer, reader) = ws_stream.split();
                *self.writer.lock().await = Some(writer);
                *self.reader.lock().await = Some(reader);
                *self.state.write().await = ConnectionState::Connected;
                info!("✅ 行情源连接成功: {}", self.display_url());
                Ok(())
            }
            Err(e) => {
                error!("❌ 行情源连接失败: {}", e);
                *self.state.write().await = ConnectionState::Disconnected;
                Err(ListenerError::WebSocketError(format!(
                    "Connection failed: {}",
                    e
                )))
            }
        }
    }

    async fn disconnect(&self) -> Result<()> {
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.close().await;
            info!("🔌 行情源连接已断开");
        }
        self.reader.lock().await.take();
        *self.state.write().await = ConnectionState::Disconnected;
        Ok(())
    }

    async fn send(&self, message: String) -> Result<()> {
        let mut writer_guard = self.writer.lock().await;
        if let Some(writer) = writer_guard.as_mut() {
            writer
                .send(Message::Text(message.clone()))
                .await
                .map_err(|e| {
                    error!("❌ 发送WebSocket消息失败: {}", e);
                    ListenerError::WebSocketError(format!("Send failed: {}", e))
                })?;
            trace!("📤 发送WebSocket消息: {}", message);
            Ok(())
        } else {
            Err(ListenerError::WebSocketError("Not connected".to_string()))
        }
    }

    async fn receive(&self) -> Result<SocketEvent> {
        let mut reader_guard = self.reader.lock().await;
        let reader = match reader_guard.as_mut() {
            Some(reader) => reader,
            None => return Err(ListenerError::WebSocketError("Not connected".to_string())),
        };

        match reader.next().await {
            Some(Ok(Message::Text(text))) => {
                // 只在TRACE级别记录原始消息
                trace!(
                    "📥 接收WebSocket消息: {}",
                    if text.len() <= 200 {
                        &text
                    } else {
                        &text[..200]
                    }
                );
                Ok(SocketEvent::Text(text))
            }
            Some(Ok(Message::Ping(data))) => {
                // 自动回复Pong
                drop(reader_guard);
                let mut writer_guard = self.writer.lock().await;
                if let Some(writer) = writer_guard.as_mut() {
                    let _ = writer.send(Message::Pong(data)).await;
                }
                trace!("🎾 回复WebSocket Ping");
                Ok(SocketEvent::Ignored)
            }
            Some(Ok(Message::Close(_))) => {
                info!("🔚 收到WebSocket关闭帧");
                *self.state.write().await = ConnectionState::Disconnected;
                Ok(SocketEvent::Closed)
            }
            Some(Ok(_)) => Ok(SocketEvent::Ignored), // 其他帧类型忽略
            Some(Err(e)) => {
                error!("❌ WebSocket接收错误: {}", e);
                *self.state.write().await = ConnectionState::Disconnected;
                Err(ListenerError::WebSocketError(format!(
                    "Receive error: {}",
                    e
                )))
            }
            None => {
                debug!("🔄 WebSocket流结束");
                *self.state.write().await = ConnectionState::Disconnected;
                Ok(SocketEvent::Closed)
            }
        }
    }

    fn get_state(&self) -> ConnectionState {
        // 同步方法，使用try_read
        self.state
            .try_read()
            .map(|state| state.clone())
            .unwrap_or(ConnectionState::Disconnected)
    }
}

// ============= 重连管理器 =============

/// 自动重连管理器（指数退避）
pub struct ReconnectManager {
    config: ReconnectConfig,
    current_attempts: Arc<RwLock<u32>>,
}

impl ReconnectManager {
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            current_attempts: Arc::new(RwLock::new(0)),
        }
    }

    /// 计算第attempt次重连的等待时间
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_delay =
            self.config.initial_delay_ms as f64 * self.config.backoff_factor.powi(attempt as i32);

        let mut delay_ms = base_delay.min(self.config.max_delay_ms as f64) as u64;

        // 添加抖动以避免雷同重试
        if self.config.jitter {
            use rand::Rng;
            let mut rng = rand::thread_rng();
            let jitter = rng.gen_range(0..=delay_ms / 4);
            delay_ms += jitter;
        }

        Duration::from_millis(delay_ms)
    }

    /// 下一次重连前等待；超出次数上限时报错
    pub async fn wait_before_retry(&self) -> Result<u32> {
        let attempt = {
            let mut attempts = self.current_attempts.write().await;

            if let Some(max) = self.config.max_attempts {
                if *attempts >= max {
                    error!("❌ 达到最大重连次数: {}", max);
                    return Err(ListenerError::ReconnectExhausted(max));
                }
            }

            *attempts += 1;
            *attempts
        };

        let delay = self.calculate_delay(attempt - 1);
        match self.config.max_attempts {
            Some(max) => info!("🔄 尝试重连 {}/{}，等待{:.2}秒", attempt, max, delay.as_secs_f64()),
            None => info!("🔄 尝试重连 第{}次，等待{:.2}秒", attempt, delay.as_secs_f64()),
        }

        sleep(delay).await;
        Ok(attempt)
    }

    /// 连接成功后重置重连计数
    pub async fn reset(&self) {
        let mut attempts = self.current_attempts.write().await;
        if *attempts > 0 {
            warn!("✅ 重连成功（第 {} 次尝试）", *attempts);
        }
        *attempts = 0;
    }
}
