/// 行情信号与控制消息的公共类型定义
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::ListenerError;

// ============= 行情信号 =============

/// 单笔标准化行情信号
///
/// 由解码器按消息生成，分发后即丢弃，核心不做任何持久化。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub price: f64,
    pub volume: f64,
    pub timestamp: DateTime<Utc>,
}

impl Tick {
    /// 从毫秒时间戳构造
    pub fn from_millis(symbol: impl Into<String>, price: f64, volume: f64, millis: i64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            volume,
            timestamp: DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now),
        }
    }
}

// ============= 控制消息 =============

/// 控制消息动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    Subscribe,
    Unsubscribe,
}

/// 发往上游行情源的订阅控制消息
///
/// 线上格式: {"type":"subscribe","symbol":"AAPL"}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlMessage {
    #[serde(rename = "type")]
    pub action: ControlAction,
    pub symbol: String,
}

impl ControlMessage {
    pub fn subscribe(symbol: impl Into<String>) -> Self {
        Self {
            action: ControlAction::Subscribe,
            symbol: symbol.into(),
        }
    }

    pub fn unsubscribe(symbol: impl Into<String>) -> Self {
        Self {
            action: ControlAction::Unsubscribe,
            symbol: symbol.into(),
        }
    }

    /// 序列化为发送用的文本帧
    pub fn to_text(&self) -> Result<String, ListenerError> {
        Ok(serde_json::to_string(self)?)
    }
}
