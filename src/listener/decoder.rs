use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::core::error::ListenerError;
use crate::core::types::Tick;

/// 行情源原始消息解码
///
/// 只有type为"trade"的消息产出信号，其余类型（ping、订阅确认等）一律忽略；
/// 无法解析的消息返回DecodeError，由调用方丢弃该条并继续接收。
pub fn decode_message(text: &str) -> Result<Vec<Tick>, ListenerError> {
    #[derive(Deserialize)]
    struct FeedEnvelope {
        #[serde(rename = "type")]
        kind: String,
        #[serde(default)]
        data: Vec<FeedTradeRow>,
    }

    #[derive(Deserialize)]
    struct FeedTradeRow {
        #[serde(rename = "p")]
        price: f64,
        #[serde(rename = "t")]
        timestamp: i64,
        #[serde(rename = "s")]
        symbol: String,
        #[serde(rename = "v")]
        volume: f64,
    }

    let envelope: FeedEnvelope = serde_json::from_str(text)
        .map_err(|e| ListenerError::DecodeError(format!("无法解析行情消息: {}", e)))?;

    if envelope.kind != "trade" {
        log::trace!("忽略非trade消息: type={}", envelope.kind);
        return Ok(Vec::new());
    }

    Ok(envelope
        .data
        .into_iter()
        .map(|row| Tick {
            symbol: row.symbol,
            price: row.price,
            volume: row.volume,
            timestamp: DateTime::from_timestamp_millis(row.timestamp).unwrap_or_else(Utc::now),
        })
        .collect())
}
