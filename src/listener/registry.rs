use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};
use tokio::sync::RwLock;

use crate::core::types::ControlMessage;
use crate::strategies::StrategyHandle;

/// 订阅表内部状态
///
/// symbol索引与待发送控制消息必须在同一把锁下变更，
/// 读取方不会观察到"有symbol但条目为空"的中间状态。
struct RegistryInner {
    pool: HashMap<String, Vec<Arc<StrategyHandle>>>,
    pending: Vec<ControlMessage>,
}

/// 策略订阅表
///
/// 按symbol索引当前活跃策略，同一symbol下owner唯一；
/// 已订阅symbol集合与订阅消息集合在每次变更后保持一致。
pub struct SubscriptionRegistry {
    inner: RwLock<RegistryInner>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner {
                pool: HashMap::new(),
                pending: Vec::new(),
            }),
        }
    }

    /// 添加订阅
    ///
    /// 同一(symbol, owner)重复添加返回false且不做任何变更；
    /// symbol首次出现时向待发送队列追加subscribe消息。
    pub async fn subscribe(&self, handle: StrategyHandle) -> bool {
        let mut inner = self.inner.write().await;

        if let Some(entries) = inner.pool.get(&handle.symbol) {
            if entries.iter().any(|e| e.owner_id == handle.owner_id) {
                debug!(
                    "⚠️ 重复订阅被拒绝: symbol={} owner={}",
                    handle.symbol, handle.owner_id
                );
                return false;
            }
        }

        let symbol = handle.symbol.clone();
        let is_new_symbol = !inner.pool.contains_key(&symbol);

        inner
            .pool
            .entry(symbol.clone())
            .or_default()
            .push(Arc::new(handle));

        if is_new_symbol {
            inner.pending.push(ControlMessage::subscribe(&symbol));
            info!("📌 新增订阅symbol: {}", symbol);
        }

        true
    }

    /// 移除订阅
    ///
    /// 给定策略id时按id匹配，否则按(symbol, owner)匹配；
    /// symbol下最后一条被移除时整个symbol出池并追加unsubscribe消息。
    /// 返回是否确实移除了条目。
    pub async fn unsubscribe(
        &self,
        symbol: &str,
        owner_id: i64,
        strategy_id: Option<i64>,
    ) -> bool {
        let mut inner = self.inner.write().await;

        let entries = match inner.pool.get_mut(symbol) {
            Some(entries) => entries,
            None => {
                debug!("⚠️ 退订的symbol不在池中: {}", symbol);
                return false;
            }
        };

        let before = entries.len();
        match strategy_id {
            Some(id) => entries.retain(|e| e.id != id),
            None => entries.retain(|e| e.owner_id != owner_id),
        }
        let removed = entries.len() < before;

        if entries.is_empty() {
            inner.pool.remove(symbol);
            inner.pending.push(ControlMessage::unsubscribe(symbol));
            info!("🗑 symbol已无订阅者，移除: {}", symbol);
        }

        removed
    }

    /// 查询symbol下的全部策略（热路径，每个tick调用一次）
    pub async fn lookup(&self, symbol: &str) -> Vec<Arc<StrategyHandle>> {
        let inner = self.inner.read().await;
        inner.pool.get(symbol).cloned().unwrap_or_default()
    }

    /// 当前全部订阅消息，重连后按此重放
    pub async fn all_subscription_messages(&self) -> Vec<ControlMessage> {
        let inner = self.inner.read().await;
        inner
            .pool
            .keys()
            .map(|symbol| ControlMessage::subscribe(symbol))
            .collect()
    }

    /// 取走自上次以来累计的控制消息
    pub async fn drain_pending(&self) -> Vec<ControlMessage> {
        let mut inner = self.inner.write().await;
        std::mem::take(&mut inner.pending)
    }

    /// 当前订阅中的symbol数量
    pub async fn symbol_count(&self) -> usize {
        self.inner.read().await.pool.len()
    }

    /// 指定symbol下的条目数量
    pub async fn entry_count(&self, symbol: &str) -> usize {
        self.inner
            .read()
            .await
            .pool
            .get(symbol)
            .map(|e| e.len())
            .unwrap_or(0)
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
