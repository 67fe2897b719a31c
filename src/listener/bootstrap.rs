use std::path::PathBuf;

use async_trait::async_trait;
use log::{info, warn};
use serde::Deserialize;

use crate::core::error::ListenerError;
use crate::listener::registry::SubscriptionRegistry;
use crate::strategies::StrategyHandle;

/// 策略持久化层接口
///
/// 由外部策略子系统实现，列出当前全部活跃策略。
#[async_trait]
pub trait StrategyStore: Send + Sync {
    async fn list_active_strategies(&self) -> anyhow::Result<Vec<StrategyHandle>>;
}

/// 从持久化层加载活跃策略并灌入订阅表
///
/// 查询本身失败时整体报错；之后每条记录独立处理，
/// 冲突或非法记录只跳过该条，不中断其余灌入。
/// 返回实际灌入的条数。
pub async fn load_initial(
    store: &dyn StrategyStore,
    registry: &SubscriptionRegistry,
) -> Result<usize, ListenerError> {
    let strategies = store
        .list_active_strategies()
        .await
        .map_err(|e| ListenerError::PersistenceError(format!("加载活跃策略失败: {}", e)))?;

    let total = strategies.len();
    let mut seeded = 0usize;

    for handle in strategies {
        if let Err(e) = handle.spec.validate() {
            warn!(
                "⚠️ 跳过非法策略记录: id={} symbol={} err={}",
                handle.id, handle.symbol, e
            );
            continue;
        }

        let symbol = handle.symbol.clone();
        let owner_id = handle.owner_id;
        if registry.subscribe(handle).await {
            seeded += 1;
        } else {
            warn!(
                "⚠️ 跳过重复策略记录: symbol={} owner={}",
                symbol, owner_id
            );
        }
    }

    info!("✅ 初始订阅加载完成: {}/{}条", seeded, total);
    Ok(seeded)
}

/// 基于YAML文件的策略来源
///
/// 独立运行时的持久化替身；记录带is_active标记，与库表语义一致。
pub struct FileStrategyStore {
    path: PathBuf,
}

impl FileStrategyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[derive(Deserialize)]
struct StrategyRecord {
    #[serde(default = "default_active")]
    is_active: bool,
    #[serde(flatten)]
    handle: StrategyHandle,
}

fn default_active() -> bool {
    true
}

#[async_trait]
impl StrategyStore for FileStrategyStore {
    async fn list_active_strategies(&self) -> anyhow::Result<Vec<StrategyHandle>> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let records: Vec<StrategyRecord> = serde_yaml::from_str(&contents)?;
        Ok(records
            .into_iter()
            .filter(|r| r.is_active)
            .map(|r| r.handle)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::{GridParams, GridType, StrategySpec};
    use anyhow::anyhow;
    use chrono::Utc;

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

    struct FixedStore {
        strategies: Vec<StrategyHandle>,
    }

    #[async_trait]
    impl StrategyStore for FixedStore {
        async fn list_active_strategies(&self) -> anyhow::Result<Vec<StrategyHandle>> {
            Ok(self.strategies.clone())
        }
    }

    struct FailingStore;

    #[async_trait]
    impl StrategyStore for FailingStore {
        async fn list_active_strategies(&self) -> anyhow::Result<Vec<StrategyHandle>> {
            Err(anyhow!("数据库不可用"))
        }
    }

    #[tokio::test]
    async fn test_seeds_all_distinct_strategies() {
        let registry = SubscriptionRegistry::new();
        let store = FixedStore {
            strategies: vec![
                handle(1, 100, "TSLA"),
                handle(2, 101, "TSLA"),
                handle(3, 102, "GOOG"),
            ],
        };

        let seeded = load_initial(&store, &registry).await.unwrap();
        assert_eq!(seeded, 3);
        assert_eq!(registry.symbol_count().await, 2);
        assert_eq!(registry.entry_count("TSLA").await, 2);
        assert_eq!(registry.entry_count("GOOG").await, 1);
    }

    #[tokio::test]
    async fn test_conflicting_record_is_skipped_not_fatal() {
        let registry = SubscriptionRegistry::new();
        let store = FixedStore {
            strategies: vec![
                handle(1, 100, "TSLA"),
                handle(2, 100, "TSLA"), // 同owner同symbol，冲突
                handle(3, 102, "GOOG"),
            ],
        };

        let seeded = load_initial(&store, &registry).await.unwrap();
        assert_eq!(seeded, 2);
        assert_eq!(registry.entry_count("TSLA").await, 1);
        assert_eq!(registry.entry_count("GOOG").await, 1);
    }

    #[tokio::test]
    async fn test_invalid_record_is_skipped_not_fatal() {
        let registry = SubscriptionRegistry::new();
        let mut bad = handle(2, 101, "TSLA");
        if let StrategySpec::Grid(params) = &mut bad.spec {
            params.upper_bound = 0.0; // 非法区间
        }
        let store = FixedStore {
            strategies: vec![handle(1, 100, "TSLA"), bad],
        };

        let seeded = load_initial(&store, &registry).await.unwrap();
        assert_eq!(seeded, 1);
        assert_eq!(registry.entry_count("TSLA").await, 1);
    }

    #[tokio::test]
    async fn test_store_failure_is_fatal() {
        let registry = SubscriptionRegistry::new();
        match load_initial(&FailingStore, &registry).await {
            Err(ListenerError::PersistenceError(_)) => {}
            other => panic!("应返回PersistenceError: {:?}", other),
        }
        assert_eq!(registry.symbol_count().await, 0);
    }

    #[tokio::test]
    async fn test_file_store_filters_inactive() {
        let yaml = r#"
- id: 1
  owner_id: 100
  symbol: "TSLA"
  strategy_type: grid
  upper_bound: 300.0
  lower_bound: 200.0
  grid_count: 5
  grid_type: arithmetic
  max_drawdown: 0.2
  principal_balance: 10000.0
- id: 2
  owner_id: 101
  symbol: "GOOG"
  is_active: false
  strategy_type: martingale
  upper_bound: 150.0
  lower_bound: 100.0
  grid_count: 4
  grid_type: geometric
  max_drawdown: 0.3
  principal_balance: 5000.0
"#;
        let dir = std::env::temp_dir().join("rustgrid-test-store");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("strategies.yaml");
        std::fs::write(&path, yaml).unwrap();

        let store = FileStrategyStore::new(&path);
        let strategies = store.list_active_strategies().await.unwrap();
        assert_eq!(strategies.len(), 1);
        assert_eq!(strategies[0].symbol, "TSLA");
    }
}
