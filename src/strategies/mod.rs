pub mod grid;
pub mod martingale;

pub use grid::{GridParams, GridType};
pub use martingale::MartingaleParams;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 策略类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Grid,
    Martingale,
}

/// 策略参数（按类型区分）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy_type", rename_all = "snake_case")]
pub enum StrategySpec {
    Grid(GridParams),
    Martingale(MartingaleParams),
}

impl StrategySpec {
    pub fn kind(&self) -> StrategyKind {
        match self {
            StrategySpec::Grid(_) => StrategyKind::Grid,
            StrategySpec::Martingale(_) => StrategyKind::Martingale,
        }
    }

    /// 参数校验，入池前调用
    pub fn validate(&self) -> Result<(), crate::core::error::ListenerError> {
        match self {
            StrategySpec::Grid(params) => params.validate(),
            StrategySpec::Martingale(params) => params.validate(),
        }
    }
}

/// 策略句柄
///
/// 监听核心只按symbol路由、按(symbol, owner)去重，不解释策略内部参数；
/// 参数归策略子系统所有。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyHandle {
    pub id: i64,
    pub owner_id: i64,
    pub symbol: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub spec: StrategySpec,
}

impl StrategyHandle {
    pub fn kind(&self) -> StrategyKind {
        self.spec.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_grid_spec() -> StrategySpec {
        StrategySpec::Grid(GridParams {
            upper_bound: 200.0,
            lower_bound: 100.0,
            grid_count: 5,
            grid_type: GridType::Arithmetic,
            max_drawdown: 0.2,
            principal_balance: 10_000.0,
        })
    }

    #[test]
    fn test_spec_kind_accessor() {
        assert_eq!(sample_grid_spec().kind(), StrategyKind::Grid);

        let martingale = StrategySpec::Martingale(MartingaleParams {
            upper_bound: 200.0,
            lower_bound: 100.0,
            grid_count: 4,
            grid_type: GridType::Arithmetic,
            max_drawdown: 0.3,
            principal_balance: 5_000.0,
        });
        assert_eq!(martingale.kind(), StrategyKind::Martingale);
    }

    #[test]
    fn test_handle_deserializes_from_yaml() {
        let yaml = r#"
id: 7
owner_id: 42
symbol: "AAPL"
strategy_type: grid
upper_bound: 180.0
lower_bound: 120.0
grid_count: 10
grid_type: arithmetic
max_drawdown: 0.25
principal_balance: 20000.0
"#;
        let handle: StrategyHandle = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(handle.id, 7);
        assert_eq!(handle.owner_id, 42);
        assert_eq!(handle.symbol, "AAPL");
        assert_eq!(handle.kind(), StrategyKind::Grid);
    }
}
