use serde::{Deserialize, Serialize};

use crate::core::error::ListenerError;
use crate::strategies::grid::GridType;

/// 马丁格尔策略参数
///
/// 与网格策略共用价格区间字段，加仓序列按本金推导。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MartingaleParams {
    pub upper_bound: f64,
    pub lower_bound: f64,
    pub grid_count: u32,
    pub grid_type: GridType,
    pub max_drawdown: f64,
    pub principal_balance: f64,
}

impl MartingaleParams {
    /// 参数校验
    pub fn validate(&self) -> Result<(), ListenerError> {
        if self.upper_bound <= self.lower_bound {
            return Err(ListenerError::ConfigError(format!(
                "价格上界必须大于下界: upper={} lower={}",
                self.upper_bound, self.lower_bound
            )));
        }
        if !(1..=32).contains(&self.grid_count) {
            return Err(ListenerError::ConfigError(format!(
                "加仓层数需在1~32之间: {}",
                self.grid_count
            )));
        }
        if self.principal_balance <= 0.0 {
            return Err(ListenerError::ConfigError(format!(
                "本金必须为正数: {}",
                self.principal_balance
            )));
        }
        if !(0.0..=1.0).contains(&self.max_drawdown) {
            return Err(ListenerError::ConfigError(format!(
                "最大回撤比例需在0~1之间: {}",
                self.max_drawdown
            )));
        }
        Ok(())
    }

    /// 生成逐层翻倍的加仓金额序列，总额等于本金
    ///
    /// 第i层金额 = base * 2^i，base = principal / (2^n - 1)
    pub fn entry_amounts(&self) -> Result<Vec<f64>, ListenerError> {
        self.validate()?;

        let n = self.grid_count;
        let total_units = (1u64 << n) - 1;
        let base = self.principal_balance / total_units as f64;

        Ok((0..n).map(|i| base * (1u64 << i) as f64).collect())
    }
}
