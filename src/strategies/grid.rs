use serde::{Deserialize, Serialize};

use crate::core::error::ListenerError;

/// 网格类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridType {
    /// 等差网格
    Arithmetic,
    /// 等比网格
    Geometric,
}

/// 网格策略参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridParams {
    pub upper_bound: f64,
    pub lower_bound: f64,
    pub grid_count: u32,
    pub grid_type: GridType,
    pub max_drawdown: f64,
    pub principal_balance: f64,
}

impl GridParams {
    /// 参数校验
    pub fn validate(&self) -> Result<(), ListenerError> {
        if self.upper_bound <= self.lower_bound {
            return Err(ListenerError::ConfigError(format!(
                "网格上界必须大于下界: upper={} lower={}",
                self.upper_bound, self.lower_bound
            )));
        }
        if self.lower_bound <= 0.0 {
            return Err(ListenerError::ConfigError(format!(
                "网格下界必须为正数: {}",
                self.lower_bound
            )));
        }
        if self.grid_count < 2 {
            return Err(ListenerError::ConfigError(format!(
                "网格数量至少为2: {}",
                self.grid_count
            )));
        }
        Ok(())
    }

    /// 生成网格价位，从下界到上界共grid_count档
    pub fn grid_levels(&self) -> Result<Vec<f64>, ListenerError> {
        self.validate()?;

        let n = self.grid_count;
        let levels = match self.grid_type {
            GridType::Arithmetic => {
                let step = (self.upper_bound - self.lower_bound) / (n - 1) as f64;
                (0..n).map(|i| self.lower_bound + step * i as f64).collect()
            }
            GridType::Geometric => {
                let ratio = (self.upper_bound / self.lower_bound).powf(1.0 / (n - 1) as f64);
                (0..n)
                    .map(|i| self.lower_bound * ratio.powi(i as i32))
                    .collect()
            }
        };

        Ok(levels)
    }
}
