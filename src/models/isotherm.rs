//! # 吸附等温线数据模型
//!
//! ## 依赖关系
//! - 被 `commands/analyze/isotherm.rs` 使用
//! - 被 `analysis/plot.rs`, `analysis/export.rs` 使用

use crate::error::{CassutilError, Result};
use serde::{Deserialize, Serialize};

/// 单个生产运行得到的等温线数据点
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsothermPoint {
    pub run: String,

    /// 平均压力 (bar)
    #[serde(rename = "pressure_bar")]
    pub pressure: f64,

    #[serde(rename = "pressure_err_bar")]
    pub pressure_err: Option<f64>,

    /// 平均吸附量（单位由 `LoadingScale` 决定）
    pub loading: f64,

    pub loading_err: Option<f64>,

    pub samples: usize,
}

/// 文献参考数据点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferencePoint {
    /// 压力 (bar)
    pub pressure: f64,
    pub loading: f64,
}

/// 分子数到吸附量的换算
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadingScale {
    /// 分子数 / 晶胞
    PerUnitCell { unit_cells: f64 },
    /// mmol/g，需要每个晶胞骨架的摩尔质量 (g/mol)
    MmolPerGram { unit_cells: f64, framework_mass: f64 },
}

impl LoadingScale {
    pub fn per_unit_cell(unit_cells: f64) -> Result<Self> {
        if !(unit_cells > 0.0) {
            return Err(CassutilError::InvalidArgument(format!(
                "number of unit cells must be positive, got {}",
                unit_cells
            )));
        }
        Ok(LoadingScale::PerUnitCell { unit_cells })
    }

    pub fn mmol_per_gram(unit_cells: f64, framework_mass: f64) -> Result<Self> {
        Self::per_unit_cell(unit_cells)?;
        if !(framework_mass > 0.0) {
            return Err(CassutilError::InvalidArgument(format!(
                "framework mass per unit cell must be positive, got {}",
                framework_mass
            )));
        }
        Ok(LoadingScale::MmolPerGram {
            unit_cells,
            framework_mass,
        })
    }

    /// 将模拟盒中的分子数换算为吸附量
    pub fn convert(&self, nmols: f64) -> f64 {
        match *self {
            LoadingScale::PerUnitCell { unit_cells } => nmols / unit_cells,
            LoadingScale::MmolPerGram {
                unit_cells,
                framework_mass,
            } => nmols / unit_cells / framework_mass * 1000.0,
        }
    }

    /// 坐标轴标签
    pub fn label(&self) -> &'static str {
        match self {
            LoadingScale::PerUnitCell { .. } => "Loading (molecules/unit cell)",
            LoadingScale::MmolPerGram { .. } => "Loading (mmol/g)",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_unit_cell_conversion() {
        let scale = LoadingScale::per_unit_cell(4.0).unwrap();
        assert!((scale.convert(10.0) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_mmol_per_gram_conversion() {
        // 1 分子/晶胞，晶胞质量 1000 g/mol -> 1 mmol/g
        let scale = LoadingScale::mmol_per_gram(2.0, 1000.0).unwrap();
        assert!((scale.convert(2.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_non_positive_parameters() {
        assert!(LoadingScale::per_unit_cell(0.0).is_err());
        assert!(LoadingScale::mmol_per_gram(1.0, -5.0).is_err());
    }
}
