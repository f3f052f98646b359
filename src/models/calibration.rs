//! # 化学势标定数据模型
//!
//! µ = slope·ln(P) + intercept 标定关系及其数据点。
//!
//! ## 依赖关系
//! - 被 `commands/calibrate.rs`, `commands/prepare.rs` 使用
//! - 使用 `analysis/regression.rs` 完成最小二乘拟合

use crate::analysis::regression::{self, LinearFit};
use crate::error::{CassutilError, Result};
use serde::{Deserialize, Serialize};

/// 气体常数 (kJ/mol/K)
pub const GAS_CONSTANT_KJ: f64 = 8.314462618e-3;

/// 单次标定运行的平均结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationPoint {
    /// 运行目录名
    pub run: String,

    /// 化学势 (kJ/mol)
    #[serde(rename = "mu_kj_mol")]
    pub mu: f64,

    /// 生产段平均压力 (bar)
    #[serde(rename = "pressure_bar")]
    pub pressure: f64,

    /// 压力块平均标准误差 (bar)
    #[serde(rename = "pressure_err_bar")]
    pub pressure_err: Option<f64>,

    /// 生产段采样数
    pub samples: usize,
}

/// 标定拟合结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationFit {
    /// 斜率 (kJ/mol)
    pub slope: f64,
    /// 截距 (kJ/mol)
    pub intercept: f64,
    pub r_squared: f64,
    pub n_points: usize,
}

impl From<LinearFit> for CalibrationFit {
    fn from(fit: LinearFit) -> Self {
        CalibrationFit {
            slope: fit.slope,
            intercept: fit.intercept,
            r_squared: fit.r_squared,
            n_points: fit.n_points,
        }
    }
}

impl CalibrationFit {
    /// 对标定点做 µ 关于 ln(P) 的最小二乘拟合
    pub fn from_points(points: &[CalibrationPoint]) -> Result<Self> {
        if points.len() < 2 {
            return Err(CassutilError::InsufficientData(format!(
                "calibration needs at least two runs, got {}",
                points.len()
            )));
        }

        if let Some(bad) = points.iter().find(|p| !(p.pressure > 0.0)) {
            return Err(CassutilError::NonPositivePressure {
                run: bad.run.clone(),
                pressure: bad.pressure,
            });
        }

        let mut distinct_mu: Vec<f64> = points.iter().map(|p| p.mu).collect();
        distinct_mu.sort_by(|a, b| a.total_cmp(b));
        distinct_mu.dedup();
        if distinct_mu.len() < 2 {
            return Err(CassutilError::InsufficientData(
                "calibration needs at least two distinct chemical potentials".to_string(),
            ));
        }

        let ln_p: Vec<f64> = points.iter().map(|p| p.pressure.ln()).collect();
        let mu: Vec<f64> = points.iter().map(|p| p.mu).collect();

        regression::linear_least_squares(&ln_p, &mu).map(CalibrationFit::from)
    }

    /// 目标压力对应的化学势
    pub fn mu_at(&self, pressure: f64) -> Result<f64> {
        if !(pressure > 0.0) {
            return Err(CassutilError::InvalidArgument(format!(
                "target pressure must be positive, got {}",
                pressure
            )));
        }
        Ok(self.slope * pressure.ln() + self.intercept)
    }

    /// 化学势对应的压力（拟合关系的反演）
    pub fn pressure_at(&self, mu: f64) -> Result<f64> {
        if self.slope == 0.0 || !self.slope.is_finite() {
            return Err(CassutilError::DegenerateFit(format!(
                "cannot invert a fit with slope {}",
                self.slope
            )));
        }
        Ok(((mu - self.intercept) / self.slope).exp())
    }

    /// 由斜率推得的理想气体温度 (K)
    pub fn implied_temperature(&self) -> f64 {
        self.slope / GAS_CONSTANT_KJ
    }
}

/// `prepare` 生成的运行清单条目（`runs.csv`）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifestEntry {
    pub run: String,
    pub mu_kj_mol: f64,
    pub target_pressure_bar: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_points(slope: f64, intercept: f64, pressures: &[f64]) -> Vec<CalibrationPoint> {
        pressures
            .iter()
            .enumerate()
            .map(|(i, &p)| CalibrationPoint {
                run: format!("run{}", i),
                mu: slope * p.ln() + intercept,
                pressure: p,
                pressure_err: None,
                samples: 100,
            })
            .collect()
    }

    #[test]
    fn test_fit_recovers_synthetic_parameters() {
        let points = synthetic_points(2.494, -32.7, &[0.05, 0.3, 1.0, 4.2, 25.0]);
        let fit = CalibrationFit::from_points(&points).unwrap();
        assert!((fit.slope - 2.494).abs() < 1e-9);
        assert!((fit.intercept + 32.7).abs() < 1e-9);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
        assert_eq!(fit.n_points, 5);
    }

    #[test]
    fn test_mu_pressure_round_trip() {
        let points = synthetic_points(2.5, -30.0, &[0.1, 1.0, 10.0]);
        let fit = CalibrationFit::from_points(&points).unwrap();
        for target in [0.01, 0.7, 3.0, 55.0] {
            let mu = fit.mu_at(target).unwrap();
            let back = fit.pressure_at(mu).unwrap();
            assert!((back - target).abs() / target < 1e-9);
        }
    }

    #[test]
    fn test_implied_temperature_of_ideal_gas_slope() {
        let t = 300.0;
        let points = synthetic_points(GAS_CONSTANT_KJ * t, -35.0, &[0.5, 2.0, 8.0]);
        let fit = CalibrationFit::from_points(&points).unwrap();
        assert!((fit.implied_temperature() - t).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_single_point_and_non_positive_pressure() {
        let one = synthetic_points(2.5, -30.0, &[1.0]);
        assert!(matches!(
            CalibrationFit::from_points(&one),
            Err(CassutilError::InsufficientData(_))
        ));

        let mut points = synthetic_points(2.5, -30.0, &[1.0, 2.0]);
        points[1].pressure = 0.0;
        match CalibrationFit::from_points(&points) {
            Err(CassutilError::NonPositivePressure { run, .. }) => assert_eq!(run, "run1"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_identical_mu() {
        let mut points = synthetic_points(2.5, -30.0, &[1.0, 2.0, 3.0]);
        for p in &mut points {
            p.mu = -30.0;
        }
        assert!(matches!(
            CalibrationFit::from_points(&points),
            Err(CassutilError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_targets() {
        let fit = CalibrationFit {
            slope: 0.0,
            intercept: -30.0,
            r_squared: 0.0,
            n_points: 2,
        };
        assert!(fit.mu_at(-1.0).is_err());
        assert!(matches!(
            fit.pressure_at(-30.0),
            Err(CassutilError::DegenerateFit(_))
        ));
    }
}
