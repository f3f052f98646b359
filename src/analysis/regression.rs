//! # 普通最小二乘线性回归
//!
//! y = slope·x + intercept，附带决定系数 r²。
//!
//! ## 依赖关系
//! - 被 `models/calibration.rs` 调用

use crate::error::{CassutilError, Result};

/// 线性拟合结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub n_points: usize,
}

/// 最小二乘拟合 y 关于 x
pub fn linear_least_squares(xs: &[f64], ys: &[f64]) -> Result<LinearFit> {
    if xs.len() != ys.len() {
        return Err(CassutilError::InvalidArgument(format!(
            "regression inputs differ in length ({} vs {})",
            xs.len(),
            ys.len()
        )));
    }
    let n = xs.len();
    if n < 2 {
        return Err(CassutilError::InsufficientData(format!(
            "linear regression needs at least two points, got {}",
            n
        )));
    }
    if xs.iter().chain(ys).any(|v| !v.is_finite()) {
        return Err(CassutilError::InvalidArgument(
            "regression inputs contain non-finite values".to_string(),
        ));
    }

    let nf = n as f64;
    let x_mean = xs.iter().sum::<f64>() / nf;
    let y_mean = ys.iter().sum::<f64>() / nf;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - x_mean;
        let dy = y - y_mean;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    if sxx <= f64::EPSILON * nf * x_mean.abs().max(1.0) {
        return Err(CassutilError::DegenerateFit(
            "all abscissae are identical".to_string(),
        ));
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;

    let ss_res: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| {
            let r = y - (slope * x + intercept);
            r * r
        })
        .sum();

    // 常数 y 被完美拟合
    let r_squared = if syy > 0.0 { 1.0 - ss_res / syy } else { 1.0 };

    Ok(LinearFit {
        slope,
        intercept,
        r_squared,
        n_points: n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_line() {
        let xs = [-2.0, 0.0, 1.5, 4.0];
        let ys: Vec<f64> = xs.iter().map(|x| 3.0 * x - 1.0).collect();
        let fit = linear_least_squares(&xs, &ys).unwrap();
        assert!((fit.slope - 3.0).abs() < 1e-12);
        assert!((fit.intercept + 1.0).abs() < 1e-12);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_noisy_line() {
        // y = x + 噪声 (+0.1, -0.1, +0.1, -0.1)
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [0.1, 0.9, 2.1, 2.9];
        let fit = linear_least_squares(&xs, &ys).unwrap();
        assert!((fit.slope - 0.96).abs() < 1e-12);
        assert!((fit.intercept - 0.06).abs() < 1e-12);
        assert!(fit.r_squared < 1.0 && fit.r_squared > 0.98);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(matches!(
            linear_least_squares(&[1.0], &[2.0]),
            Err(CassutilError::InsufficientData(_))
        ));
        assert!(matches!(
            linear_least_squares(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]),
            Err(CassutilError::DegenerateFit(_))
        ));
        assert!(linear_least_squares(&[1.0, 2.0], &[1.0]).is_err());
        assert!(linear_least_squares(&[1.0, f64::NAN], &[1.0, 2.0]).is_err());
    }
}
