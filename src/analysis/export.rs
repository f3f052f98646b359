//! # 数据导出与读取
//!
//! 标定点、拟合结果、运行清单和等温线的 CSV 读写。
//!
//! ## 依赖关系
//! - 被 `commands/` 各命令调用
//! - 使用 `csv` + `serde` 序列化 `models/` 中的结构

use crate::error::{CassutilError, Result};
use crate::models::{CalibrationFit, CalibrationPoint, IsothermPoint, RunManifestEntry};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// 运行清单文件名
pub const MANIFEST_FILE: &str = "runs.csv";

/// 序列化一组记录到 CSV
pub fn write_records<T: Serialize>(records: &[T], output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;

    for record in records {
        wtr.serialize(record)?;
    }

    wtr.flush().map_err(|e| CassutilError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// 从 CSV 反序列化记录
fn read_records<T: DeserializeOwned>(input_path: &Path) -> Result<Vec<T>> {
    if !input_path.exists() {
        return Err(CassutilError::FileNotFound {
            path: input_path.display().to_string(),
        });
    }

    let mut rdr = csv::Reader::from_path(input_path)?;
    rdr.deserialize()
        .map(|r| r.map_err(CassutilError::CsvError))
        .collect()
}

/// 导出标定数据点
pub fn write_calibration_points(points: &[CalibrationPoint], output_path: &Path) -> Result<()> {
    write_records(points, output_path)
}

/// 导出拟合结果（单行）
pub fn write_fit(fit: &CalibrationFit, output_path: &Path) -> Result<()> {
    write_records(std::slice::from_ref(fit), output_path)
}

/// 读取拟合结果
pub fn read_fit(input_path: &Path) -> Result<CalibrationFit> {
    read_records::<CalibrationFit>(input_path)?
        .into_iter()
        .next()
        .ok_or_else(|| CassutilError::ParseError {
            format: "fit CSV".to_string(),
            path: input_path.display().to_string(),
            reason: "no fit record".to_string(),
        })
}

/// 导出运行清单
pub fn write_manifest(entries: &[RunManifestEntry], output_path: &Path) -> Result<()> {
    write_records(entries, output_path)
}

/// 读取运行清单
pub fn read_manifest(input_path: &Path) -> Result<Vec<RunManifestEntry>> {
    read_records(input_path)
}

/// 导出等温线
pub fn write_isotherm(points: &[IsothermPoint], output_path: &Path) -> Result<()> {
    write_records(points, output_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration_fit.csv");
        let fit = CalibrationFit {
            slope: 2.569,
            intercept: -31.25,
            r_squared: 0.9987,
            n_points: 4,
        };
        write_fit(&fit, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("slope,intercept,r_squared,n_points"));
        assert_eq!(read_fit(&path).unwrap(), fit);
    }

    #[test]
    fn test_manifest_keeps_optional_pressure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        let entries = vec![
            RunManifestEntry {
                run: "mu_-36".to_string(),
                mu_kj_mol: -36.0,
                target_pressure_bar: None,
            },
            RunManifestEntry {
                run: "p_1bar".to_string(),
                mu_kj_mol: -31.0,
                target_pressure_bar: Some(1.0),
            },
        ];
        write_manifest(&entries, &path).unwrap();
        assert_eq!(read_manifest(&path).unwrap(), entries);
    }

    #[test]
    fn test_read_missing_fit() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_fit(&dir.path().join("none.csv")),
            Err(CassutilError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_calibration_points_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.csv");
        let points = vec![CalibrationPoint {
            run: "mu_-30".to_string(),
            mu: -30.0,
            pressure: 2.0,
            pressure_err: Some(0.1),
            samples: 50,
        }];
        write_calibration_points(&points, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("run,mu_kj_mol,pressure_bar,pressure_err_bar,samples"));
    }
}
