//! # Cassandra .prp 性质文件解析器
//!
//! 解析 Cassandra 输出的性质时间序列文件（`<run>.out.prp` 或 `.boxN.prp`）。
//!
//! ```text
//! # Run_Name:  gcmc.out
//! #   MC_STEP     Energy_Total      Pressure        Nmols_1
//! #              (kJ/mol)-Ext         (bar)
//!         1000  -0.1234567890E+04  0.1234567890E+01  0.1000000000E+02
//! ```
//!
//! ## 依赖关系
//! - 被 `commands/calibrate.rs`, `commands/analyze/` 使用
//! - 使用 `models/series.rs`

use crate::error::{CassutilError, Result};
use crate::models::PropertySeries;
use std::fs;
use std::path::Path;

/// 解析 .prp 文件
pub fn parse_prp_file(path: &Path) -> Result<PropertySeries> {
    let content = fs::read_to_string(path).map_err(|e| CassutilError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_prp_content(&content, &path.display().to_string())
}

/// 解析 .prp 文本内容
pub fn parse_prp_content(content: &str, name: &str) -> Result<PropertySeries> {
    let parse_err = |reason: String| CassutilError::ParseError {
        format: "prp".to_string(),
        path: name.to_string(),
        reason,
    };

    let mut run_name: Option<String> = None;
    let mut columns: Option<Vec<String>> = None;
    let mut series: Option<PropertySeries> = None;

    for (lineno, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(header) = line.strip_prefix('#') {
            let header = header.trim();
            if let Some(rest) = header.strip_prefix("Run_Name:") {
                run_name = Some(rest.trim().to_string());
            } else if columns.is_none() && series.is_none() && is_column_header(header) {
                columns = Some(header.split_whitespace().map(String::from).collect());
            }
            // 单位行及其他注释忽略
            continue;
        }

        let row = line
            .split_whitespace()
            .map(parse_fortran_float)
            .collect::<Option<Vec<f64>>>()
            .ok_or_else(|| parse_err(format!("line {}: non-numeric value", lineno + 1)))?;

        let target = series.get_or_insert_with(|| {
            let cols = columns.take().unwrap_or_else(|| {
                (1..=row.len()).map(|i| format!("Column_{}", i)).collect()
            });
            PropertySeries::new(name, cols)
        });

        if row.len() != target.columns.len() {
            return Err(parse_err(format!(
                "line {}: expected {} columns, found {}",
                lineno + 1,
                target.columns.len(),
                row.len()
            )));
        }

        target.push_row(&row);
    }

    let mut series = series.ok_or_else(|| parse_err("no data rows".to_string()))?;
    series.run_name = run_name;
    Ok(series)
}

/// 判断注释行是否为列名行
fn is_column_header(header: &str) -> bool {
    match header.split_whitespace().next() {
        Some(first) => {
            first.eq_ignore_ascii_case("MC_STEP")
                || first.eq_ignore_ascii_case("MC_SWEEP")
                || first.eq_ignore_ascii_case("Step")
        }
        None => false,
    }
}

/// 解析数值，兼容 Fortran 的 D 指数
pub fn parse_fortran_float(token: &str) -> Option<f64> {
    token
        .parse::<f64>()
        .ok()
        .or_else(|| token.replace(['D', 'd'], "E").parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#" # Run_Name:  gcmc.out
 #   MC_STEP     Energy_Total      Pressure        Nmols_1
 #              (kJ/mol)-Ext         (bar)
         1000  -0.1200000000E+03  0.5000000000E+01  0.1000000000E+02
         2000  -0.1500000000E+03  0.4000000000E+01  0.1200000000E+02
         3000  -0.1600000000E+03  0.3000000000E+01  0.1400000000E+02
"#;

    #[test]
    fn test_parse_prp_header_and_rows() {
        let s = parse_prp_content(SAMPLE, "gcmc.out.prp").unwrap();
        assert_eq!(s.run_name.as_deref(), Some("gcmc.out"));
        assert_eq!(
            s.columns,
            vec!["MC_STEP", "Energy_Total", "Pressure", "Nmols_1"]
        );
        assert_eq!(s.len(), 3);
        assert_eq!(s.steps(), &[1000.0, 2000.0, 3000.0]);
        assert_eq!(s.column("Nmols_1").unwrap(), &[10.0, 12.0, 14.0]);
    }

    #[test]
    fn test_parse_fortran_exponent() {
        assert_eq!(parse_fortran_float("0.25D+01"), Some(2.5));
        assert_eq!(parse_fortran_float("-1.0d-1"), Some(-0.1));
        assert_eq!(parse_fortran_float("abc"), None);
    }

    #[test]
    fn test_headerless_file_gets_generic_columns() {
        let s = parse_prp_content("10 1.0 2.0\n20 1.5 2.5\n", "bare.prp").unwrap();
        assert_eq!(s.columns, vec!["Column_1", "Column_2", "Column_3"]);
        assert_eq!(s.column("column_3").unwrap(), &[2.0, 2.5]);
    }

    #[test]
    fn test_width_mismatch_is_reported() {
        let content = "# MC_STEP Pressure\n100 1.0\n200 1.0 3.0\n";
        match parse_prp_content(content, "bad.prp") {
            Err(CassutilError::ParseError { reason, .. }) => assert!(reason.contains("line 3")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_empty_file_is_an_error() {
        assert!(parse_prp_content("# MC_STEP Pressure\n", "empty.prp").is_err());
    }

    #[test]
    fn test_parse_prp_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gcmc.out.prp");
        std::fs::write(&path, SAMPLE).unwrap();
        let s = parse_prp_file(&path).unwrap();
        assert_eq!(s.len(), 3);
        assert!(parse_prp_file(&dir.path().join("missing.prp")).is_err());
    }
}
