//! # 文献等温线数据解析器
//!
//! 读取 `pressure,loading` 两列 CSV（压力单位 bar），允许 `#` 注释行和表头。
//!
//! ## 依赖关系
//! - 被 `commands/analyze/isotherm.rs` 使用
//! - 使用 `csv` crate

use crate::error::{CassutilError, Result};
use crate::models::ReferencePoint;
use std::path::Path;

/// 读取文献数据文件
pub fn parse_reference_file(path: &Path) -> Result<Vec<ReferencePoint>> {
    if !path.exists() {
        return Err(CassutilError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    parse_reference_records(reader, &path.display().to_string())
}

/// 从任意 CSV reader 解析文献数据
pub fn parse_reference_records<R: std::io::Read>(
    mut reader: csv::Reader<R>,
    name: &str,
) -> Result<Vec<ReferencePoint>> {
    let mut points = Vec::new();

    for (i, record) in reader.records().enumerate() {
        let record = record?;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }

        let pressure = record.get(0).and_then(|f| f.parse::<f64>().ok());
        let loading = record.get(1).and_then(|f| f.parse::<f64>().ok());

        match (pressure, loading) {
            (Some(pressure), Some(loading)) => points.push(ReferencePoint { pressure, loading }),
            // 首行允许为表头，但不能含数值
            (None, None) if i == 0 => continue,
            _ => {
                return Err(CassutilError::ParseError {
                    format: "reference CSV".to_string(),
                    path: name.to_string(),
                    reason: format!("record {} is not a 'pressure,loading' pair", i + 1),
                })
            }
        }
    }

    if points.is_empty() {
        return Err(CassutilError::InsufficientData(format!(
            "no reference points in {}",
            name
        )));
    }

    points.sort_by(|a, b| a.pressure.total_cmp(&b.pressure));
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(content: &str) -> csv::Reader<&[u8]> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .comment(Some(b'#'))
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes())
    }

    #[test]
    fn test_header_and_comments() {
        let content = "# methane in TON, 309 K\npressure_bar, loading\n10.0, 1.2\n0.5, 0.1\n";
        let points = parse_reference_records(reader(content), "lit.csv").unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0], ReferencePoint { pressure: 0.5, loading: 0.1 });
    }

    #[test]
    fn test_bad_record_after_header() {
        let content = "p,q\n1.0,2.0\noops,3\n";
        assert!(parse_reference_records(reader(content), "lit.csv").is_err());
    }

    #[test]
    fn test_partly_numeric_first_record_is_an_error() {
        let err = parse_reference_records(reader("0.5,abc\n1.0,2.0\n"), "lit.csv").unwrap_err();
        assert!(matches!(err, CassutilError::ParseError { .. }));
        assert!(err.to_string().contains("record 1"));

        let err = parse_reference_records(reader("0.5\n1.0,2.0\n"), "lit.csv").unwrap_err();
        assert!(matches!(err, CassutilError::ParseError { .. }));
    }

    #[test]
    fn test_empty_reference() {
        assert!(parse_reference_records(reader("# nothing\n"), "lit.csv").is_err());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            parse_reference_file(&dir.path().join("nope.csv")),
            Err(CassutilError::FileNotFound { .. })
        ));
    }
}
