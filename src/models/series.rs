//! # 性质时间序列数据模型
//!
//! 存储 Cassandra `.prp` 文件解析后的列数据，并提供预平衡段（warm-up）截断。
//!
//! ## 依赖关系
//! - 被 `parsers/prp.rs` 构建
//! - 被 `commands/calibrate.rs`, `commands/analyze/` 使用

use crate::analysis::stats::{self, BlockStats};
use crate::error::{CassutilError, Result};

/// 预平衡段的截断方式
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Warmup {
    /// 丢弃前 n 个采样点
    Rows(usize),
    /// 丢弃步数 <= s 的采样点
    Steps(f64),
}

impl Default for Warmup {
    fn default() -> Self {
        Warmup::Rows(0)
    }
}

impl std::fmt::Display for Warmup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warmup::Rows(n) => write!(f, "first {} samples", n),
            Warmup::Steps(s) => write!(f, "steps <= {}", s),
        }
    }
}

impl Warmup {
    /// 根据步数列计算生产段起始下标
    pub fn production_start(&self, steps: &[f64]) -> usize {
        match *self {
            Warmup::Rows(n) => n.min(steps.len()),
            Warmup::Steps(s) => steps.iter().position(|&x| x > s).unwrap_or(steps.len()),
        }
    }
}

/// Cassandra 性质时间序列（按列存储）
#[derive(Debug, Clone)]
pub struct PropertySeries {
    /// 来源名称（通常为文件路径）
    pub name: String,

    /// `# Run_Name:` 头部给出的运行名
    pub run_name: Option<String>,

    /// 列名，第一列为步数
    pub columns: Vec<String>,

    /// 列数据，与 `columns` 一一对应
    pub data: Vec<Vec<f64>>,
}

impl PropertySeries {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        let data = vec![Vec::new(); columns.len()];
        PropertySeries {
            name: name.into(),
            run_name: None,
            columns,
            data,
        }
    }

    /// 采样点数量
    pub fn len(&self) -> usize {
        self.data.first().map(|c| c.len()).unwrap_or(0)
    }

    /// 追加一行数据（调用方保证宽度一致）
    pub fn push_row(&mut self, row: &[f64]) {
        for (col, value) in self.data.iter_mut().zip(row) {
            col.push(*value);
        }
    }

    /// 按名称查找列（大小写不敏感）
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    /// 获取列数据
    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.column_index(name)
            .map(|i| self.data[i].as_slice())
            .ok_or_else(|| CassutilError::MissingColumn {
                column: name.to_string(),
                path: self.name.clone(),
            })
    }

    /// 步数列
    pub fn steps(&self) -> &[f64] {
        self.data.first().map(|c| c.as_slice()).unwrap_or(&[])
    }

    /// 某物种的分子数列名，如 `Nmols_1`
    pub fn nmols_column(species: usize) -> String {
        format!("Nmols_{}", species)
    }

    /// 截断预平衡段后的列数据
    pub fn production(&self, name: &str, warmup: Warmup) -> Result<&[f64]> {
        let values = self.column(name)?;
        let start = warmup.production_start(self.steps());
        let remainder = &values[start..];
        if remainder.is_empty() {
            return Err(CassutilError::InsufficientData(format!(
                "no samples of '{}' in {} remain after discarding {}",
                name, self.name, warmup
            )));
        }
        Ok(remainder)
    }

    /// 生产段的块平均统计
    pub fn block_stats(&self, name: &str, warmup: Warmup, n_blocks: usize) -> Result<BlockStats> {
        stats::block_average(self.production(name, warmup)?, n_blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_series() -> PropertySeries {
        let mut s = PropertySeries::new(
            "test.prp",
            vec!["MC_STEP".into(), "Pressure".into(), "Nmols_1".into()],
        );
        for (step, p, n) in [
            (100.0, 9.0, 1.0),
            (200.0, 9.0, 2.0),
            (300.0, 1.0, 10.0),
            (400.0, 3.0, 12.0),
        ] {
            s.push_row(&[step, p, n]);
        }
        s
    }

    #[test]
    fn test_column_lookup_is_case_insensitive() {
        let s = sample_series();
        assert_eq!(s.column_index("pressure"), Some(1));
        assert_eq!(s.column("NMOLS_1").unwrap(), &[1.0, 2.0, 10.0, 12.0]);
        assert!(matches!(
            s.column("Energy_Total"),
            Err(CassutilError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_warmup_rows_and_steps() {
        let s = sample_series();
        assert_eq!(s.production("Pressure", Warmup::Rows(2)).unwrap(), &[1.0, 3.0]);
        assert_eq!(
            s.production("Pressure", Warmup::Steps(200.0)).unwrap(),
            &[1.0, 3.0]
        );
        assert_eq!(
            s.production("Pressure", Warmup::Steps(250.0)).unwrap(),
            &[1.0, 3.0]
        );
        assert_eq!(s.production("Pressure", Warmup::default()).unwrap().len(), 4);
    }

    #[test]
    fn test_block_stats_use_production_samples() {
        let s = sample_series();
        let stats = s.block_stats("Nmols_1", Warmup::Rows(2), 2).unwrap();
        assert_eq!(stats.n_samples, 2);
        assert!((stats.mean - 11.0).abs() < 1e-12);
        assert!((stats.std_err.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_warmup_consuming_everything_is_an_error() {
        let s = sample_series();
        assert!(matches!(
            s.production("Pressure", Warmup::Rows(10)),
            Err(CassutilError::InsufficientData(_))
        ));
        assert!(matches!(
            s.production("Pressure", Warmup::Steps(400.0)),
            Err(CassutilError::InsufficientData(_))
        ));
    }
}
