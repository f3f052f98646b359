//! # 时间序列统计
//!
//! 均值、样本标准差与块平均误差估计。
//!
//! ## 依赖关系
//! - 被 `commands/` 中的平均流程使用

use crate::error::{CassutilError, Result};

/// 块平均统计结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockStats {
    /// 全部采样的均值
    pub mean: f64,
    /// 全部采样的样本标准差
    pub std_dev: f64,
    /// 块均值的标准误差，块数不足两个时为 None
    pub std_err: Option<f64>,
    pub n_blocks: usize,
    pub n_samples: usize,
}

/// 算术平均
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// 样本标准差 (n - 1)
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// 块平均：将序列等分为 `n_blocks` 块（末尾多余采样丢弃）
pub fn block_average(values: &[f64], n_blocks: usize) -> Result<BlockStats> {
    let mean_all = mean(values).ok_or_else(|| {
        CassutilError::InsufficientData("cannot average an empty series".to_string())
    })?;
    let std_all = std_dev(values).unwrap_or(0.0);

    let n_blocks = n_blocks.min(values.len());
    let std_err = if n_blocks >= 2 {
        let block_len = values.len() / n_blocks;
        let block_means: Vec<f64> = values
            .chunks_exact(block_len)
            .take(n_blocks)
            .filter_map(mean)
            .collect();
        std_dev(&block_means).map(|s| s / (n_blocks as f64).sqrt())
    } else {
        None
    };

    Ok(BlockStats {
        mean: mean_all,
        std_dev: std_all,
        std_err,
        n_blocks,
        n_samples: values.len(),
    })
}
