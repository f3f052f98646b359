//! # 数值分析模块
//!
//! 提供标定与后处理所需的数值计算和输出功能。
//!
//! ## 子模块
//! - `regression`: 最小二乘线性回归
//! - `stats`: 均值、标准差、块平均
//! - `plot`: 图表生成
//! - `export`: CSV 导出与读取
//!
//! ## 依赖关系
//! - 被 `commands/` 和 `models/calibration.rs` 使用

pub mod export;
pub mod plot;
pub mod regression;
pub mod stats;

pub use plot::PlotStyle;
pub use stats::BlockStats;
