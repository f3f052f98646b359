//! # 数据模型模块
//!
//! 定义性质时间序列、标定和等温线数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/`、`analysis/` 和 `commands/` 使用
//! - 子模块: series, calibration, isotherm

pub mod calibration;
pub mod isotherm;
pub mod series;

pub use calibration::{CalibrationFit, CalibrationPoint, RunManifestEntry};
pub use isotherm::{IsothermPoint, LoadingScale, ReferencePoint};
pub use series::{PropertySeries, Warmup};
