//! # 批量处理模块
//!
//! 提供运行目录的统一批量处理能力。
//!
//! ## 功能
//! - 收集含性质文件的运行目录
//! - 并行解析
//! - 进度反馈与失败汇总
//!
//! ## 依赖关系
//! - 被各命令模块使用
//! - 使用 `rayon` 进行并行处理
//! - 使用 `indicatif` 显示进度

pub mod collector;
pub mod runner;

pub use collector::{RunCollector, RunDir};
pub use runner::BatchRunner;
