//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `prepare`: 由模板生成（并可启动）Cassandra 运行目录
//! - `calibrate`: 化学势–压力标定
//! - `analyze`: 后处理（嵌套子命令）
//!   - `prp`: 单个性质文件统计
//!   - `isotherm`: 吸附等温线汇总与对比
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: prepare, calibrate, analyze

pub mod analyze;
pub mod calibrate;
pub mod prepare;

use clap::{Parser, Subcommand};

/// cassutil - Cassandra GCMC 吸附工作流工具箱
#[derive(Parser)]
#[command(name = "cassutil")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Workflow toolkit for Cassandra GCMC adsorption studies", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Create (and optionally launch) Cassandra run directories from a template input
    Prepare(prepare::PrepareArgs),

    /// Fit chemical potential against ln(pressure) from calibration runs
    Calibrate(calibrate::CalibrateArgs),

    /// Post-process Cassandra property files
    Analyze(analyze::AnalyzeArgs),
}
