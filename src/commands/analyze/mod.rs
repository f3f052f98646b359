//! # analyze 命令实现
//!
//! 后处理统一入口，包含多个子命令：
//! - `prp`: 单个性质文件的统计与时间序列图
//! - `isotherm`: 生产运行汇总为吸附等温线
//!
//! ## 依赖关系
//! - 使用 `cli/analyze.rs` 定义的参数
//! - 子模块: prp, isotherm

pub mod isotherm;
pub mod prp;

use crate::cli::analyze::{AnalyzeArgs, AnalyzeCommands};
use crate::error::Result;

/// 执行 analyze 命令
pub fn execute(args: AnalyzeArgs) -> Result<()> {
    match args.command {
        AnalyzeCommands::Prp(prp_args) => prp::execute(prp_args),
        AnalyzeCommands::Isotherm(isotherm_args) => isotherm::execute(isotherm_args),
    }
}
