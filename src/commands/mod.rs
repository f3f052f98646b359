//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `parsers/`, `models/`, `analysis/`, `utils/`
//! - 子模块: prepare, calibrate, analyze

pub mod analyze;
pub mod calibrate;
pub mod prepare;

use crate::cli::Commands;
use crate::error::Result;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Prepare(args) => prepare::execute(args),
        Commands::Calibrate(args) => calibrate::execute(args),
        Commands::Analyze(args) => analyze::execute(args),
    }
}
