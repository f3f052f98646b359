//! # cassutil - Cassandra GCMC 吸附工作流工具箱
//!
//! 将沸石吸附教程中的化学势标定与后处理脚本用 Rust 重构，统一成单一可执行文件。
//! Monte Carlo 引擎本身、力场分配和分子结构读入仍由外部工具完成。
//!
//! ## 子命令
//! - `prepare`   - 由输入模板生成运行目录，可本地运行或提交到 Slurm
//! - `calibrate` - 拟合 µ = slope·ln(P) + intercept
//! - `analyze`   - 后处理
//!   - `prp`      - 性质文件统计
//!   - `isotherm` - 吸附等温线汇总与文献对比
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── parsers/   (.prp / .inp / 文献 CSV)
//!   │     ├── batch/     (运行目录收集与并行解析)
//!   │     ├── analysis/  (回归、统计、绘图、导出)
//!   │     └── models/    (数据模型)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod analysis;
mod batch;
mod cli;
mod commands;
mod error;
mod models;
mod parsers;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
