//! # analyze 子命令 CLI 定义
//!
//! 后处理统一入口，包含多个子命令：
//! - `prp`: 单个性质文件的统计与时间序列图
//! - `isotherm`: 生产运行汇总为吸附等温线，并与文献数据对比
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - `WarmupArgs` 同时被 `cli/calibrate.rs` 使用
//! - 参数传递给 `commands/analyze/` 相应模块

use crate::models::Warmup;
use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────
// 公共参数
// ─────────────────────────────────────────────────────────────

/// 预平衡段截断参数
#[derive(Args, Debug, Clone, Default)]
pub struct WarmupArgs {
    /// Discard samples with MC step <= this value (equilibration)
    #[arg(long, conflicts_with = "warmup_rows")]
    pub warmup_steps: Option<f64>,

    /// Discard this many leading samples (equilibration)
    #[arg(long)]
    pub warmup_rows: Option<usize>,
}

impl WarmupArgs {
    /// 转换为截断方式，未指定时不截断
    pub fn to_warmup(&self) -> Warmup {
        match (self.warmup_steps, self.warmup_rows) {
            (Some(steps), _) => Warmup::Steps(steps),
            (None, Some(rows)) => Warmup::Rows(rows),
            (None, None) => Warmup::Rows(0),
        }
    }
}

// ─────────────────────────────────────────────────────────────
// Analyze 主命令
// ─────────────────────────────────────────────────────────────

/// analyze 主命令参数
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    #[command(subcommand)]
    pub command: AnalyzeCommands,
}

/// analyze 子命令
#[derive(Subcommand, Debug)]
pub enum AnalyzeCommands {
    /// Summarize one Cassandra property (.prp) file
    Prp(PrpArgs),

    /// Build an adsorption isotherm from production runs
    Isotherm(IsothermArgs),
}

// ─────────────────────────────────────────────────────────────
// prp 子命令
// ─────────────────────────────────────────────────────────────

/// prp 子命令参数
#[derive(Args, Debug)]
pub struct PrpArgs {
    /// Path to the property file
    pub file: PathBuf,

    #[command(flatten)]
    pub warmup: WarmupArgs,

    /// Columns to summarize (comma-separated, default: all but the step column)
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Number of blocks for block-averaged standard errors
    #[arg(long, default_value_t = 5)]
    pub blocks: usize,

    /// Save the summary table as CSV
    #[arg(long)]
    pub output_csv: Option<PathBuf>,

    /// Plot the time series of this column
    #[arg(long)]
    pub plot_column: Option<String>,

    /// Filename for the time-series plot (PNG or SVG)
    #[arg(long, default_value = "series.png")]
    pub output_plot: PathBuf,
}

// ─────────────────────────────────────────────────────────────
// isotherm 子命令
// ─────────────────────────────────────────────────────────────

/// 吸附量单位
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum LoadingUnit {
    /// Molecules per unit cell
    #[default]
    PerCell,
    /// mmol per gram of framework (requires --framework-mass)
    MmolPerG,
}

impl std::fmt::Display for LoadingUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadingUnit::PerCell => write!(f, "molecules/uc"),
            LoadingUnit::MmolPerG => write!(f, "mmol/g"),
        }
    }
}

/// isotherm 子命令参数
#[derive(Args, Debug)]
pub struct IsothermArgs {
    /// Root directory containing one production run per sub-directory
    pub job_dir: PathBuf,

    #[command(flatten)]
    pub warmup: WarmupArgs,

    /// Name of the pressure column
    #[arg(long, default_value = "Pressure")]
    pub pressure_column: String,

    /// Adsorbate species index (reads the Nmols_<species> column).
    /// Species 1 is usually the framework when it is listed first
    #[arg(long, default_value_t = 1)]
    pub species: usize,

    /// Number of framework unit cells in the simulation box
    #[arg(long, default_value_t = 1.0)]
    pub unit_cells: f64,

    /// Loading unit
    #[arg(long, value_enum, default_value = "per-cell")]
    pub loading_unit: LoadingUnit,

    /// Framework molar mass per unit cell in g/mol
    #[arg(long)]
    pub framework_mass: Option<f64>,

    /// Literature isotherm CSV (pressure in bar, loading in the chosen unit)
    #[arg(long)]
    pub reference: Option<PathBuf>,

    /// Legend label for the literature data
    #[arg(long, default_value = "Literature")]
    pub reference_label: String,

    /// Number of blocks for block-averaged standard errors
    #[arg(long, default_value_t = 5)]
    pub blocks: usize,

    /// Filename for the isotherm CSV output
    #[arg(long, default_value = "isotherm.csv")]
    pub output_csv: PathBuf,

    /// Filename for the comparison plot (PNG or SVG)
    #[arg(long, default_value = "isotherm.png")]
    pub output_plot: PathBuf,

    /// Skip plot generation
    #[arg(long, default_value_t = false)]
    pub no_plot: bool,

    /// Use a logarithmic pressure axis
    #[arg(long, default_value_t = false)]
    pub log_x: bool,

    /// Title for the plot
    #[arg(long, default_value = "Adsorption isotherm")]
    pub title: String,

    /// Figure width in pixels (PNG) or points (SVG)
    #[arg(long, default_value_t = 1000)]
    pub width: u32,

    /// Figure height in pixels (PNG) or points (SVG)
    #[arg(long, default_value_t = 700)]
    pub height: u32,

    // ─────────────────────────────────────────────────────────────
    // 批量处理参数
    // ─────────────────────────────────────────────────────────────
    /// Glob pattern for property files (comma-separated)
    #[arg(long, default_value = "*.prp")]
    pub pattern: String,

    /// Recurse into nested sub-directories
    #[arg(long, default_value_t = false)]
    pub recursive: bool,

    /// Number of parallel parsing jobs (0 = auto)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warmup_args_conversion() {
        let none = WarmupArgs::default();
        assert_eq!(none.to_warmup(), Warmup::Rows(0));

        let rows = WarmupArgs {
            warmup_steps: None,
            warmup_rows: Some(20),
        };
        assert_eq!(rows.to_warmup(), Warmup::Rows(20));

        let steps = WarmupArgs {
            warmup_steps: Some(5.0e5),
            warmup_rows: None,
        };
        assert_eq!(steps.to_warmup(), Warmup::Steps(5.0e5));
    }
}
