//! # calibrate 子命令 CLI 定义
//!
//! 由若干标定运行拟合 µ = slope·ln(P) + intercept
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 使用 `cli/analyze.rs` 的 `WarmupArgs`
//! - 参数传递给 `commands/calibrate.rs`

use super::analyze::WarmupArgs;
use clap::Args;
use std::path::PathBuf;

/// calibrate 子命令参数
#[derive(Args, Debug)]
pub struct CalibrateArgs {
    /// Root directory containing one calibration run per sub-directory
    pub job_dir: PathBuf,

    #[command(flatten)]
    pub warmup: WarmupArgs,

    /// Name of the pressure column in the property files
    #[arg(long, default_value = "Pressure")]
    pub pressure_column: String,

    /// Number of blocks for block-averaged standard errors
    #[arg(long, default_value_t = 5)]
    pub blocks: usize,

    /// Target pressures in bar to convert to chemical potentials (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub target_pressure: Vec<f64>,

    /// Filename for the fit result CSV
    #[arg(long, default_value = "calibration_fit.csv")]
    pub output_fit: PathBuf,

    /// Filename for the averaged calibration points CSV
    #[arg(long, default_value = "calibration_points.csv")]
    pub output_points: PathBuf,

    /// Filename for the calibration plot (PNG or SVG)
    #[arg(long, default_value = "calibration.png")]
    pub output_plot: PathBuf,

    /// Skip plot generation
    #[arg(long, default_value_t = false)]
    pub no_plot: bool,

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
