//! # prepare 子命令 CLI 定义
//!
//! 由 Cassandra 输入模板批量生成运行目录，可本地运行或提交到 Slurm
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/prepare.rs`

use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// 启动方式
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum Scheduler {
    /// Plain bash script (run.sh)
    Local,
    /// Slurm batch script (job.sbatch)
    Slurm,
}

/// prepare 子命令参数
#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Cassandra input file used as template
    #[arg(long)]
    pub template: PathBuf,

    /// Root directory for run folders
    #[arg(long, default_value = "runs")]
    pub jobs_root: PathBuf,

    /// Chemical potentials in kJ/mol, one calibration run each (e.g. '-36,-34,-32')
    #[arg(
        long,
        value_delimiter = ',',
        allow_hyphen_values = true,
        required_unless_present = "pressure",
        conflicts_with = "pressure"
    )]
    pub mu: Vec<f64>,

    /// Target pressures in bar, converted to µ with the calibration fit
    #[arg(long, value_delimiter = ',')]
    pub pressure: Vec<f64>,

    /// Calibration fit CSV written by 'calibrate' (used with --pressure)
    #[arg(long, default_value = "calibration_fit.csv")]
    pub fit: PathBuf,

    /// Run name; Cassandra output files become '<name>.out.*'
    #[arg(long, default_value = "gcmc")]
    pub run_name: String,

    /// Base random seed; run i gets seeds (seed + 2i, seed + 2i + 1)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Support files copied into every run directory (comma-separated: .mcf, .ff, .xyz, fragment libraries)
    #[arg(long, value_delimiter = ',')]
    pub copy: Vec<PathBuf>,

    /// Regenerate run directories that already contain an input file
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,

    // ─────────────────────────────────────────────────────────────
    // Execution options
    // ─────────────────────────────────────────────────────────────
    /// Launch script flavour
    #[arg(long, value_enum, default_value = "local")]
    pub scheduler: Scheduler,

    /// Cassandra executable
    #[arg(long, env = "CASSANDRA_EXEC", default_value = "cassandra.exe")]
    pub cassandra_exec: String,

    /// OpenMP threads per run
    #[arg(long, env = "CASSUTIL_THREADS", default_value_t = 1)]
    pub threads: u32,

    // ─────────────────────────────────────────────────────────────
    // Slurm options
    // ─────────────────────────────────────────────────────────────
    /// Slurm partition
    #[arg(long, default_value = "cpu")]
    pub partition: String,

    /// Slurm constraint
    #[arg(long)]
    pub constraint: Option<String>,

    /// Memory per CPU
    #[arg(long, default_value = "2G")]
    pub mem_per_cpu: String,

    /// Time limit (e.g., '24:00:00')
    #[arg(long, default_value = "24:00:00")]
    pub time: String,

    /// Modules to load (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub modules: Vec<String>,

    // ─────────────────────────────────────────────────────────────
    // Execution control
    // ─────────────────────────────────────────────────────────────
    /// Run Cassandra locally, one run after another
    #[arg(long, default_value_t = false, conflicts_with = "submit")]
    pub run: bool,

    /// Submit jobs with sbatch (requires --scheduler slurm)
    #[arg(long, default_value_t = false)]
    pub submit: bool,
}
