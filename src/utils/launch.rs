//! # 启动脚本生成工具
//!
//! 为每个运行目录生成本地 `run.sh` 或 Slurm `job.sbatch`。
//! Cassandra 通过 OpenMP 并行，线程数写入 `OMP_NUM_THREADS`。
//!
//! ## 依赖关系
//! - 被 `commands/prepare.rs` 使用
//! - 无外部模块依赖

use std::path::Path;

/// 本地启动脚本文件名
pub const LOCAL_SCRIPT: &str = "run.sh";

/// Slurm 脚本文件名
pub const SLURM_SCRIPT: &str = "job.sbatch";

/// Slurm 作业配置
#[derive(Debug, Clone)]
pub struct SlurmConfig {
    pub job_name: String,
    pub partition: String,
    pub constraint: Option<String>,
    pub cpus_per_task: u32,
    pub mem_per_cpu: String,
    pub time_limit: String,
    pub modules: Vec<String>,
}

impl Default for SlurmConfig {
    fn default() -> Self {
        SlurmConfig {
            job_name: "gcmc".to_string(),
            partition: "cpu".to_string(),
            constraint: None,
            cpus_per_task: 1,
            mem_per_cpu: "2G".to_string(),
            time_limit: "24:00:00".to_string(),
            modules: vec![],
        }
    }
}

/// Cassandra 命令行
pub fn cassandra_command(exec: &str, input_file: &str) -> String {
    format!("{} {}", exec, input_file)
}

/// 生成本地 bash 脚本（`workdir` 应为绝对路径）
pub fn generate_local_script(workdir: &Path, exec_cmd: &str, threads: u32) -> String {
    format!(
        r#"#!/bin/bash
set -euo pipefail

export OMP_NUM_THREADS={threads}
cd "{workdir}"
echo "Running: {cmd}"
{cmd}
"#,
        threads = threads,
        workdir = workdir.display(),
        cmd = exec_cmd,
    )
}

/// 生成 sbatch 脚本内容（`workdir` 应为绝对路径）
pub fn generate_sbatch_script(config: &SlurmConfig, workdir: &Path, exec_cmd: &str) -> String {
    let module_loads = config
        .modules
        .iter()
        .map(|m| format!("module load {}", m))
        .collect::<Vec<_>>()
        .join("\n");

    let constraint = config
        .constraint
        .as_ref()
        .map(|c| format!("#SBATCH --constraint \"{}\"\n", c))
        .unwrap_or_default();

    format!(
        r#"#!/bin/bash
{constraint}#SBATCH --partition {partition}
#SBATCH --nodes=1
#SBATCH --ntasks=1
#SBATCH --cpus-per-task={cpus}
#SBATCH --mem-per-cpu {mem}
#SBATCH --time {time}
#SBATCH -J {job}
#SBATCH -o slurm_logs/%x.out
#SBATCH -e slurm_logs/%x.err

set -euo pipefail

module purge 2>&1
{modules}

export OMP_NUM_THREADS=${{SLURM_CPUS_PER_TASK:-{cpus}}}
cd "{workdir}"
echo "PWD=$(pwd)"
echo "Running: {cmd}"
{cmd}

echo "Timings:"
sacct -o JobID,Submit,Start,End,CPUTime,State -j $SLURM_JOBID
"#,
        constraint = constraint,
        partition = config.partition,
        cpus = config.cpus_per_task,
        mem = config.mem_per_cpu,
        time = config.time_limit,
        job = config.job_name,
        modules = module_loads,
        workdir = workdir.display(),
        cmd = exec_cmd,
    )
}
