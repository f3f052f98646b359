//! # prepare 命令实现
//!
//! 由 Cassandra 输入模板批量生成运行目录。
//!
//! ## 功能
//! - `--mu` 生成标定运行，`--pressure` 借助标定拟合生成生产运行
//! - 修改模板的 Run_Name / Chemical_Potential_Info / Seed_Info 段落
//! - 复制力场、分子构型等附属文件
//! - 生成 `run.sh` 或 `job.sbatch`
//! - 写入 `runs.csv` 运行清单
//! - 可选本地依次运行或 sbatch 提交
//!
//! ## 依赖关系
//! - 使用 `cli/prepare.rs` 定义的参数
//! - 使用 `parsers/inp.rs`, `analysis/export.rs`
//! - 使用 `utils/launch.rs`, `utils/output.rs`, `utils/progress.rs`

use crate::analysis::export;
use crate::cli::prepare::{PrepareArgs, Scheduler};
use crate::error::{CassutilError, Result};
use crate::models::RunManifestEntry;
use crate::parsers::inp::CassandraInput;
use crate::utils::launch::{self, SlurmConfig};
use crate::utils::{output, progress};

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tabled::{Table, Tabled};

/// 计划中的一个运行
#[derive(Debug, Clone, PartialEq)]
struct PlannedRun {
    name: String,
    mu: f64,
    target_pressure: Option<f64>,
}

/// 汇总表格行
#[derive(Debug, Clone, Tabled)]
struct RunRow {
    #[tabled(rename = "Run")]
    run: String,
    #[tabled(rename = "µ (kJ/mol)")]
    mu: String,
    #[tabled(rename = "Target P (bar)")]
    pressure: String,
    #[tabled(rename = "Status")]
    status: String,
}

/// 执行 prepare 命令
pub fn execute(args: PrepareArgs) -> Result<()> {
    output::print_header("Cassandra Run Preparation");

    if !args.template.is_file() {
        return Err(CassutilError::FileNotFound {
            path: args.template.display().to_string(),
        });
    }

    if args.submit && args.scheduler != Scheduler::Slurm {
        return Err(CassutilError::InvalidArgument(
            "--submit requires --scheduler slurm".to_string(),
        ));
    }

    for file in &args.copy {
        if !file.is_file() {
            return Err(CassutilError::FileNotFound {
                path: file.display().to_string(),
            });
        }
    }

    let template = CassandraInput::from_file(&args.template)?;
    if let Some(old_name) = template.run_name() {
        output::print_info(&format!(
            "Template Run_Name '{}' becomes '{}.out'",
            old_name, args.run_name
        ));
    }
    let template_mu = template.chemical_potentials()?;
    if template_mu.is_empty() {
        return Err(CassutilError::ParseError {
            format: "inp".to_string(),
            path: args.template.display().to_string(),
            reason: "Chemical_Potential_Info lists no values".to_string(),
        });
    }
    if template_mu.len() > 1 {
        output::print_warning(&format!(
            "Template lists {} chemical potentials, only the first is changed",
            template_mu.len()
        ));
    }

    let plan = build_plan(&args)?;
    output::print_info(&format!(
        "Preparing {} runs under '{}'",
        plan.len(),
        args.jobs_root.display()
    ));

    fs::create_dir_all(&args.jobs_root).map_err(|e| CassutilError::FileWriteError {
        path: args.jobs_root.display().to_string(),
        source: e,
    })?;

    let mut rows = Vec::new();
    let mut prepared = Vec::new();
    let mut recorded = Vec::new();

    for (i, run) in plan.iter().enumerate() {
        let run_dir = args.jobs_root.join(&run.name);
        let input_path = run_dir.join(input_file_name(&args.run_name));

        let (status, used) = if input_path.exists() && !args.overwrite {
            output::print_skip(&format!(
                "'{}' already exists (use --overwrite to regenerate)",
                input_path.display()
            ));
            let kept = kept_run(&input_path, run);
            match &kept {
                Some(k) if (k.mu - run.mu).abs() > 1e-9 => output::print_warning(&format!(
                    "'{}' keeps µ = {:.4} kJ/mol (planned {:.4})",
                    run.name, k.mu, run.mu
                )),
                Some(_) => {}
                None => output::print_warning(&format!(
                    "Cannot read µ from '{}', its manifest entry is left unchanged",
                    input_path.display()
                )),
            }
            ("existing", kept)
        } else {
            let mut seed_mu = template_mu.clone();
            seed_mu[0] = run.mu;
            let mut input = template.clone();
            input.set_run_name(&format!("{}.out", args.run_name));
            input.set_chemical_potentials(&seed_mu);
            if let Some(seed) = args.seed {
                let (s1, s2) = seeds_for(seed, i);
                input.set_seeds(s1, s2);
            }
            write_run_dir(&args, &run_dir, &input, &run.name)?;
            ("written", Some(run.clone()))
        };

        rows.push(RunRow {
            run: run.name.clone(),
            mu: used
                .as_ref()
                .map(|r| format!("{:.4}", r.mu))
                .unwrap_or_else(|| "?".to_string()),
            pressure: run
                .target_pressure
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string()),
            status: status.to_string(),
        });
        prepared.push(run_dir);
        recorded.extend(used);
    }

    output::print_header(&format!("Run Directories ({})", rows.len()));
    println!("{}", Table::new(&rows));

    let manifest_path = args.jobs_root.join(export::MANIFEST_FILE);
    let entries = merge_manifest(&manifest_path, &recorded)?;
    export::write_manifest(&entries, &manifest_path)?;
    output::print_success(&format!("Run manifest saved to '{}'", manifest_path.display()));

    let launched = if args.run {
        run_locally(&args, &prepared)?
    } else if args.submit {
        submit_all(&prepared)?
    } else {
        0
    };

    output::print_done(&format!(
        "Prepared {} runs, launched {}",
        prepared.len(),
        launched
    ));

    Ok(())
}

/// 由 `--mu` 或 `--pressure` + 拟合结果生成运行计划
fn build_plan(args: &PrepareArgs) -> Result<Vec<PlannedRun>> {
    let plan: Vec<PlannedRun> = if !args.mu.is_empty() {
        args.mu
            .iter()
            .map(|&mu| PlannedRun {
                name: mu_dir_name(mu),
                mu,
                target_pressure: None,
            })
            .collect()
    } else if !args.pressure.is_empty() {
        if !args.fit.is_file() {
            return Err(CassutilError::FileNotFound {
                path: args.fit.display().to_string(),
            });
        }
        let fit = export::read_fit(&args.fit)?;
        output::print_info(&format!(
            "Using fit µ = {:.4} ln(P) + {:.4} from '{}'",
            fit.slope,
            fit.intercept,
            args.fit.display()
        ));
        args.pressure
            .iter()
            .map(|&p| {
                Ok(PlannedRun {
                    name: pressure_dir_name(p),
                    mu: fit.mu_at(p)?,
                    target_pressure: Some(p),
                })
            })
            .collect::<Result<_>>()?
    } else {
        return Err(CassutilError::InvalidArgument(
            "either --mu or --pressure is required".to_string(),
        ));
    };

    let mut seen = HashSet::new();
    for run in &plan {
        if !seen.insert(run.name.as_str()) {
            return Err(CassutilError::InvalidArgument(format!(
                "duplicate run '{}'",
                run.name
            )));
        }
    }

    Ok(plan)
}

fn mu_dir_name(mu: f64) -> String {
    format!("mu_{}", mu)
}

fn pressure_dir_name(pressure: f64) -> String {
    format!("p_{}bar", pressure)
}

fn input_file_name(run_name: &str) -> String {
    format!("{}.inp", run_name)
}

/// 第 i 个运行的两个随机种子
fn seeds_for(base: u64, index: usize) -> (u64, u64) {
    let first = base.wrapping_add(2 * index as u64);
    (first, first.wrapping_add(1))
}

/// 已存在运行的输入文件中实际写入的 µ
fn kept_run(input_path: &Path, run: &PlannedRun) -> Option<PlannedRun> {
    let input = CassandraInput::from_file(input_path).ok()?;
    let mu = *input.chemical_potentials().ok()?.first()?;
    Some(PlannedRun {
        mu,
        ..run.clone()
    })
}

/// 写入输入文件、附属文件和启动脚本
fn write_run_dir(
    args: &PrepareArgs,
    run_dir: &Path,
    input: &CassandraInput,
    run_name: &str,
) -> Result<()> {
    fs::create_dir_all(run_dir).map_err(|e| CassutilError::FileWriteError {
        path: run_dir.display().to_string(),
        source: e,
    })?;
    // 脚本中的 cd 需要绝对路径
    let workdir = fs::canonicalize(run_dir).map_err(|e| CassutilError::FileReadError {
        path: run_dir.display().to_string(),
        source: e,
    })?;

    let input_name = input_file_name(&args.run_name);
    input.write_to(&run_dir.join(&input_name))?;

    for src in &args.copy {
        let Some(file_name) = src.file_name() else {
            continue;
        };
        let dest = run_dir.join(file_name);
        fs::copy(src, &dest).map_err(|e| CassutilError::FileWriteError {
            path: dest.display().to_string(),
            source: e,
        })?;
    }

    let exec_cmd = launch::cassandra_command(&args.cassandra_exec, &input_name);
    let (script_name, content) = match args.scheduler {
        Scheduler::Local => (
            launch::LOCAL_SCRIPT,
            launch::generate_local_script(&workdir, &exec_cmd, args.threads),
        ),
        Scheduler::Slurm => {
            // 创建 slurm_logs 目录
            fs::create_dir_all(run_dir.join("slurm_logs")).ok();
            let config = SlurmConfig {
                job_name: run_name.replace('/', "_"),
                partition: args.partition.clone(),
                constraint: args.constraint.clone(),
                cpus_per_task: args.threads,
                mem_per_cpu: args.mem_per_cpu.clone(),
                time_limit: args.time.clone(),
                modules: args.modules.clone(),
            };
            (
                launch::SLURM_SCRIPT,
                launch::generate_sbatch_script(&config, &workdir, &exec_cmd),
            )
        }
    };

    let script_path = run_dir.join(script_name);
    fs::write(&script_path, content).map_err(|e| CassutilError::FileWriteError {
        path: script_path.display().to_string(),
        source: e,
    })?;
    make_executable(&script_path);

    output::print_success(&format!("Prepared '{}'", run_dir.display()));
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(meta) = fs::metadata(path) {
        let mut perms = meta.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms).ok();
    }
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}

/// 合并已有清单：同名运行被覆盖，其余保留
fn merge_manifest(path: &Path, runs: &[PlannedRun]) -> Result<Vec<RunManifestEntry>> {
    let mut entries = if path.is_file() {
        export::read_manifest(path)?
    } else {
        Vec::new()
    };

    for run in runs {
        let entry = RunManifestEntry {
            run: run.name.clone(),
            mu_kj_mol: run.mu,
            target_pressure_bar: run.target_pressure,
        };
        match entries.iter_mut().find(|e| e.run == run.name) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
    }

    Ok(entries)
}

/// 本地依次运行 Cassandra
fn run_locally(args: &PrepareArgs, run_dirs: &[PathBuf]) -> Result<usize> {
    let input_name = input_file_name(&args.run_name);
    let mut finished = 0;

    for run_dir in run_dirs {
        let spinner = progress::create_spinner(&format!("Running {}", run_dir.display()));
        let result = Command::new(&args.cassandra_exec)
            .arg(&input_name)
            .current_dir(run_dir)
            .env("OMP_NUM_THREADS", args.threads.to_string())
            .output();
        spinner.finish_and_clear();

        match result {
            Ok(out) => {
                let log = run_dir.join("cassandra.stdout");
                fs::write(&log, &out.stdout).map_err(|e| CassutilError::FileWriteError {
                    path: log.display().to_string(),
                    source: e,
                })?;
                if out.status.success() {
                    output::print_success(&format!("Finished '{}'", run_dir.display()));
                    finished += 1;
                } else {
                    let command = format!(
                        "{} {} (in {})",
                        args.cassandra_exec,
                        input_name,
                        run_dir.display()
                    );
                    output::print_error(&command_failure(command, &out).to_string());
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CassutilError::CommandNotFound {
                    command: args.cassandra_exec.clone(),
                });
            }
            Err(e) => {
                output::print_error(&format!(
                    "Failed to start Cassandra in '{}': {}",
                    run_dir.display(),
                    e
                ));
            }
        }
    }

    Ok(finished)
}

/// 用 sbatch 提交所有运行
fn submit_all(run_dirs: &[PathBuf]) -> Result<usize> {
    let mut submitted = 0;

    for run_dir in run_dirs {
        match Command::new("sbatch")
            .arg(launch::SLURM_SCRIPT)
            .current_dir(run_dir)
            .output()
        {
            Ok(out) if out.status.success() => {
                output::print_success(&format!(
                    "Submitted: {} - {}",
                    run_dir.display(),
                    String::from_utf8_lossy(&out.stdout).trim()
                ));
                submitted += 1;
            }
            Ok(out) => {
                let command = format!("sbatch {} (in {})", launch::SLURM_SCRIPT, run_dir.display());
                output::print_error(&command_failure(command, &out).to_string());
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CassutilError::CommandNotFound {
                    command: "sbatch".to_string(),
                });
            }
            Err(e) => {
                output::print_error(&format!(
                    "Failed to run sbatch for {}: {}",
                    run_dir.display(),
                    e
                ));
            }
        }
    }

    Ok(submitted)
}

/// 外部命令非零退出
fn command_failure(command: String, out: &Output) -> CassutilError {
    let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
    CassutilError::CommandFailed {
        command,
        stderr: if stderr.is_empty() {
            format!("exited with {}", out.status)
        } else {
            stderr
        },
    }
}
