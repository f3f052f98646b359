//! # calibrate 命令实现
//!
//! 由标定运行拟合化学势与压力的关系。
//!
//! ## 功能
//! - 扫描标定运行目录，截断预平衡段后求平均压力
//! - 从 `runs.csv` 或各运行的 `.inp` 读取化学势
//! - 最小二乘拟合 µ = slope·ln(P) + intercept
//! - 打印拟合结果与目标压力对应的化学势
//! - 导出 CSV 并绘制标定图
//!
//! ## 依赖关系
//! - 使用 `cli/calibrate.rs` 定义的参数
//! - 使用 `batch/`, `parsers/`, `models/`, `analysis/`
//! - 使用 `utils/output.rs`

use crate::analysis::{export, plot, PlotStyle};
use crate::batch::{BatchRunner, RunCollector, RunDir};
use crate::cli::calibrate::CalibrateArgs;
use crate::error::{CassutilError, Result};
use crate::models::{CalibrationFit, CalibrationPoint, Warmup};
use crate::parsers::inp::CassandraInput;
use crate::parsers::prp;
use crate::utils::output;

use std::collections::HashMap;
use std::path::Path;
use tabled::{Table, Tabled};

/// 标定点表格行
#[derive(Debug, Clone, Tabled)]
struct PointRow {
    #[tabled(rename = "Run")]
    run: String,
    #[tabled(rename = "µ (kJ/mol)")]
    mu: String,
    #[tabled(rename = "<P> (bar)")]
    pressure: String,
    #[tabled(rename = "± (bar)")]
    error: String,
    #[tabled(rename = "ln P")]
    ln_p: String,
    #[tabled(rename = "µ fit - µ")]
    residual: String,
    #[tabled(rename = "P fit (bar)")]
    fitted_pressure: String,
}

/// 目标压力表格行
#[derive(Debug, Clone, Tabled)]
struct TargetRow {
    #[tabled(rename = "Target P (bar)")]
    pressure: String,
    #[tabled(rename = "µ (kJ/mol)")]
    mu: String,
}

/// 执行标定
pub fn execute(args: CalibrateArgs) -> Result<()> {
    output::print_header("Chemical Potential Calibration");

    if !args.job_dir.exists() {
        return Err(CassutilError::DirectoryNotFound {
            path: args.job_dir.display().to_string(),
        });
    }

    let warmup = args.warmup.to_warmup();
    let runs = RunCollector::new(&args.job_dir)
        .with_pattern(&args.pattern)
        .recursive(args.recursive)
        .collect();

    if runs.is_empty() {
        return Err(CassutilError::NoRunsFound {
            path: args.job_dir.display().to_string(),
        });
    }

    output::print_info(&format!(
        "Found {} runs under '{}', discarding {}",
        runs.len(),
        args.job_dir.display(),
        warmup
    ));

    let manifest = load_manifest_mu(&args.job_dir)?;
    if manifest.is_some() {
        output::print_info(&format!(
            "Reading chemical potentials from '{}'",
            export::MANIFEST_FILE
        ));
    }

    let batch = BatchRunner::new(args.jobs).run(&runs, "Averaging pressure", |run| {
        calibration_point(run, manifest.as_ref(), &args.pressure_column, warmup, args.blocks)
    });

    for (run, err) in &batch.failures {
        output::print_warning(&format!("Skipping '{}': {}", run, err));
    }
    output::print_info(&format!(
        "{} of {} runs averaged",
        batch.successes.len(),
        batch.total()
    ));

    let mut points = batch.successes;
    points.sort_by(|a, b| a.pressure.total_cmp(&b.pressure));

    let fit = CalibrationFit::from_points(&points)?;

    // 标定点表格
    let mut rows = Vec::with_capacity(points.len());
    for p in &points {
        rows.push(PointRow {
            run: p.run.clone(),
            mu: format!("{:.4}", p.mu),
            pressure: format!("{:.6}", p.pressure),
            error: p
                .pressure_err
                .map(|e| format!("{:.6}", e))
                .unwrap_or_else(|| "-".to_string()),
            ln_p: format!("{:.4}", p.pressure.ln()),
            residual: format!("{:+.4}", fit.mu_at(p.pressure)? - p.mu),
            fitted_pressure: format!("{:.6}", fit.pressure_at(p.mu)?),
        });
    }

    output::print_header(&format!("Calibration Points ({})", rows.len()));
    println!("{}", Table::new(&rows));

    print_fit(&fit, &runs);

    // 目标压力
    let mut targets = Vec::new();
    for &p in &args.target_pressure {
        targets.push((p, fit.mu_at(p)?));
    }
    if !targets.is_empty() {
        let rows: Vec<TargetRow> = targets
            .iter()
            .map(|(p, mu)| TargetRow {
                pressure: format!("{}", p),
                mu: format!("{:.4}", mu),
            })
            .collect();
        output::print_header("Chemical Potentials for Target Pressures");
        println!("{}", Table::new(&rows));
    }

    export::write_calibration_points(&points, &args.output_points)?;
    output::print_success(&format!(
        "Calibration points saved to '{}'",
        args.output_points.display()
    ));

    export::write_fit(&fit, &args.output_fit)?;
    output::print_success(&format!("Fit saved to '{}'", args.output_fit.display()));

    if !args.no_plot {
        let style = PlotStyle::new("Chemical potential calibration", 1000, 700);
        plot::plot_calibration(&points, &fit, &targets, &args.output_plot, &style)?;
        output::print_success(&format!(
            "Calibration plot saved to '{}'",
            args.output_plot.display()
        ));
    }

    output::print_info("r² is not checked automatically; inspect the plot before production runs.");

    Ok(())
}

/// 打印拟合参数
fn print_fit(fit: &CalibrationFit, runs: &[RunDir]) {
    output::print_header("Fit: µ = slope · ln(P / bar) + intercept");
    output::print_value("slope (kJ/mol)", &format!("{:.6}", fit.slope));
    output::print_value("intercept (kJ/mol)", &format!("{:.6}", fit.intercept));
    output::print_value("r²", &format!("{:.6}", fit.r_squared));
    output::print_value("points", &fit.n_points.to_string());
    output::print_value(
        "implied T (K)",
        &format!("{:.2}", fit.implied_temperature()),
    );

    // 与输入温度对照
    let temperature = runs
        .iter()
        .filter_map(|r| r.input_file())
        .filter_map(|p| CassandraInput::from_file(&p).ok())
        .find_map(|inp| inp.temperature());
    if let Some(t) = temperature {
        output::print_value("input T (K)", &format!("{:.2}", t));
    }
    println!();
}

/// 读取运行清单中的化学势
fn load_manifest_mu(job_dir: &Path) -> Result<Option<HashMap<String, f64>>> {
    let path = job_dir.join(export::MANIFEST_FILE);
    if !path.is_file() {
        return Ok(None);
    }
    let entries = export::read_manifest(&path)?;
    Ok(Some(
        entries.into_iter().map(|e| (e.run, e.mu_kj_mol)).collect(),
    ))
}

/// 单个运行的化学势：优先清单，其次输入文件
fn chemical_potential(run: &RunDir, manifest: Option<&HashMap<String, f64>>) -> Result<f64> {
    if let Some(mu) = manifest.and_then(|m| m.get(&run.name)) {
        return Ok(*mu);
    }

    let input = run.input_file().ok_or_else(|| CassutilError::FileNotFound {
        path: run.dir.join("*.inp").display().to_string(),
    })?;
    let inp = CassandraInput::from_file(&input)?;
    inp.chemical_potentials()?
        .first()
        .copied()
        .ok_or_else(|| CassutilError::MissingSection {
            section: "Chemical_Potential_Info".to_string(),
            path: input.display().to_string(),
        })
}

/// 单个标定运行的平均结果
fn calibration_point(
    run: &RunDir,
    manifest: Option<&HashMap<String, f64>>,
    pressure_column: &str,
    warmup: Warmup,
    blocks: usize,
) -> Result<CalibrationPoint> {
    let mu = chemical_potential(run, manifest)?;
    let series = prp::parse_prp_file(&run.property_file)?;
    let stats = series.block_stats(pressure_column, warmup, blocks)?;

    Ok(CalibrationPoint {
        run: run.name.clone(),
        mu,
        pressure: stats.mean,
        pressure_err: stats.std_err,
        samples: stats.n_samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::analyze::WarmupArgs;
    use crate::models::RunManifestEntry;
    use std::fs;
    use std::path::PathBuf;

    /// 按理想气体关系生成一个标定运行
    fn write_run(root: &Path, name: &str, mu: f64, pressure: f64, with_inp: bool) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        let mut prp = String::from("# Run_Name: equil.out\n# MC_STEP Energy_Total Pressure Nmols_1\n");
        // 预平衡段压力偏离 10 倍
        for step in 1..=4 {
            prp.push_str(&format!("{} -1.0 {:E} 3\n", step * 100, pressure * 10.0));
        }
        for step in 5..=14 {
            prp.push_str(&format!("{} -1.0 {:E} 3\n", step * 100, pressure));
        }
        fs::write(dir.join("equil.out.prp"), prp).unwrap();
        if with_inp {
            fs::write(
                dir.join("equil.inp"),
                format!(
                    "# Temperature_Info\n300.0\n!---\n# Chemical_Potential_Info\n{}\n!---\nEND\n",
                    mu
                ),
            )
            .unwrap();
        }
    }

    fn args(root: &Path, out: &Path) -> CalibrateArgs {
        CalibrateArgs {
            job_dir: root.to_path_buf(),
            warmup: WarmupArgs {
                warmup_steps: Some(400.0),
                warmup_rows: None,
            },
            pressure_column: "Pressure".to_string(),
            blocks: 5,
            target_pressure: vec![1.0, 5.0],
            output_fit: out.join("fit.csv"),
            output_points: out.join("points.csv"),
            output_plot: out.join("calibration.png"),
            no_plot: true,
            pattern: "*.prp".to_string(),
            recursive: false,
            jobs: 2,
        }
    }

    #[test]
    fn test_calibrate_from_input_files() {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let (slope, intercept) = (2.5, -31.0);
        for p in [0.2, 1.5, 12.0] {
            let mu = slope * f64::ln(p) + intercept;
            write_run(root.path(), &format!("mu_{:.3}", mu), mu, p, true);
        }

        execute(args(root.path(), out.path())).unwrap();

        let fit = export::read_fit(&out.path().join("fit.csv")).unwrap();
        assert!((fit.slope - slope).abs() < 1e-6);
        assert!((fit.intercept - intercept).abs() < 1e-6);
        assert_eq!(fit.n_points, 3);
    }

    #[test]
    fn test_manifest_takes_precedence_and_bad_runs_are_skipped() {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_run(root.path(), "a", 0.0, 1.0, false);
        write_run(root.path(), "b", 0.0, 10.0, false);
        // 无清单条目、无输入文件
        write_run(root.path(), "orphan", 0.0, 3.0, false);

        let manifest = vec![
            RunManifestEntry {
                run: "a".to_string(),
                mu_kj_mol: -30.0,
                target_pressure_bar: None,
            },
            RunManifestEntry {
                run: "b".to_string(),
                mu_kj_mol: -30.0 + 2.0 * f64::ln(10.0),
                target_pressure_bar: None,
            },
        ];
        export::write_manifest(&manifest, &root.path().join(export::MANIFEST_FILE)).unwrap();

        execute(args(root.path(), out.path())).unwrap();
        let fit = export::read_fit(&out.path().join("fit.csv")).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-9);
        assert!((fit.intercept + 30.0).abs() < 1e-9);
        assert_eq!(fit.n_points, 2);
    }

    #[test]
    fn test_missing_job_dir() {
        let out = tempfile::tempdir().unwrap();
        let missing = PathBuf::from("/nonexistent/cassutil/calibration");
        assert!(matches!(
            execute(args(&missing, out.path())),
            Err(CassutilError::DirectoryNotFound { .. })
        ));
    }
}
