//! # isotherm 分析子命令实现
//!
//! 将一组生产运行汇总为吸附等温线，并与文献数据对比。
//!
//! ## 功能
//! - 并行解析每个运行的性质文件
//! - 截断预平衡段后求平均压力与平均分子数
//! - 分子数换算为 分子/晶胞 或 mmol/g
//! - 打印表格、导出 CSV、绘制对比图
//!
//! ## 依赖关系
//! - 使用 `cli/analyze.rs` 定义的 IsothermArgs
//! - 使用 `batch/`, `parsers/`, `models/`, `analysis/`

use crate::analysis::{export, plot, PlotStyle};
use crate::batch::{BatchRunner, RunCollector, RunDir};
use crate::cli::analyze::{IsothermArgs, LoadingUnit};
use crate::error::{CassutilError, Result};
use crate::models::{IsothermPoint, LoadingScale, PropertySeries, Warmup};
use crate::parsers::{literature, prp};
use crate::utils::output;

use tabled::{Table, Tabled};

/// 等温线表格行
#[derive(Debug, Clone, Tabled)]
struct IsothermRow {
    #[tabled(rename = "Run")]
    run: String,
    #[tabled(rename = "<P> (bar)")]
    pressure: String,
    #[tabled(rename = "± (bar)")]
    pressure_err: String,
    #[tabled(rename = "Loading")]
    loading: String,
    #[tabled(rename = "±")]
    loading_err: String,
    #[tabled(rename = "Samples")]
    samples: usize,
}

fn fmt_err(v: Option<f64>) -> String {
    v.map(|x| format!("{:.4}", x))
        .unwrap_or_else(|| "-".to_string())
}

/// 平均参数
struct AveragingOptions<'a> {
    pressure_column: &'a str,
    nmols_column: String,
    warmup: Warmup,
    blocks: usize,
    scale: LoadingScale,
}

/// 执行等温线分析
pub fn execute(args: IsothermArgs) -> Result<()> {
    output::print_header("Adsorption Isotherm");

    if !args.job_dir.exists() {
        return Err(CassutilError::DirectoryNotFound {
            path: args.job_dir.display().to_string(),
        });
    }

    let scale = loading_scale(&args)?;
    let options = AveragingOptions {
        pressure_column: &args.pressure_column,
        nmols_column: PropertySeries::nmols_column(args.species),
        warmup: args.warmup.to_warmup(),
        blocks: args.blocks,
        scale,
    };

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
        "Found {} runs, averaging '{}' and '{}' after discarding {}",
        runs.len(),
        options.pressure_column,
        options.nmols_column,
        options.warmup
    ));

    let batch = BatchRunner::new(args.jobs).run(&runs, "Averaging runs", |run| {
        isotherm_point(run, &options)
    });

    for (run, err) in &batch.failures {
        output::print_warning(&format!("Skipping '{}': {}", run, err));
    }

    let total = batch.total();
    let mut points = batch.successes;
    if points.is_empty() {
        return Err(CassutilError::InsufficientData(
            "no run could be averaged".to_string(),
        ));
    }
    points.sort_by(|a, b| a.pressure.total_cmp(&b.pressure));

    if loading_is_flat(&points) {
        output::print_warning(&format!(
            "'{}' has the same mean in every run; if species {} is the framework, pass --species for the adsorbate",
            options.nmols_column, args.species
        ));
    }

    let rows: Vec<IsothermRow> = points
        .iter()
        .map(|p| IsothermRow {
            run: p.run.clone(),
            pressure: format!("{:.4}", p.pressure),
            pressure_err: fmt_err(p.pressure_err),
            loading: format!("{:.4}", p.loading),
            loading_err: fmt_err(p.loading_err),
            samples: p.samples,
        })
        .collect();

    output::print_header(&format!("Isotherm Points ({})", args.loading_unit));
    println!("{}", Table::new(&rows));

    export::write_isotherm(&points, &args.output_csv)?;
    output::print_success(&format!("Isotherm saved to '{}'", args.output_csv.display()));

    if !args.no_plot {
        let reference = match &args.reference {
            Some(path) => {
                let data = literature::parse_reference_file(path)?;
                output::print_info(&format!(
                    "Loaded {} literature points from '{}'",
                    data.len(),
                    path.display()
                ));
                data
            }
            None => Vec::new(),
        };

        let style = PlotStyle::new(args.title.clone(), args.width, args.height);
        plot::plot_isotherm(
            &points,
            &reference,
            &args.reference_label,
            scale.label(),
            args.log_x,
            &args.output_plot,
            &style,
        )?;
        output::print_success(&format!(
            "Isotherm plot saved to '{}'",
            args.output_plot.display()
        ));
    }

    output::print_done(&format!(
        "{} of {} runs in the isotherm",
        points.len(),
        total
    ));

    Ok(())
}

/// 根据命令行参数构造吸附量换算
fn loading_scale(args: &IsothermArgs) -> Result<LoadingScale> {
    match args.loading_unit {
        LoadingUnit::PerCell => LoadingScale::per_unit_cell(args.unit_cells),
        LoadingUnit::MmolPerG => {
            let mass = args.framework_mass.ok_or_else(|| {
                CassutilError::InvalidArgument(
                    "--loading-unit mmol-per-g requires --framework-mass".to_string(),
                )
            })?;
            LoadingScale::mmol_per_gram(args.unit_cells, mass)
        }
    }
}

/// 多个运行的吸附量完全相同（通常是选中了骨架分子）
fn loading_is_flat(points: &[IsothermPoint]) -> bool {
    let Some(first) = points.first() else {
        return false;
    };
    let tol = 1e-12 * first.loading.abs().max(1.0);
    points.len() > 1
        && points
            .iter()
            .all(|p| (p.loading - first.loading).abs() <= tol)
}

/// 单个生产运行的等温线数据点
fn isotherm_point(run: &RunDir, options: &AveragingOptions<'_>) -> Result<IsothermPoint> {
    let series = prp::parse_prp_file(&run.property_file)?;
    let pressure = series.block_stats(options.pressure_column, options.warmup, options.blocks)?;
    let nmols = series.block_stats(&options.nmols_column, options.warmup, options.blocks)?;

    Ok(IsothermPoint {
        run: run.name.clone(),
        pressure: pressure.mean,
        pressure_err: pressure.std_err,
        loading: options.scale.convert(nmols.mean),
        loading_err: nmols.std_err.map(|e| options.scale.convert(e)),
        samples: nmols.n_samples,
    })
}
