//! # prp 分析子命令实现
//!
//! 单个 Cassandra 性质文件的统计摘要。
//!
//! ## 功能
//! - 截断预平衡段后按列给出均值、标准差、块平均误差
//! - 可选导出 CSV
//! - 可选绘制某一列的时间序列（标出截断位置）
//!
//! ## 依赖关系
//! - 使用 `cli/analyze.rs` 定义的 PrpArgs
//! - 使用 `parsers/prp.rs`, `analysis/`

use crate::analysis::{export, plot, PlotStyle};
use crate::cli::analyze::PrpArgs;
use crate::error::{CassutilError, Result};
use crate::models::{PropertySeries, Warmup};
use crate::parsers::prp;
use crate::utils::output;

use serde::Serialize;
use tabled::{Table, Tabled};

/// 单列统计结果
#[derive(Debug, Clone, Serialize, Tabled)]
struct ColumnSummary {
    #[tabled(rename = "Property")]
    column: String,
    #[tabled(rename = "Mean", display_with = "fmt_value")]
    mean: f64,
    #[tabled(rename = "Std dev", display_with = "fmt_value")]
    std_dev: f64,
    #[tabled(rename = "Std err", display_with = "fmt_option")]
    std_err: Option<f64>,
    #[tabled(rename = "Samples")]
    samples: usize,
}

fn fmt_value(v: &f64) -> String {
    format!("{:.6e}", v)
}

fn fmt_option(v: &Option<f64>) -> String {
    v.map(|x| format!("{:.3e}", x))
        .unwrap_or_else(|| "-".to_string())
}

/// 执行 prp 分析
pub fn execute(args: PrpArgs) -> Result<()> {
    output::print_header("Cassandra Property File Summary");

    if !args.file.is_file() {
        return Err(CassutilError::FileNotFound {
            path: args.file.display().to_string(),
        });
    }

    let series = prp::parse_prp_file(&args.file)?;
    let warmup = args.warmup.to_warmup();
    let start = warmup.production_start(series.steps());

    output::print_value("file", &args.file.display().to_string());
    if let Some(run_name) = &series.run_name {
        output::print_value("run name", run_name);
    }
    output::print_value("samples", &series.len().to_string());
    output::print_value(
        "production",
        &format!("{} samples ({} discarded)", series.len() - start, start),
    );
    println!();

    let summaries = summarize(&series, &args.columns, warmup, args.blocks)?;
    println!("{}", Table::new(&summaries));

    if let Some(csv_path) = &args.output_csv {
        export::write_records(&summaries, csv_path)?;
        output::print_success(&format!("Summary saved to '{}'", csv_path.display()));
    }

    if let Some(column) = &args.plot_column {
        let values = series.column(column)?;
        let style = PlotStyle::new(format!("{} vs step", column), 1000, 600);
        plot::plot_series(
            series.steps(),
            values,
            column,
            start,
            &args.output_plot,
            &style,
        )?;
        output::print_success(&format!(
            "Time series saved to '{}'",
            args.output_plot.display()
        ));
    }

    Ok(())
}

/// 统计指定列（为空时统计除步数外的全部列）
fn summarize(
    series: &PropertySeries,
    columns: &[String],
    warmup: Warmup,
    blocks: usize,
) -> Result<Vec<ColumnSummary>> {
    let names: Vec<String> = if columns.is_empty() {
        series.columns.iter().skip(1).cloned().collect()
    } else {
        columns.to_vec()
    };

    names
        .iter()
        .map(|name| {
            let stats = series.block_stats(name, warmup, blocks)?;
            Ok(ColumnSummary {
                column: name.clone(),
                mean: stats.mean,
                std_dev: stats.std_dev,
                std_err: stats.std_err,
                samples: stats.n_samples,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::analyze::WarmupArgs;
    use std::fs;

    const PRP: &str = "\
# Run_Name: gcmc.out
# MC_STEP Energy_Total Pressure Nmols_1
# ( ) (kJ/mol) (bar) ( )
100 -1.0D+02 9.0 1
200 -1.0D+02 9.0 1
300 -2.0D+02 1.0 4
400 -4.0D+02 3.0 6
";

    #[test]
    fn test_summarize_all_columns_after_warmup() {
        let series = prp::parse_prp_content(PRP, "gcmc.out.prp").unwrap();
        let rows = summarize(&series, &[], Warmup::Steps(200.0), 2).unwrap();

        let names: Vec<_> = rows.iter().map(|r| r.column.as_str()).collect();
        assert_eq!(names, vec!["Energy_Total", "Pressure", "Nmols_1"]);
        assert!((rows[1].mean - 2.0).abs() < 1e-12);
        assert!((rows[2].mean - 5.0).abs() < 1e-12);
        assert_eq!(rows[2].samples, 2);
    }

    #[test]
    fn test_unknown_column_is_reported() {
        let series = prp::parse_prp_content(PRP, "gcmc.out.prp").unwrap();
        assert!(matches!(
            summarize(&series, &["Volume".to_string()], Warmup::default(), 5),
            Err(CassutilError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_execute_writes_summary_csv() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("gcmc.out.prp");
        fs::write(&file, PRP).unwrap();
        let csv_path = dir.path().join("summary.csv");

        execute(PrpArgs {
            file,
            warmup: WarmupArgs {
                warmup_steps: None,
                warmup_rows: Some(2),
            },
            columns: vec!["pressure".to_string()],
            blocks: 2,
            output_csv: Some(csv_path.clone()),
            plot_column: None,
            output_plot: dir.path().join("series.png"),
        })
        .unwrap();

        let text = fs::read_to_string(&csv_path).unwrap();
        assert!(text.starts_with("column,mean,std_dev,std_err,samples"));
        assert!(text.contains("pressure,2"));
    }
}
