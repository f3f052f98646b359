//! # 图表生成
//!
//! 使用 `plotters` 绘制标定曲线、吸附等温线对比图和性质时间序列。
//!
//! ## 功能
//! - µ–P 标定图（对数压力轴）及拟合直线
//! - 模拟等温线（带误差棒）与文献数据对比
//! - 时间序列图，标出预平衡截断位置
//! - 按扩展名选择 PNG 或 SVG 输出
//!
//! ## 依赖关系
//! - 被 `commands/calibrate.rs`, `commands/analyze/` 调用
//! - 使用 `models/` 中的数据结构

use crate::error::{CassutilError, Result};
use crate::models::{CalibrationFit, CalibrationPoint, IsothermPoint, ReferencePoint};

use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::ranged1d::Ranged;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

const SIM_COLOR: RGBColor = RGBColor(0, 102, 204);
const REF_COLOR: RGBColor = RGBColor(214, 39, 40);

/// 图表外观
#[derive(Debug, Clone)]
pub struct PlotStyle {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl PlotStyle {
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Self {
        PlotStyle {
            title: title.into(),
            width,
            height,
        }
    }
}

fn plot_err<E: std::fmt::Debug>(e: E) -> CassutilError {
    CassutilError::PlotError(format!("{:?}", e))
}

/// 输出路径是否为 SVG
pub fn is_svg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("svg"))
        .unwrap_or(false)
}

/// 数值范围加边距；单点范围时自动展开
fn padded_range(values: impl Iterator<Item = f64>, frac: f64) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    let span = (hi - lo).abs();
    let margin = if span > 0.0 { span * frac } else { lo.abs().max(1.0) * frac };
    (lo - margin, hi + margin)
}

/// 对数轴范围（各向外扩展 20%）
fn log_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| *v > 0.0)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() || !hi.is_finite() {
        return (0.1, 10.0);
    }
    (lo / 1.2, hi * 1.2)
}

// ─────────────────────────────────────────────────────────────
// 标定图
// ─────────────────────────────────────────────────────────────

/// 绘制 µ–P 标定图
pub fn plot_calibration(
    points: &[CalibrationPoint],
    fit: &CalibrationFit,
    targets: &[(f64, f64)],
    output_path: &Path,
    style: &PlotStyle,
) -> Result<()> {
    if is_svg(output_path) {
        let root = SVGBackend::new(output_path, (style.width, style.height)).into_drawing_area();
        draw_calibration_chart(&root, points, fit, targets, style)?;
        root.present().map_err(plot_err)?;
    } else {
        let root =
            BitMapBackend::new(output_path, (style.width, style.height)).into_drawing_area();
        draw_calibration_chart(&root, points, fit, targets, style)?;
        root.present().map_err(plot_err)?;
    }
    Ok(())
}

fn draw_calibration_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    points: &[CalibrationPoint],
    fit: &CalibrationFit,
    targets: &[(f64, f64)],
    style: &PlotStyle,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).map_err(plot_err)?;

    let pressures = points
        .iter()
        .map(|p| p.pressure)
        .chain(targets.iter().map(|t| t.0));
    let (x_min, x_max) = log_range(pressures);
    let fit_line: Vec<(f64, f64)> = (0..=60)
        .map(|i| {
            let p = x_min * (x_max / x_min).powf(i as f64 / 60.0);
            (p, fit.slope * p.ln() + fit.intercept)
        })
        .collect();
    let (y_min, y_max) = padded_range(
        points
            .iter()
            .map(|p| p.mu)
            .chain(fit_line.iter().map(|(_, mu)| *mu))
            .chain(targets.iter().map(|t| t.1)),
        0.08,
    );

    let mut chart = ChartBuilder::on(root)
        .caption(&style.title, ("sans-serif", 28).into_font())
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d((x_min..x_max).log_scale(), y_min..y_max)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("Pressure (bar)")
        .y_desc("µ (kJ/mol)")
        .x_label_style(("sans-serif", 16))
        .y_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(fit_line, SIM_COLOR.stroke_width(2)))
        .map_err(plot_err)?
        .label(format!(
            "µ = {:.3}·ln P {:+.3} (r² = {:.4})",
            fit.slope, fit.intercept, fit.r_squared
        ))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], SIM_COLOR.stroke_width(2)));

    chart
        .draw_series(
            points
                .iter()
                .filter(|p| p.pressure > 0.0)
                .map(|p| Circle::new((p.pressure, p.mu), 6, BLACK.filled())),
        )
        .map_err(plot_err)?
        .label("Calibration runs")
        .legend(|(x, y)| Circle::new((x + 10, y), 5, BLACK.filled()));

    if !targets.is_empty() {
        chart
            .draw_series(
                targets
                    .iter()
                    .map(|&(p, mu)| Cross::new((p, mu), 6, REF_COLOR.stroke_width(2))),
            )
            .map_err(plot_err)?
            .label("Targets")
            .legend(|(x, y)| Cross::new((x + 10, y), 5, REF_COLOR.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(plot_err)?;

    Ok(())
}

// ─────────────────────────────────────────────────────────────
// 等温线对比图
// ─────────────────────────────────────────────────────────────

/// 绘制模拟等温线与文献数据对比图
pub fn plot_isotherm(
    simulated: &[IsothermPoint],
    reference: &[ReferencePoint],
    reference_label: &str,
    y_label: &str,
    log_x: bool,
    output_path: &Path,
    style: &PlotStyle,
) -> Result<()> {
    let data = IsothermData {
        simulated,
        reference,
        reference_label,
        y_label,
    };
    if is_svg(output_path) {
        let root = SVGBackend::new(output_path, (style.width, style.height)).into_drawing_area();
        draw_isotherm_chart(&root, &data, log_x, style)?;
        root.present().map_err(plot_err)?;
    } else {
        let root =
            BitMapBackend::new(output_path, (style.width, style.height)).into_drawing_area();
        draw_isotherm_chart(&root, &data, log_x, style)?;
        root.present().map_err(plot_err)?;
    }
    Ok(())
}

struct IsothermData<'a> {
    simulated: &'a [IsothermPoint],
    reference: &'a [ReferencePoint],
    reference_label: &'a str,
    y_label: &'a str,
}

fn draw_isotherm_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    data: &IsothermData<'_>,
    log_x: bool,
    style: &PlotStyle,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).map_err(plot_err)?;

    let pressures = data
        .simulated
        .iter()
        .map(|p| p.pressure)
        .chain(data.reference.iter().map(|r| r.pressure));
    let loadings = data
        .simulated
        .iter()
        .map(|p| p.loading + p.loading_err.unwrap_or(0.0))
        .chain(data.reference.iter().map(|r| r.loading));
    let (_, y_top) = padded_range(loadings, 0.1);
    let y_range = 0.0..y_top.max(1e-6);

    let mut builder = ChartBuilder::on(root);
    builder
        .caption(&style.title, ("sans-serif", 28).into_font())
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(70);

    if log_x {
        let (x_min, x_max) = log_range(pressures);
        let mut chart = builder
            .build_cartesian_2d((x_min..x_max).log_scale(), y_range)
            .map_err(plot_err)?;
        chart
            .configure_mesh()
            .x_desc("Pressure (bar)")
            .y_desc(data.y_label)
            .x_label_style(("sans-serif", 16))
            .y_label_style(("sans-serif", 16))
            .axis_desc_style(("sans-serif", 18))
            .draw()
            .map_err(plot_err)?;
        draw_isotherm_series(&mut chart, data)
    } else {
        let (_, x_max) = padded_range(pressures, 0.05);
        let mut chart = builder
            .build_cartesian_2d(0.0..x_max.max(1e-6), y_range)
            .map_err(plot_err)?;
        chart
            .configure_mesh()
            .x_desc("Pressure (bar)")
            .y_desc(data.y_label)
            .x_label_style(("sans-serif", 16))
            .y_label_style(("sans-serif", 16))
            .axis_desc_style(("sans-serif", 18))
            .draw()
            .map_err(plot_err)?;
        draw_isotherm_series(&mut chart, data)
    }
}

/// 绘制等温线数据系列（与坐标轴类型无关）
fn draw_isotherm_series<'a, DB, X, Y>(
    chart: &mut ChartContext<'a, DB, Cartesian2d<X, Y>>,
    data: &IsothermData<'_>,
) -> Result<()>
where
    DB: DrawingBackend + 'a,
    DB::ErrorType: 'static,
    X: Ranged<ValueType = f64>,
    Y: Ranged<ValueType = f64>,
{
    let sim: Vec<(f64, f64)> = data
        .simulated
        .iter()
        .map(|p| (p.pressure, p.loading))
        .collect();

    chart
        .draw_series(LineSeries::new(sim.clone(), SIM_COLOR.stroke_width(2)))
        .map_err(plot_err)?;

    chart
        .draw_series(
            data.simulated
                .iter()
                .filter_map(|p| p.loading_err.map(|e| (p, e)))
                .map(|(p, e)| {
                    ErrorBar::new_vertical(
                        p.pressure,
                        (p.loading - e).max(0.0),
                        p.loading,
                        p.loading + e,
                        SIM_COLOR.stroke_width(1),
                        8,
                    )
                }),
        )
        .map_err(plot_err)?;

    chart
        .draw_series(
            sim.iter()
                .map(|&(x, y)| Circle::new((x, y), 5, SIM_COLOR.filled())),
        )
        .map_err(plot_err)?
        .label("Simulation (GCMC)")
        .legend(|(x, y)| Circle::new((x + 10, y), 5, SIM_COLOR.filled()));

    if !data.reference.is_empty() {
        chart
            .draw_series(data.reference.iter().map(|r| {
                TriangleMarker::new((r.pressure, r.loading), 7, REF_COLOR.filled())
            }))
            .map_err(plot_err)?
            .label(data.reference_label.to_string())
            .legend(|(x, y)| TriangleMarker::new((x + 10, y), 6, REF_COLOR.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(plot_err)?;

    Ok(())
}

// ─────────────────────────────────────────────────────────────
// 时间序列图
// ─────────────────────────────────────────────────────────────

/// 绘制单列时间序列，竖线标出预平衡截断位置
pub fn plot_series(
    steps: &[f64],
    values: &[f64],
    column: &str,
    production_start: usize,
    output_path: &Path,
    style: &PlotStyle,
) -> Result<()> {
    if steps.is_empty() || steps.len() != values.len() {
        return Err(CassutilError::InsufficientData(format!(
            "nothing to plot for column '{}'",
            column
        )));
    }

    if is_svg(output_path) {
        let root = SVGBackend::new(output_path, (style.width, style.height)).into_drawing_area();
        draw_series_chart(&root, steps, values, column, production_start, style)?;
        root.present().map_err(plot_err)?;
    } else {
        let root =
            BitMapBackend::new(output_path, (style.width, style.height)).into_drawing_area();
        draw_series_chart(&root, steps, values, column, production_start, style)?;
        root.present().map_err(plot_err)?;
    }
    Ok(())
}

fn draw_series_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    steps: &[f64],
    values: &[f64],
    column: &str,
    production_start: usize,
    style: &PlotStyle,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).map_err(plot_err)?;

    let (x_min, x_max) = padded_range(steps.iter().copied(), 0.02);
    let (y_min, y_max) = padded_range(values.iter().copied(), 0.05);

    let mut chart = ChartBuilder::on(root)
        .caption(&style.title, ("sans-serif", 28).into_font())
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("MC step")
        .y_desc(column)
        .x_label_style(("sans-serif", 16))
        .y_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(
            steps.iter().copied().zip(values.iter().copied()),
            SIM_COLOR.stroke_width(1),
        ))
        .map_err(plot_err)?
        .label(column.to_string())
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], SIM_COLOR.stroke_width(2)));

    if production_start > 0 && production_start < steps.len() {
        let cut = steps[production_start];
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(cut, y_min), (cut, y_max)],
                REF_COLOR.stroke_width(2),
            )))
            .map_err(plot_err)?
            .label("Production start")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], REF_COLOR.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(plot_err)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_svg() {
        assert!(is_svg(Path::new("iso.SVG")));
        assert!(!is_svg(Path::new("iso.png")));
        assert!(!is_svg(Path::new("iso")));
    }

    #[test]
    fn test_padded_range() {
        let (lo, hi) = padded_range([1.0, 3.0].into_iter(), 0.5);
        assert!((lo - 0.0).abs() < 1e-12 && (hi - 4.0).abs() < 1e-12);
        let (lo, hi) = padded_range([2.0].into_iter(), 0.1);
        assert!(lo < 2.0 && hi > 2.0);
        assert_eq!(padded_range(std::iter::empty(), 0.1), (0.0, 1.0));
    }

    #[test]
    fn test_log_range_skips_non_positive() {
        let (lo, hi) = log_range([0.0, -1.0, 0.5, 20.0].into_iter());
        assert!((lo - 0.5 / 1.2).abs() < 1e-12);
        assert!((hi - 24.0).abs() < 1e-12);
    }

    #[test]
    fn test_plot_series_rejects_empty() {
        let style = PlotStyle::new("t", 400, 300);
        assert!(plot_series(&[], &[], "Pressure", 0, Path::new("x.svg"), &style).is_err());
    }
}
