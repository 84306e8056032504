//! Four-panel bar chart comparing headline metrics across models.

use super::{draw_title, ensure_font, fit_label, slot_index, CategoryAxis, FONT_FAMILY};
use crate::config::PlotConfig;
use crate::models::{EvaluatedModel, MetricKind};
use anyhow::{ensure, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;

/// Upper end of the score axis; leaves room for the value labels.
const SCORE_CEILING: f64 = 1.1;

const BAR_ALPHA: f64 = 0.8;

const CHART_MARGIN: u32 = 15;
const Y_LABEL_AREA: u32 = 60;
const NAME_FONT_PX: u32 = 16;

/// Bar colour for each metric panel.
fn metric_color(metric: MetricKind) -> RGBColor {
    match metric {
        MetricKind::Accuracy => RGBColor(70, 130, 180),   // steelblue
        MetricKind::F1Macro => RGBColor(255, 127, 80),    // coral
        MetricKind::Precision => RGBColor(144, 238, 144), // lightgreen
        MetricKind::Recall => RGBColor(221, 160, 221),    // plum
    }
}

/// Render a 2x2 grid of bar charts, one per metric in [`MetricKind::ALL`].
pub fn render_metrics_comparison(
    models: &[EvaluatedModel],
    path: &Path,
    config: &PlotConfig,
    family: &str,
) -> Result<()> {
    ensure!(!models.is_empty(), "no models to compare");
    ensure_font()?;

    let [width, height] = config.comparison_size;
    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE)?;
    let body = draw_title(&root, &format!("{} Model Performance Comparison", family), 32)?;

    let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
    let panels = body.split_evenly((2, 2));
    for (metric, panel) in MetricKind::ALL.into_iter().zip(panels.iter()) {
        let values: Vec<f64> = models.iter().map(|m| metric.value(&m.metrics)).collect();
        draw_bars(panel, metric, &names, &values)?;
    }

    root.present()?;
    Ok(())
}

fn draw_bars<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    metric: MetricKind,
    names: &[&str],
    values: &[f64],
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let n = names.len();
    let (width, _) = area.dim_in_pixel();
    let slot_px = width.saturating_sub(Y_LABEL_AREA + 2 * CHART_MARGIN) / n.max(1) as u32;
    let labels: Vec<String> = names
        .iter()
        .map(|name| fit_label(name, slot_px, NAME_FONT_PX))
        .collect();
    let name_for = |x: &f64| {
        slot_index(*x, n)
            .map(|i| labels[i].clone())
            .unwrap_or_default()
    };

    let mut chart = ChartBuilder::on(area)
        .caption(metric.to_string(), (FONT_FAMILY, 26))
        .margin(CHART_MARGIN)
        .x_label_area_size(45)
        .y_label_area_size(Y_LABEL_AREA)
        .build_cartesian_2d(CategoryAxis::new(n), 0f64..SCORE_CEILING)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc("Score")
        .x_label_formatter(&name_for)
        .y_label_formatter(&|y: &f64| format!("{:.1}", y))
        .label_style((FONT_FAMILY, NAME_FONT_PX))
        .axis_desc_style((FONT_FAMILY, 18))
        .draw()?;

    let color = metric_color(metric);
    chart.draw_series(values.iter().enumerate().map(|(i, &v)| {
        let x = i as f64;
        Rectangle::new([(x + 0.15, 0.0), (x + 0.85, v)], color.mix(BAR_ALPHA).filled())
    }))?;

    chart.draw_series(values.iter().enumerate().map(|(i, &v)| {
        let style = (FONT_FAMILY, 16.0)
            .into_font()
            .color(&BLACK)
            .pos(Pos::new(HPos::Center, VPos::Bottom));
        Text::new(format!("{:.3}", v), (i as f64 + 0.5, v + 0.01), style)
    }))?;

    Ok(())
}
