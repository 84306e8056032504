//! Grid of per-model confusion matrix heatmaps.

use super::{
    blues, draw_title, ensure_font, fit_label, slot_index, text_color_on, CategoryAxis, FONT_FAMILY,
};
use crate::config::PlotConfig;
use crate::models::{ConfusionMatrix, EvaluatedModel};
use anyhow::{ensure, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;
use tracing::{debug, info};

/// Width of the colour bar strip beside each heatmap, labels included.
const COLORBAR_WIDTH: u32 = 80;

const COLORBAR_STEPS: usize = 64;

const CHART_MARGIN: u32 = 12;
const X_LABEL_AREA: u32 = 50;

/// Render one heatmap per model into a `grid_rows x grid_columns` figure.
///
/// Models beyond the grid capacity are left out; unused panels stay blank.
pub fn render_confusion_matrices(
    models: &[EvaluatedModel],
    path: &Path,
    config: &PlotConfig,
    family: &str,
) -> Result<()> {
    ensure!(
        config.capacity() > 0,
        "confusion matrix grid must have at least one panel"
    );
    ensure_font()?;

    if models.len() > config.capacity() {
        info!(
            "Showing the first {} of {} models in the confusion matrix grid",
            config.capacity(),
            models.len()
        );
    }

    let [width, height] = config.confusion_size;
    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE)?;
    let body = draw_title(&root, &format!("{} Model Confusion Matrices", family), 32)?;

    let panels = body.split_evenly((config.grid_rows, config.grid_columns));
    for (model, panel) in models.iter().zip(panels.iter()) {
        debug!("Drawing confusion matrix for {}", model.name);
        let (panel_width, _) = panel.dim_in_pixel();
        let plot_area = draw_title(panel, &fit_label(&model.name, panel_width, 22), 22)?;
        let (heatmap, colorbar) =
            plot_area.split_horizontally(panel_width.saturating_sub(COLORBAR_WIDTH));

        draw_heatmap(&heatmap, &model.confusion)?;
        draw_colorbar(&colorbar, model.confusion.max_count())?;
    }

    root.present()?;
    Ok(())
}

fn draw_heatmap<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    cm: &ConfusionMatrix,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let n = cm.size();
    let extent = n as f64;
    let max = cm.max_count().max(1) as f64;

    // Row 0 is drawn at the top, so row `i` occupies [n - i - 1, n - i).
    let label_for =
        |idx: Option<usize>| idx.map(|i| cm.labels[i].to_string()).unwrap_or_default();
    let x_label = |x: &f64| label_for(slot_index(*x, n));
    let y_label = |y: &f64| label_for(slot_index(extent - *y, n));

    let mut chart = ChartBuilder::on(area)
        .margin(CHART_MARGIN)
        .x_label_area_size(X_LABEL_AREA)
        .y_label_area_size(60)
        .build_cartesian_2d(CategoryAxis::new(n), CategoryAxis::new(n))?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Predicted Label")
        .y_desc("True Label")
        .x_label_formatter(&x_label)
        .y_label_formatter(&y_label)
        .label_style((FONT_FAMILY, 16))
        .axis_desc_style((FONT_FAMILY, 18))
        .draw()?;

    let cells: Vec<(f64, f64, usize)> = cm
        .counts
        .iter()
        .enumerate()
        .flat_map(|(row, counts)| {
            counts
                .iter()
                .enumerate()
                .map(move |(col, &count)| (col as f64, extent - row as f64 - 1.0, count))
        })
        .collect();

    chart.draw_series(cells.iter().map(|&(x, y, count)| {
        let fill = blues(count as f64 / max);
        Rectangle::new([(x, y), (x + 1.0, y + 1.0)], fill.filled())
    }))?;

    let annotation_size = if n > 12 { 12.0 } else { 20.0 };
    chart.draw_series(cells.iter().map(|&(x, y, count)| {
        let style = (FONT_FAMILY, annotation_size)
            .into_font()
            .color(&text_color_on(blues(count as f64 / max)))
            .pos(Pos::new(HPos::Center, VPos::Center));
        Text::new(count.to_string(), (x + 0.5, y + 0.5), style)
    }))?;

    Ok(())
}

/// Vertical Blues gradient from 0 to the largest count, labelled on the right.
fn draw_colorbar<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    max_count: usize,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let top = max_count.max(1) as f64;

    let mut chart = ChartBuilder::on(area)
        .margin(CHART_MARGIN)
        .x_label_area_size(X_LABEL_AREA)
        .right_y_label_area_size(40)
        .build_cartesian_2d(0f64..1f64, 0f64..top)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_labels(6)
        .y_label_formatter(&|v: &f64| format_count(*v))
        .label_style((FONT_FAMILY, 14))
        .draw()?;

    let step = top / COLORBAR_STEPS as f64;
    chart.draw_series((0..COLORBAR_STEPS).map(|k| {
        let low = k as f64 * step;
        let fill = blues((low + step / 2.0) / top);
        Rectangle::new([(0.0, low), (1.0, low + step)], fill.filled())
    }))?;

    Ok(())
}

/// Tick text for a count axis: whole numbers without decimals.
fn format_count(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClassificationMetrics;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn model(name: &str, counts: Vec<Vec<usize>>) -> EvaluatedModel {
        let labels = (0..counts.len() as i64).collect();
        EvaluatedModel {
            name: name.to_string(),
            metrics: ClassificationMetrics::default(),
            n_samples: counts.iter().flatten().sum(),
            confusion: ConfusionMatrix { labels, counts },
            source: PathBuf::from(format!("{}/results.pickle", name)),
        }
    }

    fn small_config() -> PlotConfig {
        PlotConfig {
            confusion_size: [1200, 800],
            ..PlotConfig::default()
        }
    }

    #[test]
    fn test_render_writes_png() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("confusion_matrices.png");
        let models = vec![
            model("cnn_hnmr", vec![vec![5, 1], vec![2, 7]]),
            model("cnn_ir", vec![vec![3, 0, 1], vec![0, 4, 0], vec![1, 1, 2]]),
        ];

        render_confusion_matrices(&models, &path, &small_config(), "CNN").unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));
    }

    #[test]
    fn test_extra_models_are_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("grid.png");
        let models: Vec<_> = (0..8)
            .map(|i| model(&format!("model_{}", i), vec![vec![1]]))
            .collect();

        render_confusion_matrices(&models, &path, &small_config(), "CNN").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_long_names_and_single_class() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("single.png");
        let models = vec![model(
            "cnn_hnmr_with_an_unusually_long_run_name",
            vec![vec![4]],
        )];

        render_confusion_matrices(&models, &path, &small_config(), "CNN").unwrap();
        assert!(std::fs::read(&path).unwrap().starts_with(b"\x89PNG"));
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(3.0), "3");
        assert_eq!(format_count(0.5), "0.5");
    }

    #[test]
    fn test_empty_grid_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config = PlotConfig {
            grid_rows: 0,
            ..small_config()
        };
        let result = render_confusion_matrices(
            &[model("m", vec![vec![1]])],
            &temp_dir.path().join("x.png"),
            &config,
            "CNN",
        );
        assert!(result.is_err());
    }
}
