//! Figure rendering.
//!
//! Both figures are drawn with plotters onto PNG bitmaps. Text uses a bundled
//! DejaVu Sans face so the output does not depend on fonts installed on the
//! machine.

mod comparison;
mod confusion;

pub use comparison::render_metrics_comparison;
pub use confusion::render_confusion_matrices;

use anyhow::{anyhow, Result};
use plotters::coord::ranged1d::{DefaultFormatting, KeyPointHint, Ranged};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{register_font, FontStyle};
use std::ops::Range;
use std::sync::OnceLock;

/// Family name every text style in this module refers to.
pub(crate) const FONT_FAMILY: &str = "sans-serif";

const FONT_BYTES: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

static FONT: OnceLock<Result<(), String>> = OnceLock::new();

/// Register the bundled font with plotters. Runs once per process.
pub(crate) fn ensure_font() -> Result<()> {
    FONT.get_or_init(|| {
        for style in [FontStyle::Normal, FontStyle::Bold] {
            register_font(FONT_FAMILY, style, FONT_BYTES)
                .map_err(|_| "bundled font could not be parsed".to_string())?;
        }
        Ok(())
    })
    .clone()
    .map_err(|e| anyhow!(e))
}

/// matplotlib's "Blues" colormap anchors, light to dark.
const BLUES: [(u8, u8, u8); 9] = [
    (247, 251, 255),
    (222, 235, 247),
    (198, 219, 239),
    (158, 202, 225),
    (107, 174, 214),
    (66, 146, 198),
    (33, 113, 181),
    (8, 81, 156),
    (8, 48, 107),
];

/// Sample the Blues ramp at `t` in `[0, 1]`.
pub(crate) fn blues(t: f64) -> RGBColor {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (BLUES.len() - 1) as f64;
    let lower = (scaled.floor() as usize).min(BLUES.len() - 2);
    let frac = scaled - lower as f64;

    let (r0, g0, b0) = BLUES[lower];
    let (r1, g1, b1) = BLUES[lower + 1];
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    RGBColor(lerp(r0, r1), lerp(g0, g1), lerp(b0, b1))
}

/// Black or white, whichever reads better on `background`.
pub(crate) fn text_color_on(background: RGBColor) -> RGBColor {
    let RGBColor(r, g, b) = background;
    let linear = |c: u8| {
        let c = c as f64 / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    let luminance = 0.2126 * linear(r) + 0.7152 * linear(g) + 0.0722 * linear(b);

    if luminance > 0.408 {
        RGBColor(0, 0, 0)
    } else {
        RGBColor(255, 255, 255)
    }
}

/// Index of the category whose unit-wide slot is centred on `x`.
pub(crate) fn slot_index(x: f64, len: usize) -> Option<usize> {
    let idx = (x - 0.5).round();
    (idx >= 0.0 && (idx as usize) < len).then_some(idx as usize)
}

/// Axis of `len` unit-wide category slots over `[0, len)`.
///
/// Tick marks sit on slot centres, so a label formatter can map a tick back
/// to its category with [`slot_index`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct CategoryAxis {
    len: usize,
}

impl CategoryAxis {
    pub(crate) fn new(len: usize) -> Self {
        Self { len: len.max(1) }
    }

    /// Slot centres, thinned to at most `max_points` ticks.
    fn centres(&self, max_points: usize) -> Vec<f64> {
        if max_points == 0 {
            return Vec::new();
        }
        let step = self.len.div_ceil(max_points).max(1);
        (0..self.len).step_by(step).map(|i| i as f64 + 0.5).collect()
    }
}

impl Ranged for CategoryAxis {
    type FormatOption = DefaultFormatting;
    type ValueType = f64;

    fn map(&self, value: &f64, limit: (i32, i32)) -> i32 {
        let fraction = value / self.len as f64;
        limit.0 + ((limit.1 - limit.0) as f64 * fraction).round() as i32
    }

    fn key_points<Hint: KeyPointHint>(&self, hint: Hint) -> Vec<f64> {
        self.centres(hint.max_num_points())
    }

    fn range(&self) -> Range<f64> {
        0.0..self.len as f64
    }
}

/// Draw `title` centred in a header strip and return the area below it.
pub(crate) fn draw_title<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    font_px: u32,
) -> Result<DrawingArea<DB, Shift>>
where
    DB::ErrorType: 'static,
{
    let (header, body) = area.split_vertically(font_px * 2);
    let (width, height) = header.dim_in_pixel();
    let style = (FONT_FAMILY, font_px as f64)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));
    header.draw_text(title, &style, (width as i32 / 2, height as i32 / 2))?;
    Ok(body)
}

/// Shorten `label` to roughly fit `width_px` at `font_px`, ending in "..".
pub(crate) fn fit_label(label: &str, width_px: u32, font_px: u32) -> String {
    // DejaVu Sans averages a little over half an em per glyph.
    let max_chars = (width_px as f64 / (font_px as f64 * 0.6)).floor() as usize;
    if label.chars().count() <= max_chars {
        return label.to_string();
    }
    if max_chars <= 2 {
        return label.chars().take(max_chars).collect();
    }
    let mut short: String = label.chars().take(max_chars - 2).collect();
    short.push_str("..");
    short
}
