//! Line charts: loss curve and turbulence over training steps.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::info;

use super::{
    escape_xml, format_tick, write_svg, VizResult, DEFAULT_LOSS_CURVE_FILE,
    DEFAULT_TURBULENCE_FILE,
};

/// Turbulence level drawn as the "Moderate" guide line.
const MODERATE_GUIDE: f64 = 0.5;

/// Turbulence level drawn as the "High" guide line.
const HIGH_GUIDE: f64 = 1.0;

const NUM_TICKS: usize = 5;

/// One plotted series; the x coordinate is the value's index.
#[derive(Debug, Clone)]
pub struct Series {
    pub name: String,
    pub color: String,
    pub values: Vec<f64>,
}

impl Series {
    pub fn new(name: impl Into<String>, color: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            values,
        }
    }
}

/// Horizontal dashed guide line.
#[derive(Debug, Clone)]
pub struct ReferenceLine {
    pub y: f64,
    pub label: String,
    pub color: String,
}

impl ReferenceLine {
    pub fn new(y: f64, label: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            y,
            label: label.into(),
            color: color.into(),
        }
    }
}

/// Minimal SVG line chart with axes, ticks, and a legend.
#[derive(Debug, Clone)]
pub struct LineChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub width: usize,
    pub height: usize,
    pub series: Vec<Series>,
    pub reference_lines: Vec<ReferenceLine>,
}

impl LineChart {
    pub fn new(
        title: impl Into<String>,
        x_label: impl Into<String>,
        y_label: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            x_label: x_label.into(),
            y_label: y_label.into(),
            width: 600,
            height: 400,
            series: Vec::new(),
            reference_lines: Vec::new(),
        }
    }

    pub fn with_series(mut self, series: Series) -> Self {
        self.series.push(series);
        self
    }

    pub fn with_reference_line(mut self, line: ReferenceLine) -> Self {
        self.reference_lines.push(line);
        self
    }

    fn x_range(&self) -> (f64, f64) {
        let longest = self.series.iter().map(|s| s.values.len()).max().unwrap_or(0);
        (0.0, (longest.saturating_sub(1)).max(1) as f64)
    }

    fn y_range(&self) -> (f64, f64) {
        let finite = self
            .series
            .iter()
            .flat_map(|s| s.values.iter().copied())
            .chain(self.reference_lines.iter().map(|r| r.y))
            .filter(|v| v.is_finite());

        let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

        if !min.is_finite() {
            return (0.0, 1.0);
        }
        if (max - min).abs() < f64::EPSILON {
            return (min - 0.5, max + 0.5);
        }
        let pad = (max - min) * 0.05;
        (min - pad, max + pad)
    }

    /// Render the chart as a standalone SVG document.
    pub fn render_svg(&self) -> String {
        let (margin_left, margin_right, margin_top, margin_bottom) = (70.0, 20.0, 40.0, 50.0);
        let (w, h) = (self.width as f64, self.height as f64);
        let (x0, x1) = (margin_left, w - margin_right);
        let (y0, y1) = (margin_top, h - margin_bottom);

        let (x_min, x_max) = self.x_range();
        let (y_min, y_max) = self.y_range();
        let sx = |x: f64| x0 + (x - x_min) / (x_max - x_min) * (x1 - x0);
        let sy = |y: f64| y1 - (y - y_min) / (y_max - y_min) * (y1 - y0);

        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {} {}" width="{}" height="{}">"#,
            self.width, self.height, self.width, self.height
        );
        svg.push_str(r#"<rect width="100%" height="100%" fill="white"/>"#);

        // Title
        let _ = write!(
            svg,
            r#"<text x="{:.1}" y="24" text-anchor="middle" font-size="14" font-weight="bold">{}</text>"#,
            w / 2.0,
            escape_xml(&self.title)
        );

        // Frame
        let _ = write!(
            svg,
            r##"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="none" stroke="#333" stroke-width="1"/>"##,
            x0,
            y0,
            x1 - x0,
            y1 - y0
        );

        // Ticks
        for i in 0..NUM_TICKS {
            let t = i as f64 / (NUM_TICKS - 1) as f64;

            let xv = x_min + t * (x_max - x_min);
            let px = sx(xv);
            let _ = write!(
                svg,
                r##"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="#333"/><text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="10">{:.0}</text>"##,
                px,
                y1,
                px,
                y1 + 4.0,
                px,
                y1 + 16.0,
                xv
            );

            let yv = y_min + t * (y_max - y_min);
            let py = sy(yv);
            let _ = write!(
                svg,
                r##"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="#333"/><text x="{:.1}" y="{:.1}" text-anchor="end" font-size="10">{}</text>"##,
                x0 - 4.0,
                py,
                x0,
                py,
                x0 - 6.0,
                py + 3.0,
                format_tick(yv)
            );
        }

        // Axis labels
        let _ = write!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="12">{}</text>"#,
            (x0 + x1) / 2.0,
            h - 12.0,
            escape_xml(&self.x_label)
        );
        let _ = write!(
            svg,
            r#"<text x="16" y="{:.1}" text-anchor="middle" font-size="12" transform="rotate(-90 16 {:.1})">{}</text>"#,
            (y0 + y1) / 2.0,
            (y0 + y1) / 2.0,
            escape_xml(&self.y_label)
        );

        // Reference lines
        for line in &self.reference_lines {
            let py = sy(line.y);
            let _ = write!(
                svg,
                r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="1.5" stroke-dasharray="6,4" stroke-opacity="0.7"/>"#,
                x0, py, x1, py, line.color
            );
        }

        // Series, broken into segments at non-finite values
        for series in &self.series {
            let mut segment: Vec<(f64, f64)> = Vec::new();
            let mut segments = Vec::new();
            for (i, &v) in series.values.iter().enumerate() {
                if v.is_finite() {
                    segment.push((sx(i as f64), sy(v)));
                } else if !segment.is_empty() {
                    segments.push(std::mem::take(&mut segment));
                }
            }
            if !segment.is_empty() {
                segments.push(segment);
            }

            for points in segments {
                if let [(px, py)] = points.as_slice() {
                    let _ = write!(
                        svg,
                        r#"<circle cx="{:.2}" cy="{:.2}" r="2" fill="{}"/>"#,
                        px, py, series.color
                    );
                    continue;
                }
                let coords: Vec<String> = points
                    .iter()
                    .map(|(px, py)| format!("{:.2},{:.2}", px, py))
                    .collect();
                let _ = write!(
                    svg,
                    r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="1.5"/>"#,
                    coords.join(" "),
                    series.color
                );
            }
        }

        // Legend
        let entries: Vec<(&str, &str, bool)> = self
            .series
            .iter()
            .map(|s| (s.name.as_str(), s.color.as_str(), false))
            .chain(
                self.reference_lines
                    .iter()
                    .map(|r| (r.label.as_str(), r.color.as_str(), true)),
            )
            .collect();
        if !entries.is_empty() {
            let (lx, ly) = (x1 - 130.0, y0 + 8.0);
            let _ = write!(
                svg,
                r##"<rect x="{:.1}" y="{:.1}" width="122" height="{}" fill="white" fill-opacity="0.8" stroke="#ccc"/>"##,
                lx,
                ly,
                entries.len() * 16 + 6
            );
            for (i, (label, color, dashed)) in entries.iter().enumerate() {
                let ey = ly + 13.0 + i as f64 * 16.0;
                let dash = if *dashed { r#" stroke-dasharray="6,4""# } else { "" };
                let _ = write!(
                    svg,
                    r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="2"{}/><text x="{:.1}" y="{:.1}" font-size="10">{}</text>"#,
                    lx + 6.0,
                    ey - 3.0,
                    lx + 28.0,
                    ey - 3.0,
                    color,
                    dash,
                    lx + 34.0,
                    ey,
                    escape_xml(label)
                );
            }
        }

        svg.push_str("</svg>");
        svg
    }
}

/// Render the loss curve to an SVG string.
pub fn render_loss_curve_svg(loss_history: &[f32]) -> String {
    let values = loss_history.iter().map(|&v| f64::from(v)).collect();
    LineChart::new("Loss Curve", "Training Step", "Loss")
        .with_series(Series::new("Training Loss", "blue", values))
        .render_svg()
}

/// Render the turbulence plot to an SVG string.
pub fn render_turbulence_svg(turbulence_history: &[f64]) -> String {
    LineChart::new(
        "Turbulence Over Training",
        "Training Step",
        "Average Gradient Angle",
    )
    .with_series(Series::new("Turbulence", "red", turbulence_history.to_vec()))
    .with_reference_line(ReferenceLine::new(MODERATE_GUIDE, "Moderate", "gold"))
    .with_reference_line(ReferenceLine::new(HIGH_GUIDE, "High", "orange"))
    .render_svg()
}

/// Write the loss curve, defaulting to [`DEFAULT_LOSS_CURVE_FILE`].
pub fn plot_loss_curve(loss_history: &[f32], path: Option<&Path>) -> VizResult<Option<PathBuf>> {
    if loss_history.is_empty() {
        info!("No loss data available.");
        return Ok(None);
    }

    let path = path.unwrap_or_else(|| Path::new(DEFAULT_LOSS_CURVE_FILE));
    let written = write_svg(path, &render_loss_curve_svg(loss_history))?;
    info!("Loss curve saved to {}", written.display());
    Ok(Some(written))
}

/// Write the turbulence plot, defaulting to [`DEFAULT_TURBULENCE_FILE`].
pub fn plot_turbulence(
    turbulence_history: &[f64],
    path: Option<&Path>,
) -> VizResult<Option<PathBuf>> {
    if turbulence_history.is_empty() {
        info!("No turbulence data available.");
        return Ok(None);
    }

    let path = path.unwrap_or_else(|| Path::new(DEFAULT_TURBULENCE_FILE));
    let written = write_svg(path, &render_turbulence_svg(turbulence_history))?;
    info!("Turbulence plot saved to {}", written.display());
    Ok(Some(written))
}
