//! Static training charts rendered as SVG
//!
//! This module provides:
//! - Loss curve over training steps
//! - Turbulence plot with moderate/high reference lines
//! - Gradient vector field for a single matrix-shaped gradient
//!
//! Every `plot_*` function writes to a fixed default filename unless a path
//! is given, and returns `Ok(None)` after logging a notice when there is
//! nothing to draw.

mod curves;
mod field;

pub use curves::{
    plot_loss_curve, plot_turbulence, render_loss_curve_svg, render_turbulence_svg, LineChart,
    ReferenceLine, Series,
};
pub use field::{find_vector_field_source, plot_gradient_vector_field, render_vector_field_svg};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Default output file for [`plot_loss_curve`].
pub const DEFAULT_LOSS_CURVE_FILE: &str = "loss_curve.svg";

/// Default output file for [`plot_gradient_vector_field`].
pub const DEFAULT_GRADIENT_FIELD_FILE: &str = "gradient_field.svg";

/// Default output file for [`plot_turbulence`].
pub const DEFAULT_TURBULENCE_FILE: &str = "turbulence.svg";

/// Errors that can occur while rendering or displaying charts.
#[derive(Debug, Error)]
pub enum VizError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for visualization operations.
pub type VizResult<T> = Result<T, VizError>;

/// Write an SVG document, creating parent directories as needed.
pub(crate) fn write_svg(path: &Path, svg: &str) -> VizResult<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, svg)?;
    Ok(path.to_path_buf())
}

/// Escape text for inclusion in SVG markup.
pub(crate) fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Compact tick label: fixed precision for ordinary magnitudes, scientific
/// notation otherwise.
pub(crate) fn format_tick(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-3..1e4).contains(&magnitude) {
        format!("{:.1e}", value)
    } else if magnitude >= 100.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}
