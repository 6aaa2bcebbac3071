//! Gradient vector field for a matrix-shaped gradient.
//!
//! Each cell `(row, col)` gets an arrow whose horizontal component is the
//! gradient value and whose vertical component is zero, one data unit per
//! cell. Row 0 is drawn at the top.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::info;

use super::{escape_xml, write_svg, VizResult, DEFAULT_GRADIENT_FIELD_FILE};
use crate::snapshot::{GradientSnapshot, GradientTensor};

/// First 2-D entry of the snapshot, in iteration order.
///
/// Entries of any other rank that come before it are skipped with a notice.
pub fn find_vector_field_source(snapshot: &GradientSnapshot) -> Option<(&str, &GradientTensor)> {
    for (name, grad) in snapshot.iter() {
        if grad.dims2().is_some() {
            return Some((name, grad));
        }
        info!(
            "Skipping vector field for {}: gradient shape {:?} not 2D.",
            name,
            grad.shape()
        );
    }
    None
}

/// Render a matrix gradient as an SVG quiver plot.
///
/// Returns `None` if the gradient is not 2-D.
pub fn render_vector_field_svg(grad: &GradientTensor, title: &str) -> Option<String> {
    let (rows, cols) = grad.dims2()?;

    let cell = (500.0 / rows.max(cols).max(1) as f64).clamp(4.0, 40.0);
    let margin = 50.0;
    let width = cols as f64 * cell + margin * 2.0;
    let height = rows as f64 * cell + margin * 2.0;

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {:.0} {:.0}" width="{:.0}" height="{:.0}">"#,
        width, height, width, height
    );
    svg.push_str(r#"<rect width="100%" height="100%" fill="white"/>"#);
    svg.push_str(
        r#"<defs><marker id="arrow" viewBox="0 0 10 10" refX="10" refY="5" markerWidth="4" markerHeight="4" orient="auto-start-reverse"><path d="M 0 0 L 10 5 L 0 10 z" fill="black"/></marker></defs>"#,
    );

    let _ = write!(
        svg,
        r#"<text x="{:.1}" y="24" text-anchor="middle" font-size="14" font-weight="bold">{}</text>"#,
        width / 2.0,
        escape_xml(title)
    );

    let _ = write!(
        svg,
        r##"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="none" stroke="#ccc"/>"##,
        margin,
        margin,
        cols as f64 * cell,
        rows as f64 * cell
    );

    for row in 0..rows {
        for col in 0..cols {
            let u = match grad.get2(row, col) {
                Some(u) if u.is_finite() && u != 0.0 => f64::from(u),
                _ => continue,
            };
            let x = margin + (col as f64 + 0.5) * cell;
            let y = margin + (row as f64 + 0.5) * cell;
            let _ = write!(
                svg,
                r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="black" stroke-width="1" marker-end="url(#arrow)"/>"#,
                x,
                y,
                x + u * cell,
                y
            );
        }
    }

    // Sparse index labels so large matrices stay legible.
    let col_step = (cols / 10).max(1);
    for col in (0..cols).step_by(col_step) {
        let _ = write!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="10">{}</text>"#,
            margin + (col as f64 + 0.5) * cell,
            margin - 6.0,
            col
        );
    }
    let row_step = (rows / 10).max(1);
    for row in (0..rows).step_by(row_step) {
        let _ = write!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end" font-size="10">{}</text>"#,
            margin - 6.0,
            margin + (row as f64 + 0.5) * cell + 3.0,
            row
        );
    }

    svg.push_str("</svg>");
    Some(svg)
}

/// Plot the first matrix-shaped gradient of `snapshot`.
///
/// Writes to [`DEFAULT_GRADIENT_FIELD_FILE`] unless `path` is given. Returns
/// `Ok(None)` with a notice when the snapshot is empty or has no 2-D entry.
pub fn plot_gradient_vector_field(
    snapshot: &GradientSnapshot,
    title_suffix: &str,
    path: Option<&Path>,
) -> VizResult<Option<PathBuf>> {
    if snapshot.is_empty() {
        info!("No gradients to visualize.");
        return Ok(None);
    }

    let Some((name, grad)) = find_vector_field_source(snapshot) else {
        info!("No 2D gradient in snapshot; vector field skipped.");
        return Ok(None);
    };

    let title = format!("Gradient Vector Field {}", title_suffix);
    let Some(svg) = render_vector_field_svg(grad, title.trim_end()) else {
        return Ok(None);
    };

    let path = path.unwrap_or_else(|| Path::new(DEFAULT_GRADIENT_FIELD_FILE));
    let written = write_svg(path, &svg)?;
    info!("Gradient field for {} saved to {}", name, written.display());
    Ok(Some(written))
}
