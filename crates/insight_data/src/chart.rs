//! Monthly revenue chart rendering.
//!
//! Charts are rendered as standalone SVG documents so no image toolchain is
//! needed at runtime.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::DataResult;
use crate::kpi::MonthlySeries;

/// Canonical file name of the monthly revenue chart.
pub const MONTHLY_REVENUE_CHART: &str = "monthly_revenue.svg";

const WIDTH: f64 = 720.0;
const HEIGHT: f64 = 400.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 60.0;
const GRID_LINES: usize = 5;
const BAR_COLOR: &str = "#4C72B0";

/// Write the monthly series as a bar chart to `path`.
///
/// Parent directories are created. Write failures are returned, not retried.
pub fn render_chart(series: &MonthlySeries, path: &Path) -> DataResult<PathBuf> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, render_svg(series, "Monthly Revenue"))?;
    info!("Chart written to {:?}", path);
    Ok(path.to_path_buf())
}

/// Render the SVG document for a monthly series.
pub fn render_svg(series: &MonthlySeries, title: &str) -> String {
    let plot_width = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let baseline = MARGIN_TOP + plot_height;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">"#,
        w = WIDTH,
        h = HEIGHT
    );
    let _ = writeln!(svg, r#"  <rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"  <text x="{}" y="30" text-anchor="middle" font-size="18">{}</text>"#,
        WIDTH / 2.0,
        escape(title)
    );

    if series.is_empty() {
        let _ = writeln!(
            svg,
            r##"  <text x="{}" y="{}" text-anchor="middle" font-size="14" fill="#666">No data</text>"##,
            WIDTH / 2.0,
            HEIGHT / 2.0
        );
        svg.push_str("</svg>\n");
        return svg;
    }

    let max = series.values().copied().fold(0.0_f64, f64::max);
    let scale_max = if max > 0.0 { max } else { 1.0 };

    // Horizontal grid with value labels
    for step in 0..=GRID_LINES {
        let value = scale_max * step as f64 / GRID_LINES as f64;
        let y = baseline - plot_height * step as f64 / GRID_LINES as f64;
        let _ = writeln!(
            svg,
            r##"  <line x1="{x1}" y1="{y:.1}" x2="{x2}" y2="{y:.1}" stroke="#ddd"/>"##,
            x1 = MARGIN_LEFT,
            x2 = WIDTH - MARGIN_RIGHT,
            y = y
        );
        let _ = writeln!(
            svg,
            r#"  <text x="{}" y="{:.1}" text-anchor="end" font-size="11">{}</text>"#,
            MARGIN_LEFT - 8.0,
            y + 4.0,
            format_axis_value(value)
        );
    }

    let slot = plot_width / series.len() as f64;
    let bar_width = slot * 0.7;
    for (index, (month, value)) in series.iter().enumerate() {
        let height = plot_height * value.max(0.0) / scale_max;
        let x = MARGIN_LEFT + slot * index as f64 + (slot - bar_width) / 2.0;
        let _ = writeln!(
            svg,
            r#"  <rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"><title>{}: {:.2}</title></rect>"#,
            x,
            baseline - height,
            bar_width,
            height,
            BAR_COLOR,
            month,
            value
        );
        let _ = writeln!(
            svg,
            r#"  <text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="11">{}</text>"#,
            x + bar_width / 2.0,
            baseline + 18.0,
            month
        );
    }

    let _ = writeln!(
        svg,
        r##"  <line x1="{x}" y1="{top}" x2="{x}" y2="{b}" stroke="#333"/>"##,
        x = MARGIN_LEFT,
        top = MARGIN_TOP,
        b = baseline
    );
    let _ = writeln!(
        svg,
        r##"  <line x1="{x1}" y1="{b}" x2="{x2}" y2="{b}" stroke="#333"/>"##,
        x1 = MARGIN_LEFT,
        x2 = WIDTH - MARGIN_RIGHT,
        b = baseline
    );
    let _ = writeln!(
        svg,
        r#"  <text x="{}" y="{}" text-anchor="middle" font-size="12">Month</text>"#,
        MARGIN_LEFT + plot_width / 2.0,
        HEIGHT - 12.0
    );
    let _ = writeln!(
        svg,
        r#"  <text x="16" y="{y}" text-anchor="middle" font-size="12" transform="rotate(-90 16 {y})">Revenue</text>"#,
        y = MARGIN_TOP + plot_height / 2.0
    );

    svg.push_str("</svg>\n");
    svg
}

fn format_axis_value(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.1}k", value / 1_000.0)
    } else {
        format!("{:.0}", value)
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
