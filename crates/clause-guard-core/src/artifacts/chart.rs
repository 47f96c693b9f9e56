use std::{
    fmt::Write,
    path::{Path, PathBuf},
};

use super::{ArtifactError, ChartRenderer, ChartSpec};

pub const CHART_FILE_NAME: &str = "risk_distribution.svg";

pub(super) const TITLE_BAND: u32 = 50;
pub(super) const AXIS_BAND: u32 = 40;
pub(super) const SIDE_MARGIN: u32 = 40;

/// Bar chart renderer emitting a standalone SVG document.
#[derive(Debug, Clone, Copy)]
pub struct SvgChartRenderer {
    pub width: u32,
    pub height: u32,
}

impl Default for SvgChartRenderer {
    fn default() -> Self {
        Self {
            width: 640,
            height: 400,
        }
    }
}

impl SvgChartRenderer {
    pub fn to_svg(&self, chart: &ChartSpec) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        let (width, height) = (self.width, self.height);
        writeln!(
            out,
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"##
        )?;
        writeln!(out, r##"  <rect width="100%" height="100%" fill="#ffffff"/>"##)?;
        writeln!(
            out,
            r##"  <text x="{x}" y="32" text-anchor="middle" font-family="sans-serif" font-size="20">{title}</text>"##,
            x = width / 2,
            title = escape_xml(&chart.title)
        )?;

        let plot_top = TITLE_BAND;
        let plot_bottom = height.saturating_sub(AXIS_BAND);
        let plot_height = plot_bottom.saturating_sub(plot_top) as f64;
        let plot_width = width.saturating_sub(2 * SIDE_MARGIN) as f64;
        writeln!(
            out,
            r##"  <line x1="{SIDE_MARGIN}" y1="{plot_bottom}" x2="{x2}" y2="{plot_bottom}" stroke="#333333"/>"##,
            x2 = width.saturating_sub(SIDE_MARGIN)
        )?;

        let slots = chart.bars.len().max(1) as f64;
        let slot_width = plot_width / slots;
        let bar_width = slot_width * 0.6;
        // Keep headroom above the tallest bar for its count label.
        let scale = match chart.max_count() {
            0 => 0.0,
            max => (plot_height - 20.0).max(0.0) / max as f64,
        };

        for (idx, bar) in chart.bars.iter().enumerate() {
            let bar_height = bar.count as f64 * scale;
            let x = SIDE_MARGIN as f64 + slot_width * idx as f64 + (slot_width - bar_width) / 2.0;
            let y = plot_bottom as f64 - bar_height;
            let center = x + bar_width / 2.0;
            writeln!(
                out,
                r##"  <rect x="{x:.1}" y="{y:.1}" width="{bar_width:.1}" height="{bar_height:.1}" fill="{color}"/>"##,
                color = bar.color
            )?;
            writeln!(
                out,
                r##"  <text x="{center:.1}" y="{label_y:.1}" text-anchor="middle" font-family="sans-serif" font-size="14">{count}</text>"##,
                label_y = y - 6.0,
                count = bar.count
            )?;
            writeln!(
                out,
                r##"  <text x="{center:.1}" y="{axis_y}" text-anchor="middle" font-family="sans-serif" font-size="14">{label}</text>"##,
                axis_y = plot_bottom + 24,
                label = escape_xml(&bar.label)
            )?;
        }
        writeln!(out, "</svg>")?;
        Ok(out)
    }
}

impl ChartRenderer for SvgChartRenderer {
    fn render(&self, chart: &ChartSpec, dir: &Path) -> Result<PathBuf, ArtifactError> {
        let svg = self
            .to_svg(chart)
            .map_err(|err| ArtifactError::Chart(err.to_string()))?;
        let path = dir.join(CHART_FILE_NAME);
        std::fs::write(&path, svg).map_err(|source| ArtifactError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    fn content_type(&self) -> &'static str {
        "image/svg+xml"
    }
}

fn escape_xml(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
