use std::path::{Path, PathBuf};

use super::chart::{AXIS_BAND, SIDE_MARGIN, TITLE_BAND};
use super::{ArtifactError, ChartRenderer, ChartSpec};

pub const PNG_CHART_FILE_NAME: &str = "risk_distribution.png";

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
const TITLE_SCALE: u32 = 3;
const LABEL_SCALE: u32 = 2;

type Rgb = (u8, u8, u8);

const WHITE: Rgb = (255, 255, 255);
const INK: Rgb = (51, 51, 51);

/// Raster bar chart renderer producing a PNG, which mail clients display inline.
#[derive(Debug, Clone, Copy)]
pub struct PngChartRenderer {
    pub width: u32,
    pub height: u32,
}

impl Default for PngChartRenderer {
    fn default() -> Self {
        Self {
            width: 640,
            height: 400,
        }
    }
}

impl PngChartRenderer {
    pub fn to_png(&self, chart: &ChartSpec) -> Result<Vec<u8>, ArtifactError> {
        let (width, height) = (self.width.max(1), self.height.max(1));
        let mut canvas = Canvas::new(width, height, WHITE);
        canvas.draw_text(&chart.title, i64::from(width / 2), 12, TITLE_SCALE, INK);

        let plot_bottom = height.saturating_sub(AXIS_BAND);
        let plot_height = plot_bottom.saturating_sub(TITLE_BAND) as f64;
        let plot_width = width.saturating_sub(2 * SIDE_MARGIN) as f64;
        canvas.fill_rect(
            i64::from(SIDE_MARGIN),
            i64::from(plot_bottom),
            i64::from(width.saturating_sub(2 * SIDE_MARGIN)),
            1,
            INK,
        );

        let slots = chart.bars.len().max(1) as f64;
        let slot_width = plot_width / slots;
        let bar_width = slot_width * 0.6;
        let label_height = f64::from(GLYPH_HEIGHT * LABEL_SCALE);
        // Keep headroom above the tallest bar for its count label.
        let scale = match chart.max_count() {
            0 => 0.0,
            max => (plot_height - label_height - 10.0).max(0.0) / max as f64,
        };

        for (idx, bar) in chart.bars.iter().enumerate() {
            let color = parse_hex_color(bar.color).ok_or_else(|| {
                ArtifactError::Chart(format!("invalid bar color `{}`", bar.color))
            })?;
            let bar_height = bar.count as f64 * scale;
            let x = SIDE_MARGIN as f64 + slot_width * idx as f64 + (slot_width - bar_width) / 2.0;
            let y = plot_bottom as f64 - bar_height;
            let center = (x + bar_width / 2.0).round() as i64;
            canvas.fill_rect(
                x.round() as i64,
                y.round() as i64,
                bar_width.round() as i64,
                bar_height.round() as i64,
                color,
            );
            canvas.draw_text(
                &bar.count.to_string(),
                center,
                (y - 6.0 - label_height).round() as i64,
                LABEL_SCALE,
                INK,
            );
            canvas.draw_text(
                &bar.label,
                center,
                i64::from(plot_bottom) + 10,
                LABEL_SCALE,
                INK,
            );
        }

        canvas.encode()
    }
}

impl ChartRenderer for PngChartRenderer {
    fn render(&self, chart: &ChartSpec, dir: &Path) -> Result<PathBuf, ArtifactError> {
        let bytes = self.to_png(chart)?;
        let path = dir.join(PNG_CHART_FILE_NAME);
        std::fs::write(&path, bytes).map_err(|source| ArtifactError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    fn content_type(&self) -> &'static str {
        "image/png"
    }
}

/// RGBA pixel buffer with clipped drawing primitives.
struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    fn new(width: u32, height: u32, background: Rgb) -> Self {
        let mut pixels = vec![255u8; (width * height * 4) as usize];
        for chunk in pixels.chunks_mut(4) {
            chunk[0] = background.0;
            chunk[1] = background.1;
            chunk[2] = background.2;
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    fn fill_rect(&mut self, x: i64, y: i64, w: i64, h: i64, color: Rgb) {
        let x0 = x.clamp(0, i64::from(self.width));
        let y0 = y.clamp(0, i64::from(self.height));
        let x1 = (x + w).clamp(0, i64::from(self.width));
        let y1 = (y + h).clamp(0, i64::from(self.height));
        for py in y0..y1 {
            for px in x0..x1 {
                let idx = ((py as u32 * self.width + px as u32) * 4) as usize;
                self.pixels[idx] = color.0;
                self.pixels[idx + 1] = color.1;
                self.pixels[idx + 2] = color.2;
                self.pixels[idx + 3] = 255;
            }
        }
    }

    /// Draw `text` horizontally centered on `center_x`, with its top edge at `top`.
    fn draw_text(&mut self, text: &str, center_x: i64, top: i64, scale: u32, color: Rgb) {
        let advance = i64::from((GLYPH_WIDTH + 1) * scale);
        let chars = text.chars().count() as i64;
        let text_width = (chars * advance - i64::from(scale)).max(0);
        let mut cursor = center_x - text_width / 2;
        let cell = i64::from(scale);
        for ch in text.chars() {
            if let Some(rows) = glyph(ch) {
                for (row, bits) in rows.iter().enumerate() {
                    for col in 0..GLYPH_WIDTH {
                        if bits & (1 << (GLYPH_WIDTH - 1 - col)) != 0 {
                            self.fill_rect(
                                cursor + i64::from(col) * cell,
                                top + row as i64 * cell,
                                cell,
                                cell,
                                color,
                            );
                        }
                    }
                }
            }
            cursor += advance;
        }
    }

    fn encode(self) -> Result<Vec<u8>, ArtifactError> {
        let mut bytes = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut bytes, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().map_err(png_error)?;
            writer.write_image_data(&self.pixels).map_err(png_error)?;
            writer.finish().map_err(png_error)?;
        }
        Ok(bytes)
    }
}

fn png_error(err: png::EncodingError) -> ArtifactError {
    ArtifactError::Chart(format!("PNG encoding failed: {err}"))
}

fn parse_hex_color(color: &str) -> Option<Rgb> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// 5x7 glyphs for the characters used by chart titles, tier labels and counts.
/// Characters without a glyph advance the cursor as blanks.
fn glyph(ch: char) -> Option<[u8; 7]> {
    let rows = match ch {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        'D' => [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'b' => [0x10, 0x10, 0x16, 0x19, 0x11, 0x11, 0x1E],
        'd' => [0x01, 0x01, 0x0D, 0x13, 0x11, 0x11, 0x0F],
        'e' => [0x00, 0x00, 0x0E, 0x11, 0x1F, 0x10, 0x0E],
        'g' => [0x00, 0x0F, 0x11, 0x11, 0x0F, 0x01, 0x0E],
        'h' => [0x10, 0x10, 0x16, 0x19, 0x11, 0x11, 0x11],
        'i' => [0x04, 0x00, 0x0C, 0x04, 0x04, 0x04, 0x0E],
        'k' => [0x10, 0x10, 0x12, 0x14, 0x18, 0x14, 0x12],
        'l' => [0x0C, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'm' => [0x00, 0x00, 0x1A, 0x15, 0x15, 0x11, 0x11],
        'n' => [0x00, 0x00, 0x16, 0x19, 0x11, 0x11, 0x11],
        'o' => [0x00, 0x00, 0x0E, 0x11, 0x11, 0x11, 0x0E],
        'r' => [0x00, 0x00, 0x16, 0x19, 0x10, 0x10, 0x10],
        's' => [0x00, 0x00, 0x0E, 0x10, 0x0E, 0x01, 0x1E],
        't' => [0x08, 0x08, 0x1C, 0x08, 0x08, 0x09, 0x06],
        'u' => [0x00, 0x00, 0x11, 0x11, 0x11, 0x13, 0x0D],
        'v' => [0x00, 0x00, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'w' => [0x00, 0x00, 0x11, 0x11, 0x15, 0x15, 0x0A],
        _ => return None,
    };
    Some(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ChartBar;
    use crate::clauses::RiskDistribution;
    use std::io::Cursor;

    fn decode(bytes: &[u8]) -> (png::OutputInfo, Vec<u8>) {
        let decoder = png::Decoder::new(Cursor::new(bytes));
        let mut reader = decoder.read_info().unwrap();
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf).unwrap();
        buf.truncate(info.buffer_size());
        (info, buf)
    }

    fn has_pixel(buf: &[u8], color: Rgb) -> bool {
        buf.chunks(4)
            .any(|px| (px[0], px[1], px[2]) == color && px[3] == 255)
    }

    #[test]
    fn renders_png_with_tier_colors() {
        let spec = ChartSpec::risk_distribution(&RiskDistribution {
            high: 2,
            medium: 1,
            low: 3,
        });
        let bytes = PngChartRenderer::default().to_png(&spec).unwrap();
        assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));

        let (info, buf) = decode(&bytes);
        assert_eq!((info.width, info.height), (640, 400));
        assert!(has_pixel(&buf, (0xff, 0x44, 0x44)));
        assert!(has_pixel(&buf, (0xff, 0xaa, 0x00)));
        assert!(has_pixel(&buf, (0x44, 0xff, 0x44)));
        assert!(has_pixel(&buf, INK));
    }

    #[test]
    fn zero_count_tier_draws_no_bar() {
        let spec = ChartSpec::risk_distribution(&RiskDistribution {
            high: 0,
            medium: 0,
            low: 4,
        });
        let (_, buf) = decode(&PngChartRenderer::default().to_png(&spec).unwrap());
        assert!(!has_pixel(&buf, (0xff, 0x44, 0x44)));
        assert!(has_pixel(&buf, (0x44, 0xff, 0x44)));
    }

    #[test]
    fn empty_distribution_still_renders() {
        let spec = ChartSpec::risk_distribution(&RiskDistribution::default());
        let (info, _) = decode(&PngChartRenderer::default().to_png(&spec).unwrap());
        assert_eq!(info.width, 640);
    }

    #[test]
    fn invalid_bar_color_is_a_chart_error() {
        let spec = ChartSpec {
            title: "Risk".into(),
            bars: vec![ChartBar {
                label: "High".into(),
                count: 1,
                color: "red",
            }],
        };
        let err = PngChartRenderer::default().to_png(&spec).unwrap_err();
        assert!(matches!(err, ArtifactError::Chart(message) if message.contains("`red`")));
    }

    #[test]
    fn writes_png_file_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = PngChartRenderer::default();
        let spec = ChartSpec::risk_distribution(&RiskDistribution {
            high: 1,
            medium: 0,
            low: 0,
        });
        let path = renderer.render(&spec, dir.path()).unwrap();
        assert_eq!(path, dir.path().join(PNG_CHART_FILE_NAME));
        assert!(std::fs::read(path).unwrap().starts_with(b"\x89PNG"));
        assert_eq!(renderer.content_type(), "image/png");
    }

    #[test]
    fn parses_hex_colors() {
        assert_eq!(parse_hex_color("#ffaa00"), Some((255, 170, 0)));
        assert_eq!(parse_hex_color("ffaa00"), None);
        assert_eq!(parse_hex_color("#ffaa0"), None);
    }
}
