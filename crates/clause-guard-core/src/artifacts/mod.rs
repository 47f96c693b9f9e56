//! Report artifacts (PDF and chart) and the temporary scope they live in.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Serialize;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::clauses::{ClauseStore, RiskDistribution, RiskLevel};
use crate::rewrite::RewriteSelection;

pub mod bitmap;
pub mod chart;
pub mod pdf;

pub use bitmap::PngChartRenderer;
pub use chart::SvgChartRenderer;
pub use pdf::PrintPdfRenderer;

pub const PDF_FILE_NAME: &str = "ai_rewritten_clauses_report.pdf";
pub const PDF_TITLE: &str = "AI-Rewritten Clauses Report";
pub const CHART_TITLE: &str = "Risk Level Distribution";

/// Errors raised while producing report artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to create temporary artifact directory: {0}")]
    Scope(#[source] io::Error),
    #[error("failed to write artifact {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to render PDF report: {0}")]
    Pdf(String),
    #[error("failed to render risk chart: {0}")]
    Chart(String),
}

/// Temporary directory holding the artifacts of one distribution attempt.
///
/// Everything written through the scope is removed when it is dropped or closed.
#[derive(Debug)]
pub struct ArtifactScope {
    dir: TempDir,
}

impl ArtifactScope {
    pub fn new() -> Result<Self, ArtifactError> {
        let dir = tempfile::Builder::new()
            .prefix("clause-guard-")
            .tempdir()
            .map_err(ArtifactError::Scope)?;
        debug!(path = %dir.path().display(), "opened artifact scope");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ArtifactError> {
        let path = self.dir.path().join(file_name);
        fs::write(&path, bytes).map_err(|source| ArtifactError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Remove the scope now, logging instead of failing if cleanup goes wrong.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(err) = self.dir.close() {
            warn!(path = %path.display(), error = %err, "failed to remove artifact scope");
        } else {
            debug!(path = %path.display(), "released artifact scope");
        }
    }
}

/// Renders the rewrite selection into a binary document.
pub trait PdfRenderer {
    fn render(&self, title: &str, selection: &RewriteSelection) -> Result<Vec<u8>, ArtifactError>;
}

/// Renders a categorical bar chart into an image file inside `dir`.
pub trait ChartRenderer {
    fn render(&self, chart: &ChartSpec, dir: &Path) -> Result<PathBuf, ArtifactError>;

    /// MIME type of the files this renderer produces.
    fn content_type(&self) -> &'static str;
}

/// Fixed color for each risk tier.
pub fn risk_color(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::High => "#ff4444",
        RiskLevel::Medium => "#ffaa00",
        RiskLevel::Low => "#44ff44",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartBar {
    pub label: String,
    pub count: usize,
    pub color: &'static str,
}

/// Input for a chart renderer: title plus bars in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub bars: Vec<ChartBar>,
}

impl ChartSpec {
    /// Histogram with one bin per risk tier (High, Medium, Low).
    pub fn risk_distribution(distribution: &RiskDistribution) -> Self {
        let bars = RiskLevel::ALL
            .iter()
            .map(|level| ChartBar {
                label: level.to_string(),
                count: distribution.count(*level),
                color: risk_color(*level),
            })
            .collect();
        Self {
            title: CHART_TITLE.to_string(),
            bars,
        }
    }

    pub fn max_count(&self) -> usize {
        self.bars.iter().map(|bar| bar.count).max().unwrap_or(0)
    }
}

/// Render the rewrite selection to PDF bytes; `None` when there is nothing to rewrite.
#[instrument(name = "render_pdf", skip_all, fields(rows = selection.len()))]
pub fn render_pdf<R>(renderer: &R, selection: &RewriteSelection) -> Result<Option<Vec<u8>>, ArtifactError>
where
    R: PdfRenderer + ?Sized,
{
    if selection.is_empty() {
        debug!("no clauses to rewrite; skipping PDF");
        return Ok(None);
    }
    renderer.render(PDF_TITLE, selection).map(Some)
}

/// Render the PDF into the scope, returning its path when one was produced.
pub fn build_pdf<R>(
    renderer: &R,
    selection: &RewriteSelection,
    scope: &ArtifactScope,
) -> Result<Option<PathBuf>, ArtifactError>
where
    R: PdfRenderer + ?Sized,
{
    match render_pdf(renderer, selection)? {
        Some(bytes) => scope.write(PDF_FILE_NAME, &bytes).map(Some),
        None => Ok(None),
    }
}

/// Render the risk distribution chart of the full store into the scope.
#[instrument(name = "build_chart", skip_all, fields(clauses = store.len()))]
pub fn build_chart<R>(renderer: &R, store: &ClauseStore, scope: &ArtifactScope) -> Result<PathBuf, ArtifactError>
where
    R: ChartRenderer + ?Sized,
{
    let spec = ChartSpec::risk_distribution(&store.distribution());
    renderer.render(&spec, scope.path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clauses::fixtures::store_with;
    use crate::rewrite::select_rewrites;

    struct FixedPdf;

    impl PdfRenderer for FixedPdf {
        fn render(&self, _title: &str, _selection: &RewriteSelection) -> Result<Vec<u8>, ArtifactError> {
            Ok(b"%PDF-fake".to_vec())
        }
    }

    #[test]
    fn chart_spec_has_fixed_bins_and_colors() {
        let spec = ChartSpec::risk_distribution(&RiskDistribution {
            high: 2,
            medium: 0,
            low: 3,
        });
        let labels: Vec<_> = spec.bars.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["High", "Medium", "Low"]);
        let colors: Vec<_> = spec.bars.iter().map(|b| b.color).collect();
        assert_eq!(colors, vec!["#ff4444", "#ffaa00", "#44ff44"]);
        assert_eq!(spec.bars[1].count, 0);
        assert_eq!(spec.max_count(), 3);
        assert_eq!(spec.title, CHART_TITLE);
    }

    #[test]
    fn empty_selection_produces_no_pdf() {
        let scope = ArtifactScope::new().unwrap();
        let selection = select_rewrites(&store_with(0, 0, 5));
        assert!(build_pdf(&FixedPdf, &selection, &scope).unwrap().is_none());
        assert_eq!(fs::read_dir(scope.path()).unwrap().count(), 0);
    }

    #[test]
    fn pdf_is_written_inside_scope() {
        let scope = ArtifactScope::new().unwrap();
        let selection = select_rewrites(&store_with(1, 0, 1));
        let path = build_pdf(&FixedPdf, &selection, &scope).unwrap().unwrap();
        assert!(path.starts_with(scope.path()));
        assert_eq!(fs::read(&path).unwrap(), b"%PDF-fake");
    }

    #[test]
    fn closing_scope_removes_artifacts() {
        let scope = ArtifactScope::new().unwrap();
        let root = scope.path().to_path_buf();
        let file = scope.write("chart.svg", b"<svg/>").unwrap();
        assert!(file.exists());
        scope.close();
        assert!(!root.exists());
    }

    #[test]
    fn dropping_scope_removes_artifacts() {
        let root = {
            let scope = ArtifactScope::new().unwrap();
            scope.write(PDF_FILE_NAME, b"data").unwrap();
            scope.path().to_path_buf()
        };
        assert!(!root.exists());
    }
}
