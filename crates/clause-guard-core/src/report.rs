use std::fmt::Write;

use serde::Serialize;

use crate::aggregate::{aggregate, AggregatedSummary};
use crate::clauses::{ClauseStore, EmptyInput};
use crate::rewrite::{results_table, select_rewrites, ResultRow, RewriteSelection};
use crate::session::RewriteView;
use crate::verdict::{decide, Severity, Verdict};

/// Format styles supported in default reporter implementations.
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Everything shown on the summary page, derived from one store snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportView {
    pub summary: AggregatedSummary,
    pub verdict: Verdict,
    pub severity: Severity,
    pub results: Vec<ResultRow>,
    /// Present only while the rewrite view is expanded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewrites: Option<RewriteSelection>,
}

impl ReportView {
    pub fn build(store: &ClauseStore, view: RewriteView) -> Result<Self, EmptyInput> {
        let summary = aggregate(store)?;
        let verdict = decide(&summary.distribution);
        let rewrites = match view {
            RewriteView::Collapsed => None,
            RewriteView::Expanded => Some(select_rewrites(store)),
        };
        Ok(Self {
            verdict,
            severity: verdict.severity(),
            results: results_table(store),
            rewrites,
            summary,
        })
    }
}

/// Produce a report string from a `ReportView` using the desired format.
pub fn render_report(view: &ReportView, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Human => render_human(view),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(view)?),
    }
}

fn render_human(view: &ReportView) -> anyhow::Result<String> {
    let mut out = String::new();
    let summary = &view.summary;

    writeln!(out, "Contract Summary")?;
    writeln!(
        out,
        "  {} clause(s) analyzed • GDPR issues: {} • HIPAA issues: {} • High risk: {}",
        summary.total, summary.gdpr_issues, summary.hipaa_issues, summary.high_risk
    )?;
    for point in &summary.summary_points {
        writeln!(out, "  • {point}")?;
    }

    writeln!(out, "\nKey Points to Consider")?;
    for recommendation in &summary.recommendations {
        writeln!(out, "  • {recommendation}")?;
    }

    writeln!(out, "\nRecommendation")?;
    writeln!(out, "  {}", view.verdict.message())?;

    writeln!(out, "\nAnalysis Results")?;
    let rows: Vec<Vec<String>> = view
        .results
        .iter()
        .map(|row| {
            vec![
                row.clause_id.clone(),
                row.risk_level.to_string(),
                row.compliant_mark().to_string(),
                row.comments.clone(),
            ]
        })
        .collect();
    write_table(
        &mut out,
        &["Clause ID", "Risk Level", "Compliant", "Comments"],
        &rows,
    )?;

    if let Some(rewrites) = &view.rewrites {
        writeln!(out, "\nAI-Modified Clauses")?;
        if rewrites.is_empty() {
            writeln!(out, "  No high-risk clauses were found to rewrite.")?;
        } else {
            let rows: Vec<Vec<String>> = rewrites
                .rows()
                .iter()
                .map(|row| {
                    vec![
                        row.clause_id.clone(),
                        sanitize_cell(&row.original_clause),
                        sanitize_cell(&row.ai_modified_clause),
                        row.new_risk_level
                            .map(|level| level.to_string())
                            .unwrap_or_default(),
                    ]
                })
                .collect();
            write_table(
                &mut out,
                &[
                    "Clause ID",
                    "Original Clause",
                    "AI-Modified Clause",
                    "New Risk Level",
                ],
                &rows,
            )?;
        }
    }

    Ok(out)
}

fn write_table(out: &mut String, headers: &[&str], rows: &[Vec<String>]) -> std::fmt::Result {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    write_row(out, &header_cells, &widths)?;
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    write_row(out, &rule, &widths)?;
    for row in rows {
        write_row(out, row, &widths)?;
    }
    Ok(())
}

fn write_row(out: &mut String, cells: &[String], widths: &[usize]) -> std::fmt::Result {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect();
    writeln!(out, "  {}", padded.join(" | ").trim_end())
}

fn sanitize_cell(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            _ => c,
        })
        .collect()
}
