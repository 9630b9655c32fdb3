//! Report output: pretty JSON and a terminal summary.

use crate::analysis::AnalysisReport;
use crate::core::RiskLevel;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

pub fn write_json(report: &AnalysisReport, writer: &mut dyn Write) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    writeln!(writer, "{json}").context("Failed to write report")?;
    Ok(())
}

pub fn write_json_file(report: &AnalysisReport, path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_json(report, &mut file)
}

/// Human-readable summary for terminal runs.
pub fn write_summary(report: &AnalysisReport, writer: &mut dyn Write) -> Result<()> {
    writeln!(writer, "Impact analysis of {}", report.root.display())?;
    writeln!(
        writer,
        "  {} files, {} symbols, {} parse failures ({})",
        report.files_scanned,
        report.symbols_extracted,
        report.parse_failures,
        report.languages.join(", ")
    )?;

    let graph = &report.call_graph;
    let partial = if graph.partial { " (partial)" } else { "" };
    writeln!(
        writer,
        "  call graph: {} nodes, {} edges via {}{}",
        graph.node_count, graph.edge_count, graph.strategy, partial
    )?;

    let stats = &report.coverage.statistics;
    writeln!(
        writer,
        "  coverage: {}% ({} of {} symbols, {} tests)",
        report.coverage.overall_coverage,
        stats.covered_symbols,
        stats.total_symbols,
        stats.test_count
    )?;

    if report.coverage.gaps.is_empty() {
        writeln!(writer, "  no coverage gaps")?;
        return Ok(());
    }
    writeln!(writer, "  top gaps:")?;
    for gap in report.coverage.gaps.iter().take(10) {
        writeln!(
            writer,
            "    [{}] {} ({}:{}) - {}",
            risk_tag(gap.risk_level),
            gap.symbol_id,
            gap.file.display(),
            gap.line,
            gap.reason
        )?;
    }
    let remaining = report.coverage.gaps.len().saturating_sub(10);
    if remaining > 0 {
        writeln!(writer, "    ... and {remaining} more")?;
    }
    Ok(())
}

fn risk_tag(risk: RiskLevel) -> &'static str {
    match risk {
        RiskLevel::High => "HIGH",
        RiskLevel::Medium => "MED ",
        RiskLevel::Low => "LOW ",
    }
}
