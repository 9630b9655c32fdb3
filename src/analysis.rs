//! End-to-end pipeline: walk, extract, resolve, enhance, report.

use crate::config::ImpactConfig;
use crate::coverage::{CoverageAnalyzer, CoverageReport};
use crate::extractors;
use crate::graph::enhance::GraphEnhancer;
use crate::graph::{Edge, Node};
use crate::io::walker::SourceWalker;
use crate::orchestrator::{Orchestrator, ResolutionState};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Call graph section of the report: flattened nodes and edges plus how
/// resolution ended.
#[derive(Debug, Clone, Serialize)]
pub struct GraphReport {
    pub state: ResolutionState,
    pub partial: bool,
    pub strategy: String,
    pub message: String,
    pub node_count: usize,
    pub edge_count: usize,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub root: PathBuf,
    pub files_scanned: usize,
    pub symbols_extracted: usize,
    pub parse_failures: usize,
    pub languages: Vec<String>,
    pub call_graph: GraphReport,
    pub coverage: CoverageReport,
}

/// Run the whole analysis over one project directory.
pub fn analyze_project(root: &Path, config: &ImpactConfig) -> Result<AnalysisReport> {
    let walker = SourceWalker::new(root, &config.ignore)?;
    let files = walker.collect()?;
    log::info!("Scanning {} files under {}", files.len(), root.display());

    let table = extractors::extract_files(&files);

    let orchestrator = Orchestrator::new(root, config.clone());
    let mut resolved = orchestrator.resolve(&table);
    GraphEnhancer::new(&table).enhance(&mut resolved.graph);

    let coverage = CoverageAnalyzer::new(&table, &config.coverage).analyze(&resolved.graph);

    let languages = table
        .languages()
        .iter()
        .map(|l| l.display_name().to_string())
        .collect();

    Ok(AnalysisReport {
        generated_at: Utc::now(),
        root: root.to_path_buf(),
        files_scanned: files.len(),
        symbols_extracted: table.len(),
        parse_failures: table.parse_failures(),
        languages,
        call_graph: GraphReport {
            state: resolved.state,
            partial: resolved.partial,
            strategy: resolved.strategy,
            message: resolved.message,
            node_count: resolved.graph.node_count(),
            edge_count: resolved.graph.edge_count(),
            nodes: resolved.graph.nodes().cloned().collect(),
            edges: resolved.graph.edges().cloned().collect(),
        },
        coverage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn end_to_end_on_a_small_go_project() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("calc.go"),
            "package calc\n\nfunc Add(a, b int) int {\n\treturn a + b\n}\n\nfunc scale(a int) int {\n\treturn Add(a, a)\n}\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("calc_test.go"),
            "package calc\n\nimport \"testing\"\n\nfunc TestAdd(t *testing.T) {\n\tAdd(1, 2)\n}\n",
        )
        .unwrap();

        let mut config = ImpactConfig::default();
        config.call_graph.external_tools = false;
        let report = analyze_project(dir.path(), &config).unwrap();

        assert_eq!(report.files_scanned, 2);
        assert_eq!(report.parse_failures, 0);
        assert_eq!(report.call_graph.state, ResolutionState::Completed);
        assert_eq!(report.call_graph.strategy, "builtin");
        assert!(report.call_graph.node_count >= 3);

        let edges: Vec<_> = report
            .call_graph
            .edges
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str()))
            .collect();
        assert!(edges.contains(&("calc.scale", "calc.Add")));
        assert!(edges.contains(&("calc.TestAdd", "calc.Add")));

        // Add is tested, scale is not.
        assert_eq!(report.coverage.overall_coverage, 50);
        assert_eq!(report.coverage.gaps.len(), 1);
        assert_eq!(report.coverage.gaps[0].symbol_id, "calc.scale");
    }

    #[test]
    fn disabled_call_graph_still_reports_coverage() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "def work():\n    pass\n").unwrap();

        let mut config = ImpactConfig::default();
        config.call_graph.enabled = false;
        let report = analyze_project(dir.path(), &config).unwrap();

        assert_eq!(report.call_graph.state, ResolutionState::Disabled);
        assert_eq!(report.call_graph.edge_count, 0);
        assert_eq!(report.coverage.overall_coverage, 0);
    }
}
