//! Test-coverage gap analysis.
//!
//! Coverage here is direct: a business symbol counts as covered only when
//! some test's call references name it. Transitive coverage through
//! helpers is deliberately not credited, so the gap list points at the
//! symbols no test touches at all.

use crate::config::CoverageConfig;
use crate::core::{RiskLevel, SymbolTable};
use crate::graph::enhance::{is_test_referenced, node_risk};
use crate::graph::CallGraph;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize)]
pub struct CoverageGap {
    pub symbol_id: String,
    pub name: String,
    pub module: String,
    pub signature: String,
    pub file: PathBuf,
    pub line: usize,
    pub risk_level: RiskLevel,
    pub reason: String,
    /// Known callers, by node id.
    pub callers: Vec<String>,
    pub callers_count: usize,
    pub complexity: u32,
    pub is_exported: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CoverageStatistics {
    pub total_symbols: usize,
    pub covered_symbols: usize,
    pub uncovered_symbols: usize,
    pub test_count: usize,
    pub high_risk_gaps: usize,
    pub medium_risk_gaps: usize,
    pub low_risk_gaps: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverageReport {
    /// Percentage of business symbols with direct test coverage, 0-100.
    pub overall_coverage: u8,
    pub gaps: Vec<CoverageGap>,
    pub statistics: CoverageStatistics,
}

pub struct CoverageAnalyzer<'a> {
    table: &'a SymbolTable,
    config: &'a CoverageConfig,
}

impl<'a> CoverageAnalyzer<'a> {
    pub fn new(table: &'a SymbolTable, config: &'a CoverageConfig) -> Self {
        Self { table, config }
    }

    pub fn analyze(&self, graph: &CallGraph) -> CoverageReport {
        let test_refs: HashSet<String> = self
            .table
            .test_symbols()
            .flat_map(|t| t.call_refs.iter().map(|c| c.name.clone()))
            .collect();

        let mut stats = CoverageStatistics {
            test_count: self.table.test_symbols().count(),
            ..Default::default()
        };
        let mut gaps = Vec::new();

        for symbol in self.table.business_symbols() {
            stats.total_symbols += 1;
            if is_test_referenced(&test_refs, &symbol.name, &symbol.id) {
                stats.covered_symbols += 1;
                continue;
            }
            stats.uncovered_symbols += 1;

            let risk = node_risk(symbol, false);
            // Exported symbols always gap; internal ones only above the
            // configured floor.
            if !symbol.is_exported && risk < self.config.min_gap_risk {
                continue;
            }

            let callers = graph.callers(&symbol.id);
            let reason = gap_reason(symbol, callers.len());
            match risk {
                RiskLevel::High => stats.high_risk_gaps += 1,
                RiskLevel::Medium => stats.medium_risk_gaps += 1,
                RiskLevel::Low => stats.low_risk_gaps += 1,
            }
            gaps.push(CoverageGap {
                symbol_id: symbol.id.clone(),
                name: symbol.name.clone(),
                module: symbol.module.clone(),
                signature: symbol.signature.clone(),
                file: symbol.file.clone(),
                line: symbol.line,
                risk_level: risk,
                reason,
                callers_count: callers.len(),
                callers,
                complexity: symbol.complexity,
                is_exported: symbol.is_exported,
            });
        }

        gaps.sort_by(|a, b| {
            b.risk_level
                .cmp(&a.risk_level)
                .then(b.complexity.cmp(&a.complexity))
                .then(a.symbol_id.cmp(&b.symbol_id))
        });

        CoverageReport {
            overall_coverage: coverage_percent(stats.covered_symbols, stats.total_symbols),
            gaps,
            statistics: stats,
        }
    }
}

/// Rounded percentage; an empty business set counts as fully covered.
fn coverage_percent(covered: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((covered as f64 / total as f64) * 100.0).round() as u8
}

fn gap_reason(symbol: &crate::core::SymbolRecord, callers_count: usize) -> String {
    let mut factors = Vec::new();
    if symbol.is_exported {
        factors.push("exported function lacks tests".to_string());
    }
    if symbol.complexity > 5 {
        factors.push(format!("high complexity ({})", symbol.complexity));
    }
    if symbol.traits.spawns_tasks {
        factors.push("spawns concurrent tasks".to_string());
    }
    if symbol.traits.uses_channels {
        factors.push("uses channel operations".to_string());
    }
    if symbol.traits.may_panic {
        factors.push("can panic".to_string());
    }
    if callers_count > 0 {
        factors.push(format!("called by {callers_count} functions"));
    }
    if factors.is_empty() {
        factors.push("no direct test coverage".to_string());
    }
    factors.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CallRef, Language, SymbolKind, SymbolRecord, SymbolTraits};
    use crate::graph::{Edge, Node};

    fn record(module: &str, name: &str, kind: SymbolKind, calls: &[&str]) -> SymbolRecord {
        SymbolRecord {
            id: SymbolRecord::qualified_name(module, name),
            name: name.to_string(),
            kind,
            signature: format!("func {name}()"),
            file: PathBuf::from(format!("{module}.go")),
            line: 1,
            module: module.to_string(),
            receiver: None,
            is_exported: name.chars().next().is_some_and(|c| c.is_uppercase()),
            complexity: 1,
            call_refs: calls
                .iter()
                .map(|c| CallRef {
                    name: c.to_string(),
                    line: 2,
                })
                .collect(),
            traits: SymbolTraits::default(),
            language: Language::Go,
            in_test_file: kind.is_test_like(),
        }
    }

    fn analyze(table: &SymbolTable, graph: &CallGraph) -> CoverageReport {
        let config = CoverageConfig::default();
        CoverageAnalyzer::new(table, &config).analyze(graph)
    }

    #[test]
    fn covered_and_uncovered_split_the_percentage() {
        let table = SymbolTable::from_records(
            vec![
                record("pkg", "Covered", SymbolKind::Function, &[]),
                record("pkg", "Naked", SymbolKind::Function, &[]),
                record("pkg", "TestCovered", SymbolKind::Test, &["Covered"]),
            ],
            0,
        );
        let report = analyze(&table, &CallGraph::new());
        assert_eq!(report.overall_coverage, 50);
        assert_eq!(report.statistics.total_symbols, 2);
        assert_eq!(report.statistics.covered_symbols, 1);
        assert_eq!(report.gaps.len(), 1);
        assert_eq!(report.gaps[0].symbol_id, "pkg.Naked");
    }

    #[test]
    fn no_business_symbols_means_full_coverage() {
        let table = SymbolTable::from_records(
            vec![record("pkg", "TestOnly", SymbolKind::Test, &[])],
            0,
        );
        let report = analyze(&table, &CallGraph::new());
        assert_eq!(report.overall_coverage, 100);
        assert!(report.gaps.is_empty());
    }

    #[test]
    fn exported_uncovered_symbols_always_gap() {
        let config = CoverageConfig {
            min_gap_risk: RiskLevel::High,
        };
        let table = SymbolTable::from_records(
            vec![
                record("pkg", "Exported", SymbolKind::Function, &[]),
                record("pkg", "quiet", SymbolKind::Function, &[]),
            ],
            0,
        );
        let report = CoverageAnalyzer::new(&table, &config).analyze(&CallGraph::new());
        let ids: Vec<_> = report.gaps.iter().map(|g| g.symbol_id.as_str()).collect();
        // quiet is low risk and filtered; Exported gaps regardless.
        assert_eq!(ids, vec!["pkg.Exported"]);
        assert!(report.gaps[0].reason.contains("exported function lacks tests"));
    }

    #[test]
    fn risky_traits_show_up_in_the_reason() {
        let mut risky = record("pkg", "worker", SymbolKind::Function, &[]);
        risky.complexity = 8;
        risky.traits = SymbolTraits {
            spawns_tasks: true,
            uses_channels: true,
            may_panic: true,
            defers_cleanup: false,
        };
        let caller = record("pkg", "Run", SymbolKind::Function, &["worker"]);
        let table = SymbolTable::from_records(vec![risky.clone(), caller.clone()], 0);

        let mut graph = CallGraph::new();
        graph.add_node(Node::from_symbol(&caller, "builtin"));
        graph.add_node(Node::from_symbol(&risky, "builtin"));
        graph.add_edge(Edge::calls("pkg.Run", "pkg.worker"), "builtin");

        let report = analyze(&table, &graph);
        let gap = report
            .gaps
            .iter()
            .find(|g| g.symbol_id == "pkg.worker")
            .expect("worker should gap");
        assert_eq!(gap.risk_level, RiskLevel::High);
        assert!(gap.reason.contains("high complexity (8)"));
        assert!(gap.reason.contains("spawns concurrent tasks"));
        assert!(gap.reason.contains("can panic"));
        assert!(gap.reason.contains("called by 1 functions"));
        assert_eq!(gap.callers, vec!["pkg.Run".to_string()]);
    }

    #[test]
    fn gaps_sort_by_risk_then_complexity() {
        let mut hot = record("pkg", "hot", SymbolKind::Function, &[]);
        hot.complexity = 20;
        hot.traits.may_panic = true;
        let mild = record("pkg", "mild", SymbolKind::Function, &[]);
        let table = SymbolTable::from_records(vec![mild, hot], 0);

        let report = analyze(&table, &CallGraph::new());
        assert_eq!(report.gaps[0].symbol_id, "pkg.hot");
        assert_eq!(report.gaps[1].symbol_id, "pkg.mild");
    }
}
