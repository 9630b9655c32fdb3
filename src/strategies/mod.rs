//! Call graph resolution strategies.
//!
//! Strategies are tried in descending priority. External whole-program
//! tools go first when present; the built-in heuristic resolver is always
//! last and cannot fail, so resolution degrades instead of erroring.
//! All strategies write into a shared [`GraphSink`] so that whatever was
//! accumulated survives a deadline hit.

pub mod builtin;
pub mod external;

use crate::config::CallGraphConfig;
use crate::core::{Language, SymbolTable};
use crate::graph::{CallGraph, Edge, Node};
use crate::orchestrator::AnalysisBudget;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("{0} is not installed")]
    ToolMissing(String),
    #[error("timed out")]
    Timeout,
    #[error("{tool} failed: {message}")]
    ToolFailed { tool: String, message: String },
    #[error("unparseable tool output: {0}")]
    OutputParse(String),
}

/// Counters reported by one strategy run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveStats {
    pub analyzed: usize,
    pub skipped: usize,
}

/// Shared accumulation point for nodes and edges. Cloning is cheap; all
/// clones write to the same graph.
#[derive(Clone, Default)]
pub struct GraphSink {
    graph: Arc<Mutex<CallGraph>>,
}

impl GraphSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&self, node: Node) {
        self.graph.lock().add_node(node);
    }

    pub fn add_edge(&self, edge: Edge, source_strategy: &str) {
        self.graph.lock().add_edge(edge, source_strategy);
    }

    /// Copy of whatever has been accumulated so far.
    pub fn snapshot(&self) -> CallGraph {
        self.graph.lock().clone()
    }
}

/// One way of turning symbols into call edges.
pub trait CallGraphStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Higher runs earlier.
    fn priority(&self) -> u32;

    /// Cheap availability check, run before `resolve`.
    fn probe(&self) -> Result<(), StrategyError>;

    fn resolve(
        &self,
        table: &SymbolTable,
        budget: &AnalysisBudget,
        sink: &GraphSink,
    ) -> Result<ResolveStats, StrategyError>;
}

/// Runs strategies in priority order until one succeeds.
pub struct StrategyResolver {
    strategies: Vec<Box<dyn CallGraphStrategy>>,
}

/// Outcome of the chain: which strategy produced the edges, and its stats.
#[derive(Debug, Clone)]
pub struct ResolveOutcome {
    pub strategy: String,
    pub stats: ResolveStats,
}

impl StrategyResolver {
    pub fn new(strategies: Vec<Box<dyn CallGraphStrategy>>) -> Self {
        let mut strategies = strategies;
        strategies.sort_by(|a, b| b.priority().cmp(&a.priority()));
        Self { strategies }
    }

    /// Standard chain for a project: external Go tools (when the table
    /// contains Go symbols and external tools are enabled), then the
    /// built-in resolver.
    pub fn for_project(root: &Path, config: &CallGraphConfig, table: &SymbolTable) -> Self {
        let mut strategies: Vec<Box<dyn CallGraphStrategy>> =
            vec![Box::new(builtin::HeuristicStrategy::new())];
        if config.external_tools && table.languages().contains(&Language::Go) {
            strategies.push(Box::new(external::GoCallvisStrategy::new(
                root,
                config.install_missing_tools,
            )));
            strategies.push(Box::new(external::GoGuruStrategy::new(root)));
        }
        Self::new(strategies)
    }

    pub fn resolve(
        &self,
        table: &SymbolTable,
        budget: &AnalysisBudget,
        sink: &GraphSink,
    ) -> Result<ResolveOutcome, StrategyError> {
        let mut last_error = StrategyError::ToolMissing("no strategies configured".to_string());
        for strategy in &self.strategies {
            if let Err(e) = strategy.probe() {
                log::debug!("Strategy {} unavailable: {}", strategy.name(), e);
                last_error = e;
                continue;
            }
            log::info!("Resolving call graph with {}", strategy.name());
            match strategy.resolve(table, budget, sink) {
                Ok(stats) => {
                    log::info!(
                        "{}: {} symbols analyzed, {} skipped",
                        strategy.name(),
                        stats.analyzed,
                        stats.skipped
                    );
                    return Ok(ResolveOutcome {
                        strategy: strategy.name().to_string(),
                        stats,
                    });
                }
                Err(e) => {
                    log::warn!("Strategy {} failed, falling back: {}", strategy.name(), e);
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        name: &'static str,
        priority: u32,
        available: bool,
        fails: bool,
    }

    impl CallGraphStrategy for Fixed {
        fn name(&self) -> &str {
            self.name
        }
        fn priority(&self) -> u32 {
            self.priority
        }
        fn probe(&self) -> Result<(), StrategyError> {
            if self.available {
                Ok(())
            } else {
                Err(StrategyError::ToolMissing(self.name.to_string()))
            }
        }
        fn resolve(
            &self,
            _table: &SymbolTable,
            _budget: &AnalysisBudget,
            _sink: &GraphSink,
        ) -> Result<ResolveStats, StrategyError> {
            if self.fails {
                Err(StrategyError::ToolFailed {
                    tool: self.name.to_string(),
                    message: "boom".to_string(),
                })
            } else {
                Ok(ResolveStats {
                    analyzed: 1,
                    skipped: 0,
                })
            }
        }
    }

    fn fixed(name: &'static str, priority: u32, available: bool, fails: bool) -> Box<Fixed> {
        Box::new(Fixed {
            name,
            priority,
            available,
            fails,
        })
    }

    #[test]
    fn chain_falls_through_to_lower_priority() {
        let resolver = StrategyResolver::new(vec![
            fixed("fallback", 1, true, false),
            fixed("missing", 10, false, false),
            fixed("broken", 5, true, true),
        ]);
        let table = SymbolTable::new();
        let budget = AnalysisBudget::from_millis(1_000, 500, 0.5, 100);
        let outcome = resolver
            .resolve(&table, &budget, &GraphSink::new())
            .expect("fallback should succeed");
        assert_eq!(outcome.strategy, "fallback");
    }
}
