//! Resolution orchestration: budgeting, sampling, and the deadline race.
//!
//! Resolution runs on a worker thread and races a global deadline. When
//! the deadline fires first the worker is abandoned and whatever the
//! shared sink accumulated is returned as a partial graph. Every known
//! symbol is seeded as a node before the race starts, so even an
//! immediate timeout yields a usable (edge-less) graph.

use crate::config::ImpactConfig;
use crate::core::{SymbolRecord, SymbolTable};
use crate::graph::{CallGraph, Node};
use crate::strategies::{GraphSink, StrategyResolver};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Wall-clock budget shared by every strategy in one resolution run.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisBudget {
    deadline: Instant,
    total: Duration,
    max_symbols: usize,
    sampling_ratio: f64,
    per_symbol_timeout: Duration,
}

impl AnalysisBudget {
    pub fn from_millis(
        deadline_ms: u64,
        max_symbols: usize,
        sampling_ratio: f64,
        per_symbol_timeout_ms: u64,
    ) -> Self {
        let total = Duration::from_millis(deadline_ms);
        Self {
            deadline: Instant::now() + total,
            total,
            max_symbols,
            sampling_ratio,
            per_symbol_timeout: Duration::from_millis(per_symbol_timeout_ms),
        }
    }

    pub fn from_config(config: &ImpactConfig) -> Self {
        let cg = &config.call_graph;
        Self::from_millis(
            cg.deadline_ms,
            cg.max_symbols,
            cg.sampling_ratio,
            cg.per_symbol_timeout_ms,
        )
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn max_symbols(&self) -> usize {
        self.max_symbols
    }

    pub fn per_symbol_timeout(&self) -> Duration {
        self.per_symbol_timeout
    }
}

/// How a resolution run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionState {
    Disabled,
    Completed,
    TimedOut,
    Failed,
}

/// A resolved (possibly partial) call graph plus how it was obtained.
#[derive(Debug, Clone)]
pub struct ResolvedGraph {
    pub graph: CallGraph,
    pub state: ResolutionState,
    /// Some edges or symbols are missing: deadline hit, or symbols skipped.
    pub partial: bool,
    /// Strategy that produced the edges, or "none".
    pub strategy: String,
    pub message: String,
}

pub struct Orchestrator {
    root: PathBuf,
    config: ImpactConfig,
}

impl Orchestrator {
    pub fn new(root: &Path, config: ImpactConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
        }
    }

    pub fn resolve(&self, table: &SymbolTable) -> ResolvedGraph {
        if !self.config.call_graph.enabled {
            return ResolvedGraph {
                graph: CallGraph::new(),
                state: ResolutionState::Disabled,
                partial: false,
                strategy: "none".to_string(),
                message: "call graph resolution disabled".to_string(),
            };
        }

        let budget = AnalysisBudget::from_config(&self.config);
        let (selected, sampled) = select_symbols(
            table,
            &budget,
            self.config.call_graph.sampling_enabled,
            &self.config.changed_files,
        );
        if sampled {
            log::info!(
                "Sampling {} of {} symbols for resolution",
                selected.len(),
                table.len()
            );
        }

        let sink = GraphSink::new();
        for symbol in table.symbols() {
            sink.add_node(Node::from_symbol(symbol, "extraction"));
        }

        let resolver = StrategyResolver::for_project(&self.root, &self.config.call_graph, &selected);
        let mut resolved = run_race(resolver, selected, budget, sink);
        resolved.partial |= sampled;
        resolved
    }
}

/// Race the resolver against the budget's deadline. The sink is read on
/// this thread when the deadline fires; the worker keeps running but its
/// late writes are no longer observed.
pub fn run_race(
    resolver: StrategyResolver,
    table: SymbolTable,
    budget: AnalysisBudget,
    sink: GraphSink,
) -> ResolvedGraph {
    let (tx, rx) = crossbeam::channel::bounded(1);
    let worker_sink = sink.clone();
    std::thread::spawn(move || {
        let outcome = resolver.resolve(&table, &budget, &worker_sink);
        let _ = tx.send(outcome);
    });

    match rx.recv_timeout(budget.total()) {
        Ok(Ok(outcome)) => ResolvedGraph {
            graph: sink.snapshot(),
            state: ResolutionState::Completed,
            partial: outcome.stats.skipped > 0,
            strategy: outcome.strategy.clone(),
            message: format!(
                "{}: {} analyzed, {} skipped",
                outcome.strategy, outcome.stats.analyzed, outcome.stats.skipped
            ),
        },
        Ok(Err(e)) => ResolvedGraph {
            graph: sink.snapshot(),
            state: ResolutionState::Failed,
            partial: true,
            strategy: "none".to_string(),
            message: format!("all strategies failed: {e}"),
        },
        Err(_) => {
            log::warn!(
                "Call graph resolution deadline ({:?}) exceeded, returning partial graph",
                budget.total()
            );
            ResolvedGraph {
                graph: sink.snapshot(),
                state: ResolutionState::TimedOut,
                partial: true,
                strategy: "none".to_string(),
                message: format!("deadline of {:?} exceeded", budget.total()),
            }
        }
    }
}

/// Deterministic sampling: when the table exceeds `max_symbols` and
/// sampling is on, keep `floor(len * ratio)` symbols, preferring exported
/// symbols, then symbols in changed files, then input order.
pub fn select_symbols(
    table: &SymbolTable,
    budget: &AnalysisBudget,
    sampling_enabled: bool,
    changed_files: &[PathBuf],
) -> (SymbolTable, bool) {
    if !sampling_enabled || table.len() <= budget.max_symbols() {
        return (table.clone(), false);
    }

    let size = ((table.len() as f64) * budget.sampling_ratio).floor() as usize;
    let size = size.max(1);

    let weight = |s: &SymbolRecord| -> u32 {
        let mut w = 0;
        if s.is_exported {
            w += 2;
        }
        if changed_files.iter().any(|f| f == &s.file) {
            w += 1;
        }
        w
    };

    let mut indexed: Vec<(usize, &SymbolRecord)> = table.symbols().iter().enumerate().collect();
    indexed.sort_by(|(ia, a), (ib, b)| weight(b).cmp(&weight(a)).then(ia.cmp(ib)));

    let keep: std::collections::HashSet<String> = indexed
        .into_iter()
        .take(size)
        .map(|(_, s)| s.id.clone())
        .collect();
    (table.subset(&keep), true)
}
