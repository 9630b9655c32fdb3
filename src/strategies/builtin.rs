//! Built-in heuristic resolver.
//!
//! Matches textual call references against the symbol table, preferring
//! the caller's own module. References that match nothing become
//! placeholder edges so the impact surface stays visible. Always
//! available, never fails; respects the budget by skipping remaining
//! symbols once the deadline passes.

use super::{CallGraphStrategy, GraphSink, ResolveStats, StrategyError};
use crate::core::{SymbolRecord, SymbolTable};
use crate::graph::{Edge, Node};
use crate::orchestrator::AnalysisBudget;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

const CHUNK_SIZE: usize = 16;

pub struct HeuristicStrategy;

impl HeuristicStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HeuristicStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl CallGraphStrategy for HeuristicStrategy {
    fn name(&self) -> &str {
        "builtin"
    }

    fn priority(&self) -> u32 {
        10
    }

    fn probe(&self) -> Result<(), StrategyError> {
        Ok(())
    }

    fn resolve(
        &self,
        table: &SymbolTable,
        budget: &AnalysisBudget,
        sink: &GraphSink,
    ) -> Result<ResolveStats, StrategyError> {
        let callers: Vec<&SymbolRecord> = table
            .symbols()
            .iter()
            .filter(|s| !s.call_refs.is_empty())
            .collect();

        let analyzed = AtomicUsize::new(0);
        let skipped = AtomicUsize::new(0);

        callers.par_chunks(CHUNK_SIZE).for_each(|chunk| {
            if budget.expired() {
                skipped.fetch_add(chunk.len(), Ordering::Relaxed);
                return;
            }
            for symbol in chunk {
                sink.add_node(Node::from_symbol(symbol, self.name()));
                for call in &symbol.call_refs {
                    let target = resolve_target(table, symbol, &call.name);
                    if target == symbol.id {
                        continue;
                    }
                    sink.add_edge(Edge::calls(&symbol.id, &target), self.name());
                }
                analyzed.fetch_add(1, Ordering::Relaxed);
            }
        });

        Ok(ResolveStats {
            analyzed: analyzed.load(Ordering::Relaxed),
            skipped: skipped.load(Ordering::Relaxed),
        })
    }
}

/// Map one textual call reference to a node id.
///
/// Dotted names try, in order: an exact id, a receiver method in the
/// caller's module, the lexically first symbol with that dotted name.
/// Bare names prefer the caller's module, then the first table-wide
/// match. Anything else becomes a placeholder id.
fn resolve_target(table: &SymbolTable, caller: &SymbolRecord, name: &str) -> String {
    if let Some(symbol) = table.get(name) {
        return symbol.id.clone();
    }

    if let Some((_prefix, last)) = name.rsplit_once('.') {
        // x.helper() where x is a local variable: look for any receiver
        // method of that name in the caller's module.
        let method_suffix = format!(".{last}");
        if let Some(symbol) = table
            .in_module(&caller.module)
            .find(|s| s.receiver.is_some() && s.name.ends_with(&method_suffix))
        {
            return symbol.id.clone();
        }
        if let Some(symbol) = table.by_name(name).next() {
            return symbol.id.clone();
        }
        // Unknown qualified target, e.g. fmt.Println.
        return name.to_string();
    }

    let same_module = SymbolRecord::qualified_name(&caller.module, name);
    if table.get(&same_module).is_some() {
        return same_module;
    }
    if let Some(symbol) = table.by_name(name).next() {
        return symbol.id.clone();
    }
    // Unknown bare target; qualify with the caller's module.
    same_module
}
