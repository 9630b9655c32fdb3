//! Post-resolution metadata pass: test presence and risk levels.
//!
//! This step only reads the symbol table and writes node/edge metadata.
//! It never creates or removes nodes or edges.

use crate::core::{RiskLevel, SymbolRecord, SymbolTable};
use crate::graph::CallGraph;
use std::collections::HashSet;

/// Computes `has_tests` and risk levels over a resolved graph.
pub struct GraphEnhancer<'a> {
    table: &'a SymbolTable,
}

impl<'a> GraphEnhancer<'a> {
    pub fn new(table: &'a SymbolTable) -> Self {
        Self { table }
    }

    pub fn enhance(&self, graph: &mut CallGraph) {
        let test_refs = self.collect_test_refs();

        let ids: Vec<String> = graph.node_ids().cloned().collect();
        for id in &ids {
            let Some(node) = graph.node(id) else { continue };
            let has_tests = is_test_referenced(&test_refs, &node.label, &node.id);
            let symbol = self.table.get(id);
            let risk = match symbol {
                Some(symbol) => node_risk(symbol, has_tests),
                // Placeholders and seeded type nodes carry no body to score.
                None => RiskLevel::Low,
            };
            if let Some(node) = graph.node_mut(id) {
                node.has_tests = has_tests;
                node.risk_level = risk;
            }
        }

        self.enhance_edges(graph);
    }

    /// Every name a test symbol calls, both bare and qualified forms.
    fn collect_test_refs(&self) -> HashSet<String> {
        let mut refs = HashSet::new();
        for test in self.table.test_symbols() {
            for call in &test.call_refs {
                refs.insert(call.name.clone());
            }
        }
        refs
    }

    fn enhance_edges(&self, graph: &mut CallGraph) {
        struct Endpoint {
            module: String,
            complexity: u32,
            has_tests: bool,
            is_exported: bool,
        }
        let endpoint = |graph: &CallGraph, id: &str| {
            graph.node(id).map(|n| Endpoint {
                module: n.module.clone(),
                complexity: n.complexity,
                has_tests: n.has_tests,
                is_exported: n.is_exported,
            })
        };

        let updates: Vec<(RiskLevel, bool)> = graph
            .edges()
            .map(|edge| {
                // Both endpoints exist by the placeholder invariant.
                let (Some(source), Some(target)) =
                    (endpoint(graph, &edge.source), endpoint(graph, &edge.target))
                else {
                    return (RiskLevel::Low, false);
                };
                let cross_module =
                    !source.module.is_empty() && !target.module.is_empty() && source.module != target.module;

                let mut score = 0u32;
                if cross_module {
                    score += 2;
                }
                if target.complexity > 10 {
                    score += 3;
                }
                if source.complexity > 10 {
                    score += 2;
                }
                if !target.has_tests {
                    score += 3;
                }
                if !source.has_tests {
                    score += 1;
                }
                if target.is_exported {
                    score += 2;
                }
                let risk = if score >= 8 {
                    RiskLevel::High
                } else if score >= 5 {
                    RiskLevel::Medium
                } else {
                    RiskLevel::Low
                };
                (risk, cross_module)
            })
            .collect();

        for (edge, (risk, cross_module)) in graph.edges_mut().zip(updates) {
            edge.risk_level = risk;
            edge.cross_module = cross_module;
        }
    }
}

/// Weighted risk score for one symbol, shared with gap reporting.
pub fn node_risk(symbol: &SymbolRecord, has_tests: bool) -> RiskLevel {
    let mut score = symbol.complexity.min(10);
    if symbol.is_exported {
        score += 5;
    }
    if symbol.traits.spawns_tasks {
        score += 3;
    }
    if symbol.traits.uses_channels {
        score += 3;
    }
    if symbol.traits.may_panic {
        score += 5;
    }
    if symbol.traits.defers_cleanup {
        score += 1;
    }
    if symbol.module == "main" {
        score += 3;
    }
    if symbol
        .file
        .components()
        .any(|c| c.as_os_str() == "internal")
    {
        score += 2;
    }
    if !has_tests {
        score += 2;
    }
    if score >= 15 {
        RiskLevel::High
    } else if score >= 8 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// A node counts as tested when any test call ref names it directly,
/// by full id, or via a qualified `.name` suffix.
pub fn is_test_referenced(test_refs: &HashSet<String>, label: &str, id: &str) -> bool {
    if test_refs.contains(label) || test_refs.contains(id) {
        return true;
    }
    let suffix = format!(".{label}");
    test_refs.iter().any(|r| r.ends_with(&suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CallRef, Language, SymbolKind, SymbolTraits};
    use crate::graph::{Edge, Node};
    use std::path::PathBuf;

    fn symbol(module: &str, name: &str, kind: SymbolKind) -> SymbolRecord {
        SymbolRecord {
            id: SymbolRecord::qualified_name(module, name),
            name: name.to_string(),
            kind,
            signature: format!("func {name}()"),
            file: PathBuf::from("a.go"),
            line: 1,
            module: module.to_string(),
            receiver: None,
            is_exported: name.chars().next().is_some_and(|c| c.is_uppercase()),
            complexity: 1,
            call_refs: vec![],
            traits: SymbolTraits::default(),
            language: Language::Go,
            in_test_file: matches!(kind, SymbolKind::Test | SymbolKind::Benchmark),
        }
    }

    #[test]
    fn test_reference_marks_node_as_tested() {
        let mut foo = symbol("pkg", "Foo", SymbolKind::Function);
        foo.complexity = 2;
        let bar = symbol("pkg", "bar", SymbolKind::Function);
        let mut test = symbol("pkg", "TestFoo", SymbolKind::Test);
        test.call_refs = vec![CallRef {
            name: "Foo".to_string(),
            line: 5,
        }];

        let table = SymbolTable::from_records(vec![foo.clone(), bar.clone(), test], 0);
        let mut graph = CallGraph::new();
        graph.add_node(Node::from_symbol(&foo, "builtin"));
        graph.add_node(Node::from_symbol(&bar, "builtin"));
        graph.add_edge(Edge::calls("pkg.Foo", "pkg.bar"), "builtin");

        GraphEnhancer::new(&table).enhance(&mut graph);

        assert!(graph.node("pkg.Foo").unwrap().has_tests);
        assert!(!graph.node("pkg.bar").unwrap().has_tests);
    }

    #[test]
    fn qualified_test_reference_counts() {
        let refs: HashSet<String> = ["pkg.Foo".to_string()].into_iter().collect();
        assert!(is_test_referenced(&refs, "Foo", "pkg.Foo"));
        assert!(!is_test_referenced(&refs, "Bar", "pkg.Bar"));
    }

    #[test]
    fn panic_and_concurrency_push_risk_up() {
        let mut s = symbol("pkg", "Handle", SymbolKind::Function);
        s.complexity = 6;
        s.traits.may_panic = true;
        s.traits.spawns_tasks = true;
        // 6 + 5 exported + 5 panic + 3 spawn + 2 untested = 21
        assert_eq!(node_risk(&s, false), RiskLevel::High);

        let plain = symbol("pkg", "quiet", SymbolKind::Function);
        assert_eq!(node_risk(&plain, true), RiskLevel::Low);
    }

    #[test]
    fn cross_module_untested_edge_is_risky() {
        let foo = symbol("api", "Serve", SymbolKind::Function);
        let bar = symbol("store", "write", SymbolKind::Function);
        let table = SymbolTable::from_records(vec![foo.clone(), bar.clone()], 0);

        let mut graph = CallGraph::new();
        graph.add_node(Node::from_symbol(&foo, "builtin"));
        graph.add_node(Node::from_symbol(&bar, "builtin"));
        graph.add_edge(Edge::calls("api.Serve", "store.write"), "builtin");

        GraphEnhancer::new(&table).enhance(&mut graph);

        let edge = graph.edges().next().unwrap();
        assert!(edge.cross_module);
        // cross-module 2 + target untested 3 + source untested 1 = 6
        assert_eq!(edge.risk_level, RiskLevel::Medium);
    }
}
