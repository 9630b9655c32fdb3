//! Call graph structure: nodes keyed by id, edges deduplicated by
//! `(source, target, relation)`, with caller/callee indexes.
//!
//! Two invariants hold at all times: node ids are unique, and every edge's
//! endpoints exist in the node set. A call target that cannot be matched to
//! a known symbol becomes a placeholder node (`NodeKind::Unknown`) rather
//! than a dangling edge.

pub mod enhance;

use crate::core::{RiskLevel, SymbolKind, SymbolRecord};
use im::{HashMap, HashSet, Vector};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Function,
    Method,
    Type,
    Test,
    Benchmark,
    Init,
    Unknown,
}

impl From<SymbolKind> for NodeKind {
    fn from(kind: SymbolKind) -> Self {
        match kind {
            SymbolKind::Function => NodeKind::Function,
            SymbolKind::Method => NodeKind::Method,
            SymbolKind::Type => NodeKind::Type,
            SymbolKind::Test => NodeKind::Test,
            SymbolKind::Benchmark => NodeKind::Benchmark,
            SymbolKind::Init => NodeKind::Init,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeRelation {
    Calls,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub file: PathBuf,
    pub module: String,
    pub kind: NodeKind,
    pub is_exported: bool,
    pub complexity: u32,
    pub has_tests: bool,
    pub risk_level: RiskLevel,
    /// Which strategy produced this node ("builtin", "callvis", "guru",
    /// "extraction" for seeded standalone nodes).
    pub source: String,
}

impl Node {
    pub fn from_symbol(symbol: &SymbolRecord, source: &str) -> Self {
        Self {
            id: symbol.id.clone(),
            label: symbol.name.clone(),
            file: symbol.file.clone(),
            module: symbol.module.clone(),
            kind: symbol.kind.into(),
            is_exported: symbol.is_exported,
            complexity: symbol.complexity,
            has_tests: false,
            risk_level: RiskLevel::Low,
            source: source.to_string(),
        }
    }

    /// Node for a call target with no matching symbol.
    pub fn placeholder(id: &str, label: &str, module: &str, source: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            file: PathBuf::new(),
            module: module.to_string(),
            kind: NodeKind::Unknown,
            is_exported: false,
            complexity: 1,
            has_tests: false,
            risk_level: RiskLevel::Low,
            source: source.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub relation: EdgeRelation,
    pub risk_level: RiskLevel,
    pub cross_module: bool,
}

impl Edge {
    pub fn calls(source: &str, target: &str) -> Self {
        Self {
            id: format!("{source}->{target}"),
            source: source.to_string(),
            target: target.to_string(),
            relation: EdgeRelation::Calls,
            risk_level: RiskLevel::Low,
            cross_module: false,
        }
    }
}

type EdgeKey = (String, String, EdgeRelation);

#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    nodes: HashMap<String, Node>,
    node_order: Vector<String>,
    edges: Vector<Edge>,
    edge_keys: HashSet<EdgeKey>,
    caller_index: HashMap<String, HashSet<String>>,
    callee_index: HashMap<String, HashSet<String>>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or upgrade a node. A placeholder is replaced by a concrete
    /// node with the same id; a concrete node is never downgraded.
    pub fn add_node(&mut self, node: Node) {
        match self.nodes.get(&node.id) {
            None => {
                self.node_order.push_back(node.id.clone());
                self.nodes.insert(node.id.clone(), node);
            }
            Some(existing) => {
                if existing.kind == NodeKind::Unknown && node.kind != NodeKind::Unknown {
                    self.nodes.insert(node.id.clone(), node);
                }
            }
        }
    }

    /// Add a call edge, creating placeholder endpoints when needed.
    /// Duplicate `(source, target, relation)` edges merge idempotently.
    pub fn add_edge(&mut self, edge: Edge, source_strategy: &str) {
        let key = (edge.source.clone(), edge.target.clone(), edge.relation);
        if self.edge_keys.contains(&key) {
            return;
        }
        if !self.nodes.contains_key(&edge.source) {
            let label = bare_label(&edge.source);
            self.add_node(Node::placeholder(&edge.source, &label, "", source_strategy));
        }
        if !self.nodes.contains_key(&edge.target) {
            let label = bare_label(&edge.target);
            self.add_node(Node::placeholder(&edge.target, &label, "", source_strategy));
        }
        self.callee_index
            .entry(edge.source.clone())
            .or_default()
            .insert(edge.target.clone());
        self.caller_index
            .entry(edge.target.clone())
            .or_default()
            .insert(edge.source.clone());
        self.edge_keys.insert(key);
        self.edges.push_back(edge);
    }

    pub fn merge(&mut self, other: CallGraph) {
        for id in &other.node_order {
            if let Some(node) = other.nodes.get(id) {
                self.add_node(node.clone());
            }
        }
        for edge in other.edges.iter() {
            self.add_edge(edge.clone(), "merge");
        }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.node_order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &String> {
        self.node_order.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn edges_mut(&mut self) -> impl Iterator<Item = &mut Edge> {
        self.edges.iter_mut()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn callers(&self, id: &str) -> Vec<String> {
        self.caller_index
            .get(id)
            .map(|set| {
                let mut v: Vec<String> = set.iter().cloned().collect();
                v.sort();
                v
            })
            .unwrap_or_default()
    }

    pub fn callees(&self, id: &str) -> Vec<String> {
        self.callee_index
            .get(id)
            .map(|set| {
                let mut v: Vec<String> = set.iter().cloned().collect();
                v.sort();
                v
            })
            .unwrap_or_default()
    }
}

fn bare_label(id: &str) -> String {
    id.rsplit('.').next().unwrap_or(id).to_string()
}
