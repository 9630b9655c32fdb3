//! Shared data model for extraction and resolution.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Languages the extractors understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Go,
    Python,
    JavaScript,
    TypeScript,
    Rust,
}

impl Language {
    pub fn extensions(&self) -> &[&str] {
        match self {
            Language::Go => &["go"],
            Language::Python => &["py", "pyw"],
            Language::JavaScript => &["js", "jsx", "mjs", "cjs"],
            Language::TypeScript => &["ts", "tsx"],
            Language::Rust => &["rs"],
        }
    }

    pub fn from_extension(ext: &str) -> Option<Language> {
        [
            Language::Go,
            Language::Python,
            Language::JavaScript,
            Language::TypeScript,
            Language::Rust,
        ]
        .into_iter()
        .find(|lang| lang.extensions().contains(&ext))
    }

    pub fn from_path(path: &Path) -> Option<Language> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Language::from_extension)
    }

    pub fn display_name(&self) -> &str {
        match self {
            Language::Go => "Go",
            Language::Python => "Python",
            Language::JavaScript => "JavaScript",
            Language::TypeScript => "TypeScript",
            Language::Rust => "Rust",
        }
    }
}

/// What kind of source construct a symbol is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Method,
    Type,
    Test,
    Benchmark,
    Init,
}

impl SymbolKind {
    /// Test-like symbols exercise business code but are not business code.
    pub fn is_test_like(&self) -> bool {
        matches!(self, SymbolKind::Test | SymbolKind::Benchmark)
    }

    /// Business symbols are the ones coverage analysis cares about.
    pub fn is_business(&self) -> bool {
        matches!(self, SymbolKind::Function | SymbolKind::Method)
    }
}

/// Risk classification shared by nodes, edges, and coverage gaps.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

/// An unresolved textual call target found inside a symbol body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRef {
    pub name: String,
    pub line: usize,
}

/// Concurrency and failure signals feeding risk scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTraits {
    /// Spawns goroutines / threads / async tasks.
    pub spawns_tasks: bool,
    /// Sends or receives on channels.
    pub uses_channels: bool,
    /// Contains panic-like constructs (panic, raise, throw, unwrap).
    pub may_panic: bool,
    /// Registers deferred cleanup (defer, finally).
    pub defers_cleanup: bool,
}

/// One extracted symbol. Created during extraction, never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolRecord {
    /// Module-qualified id, unique within a run.
    pub id: String,
    pub name: String,
    pub kind: SymbolKind,
    pub signature: String,
    pub file: PathBuf,
    pub line: usize,
    /// Package (Go), module, or file-stem namespace.
    pub module: String,
    /// Receiver type for methods.
    pub receiver: Option<String>,
    pub is_exported: bool,
    pub complexity: u32,
    pub call_refs: Vec<CallRef>,
    pub traits: SymbolTraits,
    pub language: Language,
    /// True when the symbol lives in a test file (`_test.go`, `test_*.py`,
    /// `*.spec.ts`, ...). Test-file helpers are neither business symbols
    /// nor coverage evidence.
    pub in_test_file: bool,
}

impl SymbolRecord {
    /// Bare-name qualified id without collision suffix.
    pub fn qualified_name(module: &str, name: &str) -> String {
        format!("{module}.{name}")
    }
}

/// Aggregated symbol inventory for one analysis run, with lookup indexes.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<SymbolRecord>,
    by_id: HashMap<String, usize>,
    by_name: HashMap<String, Vec<usize>>,
    by_module: HashMap<String, Vec<usize>>,
    test_indices: Vec<usize>,
    parse_failures: usize,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from extracted records, disambiguating id collisions
    /// with a `#line` suffix so ids stay unique and deterministic.
    pub fn from_records(records: Vec<SymbolRecord>, parse_failures: usize) -> Self {
        let mut table = Self {
            parse_failures,
            ..Self::default()
        };
        for record in records {
            table.insert(record);
        }
        table
    }

    pub fn insert(&mut self, mut record: SymbolRecord) {
        if self.by_id.contains_key(&record.id) {
            record.id = format!("{}#{}", record.id, record.line);
            if self.by_id.contains_key(&record.id) {
                // Same name on the same line of the same module; keep the first.
                return;
            }
        }
        let index = self.symbols.len();
        self.by_id.insert(record.id.clone(), index);
        self.by_name
            .entry(record.name.clone())
            .or_default()
            .push(index);
        self.by_module
            .entry(record.module.clone())
            .or_default()
            .push(index);
        if record.kind.is_test_like() {
            self.test_indices.push(index);
        }
        self.symbols.push(record);
    }

    pub fn symbols(&self) -> &[SymbolRecord] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn parse_failures(&self) -> usize {
        self.parse_failures
    }

    pub fn get(&self, id: &str) -> Option<&SymbolRecord> {
        self.by_id.get(id).map(|&i| &self.symbols[i])
    }

    /// All symbols sharing a bare name, in insertion order.
    pub fn by_name(&self, name: &str) -> impl Iterator<Item = &SymbolRecord> {
        self.by_name
            .get(name)
            .into_iter()
            .flatten()
            .map(|&i| &self.symbols[i])
    }

    pub fn in_module(&self, module: &str) -> impl Iterator<Item = &SymbolRecord> {
        self.by_module
            .get(module)
            .into_iter()
            .flatten()
            .map(|&i| &self.symbols[i])
    }

    pub fn has_module(&self, module: &str) -> bool {
        self.by_module.contains_key(module)
    }

    pub fn test_symbols(&self) -> impl Iterator<Item = &SymbolRecord> {
        self.test_indices.iter().map(|&i| &self.symbols[i])
    }

    pub fn business_symbols(&self) -> impl Iterator<Item = &SymbolRecord> {
        self.symbols
            .iter()
            .filter(|s| s.kind.is_business() && !s.in_test_file)
    }

    pub fn languages(&self) -> Vec<Language> {
        let mut langs: Vec<Language> = Vec::new();
        for symbol in &self.symbols {
            if !langs.contains(&symbol.language) {
                langs.push(symbol.language);
            }
        }
        langs
    }

    /// Sub-table restricted to the given ids, preserving order.
    pub fn subset(&self, ids: &std::collections::HashSet<String>) -> SymbolTable {
        let records = self
            .symbols
            .iter()
            .filter(|s| ids.contains(&s.id))
            .cloned()
            .collect();
        Self::from_records(records, self.parse_failures)
    }
}
