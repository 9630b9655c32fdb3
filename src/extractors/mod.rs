//! Per-language symbol extraction.
//!
//! Each extractor turns one source file into flat [`SymbolRecord`]s:
//! functions, methods, types, and tests, together with the raw call
//! references found in their bodies. Resolution of those references into
//! graph edges happens later, in the strategies layer.

pub mod go;
pub mod javascript;
pub mod python;
pub mod rust;

use crate::core::{Language, SymbolRecord, SymbolTable};
use anyhow::Result;
use rayon::prelude::*;
use std::path::Path;

/// One language's extraction front end.
pub trait SymbolExtractor: Send + Sync {
    fn language(&self) -> Language;

    /// Extract all symbols from a single file. A parse error fails the
    /// whole file; callers skip it and keep going.
    fn extract(&self, path: &Path, content: &str) -> Result<Vec<SymbolRecord>>;
}

/// Extractor for a language, if one exists.
pub fn extractor_for(language: Language) -> Box<dyn SymbolExtractor> {
    match language {
        Language::Go => Box::new(go::GoExtractor::new()),
        Language::Python => Box::new(python::PythonExtractor::new()),
        Language::JavaScript => Box::new(javascript::JavaScriptExtractor::new(false)),
        Language::TypeScript => Box::new(javascript::JavaScriptExtractor::new(true)),
        Language::Rust => Box::new(rust::RustExtractor::new()),
    }
}

/// Extract every supported file in parallel. Files that fail to parse are
/// logged and counted, never fatal.
pub fn extract_files(files: &[(std::path::PathBuf, String)]) -> SymbolTable {
    let results: Vec<Result<Vec<SymbolRecord>>> = files
        .par_iter()
        .filter_map(|(path, content)| {
            let language = Language::from_path(path)?;
            let extractor = extractor_for(language);
            Some(extractor.extract(path, content).map_err(|e| {
                log::warn!("Skipping {}: {}", path.display(), e);
                e
            }))
        })
        .collect();

    let mut records = Vec::new();
    let mut failures = 0;
    for result in results {
        match result {
            Ok(mut symbols) => records.append(&mut symbols),
            Err(_) => failures += 1,
        }
    }
    log::info!(
        "Extracted {} symbols from {} files ({} parse failures)",
        records.len(),
        files.len(),
        failures
    );
    SymbolTable::from_records(records, failures)
}

/// Pre-order traversal shared by the tree-sitter extractors.
pub(crate) fn walk_tree<'a>(node: tree_sitter::Node<'a>, f: &mut dyn FnMut(tree_sitter::Node<'a>)) {
    f(node);
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_tree(child, f);
    }
}

pub(crate) fn node_text<'a>(node: tree_sitter::Node<'_>, content: &'a str) -> &'a str {
    node.utf8_text(content.as_bytes()).unwrap_or("")
}

/// 1-based line of a node's first byte.
pub(crate) fn node_line(node: tree_sitter::Node<'_>) -> usize {
    node.start_position().row + 1
}

/// First line of a node's source, used as a signature for declarations.
pub(crate) fn first_line<'a>(node: tree_sitter::Node<'_>, content: &'a str) -> &'a str {
    node_text(node, content)
        .lines()
        .next()
        .unwrap_or("")
        .trim_end_matches('{')
        .trim()
}
