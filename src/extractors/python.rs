//! Python symbol extraction via tree-sitter.
//!
//! Symbols are qualified by file stem. Methods are named `Class.method`.
//! `test_*` functions and `Test*` class methods are test symbols wherever
//! they live; underscore-prefixed names are treated as private.

use super::{first_line, node_line, node_text, walk_tree, SymbolExtractor};
use crate::core::{CallRef, Language, SymbolKind, SymbolRecord, SymbolTraits};
use anyhow::{anyhow, Context, Result};
use std::path::Path;
use tree_sitter::{Node, Parser};

const EXCLUDED_CALLS: &[&str] = &[
    "print", "len", "range", "str", "int", "float", "list", "dict", "set", "tuple",
    "isinstance", "issubclass", "super", "type", "enumerate", "zip", "map", "filter", "sorted",
    "min", "max", "sum", "abs", "open", "getattr", "setattr", "hasattr", "repr", "id", "iter",
    "next", "vars",
];

const TEST_NOISE_PREFIXES: &[&str] = &["pytest", "unittest", "mock"];

pub struct PythonExtractor;

impl PythonExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PythonExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolExtractor for PythonExtractor {
    fn language(&self) -> Language {
        Language::Python
    }

    fn extract(&self, path: &Path, content: &str) -> Result<Vec<SymbolRecord>> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .context("Failed to load Python grammar")?;
        let tree = parser
            .parse(content, None)
            .ok_or_else(|| anyhow!("Failed to parse Python file"))?;

        let module = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();
        let in_test_file = is_test_file(path);

        let mut symbols = Vec::new();
        scan_scope(
            tree.root_node(),
            content,
            path,
            &module,
            in_test_file,
            None,
            &mut symbols,
        );
        Ok(symbols)
    }
}

fn is_test_file(path: &Path) -> bool {
    let name = path.file_stem().and_then(|n| n.to_str()).unwrap_or("");
    name.starts_with("test_") || name.ends_with("_test")
}

fn scan_scope(
    scope: Node<'_>,
    content: &str,
    path: &Path,
    module: &str,
    in_test_file: bool,
    receiver: Option<&str>,
    out: &mut Vec<SymbolRecord>,
) {
    let mut cursor = scope.walk();
    for child in scope.children(&mut cursor) {
        let node = if child.kind() == "decorated_definition" {
            child.child_by_field_name("definition").unwrap_or(child)
        } else {
            child
        };
        match node.kind() {
            "function_definition" => {
                if let Some(symbol) =
                    function_symbol(node, content, path, module, in_test_file, receiver)
                {
                    out.push(symbol);
                }
            }
            "class_definition" => {
                let Some(name) = node
                    .child_by_field_name("name")
                    .map(|n| node_text(n, content).to_string())
                else {
                    continue;
                };
                out.push(SymbolRecord {
                    id: SymbolRecord::qualified_name(module, &name),
                    name: name.clone(),
                    kind: SymbolKind::Type,
                    signature: first_line(node, content).trim_end_matches(':').to_string(),
                    file: path.to_path_buf(),
                    line: node_line(node),
                    module: module.to_string(),
                    receiver: None,
                    is_exported: !name.starts_with('_'),
                    complexity: 1,
                    call_refs: vec![],
                    traits: SymbolTraits::default(),
                    language: Language::Python,
                    in_test_file,
                });
                if let Some(body) = node.child_by_field_name("body") {
                    scan_scope(body, content, path, module, in_test_file, Some(&name), out);
                }
            }
            _ => {}
        }
    }
}

fn function_symbol(
    node: Node<'_>,
    content: &str,
    path: &Path,
    module: &str,
    in_test_file: bool,
    receiver: Option<&str>,
) -> Option<SymbolRecord> {
    let name_node = node.child_by_field_name("name")?;
    let bare_name = node_text(name_node, content).to_string();
    let name = match receiver {
        Some(class) => format!("{class}.{bare_name}"),
        None => bare_name.clone(),
    };

    let is_test = bare_name.starts_with("test_")
        || receiver.is_some_and(|c| c.starts_with("Test")) && bare_name.starts_with("test");
    let kind = if is_test {
        SymbolKind::Test
    } else if receiver.is_some() {
        SymbolKind::Method
    } else {
        SymbolKind::Function
    };

    let is_async = node.child(0).is_some_and(|c| c.kind() == "async");
    let body = node.child_by_field_name("body")?;
    let mut traits = body_traits(body);
    traits.spawns_tasks |= is_async;

    Some(SymbolRecord {
        id: SymbolRecord::qualified_name(module, &name),
        name,
        kind,
        signature: first_line(node, content).trim_end_matches(':').to_string(),
        file: path.to_path_buf(),
        line: node_line(node),
        module: module.to_string(),
        receiver: receiver.map(str::to_string),
        is_exported: !bare_name.starts_with('_'),
        complexity: cyclomatic(body),
        call_refs: collect_calls(body, content, kind.is_test_like()),
        traits,
        language: Language::Python,
        in_test_file,
    })
}

fn collect_calls(body: Node<'_>, content: &str, test_context: bool) -> Vec<CallRef> {
    let mut calls = Vec::new();
    walk_tree(body, &mut |node| {
        if node.kind() != "call" {
            return;
        }
        let Some(function) = node.child_by_field_name("function") else {
            return;
        };
        let name = match function.kind() {
            "identifier" | "attribute" => node_text(function, content),
            _ => return,
        };
        if name.contains('(') || name.contains(char::is_whitespace) {
            return;
        }
        let first = name.split('.').next().unwrap_or(name);
        if EXCLUDED_CALLS.contains(&first) {
            return;
        }
        if test_context
            && (TEST_NOISE_PREFIXES.contains(&first) || name.contains(".assert"))
        {
            return;
        }
        // self.helper() resolves within the same class; drop the prefix.
        let name = name.strip_prefix("self.").unwrap_or(name);
        calls.push(CallRef {
            name: name.to_string(),
            line: node_line(node),
        });
    });
    calls
}

fn cyclomatic(body: Node<'_>) -> u32 {
    let mut count = 1u32;
    walk_tree(body, &mut |node| {
        if matches!(
            node.kind(),
            "if_statement"
                | "elif_clause"
                | "for_statement"
                | "while_statement"
                | "except_clause"
                | "case_clause"
                | "conditional_expression"
                | "boolean_operator"
        ) {
            count += 1;
        }
    });
    count
}

fn body_traits(body: Node<'_>) -> SymbolTraits {
    let mut traits = SymbolTraits::default();
    walk_tree(body, &mut |node| match node.kind() {
        "raise_statement" => traits.may_panic = true,
        "finally_clause" => traits.defers_cleanup = true,
        "await" => traits.spawns_tasks = true,
        _ => {}
    });
    traits
}
