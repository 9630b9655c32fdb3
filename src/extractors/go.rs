//! Go symbol extraction via tree-sitter.
//!
//! Symbols are qualified by package name. Methods are named
//! `Receiver.Method` so they resolve against dotted call references.
//! Function literals do not become symbols of their own; their calls are
//! attributed to the enclosing declaration.

use super::{first_line, node_line, node_text, walk_tree, SymbolExtractor};
use crate::core::{CallRef, Language, SymbolKind, SymbolRecord, SymbolTraits};
use anyhow::{anyhow, Context, Result};
use std::path::Path;
use tree_sitter::{Node, Parser};

/// Keywords and builtins that parse as call expressions but never name a
/// user function. `panic` and `recover` are folded into traits instead.
const EXCLUDED_CALLS: &[&str] = &[
    "if", "for", "switch", "select", "range", "go", "defer", "return", "make", "new", "len",
    "cap", "append", "copy", "delete", "close", "panic", "recover", "print", "println",
];

/// Extra prefixes dropped from test bodies so coverage evidence only keeps
/// business calls.
const TEST_NOISE_PREFIXES: &[&str] = &["t", "b", "testing", "fmt", "log"];

pub struct GoExtractor;

impl GoExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GoExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolExtractor for GoExtractor {
    fn language(&self) -> Language {
        Language::Go
    }

    fn extract(&self, path: &Path, content: &str) -> Result<Vec<SymbolRecord>> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .context("Failed to load Go grammar")?;
        let tree = parser
            .parse(content, None)
            .ok_or_else(|| anyhow!("Failed to parse Go file"))?;

        let root = tree.root_node();
        let module = package_name(root, content)
            .map(str::to_string)
            .unwrap_or_else(|| file_stem(path));
        let in_test_file = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with("_test.go"));

        let mut symbols = Vec::new();
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            match child.kind() {
                "function_declaration" => {
                    if let Some(symbol) =
                        function_symbol(child, content, path, &module, in_test_file, None)
                    {
                        symbols.push(symbol);
                    }
                }
                "method_declaration" => {
                    let receiver = receiver_type(child, content);
                    if let Some(symbol) =
                        function_symbol(child, content, path, &module, in_test_file, receiver)
                    {
                        symbols.push(symbol);
                    }
                }
                "type_declaration" => {
                    type_symbols(child, content, path, &module, in_test_file, &mut symbols);
                }
                _ => {}
            }
        }
        Ok(symbols)
    }
}

fn package_name<'a>(root: Node<'_>, content: &'a str) -> Option<&'a str> {
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if child.kind() == "package_clause" {
            let mut inner = child.walk();
            for part in child.children(&mut inner) {
                if part.kind() == "package_identifier" {
                    return Some(node_text(part, content));
                }
            }
        }
    }
    None
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

fn function_symbol(
    node: Node<'_>,
    content: &str,
    path: &Path,
    module: &str,
    in_test_file: bool,
    receiver: Option<String>,
) -> Option<SymbolRecord> {
    let name_node = node.child_by_field_name("name")?;
    let bare_name = node_text(name_node, content).to_string();
    let name = match &receiver {
        Some(recv) => format!("{recv}.{bare_name}"),
        None => bare_name.clone(),
    };

    let kind = classify(&bare_name, receiver.is_some(), in_test_file);
    let body = node.child_by_field_name("body");
    let traits = body.map(|b| body_traits(b, content)).unwrap_or_default();
    let complexity = body.map(|b| cyclomatic(b)).unwrap_or(1);
    let call_refs = body
        .map(|b| collect_calls(b, content, kind.is_test_like()))
        .unwrap_or_default();

    Some(SymbolRecord {
        id: SymbolRecord::qualified_name(module, &name),
        name,
        kind,
        signature: first_line(node, content).to_string(),
        file: path.to_path_buf(),
        line: node_line(node),
        module: module.to_string(),
        receiver,
        is_exported: bare_name.chars().next().is_some_and(|c| c.is_uppercase()),
        complexity,
        call_refs,
        traits,
        language: Language::Go,
        in_test_file,
    })
}

fn classify(name: &str, is_method: bool, in_test_file: bool) -> SymbolKind {
    if name == "init" {
        return SymbolKind::Init;
    }
    if in_test_file {
        if name.starts_with("Benchmark") {
            return SymbolKind::Benchmark;
        }
        if name.starts_with("Test") || name.starts_with("Example") {
            return SymbolKind::Test;
        }
    }
    if is_method {
        SymbolKind::Method
    } else {
        SymbolKind::Function
    }
}

/// Receiver type name, with any pointer stripped: `(s *Server)` -> `Server`.
fn receiver_type(node: Node<'_>, content: &str) -> Option<String> {
    let receiver = node.child_by_field_name("receiver")?;
    let mut found = None;
    walk_tree(receiver, &mut |n| {
        if found.is_none() && n.kind() == "type_identifier" {
            found = Some(node_text(n, content).to_string());
        }
    });
    found
}

fn type_symbols(
    decl: Node<'_>,
    content: &str,
    path: &Path,
    module: &str,
    in_test_file: bool,
    out: &mut Vec<SymbolRecord>,
) {
    let mut cursor = decl.walk();
    for spec in decl.children(&mut cursor) {
        if spec.kind() != "type_spec" {
            continue;
        }
        let Some(name_node) = spec.child_by_field_name("name") else {
            continue;
        };
        let name = node_text(name_node, content).to_string();
        out.push(SymbolRecord {
            id: SymbolRecord::qualified_name(module, &name),
            kind: SymbolKind::Type,
            signature: format!("type {}", first_line(spec, content)),
            file: path.to_path_buf(),
            line: node_line(spec),
            module: module.to_string(),
            receiver: None,
            is_exported: name.chars().next().is_some_and(|c| c.is_uppercase()),
            complexity: 1,
            call_refs: vec![],
            traits: SymbolTraits::default(),
            language: Language::Go,
            in_test_file,
            name,
        });
    }
}

fn collect_calls(body: Node<'_>, content: &str, test_context: bool) -> Vec<CallRef> {
    let mut calls = Vec::new();
    walk_tree(body, &mut |node| {
        if node.kind() != "call_expression" {
            return;
        }
        let Some(function) = node.child_by_field_name("function") else {
            return;
        };
        let name = match function.kind() {
            "identifier" | "selector_expression" => node_text(function, content),
            _ => return,
        };
        // Chained calls like a.b().c() are not a resolvable name.
        if name.contains('(') || name.contains(char::is_whitespace) {
            return;
        }
        if !keep_call(name, test_context) {
            return;
        }
        calls.push(CallRef {
            name: name.to_string(),
            line: node_line(node),
        });
    });
    calls
}

fn keep_call(name: &str, test_context: bool) -> bool {
    let first = name.split('.').next().unwrap_or(name);
    if EXCLUDED_CALLS.contains(&first) {
        return false;
    }
    if test_context && (TEST_NOISE_PREFIXES.contains(&first) || name.contains("testing")) {
        return false;
    }
    true
}

fn cyclomatic(body: Node<'_>) -> u32 {
    let mut count = 1u32;
    walk_tree(body, &mut |node| {
        if matches!(
            node.kind(),
            "if_statement"
                | "for_statement"
                | "expression_case"
                | "type_case"
                | "default_case"
                | "communication_case"
                | "go_statement"
                | "defer_statement"
        ) {
            count += 1;
        }
    });
    count
}

fn body_traits(body: Node<'_>, content: &str) -> SymbolTraits {
    let mut traits = SymbolTraits::default();
    walk_tree(body, &mut |node| match node.kind() {
        "go_statement" => traits.spawns_tasks = true,
        "send_statement" => traits.uses_channels = true,
        "unary_expression" => {
            if node_text(node, content).starts_with("<-") {
                traits.uses_channels = true;
            }
        }
        "defer_statement" => traits.defers_cleanup = true,
        "call_expression" => {
            if let Some(function) = node.child_by_field_name("function") {
                let name = node_text(function, content);
                if name == "panic" {
                    traits.may_panic = true;
                }
                if name == "make" {
                    // make(chan T) is the usual way channels enter a function.
                    if node_text(node, content).contains("chan") {
                        traits.uses_channels = true;
                    }
                }
            }
        }
        _ => {}
    });
    traits
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn extract(file: &str, content: &str) -> Vec<SymbolRecord> {
        GoExtractor::new()
            .extract(Path::new(file), content)
            .expect("extraction should succeed")
    }

    #[test]
    fn functions_and_methods_are_qualified_by_package() {
        let symbols = extract(
            "server.go",
            indoc! {r#"
                package api

                func Serve(addr string) error {
                    return nil
                }

                func (s *Server) handle(w http.ResponseWriter) {
                    s.log(w)
                }
            "#},
        );
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].id, "api.Serve");
        assert!(symbols[0].is_exported);
        assert_eq!(symbols[1].id, "api.Server.handle");
        assert_eq!(symbols[1].receiver.as_deref(), Some("Server"));
        assert_eq!(symbols[1].kind, SymbolKind::Method);
        assert!(!symbols[1].is_exported);
    }

    #[test]
    fn test_file_classifies_tests_benchmarks_and_helpers() {
        let symbols = extract(
            "server_test.go",
            indoc! {r#"
                package api

                func TestServe(t *testing.T) {
                    got := Serve(":80")
                    t.Log(got)
                }

                func BenchmarkServe(b *testing.B) {}

                func newFixture() *Server { return nil }
            "#},
        );
        assert_eq!(symbols[0].kind, SymbolKind::Test);
        assert_eq!(symbols[1].kind, SymbolKind::Benchmark);
        assert_eq!(symbols[2].kind, SymbolKind::Function);
        assert!(symbols[2].in_test_file);
        // t.Log is noise; Serve is coverage evidence.
        let refs: Vec<_> = symbols[0].call_refs.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(refs, vec!["Serve"]);
    }

    #[test]
    fn keywords_and_builtins_never_become_call_refs() {
        let symbols = extract(
            "loop.go",
            indoc! {r#"
                package pkg

                func process(items []int) []int {
                    out := make([]int, 0, len(items))
                    for _, v := range items {
                        out = append(out, transform(v))
                    }
                    return out
                }
            "#},
        );
        let refs: Vec<_> = symbols[0].call_refs.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(refs, vec!["transform"]);
    }

    #[test]
    fn concurrency_traits_and_complexity() {
        let symbols = extract(
            "worker.go",
            indoc! {r#"
                package pool

                func run(jobs chan int) {
                    defer close(jobs)
                    go func() {
                        for j := range jobs {
                            if j < 0 {
                                panic("negative job")
                            }
                            jobs <- j * 2
                        }
                    }()
                }
            "#},
        );
        let run = &symbols[0];
        assert!(run.traits.spawns_tasks);
        assert!(run.traits.uses_channels);
        assert!(run.traits.may_panic);
        assert!(run.traits.defers_cleanup);
        // base 1 + go + defer + for + if
        assert_eq!(run.complexity, 5);
    }

    #[test]
    fn init_and_types_are_extracted() {
        let symbols = extract(
            "types.go",
            indoc! {r#"
                package model

                type User struct {
                    Name string
                }

                func init() {
                    register(User{})
                }
            "#},
        );
        assert_eq!(symbols[0].kind, SymbolKind::Type);
        assert_eq!(symbols[0].id, "model.User");
        assert_eq!(symbols[1].kind, SymbolKind::Init);
    }
}
