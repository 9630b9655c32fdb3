//! JavaScript and TypeScript symbol extraction via tree-sitter.
//!
//! Both languages share one extractor; only the grammar differs. Symbols
//! are qualified by file stem. Functions assigned to variables take the
//! variable's name; truly anonymous callbacks are not symbols of their
//! own, their calls count toward the enclosing declaration.

use super::{first_line, node_line, node_text, walk_tree, SymbolExtractor};
use crate::core::{CallRef, Language, SymbolKind, SymbolRecord, SymbolTraits};
use anyhow::{anyhow, Context, Result};
use std::path::Path;
use tree_sitter::{Node, Parser};

const EXCLUDED_CALLS: &[&str] = &[
    "require", "import", "super", "console", "JSON", "Math", "Object", "Array", "Promise",
    "String", "Number", "Boolean", "parseInt", "parseFloat", "setTimeout", "setInterval",
];

/// Test-framework globals dropped from test bodies.
const TEST_NOISE: &[&str] = &[
    "describe", "it", "test", "expect", "beforeEach", "afterEach", "beforeAll", "afterAll",
    "jest", "vi", "assert",
];

pub struct JavaScriptExtractor {
    typescript: bool,
}

impl JavaScriptExtractor {
    pub fn new(typescript: bool) -> Self {
        Self { typescript }
    }

    fn grammar(&self, path: &Path) -> tree_sitter::Language {
        if !self.typescript {
            return tree_sitter_javascript::LANGUAGE.into();
        }
        let tsx = path.extension().and_then(|e| e.to_str()) == Some("tsx");
        if tsx {
            tree_sitter_typescript::LANGUAGE_TSX.into()
        } else {
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
        }
    }
}

impl SymbolExtractor for JavaScriptExtractor {
    fn language(&self) -> Language {
        if self.typescript {
            Language::TypeScript
        } else {
            Language::JavaScript
        }
    }

    fn extract(&self, path: &Path, content: &str) -> Result<Vec<SymbolRecord>> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.grammar(path))
            .context("Failed to load grammar")?;
        let tree = parser
            .parse(content, None)
            .ok_or_else(|| anyhow!("Failed to parse file"))?;

        let ctx = FileContext {
            language: self.language(),
            module: path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("unknown")
                .to_string(),
            path: path.to_path_buf(),
            in_test_file: is_test_file(path),
        };

        let mut symbols = Vec::new();
        scan_scope(tree.root_node(), content, &ctx, false, None, &mut symbols);
        Ok(symbols)
    }
}

struct FileContext {
    language: Language,
    module: String,
    path: std::path::PathBuf,
    in_test_file: bool,
}

fn is_test_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name.contains(".test.")
        || name.contains(".spec.")
        || path.components().any(|c| c.as_os_str() == "__tests__")
}

/// Walk one declaration scope (program or class body) for symbol-producing
/// nodes. `exported` carries an enclosing `export` down to declarations.
fn scan_scope(
    scope: Node<'_>,
    content: &str,
    ctx: &FileContext,
    exported: bool,
    receiver: Option<&str>,
    out: &mut Vec<SymbolRecord>,
) {
    let mut cursor = scope.walk();
    for child in scope.children(&mut cursor) {
        match child.kind() {
            "export_statement" => scan_scope(child, content, ctx, true, receiver, out),
            "function_declaration" | "generator_function_declaration" => {
                if let Some(name) = child
                    .child_by_field_name("name")
                    .map(|n| node_text(n, content).to_string())
                {
                    out.push(make_symbol(child, content, ctx, &name, exported, receiver));
                }
            }
            "class_declaration" | "abstract_class_declaration" => {
                let Some(name) = child
                    .child_by_field_name("name")
                    .map(|n| node_text(n, content).to_string())
                else {
                    continue;
                };
                out.push(type_symbol(child, content, ctx, &name, exported));
                if let Some(body) = child.child_by_field_name("body") {
                    scan_scope(body, content, ctx, exported, Some(&name), out);
                }
            }
            "interface_declaration" | "enum_declaration" | "type_alias_declaration" => {
                if let Some(name) = child
                    .child_by_field_name("name")
                    .map(|n| node_text(n, content).to_string())
                {
                    out.push(type_symbol(child, content, ctx, &name, exported));
                }
            }
            "method_definition" => {
                if let Some(name) = child
                    .child_by_field_name("name")
                    .map(|n| node_text(n, content).to_string())
                {
                    out.push(make_symbol(child, content, ctx, &name, exported, receiver));
                }
            }
            "lexical_declaration" | "variable_declaration" => {
                let mut inner = child.walk();
                for declarator in child.children(&mut inner) {
                    if declarator.kind() != "variable_declarator" {
                        continue;
                    }
                    let (Some(name_node), Some(value)) = (
                        declarator.child_by_field_name("name"),
                        declarator.child_by_field_name("value"),
                    ) else {
                        continue;
                    };
                    if matches!(value.kind(), "arrow_function" | "function_expression") {
                        let name = node_text(name_node, content).to_string();
                        out.push(make_symbol(value, content, ctx, &name, exported, receiver));
                    }
                }
            }
            _ => {}
        }
    }
}

fn make_symbol(
    node: Node<'_>,
    content: &str,
    ctx: &FileContext,
    name: &str,
    exported: bool,
    receiver: Option<&str>,
) -> SymbolRecord {
    let qualified = match receiver {
        Some(recv) => format!("{recv}.{name}"),
        None => name.to_string(),
    };
    let kind = if ctx.in_test_file {
        SymbolKind::Test
    } else if receiver.is_some() {
        SymbolKind::Method
    } else {
        SymbolKind::Function
    };
    let body = node.child_by_field_name("body").unwrap_or(node);
    SymbolRecord {
        id: SymbolRecord::qualified_name(&ctx.module, &qualified),
        name: qualified,
        kind,
        signature: first_line(node, content).to_string(),
        file: ctx.path.clone(),
        line: node_line(node),
        module: ctx.module.clone(),
        receiver: receiver.map(str::to_string),
        is_exported: exported,
        complexity: cyclomatic(body, content),
        call_refs: collect_calls(body, content, ctx.in_test_file),
        traits: body_traits(node, body, content),
        language: ctx.language,
        in_test_file: ctx.in_test_file,
    }
}

fn type_symbol(
    node: Node<'_>,
    content: &str,
    ctx: &FileContext,
    name: &str,
    exported: bool,
) -> SymbolRecord {
    SymbolRecord {
        id: SymbolRecord::qualified_name(&ctx.module, name),
        name: name.to_string(),
        kind: SymbolKind::Type,
        signature: first_line(node, content).to_string(),
        file: ctx.path.clone(),
        line: node_line(node),
        module: ctx.module.clone(),
        receiver: None,
        is_exported: exported,
        complexity: 1,
        call_refs: vec![],
        traits: SymbolTraits::default(),
        language: ctx.language,
        in_test_file: ctx.in_test_file,
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
            "identifier" | "member_expression" => node_text(function, content),
            _ => return,
        };
        // Chained calls like a.b().c() are not a resolvable name.
        if name.contains('(') || name.contains(char::is_whitespace) {
            return;
        }
        let first = name.split('.').next().unwrap_or(name);
        if EXCLUDED_CALLS.contains(&first) {
            return;
        }
        if test_context && TEST_NOISE.contains(&first) {
            return;
        }
        // this.helper() resolves within the same class; drop the prefix.
        let name = name.strip_prefix("this.").unwrap_or(name);
        calls.push(CallRef {
            name: name.to_string(),
            line: node_line(node),
        });
    });
    calls
}

fn cyclomatic(body: Node<'_>, content: &str) -> u32 {
    let mut count = 1u32;
    walk_tree(body, &mut |node| match node.kind() {
        "if_statement" | "ternary_expression" | "switch_case" | "for_statement"
        | "for_in_statement" | "while_statement" | "do_statement" | "catch_clause" => count += 1,
        "binary_expression" => {
            if let Some(op) = node.child_by_field_name("operator") {
                let op = node_text(op, content);
                if op == "&&" || op == "||" || op == "??" {
                    count += 1;
                }
            }
        }
        _ => {}
    });
    count
}

fn body_traits(decl: Node<'_>, body: Node<'_>, content: &str) -> SymbolTraits {
    let mut traits = SymbolTraits::default();
    // `async` is the leading token of async functions and methods.
    if node_text(decl, content).trim_start().starts_with("async")
        || decl
            .child(0)
            .is_some_and(|c| node_text(c, content) == "async")
    {
        traits.spawns_tasks = true;
    }
    walk_tree(body, &mut |node| match node.kind() {
        "throw_statement" => traits.may_panic = true,
        "finally_clause" => traits.defers_cleanup = true,
        "await_expression" => traits.spawns_tasks = true,
        _ => {}
    });
    traits
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn extract_js(file: &str, content: &str) -> Vec<SymbolRecord> {
        JavaScriptExtractor::new(false)
            .extract(Path::new(file), content)
            .expect("extraction should succeed")
    }

    fn extract_ts(file: &str, content: &str) -> Vec<SymbolRecord> {
        JavaScriptExtractor::new(true)
            .extract(Path::new(file), content)
            .expect("extraction should succeed")
    }

    #[test]
    fn declarations_arrows_and_methods() {
        let symbols = extract_js(
            "checkout.js",
            indoc! {r#"
                export function submitOrder(cart) {
                    return validate(cart) ? send(cart) : null;
                }

                const totalOf = (cart) => cart.reduce(sum, 0);

                class Cart {
                    add(item) {
                        this.validateItem(item);
                    }
                }
            "#},
        );
        let ids: Vec<_> = symbols.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "checkout.submitOrder",
                "checkout.totalOf",
                "checkout.Cart",
                "checkout.Cart.add"
            ]
        );
        assert!(symbols[0].is_exported);
        assert!(!symbols[1].is_exported);
        // ternary adds one branch
        assert_eq!(symbols[0].complexity, 2);
        // this.validateItem resolves as a bare class-local call
        assert_eq!(symbols[3].call_refs[0].name, "validateItem");
    }

    #[test]
    fn spec_files_become_tests_and_drop_framework_noise() {
        let symbols = extract_js(
            "checkout.spec.js",
            indoc! {r#"
                const runCase = () => {
                    expect(submitOrder([])).toBe(null);
                    submitOrder([item()]);
                };
            "#},
        );
        assert_eq!(symbols[0].kind, SymbolKind::Test);
        let refs: Vec<_> = symbols[0].call_refs.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(refs, vec!["submitOrder", "item"]);
    }

    #[test]
    fn typescript_types_and_async_traits() {
        let symbols = extract_ts(
            "api.ts",
            indoc! {r#"
                export interface Order {
                    id: string;
                }

                export async function fetchOrder(id: string): Promise<Order> {
                    const res = await http.get(id);
                    if (!res.ok) {
                        throw new Error("bad response");
                    }
                    return res.json();
                }
            "#},
        );
        assert_eq!(symbols[0].kind, SymbolKind::Type);
        let fetch = &symbols[1];
        assert!(fetch.traits.spawns_tasks);
        assert!(fetch.traits.may_panic);
        assert_eq!(fetch.language, Language::TypeScript);
    }
}
