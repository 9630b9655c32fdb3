//! Rust symbol extraction via syn.
//!
//! Symbols are qualified by module (file stem, or the directory name for
//! `mod.rs`/`lib.rs`/`main.rs`). Impl methods are named `Type.method`.
//! Call paths are normalized to dotted form so they resolve the same way
//! as the tree-sitter languages.

use super::SymbolExtractor;
use crate::core::{CallRef, Language, SymbolKind, SymbolRecord, SymbolTraits};
use anyhow::{Context, Result};
use std::path::Path;
use syn::spanned::Spanned;
use syn::visit::{self, Visit};

/// Constructors and conversions that parse as calls but never name a
/// user-defined function worth an edge.
const EXCLUDED_PATH_HEADS: &[&str] = &[
    "Some", "Ok", "Err", "Box", "Vec", "String", "Default", "Arc", "Rc", "PathBuf", "HashMap",
    "HashSet", "Duration", "Instant", "std", "core", "alloc",
];

/// Ubiquitous std/iterator methods skipped as call refs. `unwrap`, `expect`,
/// `send`, `recv`, and `spawn` are folded into traits instead.
const EXCLUDED_METHODS: &[&str] = &[
    "clone", "into", "to_string", "to_owned", "as_str", "as_ref", "as_deref", "iter",
    "into_iter", "map", "filter", "filter_map", "flat_map", "collect", "fold", "for_each",
    "push", "pop", "insert", "remove", "get", "len", "is_empty", "contains", "join", "split",
    "trim", "starts_with", "ends_with", "next", "unwrap_or", "unwrap_or_else",
    "unwrap_or_default", "and_then", "or_else", "ok_or", "ok_or_else", "ok", "err", "is_some",
    "is_none", "is_ok", "is_err", "to_vec", "extend", "sort", "sort_by", "cloned", "copied",
    "entry", "or_default", "or_insert", "lock", "read", "write",
];

pub struct RustExtractor;

impl RustExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolExtractor for RustExtractor {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn extract(&self, path: &Path, content: &str) -> Result<Vec<SymbolRecord>> {
        let file = syn::parse_file(content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        let in_test_file = path.components().any(|c| c.as_os_str() == "tests");
        let mut visitor = FileVisitor {
            content,
            path,
            module: module_name(path),
            receiver: None,
            test_scope: in_test_file,
            symbols: Vec::new(),
        };
        visitor.visit_file(&file);
        Ok(visitor.symbols)
    }
}

fn module_name(path: &Path) -> String {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("unknown");
    if matches!(stem, "mod" | "lib" | "main") {
        if let Some(parent) = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
        {
            if parent != "src" {
                return parent.to_string();
            }
        }
    }
    stem.to_string()
}

struct FileVisitor<'a> {
    content: &'a str,
    path: &'a Path,
    module: String,
    receiver: Option<String>,
    /// Inside `#[cfg(test)] mod` or a `tests/` file.
    test_scope: bool,
    symbols: Vec<SymbolRecord>,
}

impl<'a> FileVisitor<'a> {
    fn source_line(&self, line: usize) -> String {
        self.content
            .lines()
            .nth(line.saturating_sub(1))
            .unwrap_or("")
            .trim()
            .trim_end_matches('{')
            .trim()
            .to_string()
    }

    fn push_fn(
        &mut self,
        ident: &syn::Ident,
        vis_public: bool,
        attrs: &[syn::Attribute],
        sig: &syn::Signature,
        block: &syn::Block,
    ) {
        let bare_name = ident.to_string();
        let name = match &self.receiver {
            Some(recv) => format!("{recv}.{bare_name}"),
            None => bare_name.clone(),
        };
        let kind = if has_attr(attrs, "bench") {
            SymbolKind::Benchmark
        } else if has_attr(attrs, "test") {
            SymbolKind::Test
        } else if self.receiver.is_some() {
            SymbolKind::Method
        } else {
            SymbolKind::Function
        };

        let mut body = BodyVisitor::default();
        body.visit_block(block);
        body.traits.spawns_tasks |= sig.asyncness.is_some();

        let line = ident.span().start().line;
        self.symbols.push(SymbolRecord {
            id: SymbolRecord::qualified_name(&self.module, &name),
            name,
            kind,
            signature: self.source_line(line),
            file: self.path.to_path_buf(),
            line,
            module: self.module.clone(),
            receiver: self.receiver.clone(),
            is_exported: vis_public,
            complexity: body.complexity,
            call_refs: if kind.is_test_like() {
                body.calls
                    .into_iter()
                    .filter(|c| !c.name.starts_with("assert"))
                    .collect()
            } else {
                body.calls
            },
            traits: body.traits,
            language: Language::Rust,
            in_test_file: self.test_scope,
        });
    }

    fn push_type(&mut self, ident: &syn::Ident, vis_public: bool) {
        let name = ident.to_string();
        let line = ident.span().start().line;
        self.symbols.push(SymbolRecord {
            id: SymbolRecord::qualified_name(&self.module, &name),
            name,
            kind: SymbolKind::Type,
            signature: self.source_line(line),
            file: self.path.to_path_buf(),
            line,
            module: self.module.clone(),
            receiver: None,
            is_exported: vis_public,
            complexity: 1,
            call_refs: vec![],
            traits: SymbolTraits::default(),
            language: Language::Rust,
            in_test_file: self.test_scope,
        });
    }
}

fn is_public(vis: &syn::Visibility) -> bool {
    matches!(vis, syn::Visibility::Public(_))
}

fn has_attr(attrs: &[syn::Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| {
        attr.path()
            .segments
            .last()
            .is_some_and(|seg| seg.ident == name)
    })
}

fn is_cfg_test(attrs: &[syn::Attribute]) -> bool {
    attrs.iter().any(|attr| {
        attr.path().is_ident("cfg")
            && attr
                .parse_args::<syn::Path>()
                .is_ok_and(|p| p.is_ident("test"))
    })
}

impl<'a, 'ast> Visit<'ast> for FileVisitor<'a> {
    fn visit_item_fn(&mut self, item: &'ast syn::ItemFn) {
        self.push_fn(
            &item.sig.ident,
            is_public(&item.vis),
            &item.attrs,
            &item.sig,
            &item.block,
        );
    }

    fn visit_item_impl(&mut self, item: &'ast syn::ItemImpl) {
        let receiver = match item.self_ty.as_ref() {
            syn::Type::Path(p) => p.path.segments.last().map(|s| s.ident.to_string()),
            _ => None,
        };
        let previous = self.receiver.take();
        self.receiver = receiver;
        visit::visit_item_impl(self, item);
        self.receiver = previous;
    }

    fn visit_impl_item_fn(&mut self, item: &'ast syn::ImplItemFn) {
        self.push_fn(
            &item.sig.ident,
            is_public(&item.vis),
            &item.attrs,
            &item.sig,
            &item.block,
        );
    }

    fn visit_item_struct(&mut self, item: &'ast syn::ItemStruct) {
        self.push_type(&item.ident, is_public(&item.vis));
    }

    fn visit_item_enum(&mut self, item: &'ast syn::ItemEnum) {
        self.push_type(&item.ident, is_public(&item.vis));
    }

    fn visit_item_trait(&mut self, item: &'ast syn::ItemTrait) {
        self.push_type(&item.ident, is_public(&item.vis));
    }

    fn visit_item_mod(&mut self, item: &'ast syn::ItemMod) {
        let previous = self.test_scope;
        self.test_scope |= is_cfg_test(&item.attrs);
        visit::visit_item_mod(self, item);
        self.test_scope = previous;
    }
}

#[derive(Default)]
struct BodyVisitor {
    calls: Vec<CallRef>,
    complexity: u32,
    traits: SymbolTraits,
    initialized: bool,
}

impl BodyVisitor {
    fn record(&mut self, name: String, line: usize) {
        self.calls.push(CallRef { name, line });
    }
}

impl<'ast> Visit<'ast> for BodyVisitor {
    fn visit_block(&mut self, block: &'ast syn::Block) {
        if !self.initialized {
            self.initialized = true;
            self.complexity = 1;
        }
        visit::visit_block(self, block);
    }

    fn visit_expr_call(&mut self, expr: &'ast syn::ExprCall) {
        if let syn::Expr::Path(path) = expr.func.as_ref() {
            let segments: Vec<String> = path
                .path
                .segments
                .iter()
                .map(|s| s.ident.to_string())
                .collect();
            let head = segments.first().map(String::as_str).unwrap_or("");
            let full = segments.join(".");
            if full.contains("spawn") {
                self.traits.spawns_tasks = true;
            }
            if full.contains("channel") {
                self.traits.uses_channels = true;
            }
            if !EXCLUDED_PATH_HEADS.contains(&head) {
                // Keep at most module.function; deeper paths rarely resolve.
                let name = segments
                    .iter()
                    .rev()
                    .take(2)
                    .rev()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(".");
                let line = expr.func.span().start().line;
                self.record(name, line);
            }
        }
        visit::visit_expr_call(self, expr);
    }

    fn visit_expr_method_call(&mut self, expr: &'ast syn::ExprMethodCall) {
        let method = expr.method.to_string();
        match method.as_str() {
            "unwrap" | "expect" => self.traits.may_panic = true,
            "send" | "recv" | "try_recv" | "try_send" => self.traits.uses_channels = true,
            "spawn" => self.traits.spawns_tasks = true,
            m if !EXCLUDED_METHODS.contains(&m) => {
                self.record(method.clone(), expr.method.span().start().line);
            }
            _ => {}
        }
        visit::visit_expr_method_call(self, expr);
    }

    fn visit_macro(&mut self, mac: &'ast syn::Macro) {
        if let Some(ident) = mac.path.segments.last().map(|s| s.ident.to_string()) {
            if matches!(
                ident.as_str(),
                "panic" | "unreachable" | "todo" | "unimplemented" | "assert" | "assert_eq"
                    | "assert_ne"
            ) {
                self.traits.may_panic = true;
            }
        }
        visit::visit_macro(self, mac);
    }

    fn visit_expr_if(&mut self, expr: &'ast syn::ExprIf) {
        self.complexity += 1;
        visit::visit_expr_if(self, expr);
    }

    fn visit_arm(&mut self, arm: &'ast syn::Arm) {
        self.complexity += 1;
        visit::visit_arm(self, arm);
    }

    fn visit_expr_while(&mut self, expr: &'ast syn::ExprWhile) {
        self.complexity += 1;
        visit::visit_expr_while(self, expr);
    }

    fn visit_expr_for_loop(&mut self, expr: &'ast syn::ExprForLoop) {
        self.complexity += 1;
        visit::visit_expr_for_loop(self, expr);
    }

    fn visit_expr_loop(&mut self, expr: &'ast syn::ExprLoop) {
        self.complexity += 1;
        visit::visit_expr_loop(self, expr);
    }

    fn visit_expr_binary(&mut self, expr: &'ast syn::ExprBinary) {
        if matches!(expr.op, syn::BinOp::And(_) | syn::BinOp::Or(_)) {
            self.complexity += 1;
        }
        visit::visit_expr_binary(self, expr);
    }
}
