//! External Go analysis tools: go-callvis and guru.
//!
//! Both run as subprocesses under hard timeouts carved out of the global
//! budget. Any failure surfaces as a [`StrategyError`] and the chain falls
//! through to the built-in resolver.

use super::{CallGraphStrategy, GraphSink, ResolveStats, StrategyError};
use crate::core::{Language, SymbolRecord, SymbolTable};
use crate::graph::{Edge, Node};
use crate::orchestrator::AnalysisBudget;
use rayon::prelude::*;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(25);
const INSTALL_TIMEOUT: Duration = Duration::from_secs(120);
/// go-callvis analyzes the whole program in one shot; cap it even when the
/// global budget is generous.
const CALLVIS_TIMEOUT: Duration = Duration::from_secs(30);

/// Run a command, killing it when the timeout passes.
pub(crate) fn run_with_timeout(
    command: &mut Command,
    timeout: Duration,
) -> Result<Output, StrategyError> {
    let tool = command.get_program().to_string_lossy().to_string();
    let mut child = command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| StrategyError::ToolFailed {
            tool: tool.clone(),
            message: e.to_string(),
        })?;

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => {
                return child.wait_with_output().map_err(|e| StrategyError::ToolFailed {
                    tool: tool.clone(),
                    message: e.to_string(),
                });
            }
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(StrategyError::Timeout);
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                let _ = child.kill();
                return Err(StrategyError::ToolFailed {
                    tool: tool.clone(),
                    message: e.to_string(),
                });
            }
        }
    }
}

fn probe_tool(tool: &str) -> Result<(), StrategyError> {
    which::which(tool)
        .map(|_| ())
        .map_err(|_| StrategyError::ToolMissing(tool.to_string()))
}

/// Whole-program call graph via go-callvis JSON output.
pub struct GoCallvisStrategy {
    root: PathBuf,
    install_missing: bool,
}

impl GoCallvisStrategy {
    pub fn new(root: &Path, install_missing: bool) -> Self {
        Self {
            root: root.to_path_buf(),
            install_missing,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallvisOutput {
    #[serde(default)]
    nodes: Vec<CallvisNode>,
    #[serde(default)]
    edges: Vec<CallvisEdge>,
}

#[derive(Debug, Deserialize)]
struct CallvisNode {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CallvisEdge {
    source: String,
    target: String,
}

impl CallGraphStrategy for GoCallvisStrategy {
    fn name(&self) -> &str {
        "callvis"
    }

    fn priority(&self) -> u32 {
        100
    }

    fn probe(&self) -> Result<(), StrategyError> {
        if probe_tool("go-callvis").is_ok() {
            return Ok(());
        }
        if self.install_missing && probe_tool("go").is_ok() {
            log::info!("Installing go-callvis");
            let _ = run_with_timeout(
                Command::new("go")
                    .args(["install", "github.com/ofabry/go-callvis@latest"])
                    .current_dir(&self.root),
                INSTALL_TIMEOUT,
            );
        }
        probe_tool("go-callvis")
    }

    fn resolve(
        &self,
        table: &SymbolTable,
        budget: &AnalysisBudget,
        sink: &GraphSink,
    ) -> Result<ResolveStats, StrategyError> {
        if budget.expired() {
            return Err(StrategyError::Timeout);
        }
        let output = run_with_timeout(
            Command::new("go-callvis")
                .args(["-format=json", "-group=pkg", "-nostd", "-skipbrowser", "./..."])
                .current_dir(&self.root),
            budget.remaining().min(CALLVIS_TIMEOUT),
        )?;
        if !output.status.success() {
            return Err(StrategyError::ToolFailed {
                tool: "go-callvis".to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let parsed: CallvisOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| StrategyError::OutputParse(e.to_string()))?;

        let mut analyzed = 0;
        for node in &parsed.nodes {
            let id = map_go_name(table, &node.id);
            match table.get(&id) {
                Some(symbol) => {
                    sink.add_node(Node::from_symbol(symbol, self.name()));
                    analyzed += 1;
                }
                None => {
                    let label = id.rsplit('.').next().unwrap_or(&id).to_string();
                    sink.add_node(Node::placeholder(&id, &label, "", self.name()));
                }
            }
        }
        for edge in &parsed.edges {
            let source = map_go_name(table, &edge.source);
            let target = map_go_name(table, &edge.target);
            if source != target {
                sink.add_edge(Edge::calls(&source, &target), self.name());
            }
        }
        Ok(ResolveStats {
            analyzed,
            skipped: 0,
        })
    }
}

/// Per-symbol callers/callees via guru.
pub struct GoGuruStrategy {
    root: PathBuf,
}

impl GoGuruStrategy {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn scope(&self, budget: &AnalysisBudget) -> Result<String, StrategyError> {
        let output = run_with_timeout(
            Command::new("go")
                .args(["list", "./..."])
                .current_dir(&self.root),
            budget.remaining().min(Duration::from_secs(10)),
        )?;
        if !output.status.success() {
            return Err(StrategyError::ToolFailed {
                tool: "go list".to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let scope = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(",");
        if scope.is_empty() {
            return Err(StrategyError::OutputParse("empty go list scope".to_string()));
        }
        Ok(scope)
    }

    fn query(
        &self,
        scope: &str,
        mode: &str,
        position: &str,
        timeout: Duration,
    ) -> Result<Vec<String>, StrategyError> {
        let output = run_with_timeout(
            Command::new("guru")
                .args(["-scope", scope, mode, position])
                .current_dir(&self.root),
            timeout,
        )?;
        if !output.status.success() {
            return Err(StrategyError::ToolFailed {
                tool: "guru".to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(parse_guru_line)
            .collect())
    }
}

impl CallGraphStrategy for GoGuruStrategy {
    fn name(&self) -> &str {
        "guru"
    }

    fn priority(&self) -> u32 {
        50
    }

    fn probe(&self) -> Result<(), StrategyError> {
        probe_tool("guru")?;
        probe_tool("go")
    }

    fn resolve(
        &self,
        table: &SymbolTable,
        budget: &AnalysisBudget,
        sink: &GraphSink,
    ) -> Result<ResolveStats, StrategyError> {
        let scope = self.scope(budget)?;
        let symbols: Vec<&SymbolRecord> = table
            .business_symbols()
            .filter(|s| s.language == Language::Go)
            .collect();
        if symbols.is_empty() {
            return Err(StrategyError::OutputParse("no Go symbols to query".to_string()));
        }

        let analyzed = AtomicUsize::new(0);
        let skipped = AtomicUsize::new(0);

        symbols.par_iter().for_each(|symbol| {
            // A symbol needs two queries; skip when the budget cannot
            // cover both.
            if budget.remaining() < budget.per_symbol_timeout() * 2 {
                skipped.fetch_add(1, Ordering::Relaxed);
                return;
            }
            let Some(position) = self.position_of(symbol) else {
                skipped.fetch_add(1, Ordering::Relaxed);
                return;
            };
            let per_query = budget
                .per_symbol_timeout()
                .min(budget.remaining())
                .checked_div(2)
                .unwrap_or_default();

            let (callers, callees) = rayon::join(
                || self.query(&scope, "callers", &position, per_query),
                || self.query(&scope, "callees", &position, per_query),
            );

            sink.add_node(Node::from_symbol(symbol, self.name()));
            if let Ok(callers) = callers {
                for caller in callers {
                    let source = map_go_name(table, &caller);
                    if source != symbol.id {
                        sink.add_edge(Edge::calls(&source, &symbol.id), self.name());
                    }
                }
            }
            if let Ok(callees) = callees {
                for callee in callees {
                    let target = map_go_name(table, &callee);
                    if target != symbol.id {
                        sink.add_edge(Edge::calls(&symbol.id, &target), self.name());
                    }
                }
            }
            analyzed.fetch_add(1, Ordering::Relaxed);
        });

        let analyzed = analyzed.load(Ordering::Relaxed);
        if analyzed == 0 {
            return Err(StrategyError::Timeout);
        }
        Ok(ResolveStats {
            analyzed,
            skipped: skipped.load(Ordering::Relaxed),
        })
    }
}

impl GoGuruStrategy {
    /// guru positions are byte offsets: `file.go:#1234`.
    fn position_of(&self, symbol: &SymbolRecord) -> Option<String> {
        let path = if symbol.file.is_absolute() {
            symbol.file.clone()
        } else {
            self.root.join(&symbol.file)
        };
        let content = std::fs::read_to_string(&path).ok()?;
        let mut offset = 0usize;
        for (index, line) in content.lines().enumerate() {
            if index + 1 == symbol.line {
                let bare = symbol.name.rsplit('.').next().unwrap_or(&symbol.name);
                let column = line.find(bare)?;
                return Some(format!("{}:#{}", path.display(), offset + column));
            }
            offset += line.len() + 1;
        }
        None
    }
}

/// Extract the qualified function name from one guru output line, e.g.
/// `main.go:10:2: dynamic call from github.com/acme/api.Serve`.
fn parse_guru_line(line: &str) -> Option<String> {
    let token = line.split_whitespace().last()?;
    let token = token.rsplit('/').next()?;
    let cleaned: String = token
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '*'))
        .collect();
    if cleaned.contains('.') {
        Some(cleaned)
    } else {
        None
    }
}

/// Normalize a Go tool's qualified name to a table id. Import paths are
/// stripped to the package name; unmatched names pass through and become
/// placeholders downstream.
fn map_go_name(table: &SymbolTable, raw: &str) -> String {
    let trimmed = raw.rsplit('/').next().unwrap_or(raw);
    let cleaned: String = trimmed
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '*'))
        .collect();
    if table.get(&cleaned).is_some() {
        return cleaned;
    }
    if let Some(bare) = cleaned.rsplit('.').next() {
        if let Some(symbol) = table.by_name(bare).next() {
            return symbol.id.clone();
        }
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SymbolKind, SymbolTraits};

    fn record(module: &str, name: &str) -> SymbolRecord {
        SymbolRecord {
            id: SymbolRecord::qualified_name(module, name),
            name: name.to_string(),
            kind: SymbolKind::Function,
            signature: format!("func {name}()"),
            file: PathBuf::from("main.go"),
            line: 1,
            module: module.to_string(),
            receiver: None,
            is_exported: true,
            complexity: 1,
            call_refs: vec![],
            traits: SymbolTraits::default(),
            language: Language::Go,
            in_test_file: false,
        }
    }

    #[test]
    fn guru_lines_yield_qualified_names() {
        assert_eq!(
            parse_guru_line("main.go:10:2: dynamic call from github.com/acme/api.Serve"),
            Some("api.Serve".to_string())
        );
        assert_eq!(
            parse_guru_line("srv.go:3:1: call from (*github.com/acme/api.Server).handle"),
            Some("api.Server.handle".to_string())
        );
        assert_eq!(parse_guru_line("not a guru line"), None);
    }

    #[test]
    fn go_names_map_to_table_ids() {
        let table = SymbolTable::from_records(vec![record("api", "Serve")], 0);
        assert_eq!(map_go_name(&table, "github.com/acme/api.Serve"), "api.Serve");
        // Bare-name fallback when the package alias differs.
        assert_eq!(map_go_name(&table, "apiserver.Serve"), "api.Serve");
        // Unknown names pass through for placeholder creation.
        assert_eq!(map_go_name(&table, "fmt.Println"), "fmt.Println");
    }

    #[test]
    fn timed_out_commands_are_killed() {
        let result = run_with_timeout(
            Command::new("sleep").arg("5"),
            Duration::from_millis(60),
        );
        assert!(matches!(result, Err(StrategyError::Timeout)));
    }
}
