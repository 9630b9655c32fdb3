//! impactmap - static change-impact analysis.
//!
//! The pipeline has four stages:
//!
//! 1. **Extraction** - per-language parsers (tree-sitter for Go, Python,
//!    JavaScript and TypeScript; syn for Rust) turn source files into a
//!    flat [`core::SymbolTable`].
//! 2. **Resolution** - [`strategies`] turn textual call references into a
//!    [`graph::CallGraph`], racing a global deadline so a huge repository
//!    yields a partial graph instead of a hung run.
//! 3. **Enhancement** - [`graph::enhance`] annotates nodes and edges with
//!    test presence and risk levels.
//! 4. **Coverage** - [`coverage`] lists business symbols no test touches,
//!    ranked by risk.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod core;
pub mod coverage;
pub mod extractors;
pub mod graph;
pub mod io;
pub mod orchestrator;
pub mod strategies;

pub use crate::analysis::{analyze_project, AnalysisReport};
pub use crate::config::ImpactConfig;
pub use crate::core::{Language, RiskLevel, SymbolKind, SymbolRecord, SymbolTable};
pub use crate::coverage::{CoverageGap, CoverageReport};
pub use crate::graph::{CallGraph, Edge, Node};
pub use crate::orchestrator::{AnalysisBudget, Orchestrator, ResolvedGraph};
