//! Source file discovery.
//!
//! Walks the project respecting gitignore rules, keeps files in supported
//! languages, and applies the user's extra ignore globs. Unreadable files
//! are logged and skipped.

use crate::core::Language;
use anyhow::{Context, Result};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Directories never worth descending into, regardless of gitignore.
const SKIP_DIRS: &[&str] = &[
    "node_modules",
    "vendor",
    "target",
    "dist",
    "build",
    ".git",
    "__pycache__",
];

pub struct SourceWalker {
    root: PathBuf,
    ignore_patterns: Vec<glob::Pattern>,
}

impl SourceWalker {
    pub fn new(root: &Path, ignore_globs: &[String]) -> Result<Self> {
        let ignore_patterns = ignore_globs
            .iter()
            .map(|g| glob::Pattern::new(g).with_context(|| format!("Invalid ignore glob: {g}")))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            root: root.to_path_buf(),
            ignore_patterns,
        })
    }

    /// All supported source files with their contents, paths relative to
    /// the walk root.
    pub fn collect(&self) -> Result<Vec<(PathBuf, String)>> {
        let mut files = Vec::new();
        let walker = WalkBuilder::new(&self.root)
            .hidden(true)
            .git_ignore(true)
            .git_global(false)
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                !SKIP_DIRS.contains(&name.as_ref())
            })
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Walk error: {e}");
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            if !self.should_process(path) {
                continue;
            }
            match std::fs::read_to_string(path) {
                Ok(content) => {
                    let relative = path.strip_prefix(&self.root).unwrap_or(path).to_path_buf();
                    files.push((relative, content));
                }
                Err(e) => log::warn!("Skipping unreadable {}: {e}", path.display()),
            }
        }
        // Walk order varies across platforms; reports must not.
        files.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(files)
    }

    fn should_process(&self, path: &Path) -> bool {
        if Language::from_path(path).is_none() {
            return false;
        }
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        !self
            .ignore_patterns
            .iter()
            .any(|pattern| pattern.matches_path(relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn collects_only_supported_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.go"), "package a\n").unwrap();
        fs::write(dir.path().join("b.txt"), "notes\n").unwrap();
        fs::create_dir(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join("node_modules/c.js"), "x()\n").unwrap();

        let walker = SourceWalker::new(dir.path(), &[]).unwrap();
        let files = walker.collect().unwrap();
        let names: Vec<_> = files.iter().map(|(p, _)| p.to_str().unwrap()).collect();
        assert_eq!(names, vec!["a.go"]);
    }

    #[test]
    fn ignore_globs_filter_paths() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("gen")).unwrap();
        fs::write(dir.path().join("gen/api.go"), "package gen\n").unwrap();
        fs::write(dir.path().join("main.go"), "package main\n").unwrap();

        let walker = SourceWalker::new(dir.path(), &["gen/**".to_string()]).unwrap();
        let files = walker.collect().unwrap();
        let names: Vec<_> = files.iter().map(|(p, _)| p.to_str().unwrap()).collect();
        assert_eq!(names, vec!["main.go"]);
    }

    #[test]
    fn invalid_globs_error_out() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SourceWalker::new(dir.path(), &["[".to_string()]).is_err());
    }
}
