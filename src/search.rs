//! 全文搜索
//!
//! Regex grep over a directory tree, independent of the query engine. Files
//! are visited in lexical path order so results are reproducible.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a line was found. `path` is relative to the search root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub path: String,
    /// 1-based
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub source: Source,
    pub content: String,
    /// false for context lines
    pub is_match: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchOptions {
    /// Glob applied to the file name, e.g. `*.md`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_glob: Option<String>,
    pub case_insensitive: bool,
    pub context_lines: usize,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file_glob(mut self, glob: impl Into<String>) -> Self {
        self.file_glob = Some(glob.into());
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    pub fn with_context(mut self, lines: usize) -> Self {
        self.context_lines = lines;
        self
    }
}

/// Search backend abstraction.
pub trait SearchProvider {
    fn search(&self, pattern: &str, opts: &SearchOptions) -> Result<Vec<SearchResult>>;
}

/// Filesystem-backed [`SearchProvider`].
#[derive(Debug, Clone)]
pub struct FileSystemSearch {
    pub root: PathBuf,
    pub extensions: Vec<String>,
}

impl FileSystemSearch {
    pub fn new(root: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            root: root.into(),
            extensions,
        }
    }
}

impl SearchProvider for FileSystemSearch {
    fn search(&self, pattern: &str, opts: &SearchOptions) -> Result<Vec<SearchResult>> {
        search(&self.root, pattern, &self.extensions, opts)
    }
}

pub fn compile_pattern(pattern: &str, case_insensitive: bool) -> Result<Regex> {
    let source = if case_insensitive {
        format!("(?i){}", pattern)
    } else {
        pattern.to_string()
    };
    Regex::new(&source).map_err(|e| {
        Error::validation(format!("invalid regex: {}", e)).with_detail("pattern", pattern)
    })
}

/// Matching lines plus `context` lines around each match. Overlapping
/// windows are merged; every line appears at most once.
pub fn match_lines(lines: &[&str], path: &str, re: &Regex, context: usize) -> Vec<SearchResult> {
    let matched: Vec<bool> = lines.iter().map(|line| re.is_match(line)).collect();
    if !matched.iter().any(|m| *m) {
        return Vec::new();
    }

    let mut include = vec![false; lines.len()];
    for (i, _) in matched.iter().enumerate().filter(|(_, m)| **m) {
        let start = i.saturating_sub(context);
        let end = (i + context).min(lines.len() - 1);
        include[start..=end].iter_mut().for_each(|flag| *flag = true);
    }

    include
        .iter()
        .enumerate()
        .filter(|(_, keep)| **keep)
        .map(|(i, _)| SearchResult {
            source: Source {
                path: path.to_string(),
                line: i + 1,
            },
            content: lines[i].to_string(),
            is_match: matched[i],
        })
        .collect()
}

/// Recursive search below `root`. Empty `extensions` searches every file;
/// entries may be given with or without the leading dot.
pub fn search(
    root: &Path,
    pattern: &str,
    extensions: &[String],
    opts: &SearchOptions,
) -> Result<Vec<SearchResult>> {
    let re = compile_pattern(pattern, opts.case_insensitive)?;
    let glob = opts
        .file_glob
        .as_deref()
        .map(|g| {
            glob::Pattern::new(g).map_err(|e| {
                Error::validation(format!("invalid file glob: {}", e)).with_detail("glob", g)
            })
        })
        .transpose()?;
    let extensions: Vec<String> = extensions
        .iter()
        .map(|ext| ext.trim_start_matches('.').to_string())
        .collect();

    let mut files = Vec::new();
    collect_files(root, &mut files)?;
    files.sort();

    let mut results = Vec::new();
    for file in files {
        if !extensions.is_empty() {
            let ext = file.extension().and_then(|e| e.to_str()).unwrap_or_default();
            if !extensions.iter().any(|e| e == ext) {
                continue;
            }
        }
        if let Some(glob) = &glob {
            let name = file.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if !glob.matches(name) {
                continue;
            }
        }

        // unreadable and non-UTF-8 files are skipped
        let Ok(text) = fs::read_to_string(&file) else {
            continue;
        };
        let relative = file
            .strip_prefix(root)
            .unwrap_or(&file)
            .to_string_lossy()
            .replace('\\', "/");
        let lines: Vec<&str> = text.lines().collect();
        results.extend(match_lines(&lines, &relative, &re, opts.context_lines));
    }

    debug!(root = %root.display(), pattern, results = results.len(), "search finished");
    Ok(results)
}

fn collect_files(root: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(root)?;
    walk_entries(entries, out);
    Ok(())
}

/// Symlinks are not followed. Unreadable entries below the root are skipped.
fn walk_entries(entries: fs::ReadDir, out: &mut Vec<PathBuf>) {
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let path = entry.path();
        if file_type.is_dir() {
            match fs::read_dir(&path) {
                Ok(sub) => walk_entries(sub, out),
                Err(e) => debug!(path = %path.display(), error = %e, "skipping unreadable directory"),
            }
        } else if file_type.is_file() {
            out.push(path);
        }
    }
}
