//! Candidate file discovery.
//!
//! Walks each root path, keeps regular files whose extension is recognized,
//! and prunes excluded directories before descending into them. A root that
//! cannot be scanned yields a `DiscoveryError` without stopping the others.
//!
//! Ordering is deterministic: candidates are deduplicated and sorted by
//! canonical path, so overlapping roots never process a file twice and the
//! report is reproducible on an unchanged tree.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// A file selected for formatting. Immutable once discovered.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CandidateFile {
    path: PathBuf,
}

impl CandidateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path as reachable from the root it was discovered under.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for CandidateFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// A root (or an entry below it) that could not be scanned.
#[derive(Error, Debug)]
#[error("cannot scan '{}': {reason}", path.display())]
pub struct DiscoveryError {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of scanning all roots.
#[derive(Debug, Default)]
pub struct Discovery {
    pub files: Vec<CandidateFile>,
    pub errors: Vec<DiscoveryError>,
}

/// Recursive file discoverer with extension and exclusion filters.
#[derive(Debug, Clone)]
pub struct Discoverer {
    extensions: Vec<String>,
    exclude: GlobSet,
    /// Directory explicit file roots are made relative to before matching
    /// exclusions; the current directory unless overridden.
    base: Option<PathBuf>,
}

impl Discoverer {
    /// Build a discoverer.
    ///
    /// Extensions are matched case-insensitively and may be given with or
    /// without a leading dot. Exclusion patterns are globs matched against
    /// the path relative to its root and against the bare entry name. A
    /// file named directly as a root is matched relative to the current
    /// directory instead.
    pub fn new(extensions: &[String], exclude: &[String]) -> Result<Self, globset::Error> {
        let extensions = extensions
            .iter()
            .map(|s| s.trim().trim_start_matches('.').to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            extensions,
            exclude: build_globset(exclude)?,
            base: std::env::current_dir().ok(),
        })
    }

    /// Resolve explicit file roots against `base` instead of the current
    /// directory.
    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Scan all roots and return the ordered candidate list.
    pub fn discover(&self, roots: &[PathBuf]) -> Discovery {
        let mut found: BTreeMap<PathBuf, CandidateFile> = BTreeMap::new();
        let mut errors = Vec::new();

        for root in roots {
            let metadata = match std::fs::metadata(root) {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(root = %root.display(), error = %e, "skipping root");
                    errors.push(DiscoveryError {
                        path: root.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if metadata.is_file() {
                // Explicitly named files bypass the extension filter.
                if !self.is_excluded_file(root) {
                    insert_candidate(&mut found, root.clone());
                }
                continue;
            }

            if !metadata.is_dir() {
                errors.push(DiscoveryError {
                    path: root.clone(),
                    reason: "not a regular file or directory".to_string(),
                });
                continue;
            }

            self.walk_root(root, &mut found, &mut errors);
        }

        Discovery {
            files: found.into_values().collect(),
            errors,
        }
    }

    fn walk_root(
        &self,
        root: &Path,
        found: &mut BTreeMap<PathBuf, CandidateFile>,
        errors: &mut Vec<DiscoveryError>,
    ) {
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.is_excluded(root, entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(root).to_path_buf();
                    tracing::warn!(path = %path.display(), error = %e, "cannot read entry");
                    errors.push(DiscoveryError {
                        path,
                        reason: e
                            .io_error()
                            .map(|io| io.to_string())
                            .unwrap_or_else(|| e.to_string()),
                    });
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            if self.has_recognized_extension(entry.path()) {
                insert_candidate(found, entry.into_path());
            }
        }
    }

    fn is_excluded(&self, root: &Path, entry: &DirEntry) -> bool {
        if self.exclude.is_empty() {
            return false;
        }

        if self.exclude.is_match(entry.file_name()) {
            return true;
        }

        entry
            .path()
            .strip_prefix(root)
            .map(|rel| self.exclude.is_match(normalize_separators(rel)))
            .unwrap_or(false)
    }

    fn is_excluded_file(&self, path: &Path) -> bool {
        if self.exclude.is_empty() {
            return false;
        }

        if path
            .file_name()
            .is_some_and(|name| self.exclude.is_match(name))
        {
            return true;
        }

        let relative = self.base.as_deref().and_then(|base| {
            let absolute = std::path::absolute(path).ok()?;
            absolute.strip_prefix(base).ok().map(Path::to_path_buf)
        });
        match relative {
            Some(rel) => self.exclude.is_match(normalize_separators(&rel)),
            None => self.exclude.is_match(normalize_separators(path)),
        }
    }

    fn has_recognized_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                let ext = ext.to_lowercase();
                self.extensions.iter().any(|e| *e == ext)
            })
    }
}

fn insert_candidate(found: &mut BTreeMap<PathBuf, CandidateFile>, path: PathBuf) {
    // Resolves `..` and symlinks so every spelling of a file shares one key.
    let key = std::fs::canonicalize(&path)
        .or_else(|_| std::path::absolute(&path))
        .unwrap_or_else(|_| path.clone());
    found.entry(key).or_insert_with(|| CandidateFile::new(path));
}

fn normalize_separators(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();

    for pattern in patterns {
        let normalized = pattern.trim().replace('\\', "/");
        if normalized.is_empty() {
            continue;
        }
        builder.add(Glob::new(&normalized)?);
    }

    builder.build()
}
