//! Project source enumeration for whole-project sweeps.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use ignore::WalkBuilder;
use tracing::{debug, info, warn};

use crate::config::ProjectConfig;
use crate::traits::ProjectFileEnumerator;
use crate::types::FileHandle;
use crate::{AugurError, Result};

/// Default size ceiling for analyzed files.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 1024 * 1024;

/// Directories never descended into: dependencies, build output, caches.
const IGNORED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".idea",
    ".vscode",
    ".gradle",
    "node_modules",
    "bower_components",
    "target",
    "build",
    "dist",
    "out",
    ".next",
    ".nuxt",
    "coverage",
    ".venv",
    "venv",
    "__pycache__",
    ".mypy_cache",
    ".pytest_cache",
    ".tox",
    "vendor",
    "third_party",
];

/// Gitignore-aware walk of a project tree.
///
/// Only files with a recognised source extension are returned (see
/// [`language_for_path`](crate::types::language_for_path)); hidden files,
/// ignored directories and files above the size ceiling are skipped.
#[derive(Debug, Clone)]
pub struct WorkspaceEnumerator {
    root: PathBuf,
    max_file_bytes: u64,
}

impl WorkspaceEnumerator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }

    /// Enumerator for the configured project root, or the current directory.
    pub fn from_config(config: &ProjectConfig) -> Result<Self> {
        let root = match &config.root {
            Some(root) => root.clone(),
            None => std::env::current_dir()?,
        };
        Ok(Self::new(root).max_file_bytes(config.max_file_bytes))
    }

    pub fn max_file_bytes(mut self, bytes: u64) -> Self {
        self.max_file_bytes = bytes;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the tree synchronously. Sorted by path.
    pub fn scan(&self) -> Result<Vec<FileHandle>> {
        if !self.root.is_dir() {
            return Err(AugurError::NoWorkspace(format!(
                "project root {} is not a directory",
                self.root.display()
            )));
        }

        let root = self.root.clone();
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            // Honour .gitignore even outside a git checkout.
            .require_git(false);
        builder.filter_entry(move |entry| !is_ignored_dir(entry.path(), &root));

        let mut files = Vec::new();
        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "failed to read directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let path = entry.path();
            if let Ok(meta) = entry.metadata()
                && meta.len() > self.max_file_bytes
            {
                debug!(
                    file = %path.display(),
                    size = meta.len(),
                    limit = self.max_file_bytes,
                    "skipping large file"
                );
                continue;
            }

            if let Some(handle) = FileHandle::detect(path) {
                files.push(handle);
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        info!(root = %self.root.display(), files = files.len(), "workspace scanned");
        Ok(files)
    }
}

fn is_ignored_dir(path: &Path, root: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return false;
    };
    relative.components().any(|component| match component {
        Component::Normal(name) => {
            let name = name.to_string_lossy();
            IGNORED_DIRS.iter().any(|ignored| name.eq_ignore_ascii_case(ignored))
        }
        _ => false,
    })
}

#[async_trait]
impl ProjectFileEnumerator for WorkspaceEnumerator {
    async fn list_source_files(&self) -> Result<Vec<FileHandle>> {
        let scanner = self.clone();
        tokio::task::spawn_blocking(move || scanner.scan()).await?
    }
}
