//! Discovery of result files in an experiment tree.
//!
//! The experiment harness lays results out as
//! `<root>/<experiment>/res/<toolchain>/<reg|gh>/<package>/results.txt`.
//! This module finds those files and counts the experiments under the root.

use crate::cache::{self, Cache};
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// File written by the harness for every tested package.
pub const RESULT_FILE_NAME: &str = "results.txt";

/// Literal directory between the experiment id and the toolchain.
const RESULTS_DIR: &str = "res";

/// Components below the root: experiment, `res`, toolchain, kind, package, file.
const RESULT_DEPTH: usize = 6;

/// Scanner for the result files of an experiment tree.
pub struct ResultScanner {
    root: PathBuf,
}

impl ResultScanner {
    /// Create a scanner rooted at the directory holding all experiments.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the result file paths, from the cache when present.
    ///
    /// A cached list is returned verbatim; its contents are not checked
    /// against the filesystem.
    pub fn discover(&self, cache: &dyn Cache, key: &str) -> Result<Vec<String>> {
        if let Some(paths) = cache::get_json::<Vec<String>>(cache, key)
            .with_context(|| format!("Failed to load cached path list '{}'", key))?
        {
            info!("Using {} cached result paths from {}", paths.len(), key);
            return Ok(paths);
        }

        let paths = self.scan()?;
        cache::put_json(cache, key, &paths)
            .with_context(|| format!("Failed to store path list '{}'", key))?;
        info!("Discovered {} result files under {}", paths.len(), self.root.display());

        Ok(paths)
    }

    /// Walk the experiment root for every path matching the result layout.
    ///
    /// Symlinks are followed, so a linked experiment directory is scanned
    /// like any other. Paths with a hidden component are ignored. The list
    /// is sorted.
    pub fn scan(&self) -> Result<Vec<String>> {
        self.ensure_root()?;

        let walker = WalkDir::new(&self.root)
            .follow_links(true)
            .min_depth(RESULT_DEPTH)
            .max_depth(RESULT_DEPTH)
            .into_iter();

        let mut paths = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.matches(entry.path()) {
                continue;
            }

            match entry.path().to_str() {
                Some(path) => paths.push(path.to_string()),
                None => warn!("Skipping non UTF-8 path: {}", entry.path().display()),
            }
        }

        paths.sort();
        debug!("Scan of {} matched {} files", self.root.display(), paths.len());
        Ok(paths)
    }

    /// Check whether a path below the root has the result file layout.
    pub fn matches(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return false;
        };

        let parts: Vec<&str> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => part.to_str(),
                _ => None,
            })
            .collect();

        parts.len() == RESULT_DEPTH
            && parts[1] == RESULTS_DIR
            && parts[RESULT_DEPTH - 1] == RESULT_FILE_NAME
            && parts.iter().all(|part| !part.starts_with('.'))
    }

    /// Number of experiment directories directly below the root.
    pub fn count_experiments(&self) -> Result<usize> {
        self.ensure_root()?;

        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("Failed to list experiments in {}", self.root.display()))?;

        let mut count = 0;
        for entry in entries {
            let entry = entry
                .with_context(|| format!("Failed to list experiments in {}", self.root.display()))?;
            let name = entry.file_name();
            if name.to_string_lossy().starts_with('.') {
                continue;
            }
            if entry.path().is_dir() {
                count += 1;
            }
        }

        debug!("Found {} experiments in {}", count, self.root.display());
        Ok(count)
    }

    fn ensure_root(&self) -> Result<()> {
        if !self.root.is_dir() {
            bail!(
                "Experiment root does not exist or is not a directory: {}",
                self.root.display()
            );
        }
        Ok(())
    }
}
