//! Loading of result files into a directory to outcome mapping.

use crate::cache::{self, Cache};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Raw result text keyed by the directory that held `results.txt`.
pub type ResultMap = BTreeMap<String, String>;

/// Options for loading result files.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Whether to show a progress bar while reading.
    pub show_progress: bool,
}

/// Return the result mapping, from the cache when present.
///
/// On a cache miss every path is read and the mapping is stored only once
/// all reads succeeded. An unreadable file aborts the load and leaves the
/// cache untouched.
pub fn load_results(
    paths: &[String],
    cache: &dyn Cache,
    key: &str,
    options: &LoadOptions,
) -> Result<ResultMap> {
    if let Some(results) = cache::get_json::<ResultMap>(cache, key)
        .with_context(|| format!("Failed to load cached results '{}'", key))?
    {
        info!("Using {} cached results from {}", results.len(), key);
        return Ok(results);
    }

    let results = read_results(paths, options)?;
    cache::put_json(cache, key, &results)
        .with_context(|| format!("Failed to store results '{}'", key))?;
    info!("Read {} result files", results.len());

    Ok(results)
}

/// Read every result file without consulting any cache.
pub fn read_results(paths: &[String], options: &LoadOptions) -> Result<ResultMap> {
    let progress = options.show_progress.then(|| progress_bar(paths.len() as u64));

    let mut results = ResultMap::new();
    for path in paths {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read result file {}", path))?;
        results.insert(result_dir(path), content);

        if let Some(ref pb) = progress {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    debug!("Loaded {} results from {} paths", results.len(), paths.len());
    Ok(results)
}

/// The directory part of a result file path.
pub fn result_dir(path: &str) -> String {
    Path::new(path)
        .parent()
        .and_then(|dir| dir.to_str())
        .unwrap_or(path)
        .to_string()
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} results ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) -> String {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn test_result_dir_strips_file_name() {
        assert_eq!(
            result_dir("work/ex/a/res/stable/reg/foo-1.0.0/results.txt"),
            "work/ex/a/res/stable/reg/foo-1.0.0"
        );
    }

    #[test]
    fn test_load_reads_and_caches() {
        let temp = TempDir::new().unwrap();
        let a = write(temp.path(), "a/res/t/reg/foo-1.0.0/results.txt", "build-fail");
        let b = write(temp.path(), "a/res/t/gh/o.r.abc/results.txt", "test-pass\n");

        let cache = MemoryCache::new();
        let results = load_results(
            &[a.clone(), b.clone()],
            &cache,
            "results.json",
            &LoadOptions::default(),
        )
        .unwrap();

        assert_eq!(results.get(&result_dir(&a)).map(String::as_str), Some("build-fail"));
        assert_eq!(results.get(&result_dir(&b)).map(String::as_str), Some("test-pass\n"));

        let cached: ResultMap = cache::get_json(&cache, "results.json").unwrap().unwrap();
        assert_eq!(cached, results);
    }

    #[test]
    fn test_cached_results_skip_reading() {
        let cache = MemoryCache::new();
        cache
            .put("results.json", "{\"x/reg/foo-1.0.0\":\"test-fail\"}")
            .unwrap();

        // The path does not exist, so reading it would fail
        let results = load_results(
            &["does/not/exist/results.txt".to_string()],
            &cache,
            "results.json",
            &LoadOptions::default(),
        )
        .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results["x/reg/foo-1.0.0"], "test-fail");
    }

    #[test]
    fn test_failed_read_leaves_no_cache() {
        let temp = TempDir::new().unwrap();
        let good = write(temp.path(), "a/res/t/reg/foo-1.0.0/results.txt", "build-fail");
        let missing = temp
            .path()
            .join("a/res/t/reg/bar-1.0.0/results.txt")
            .to_str()
            .unwrap()
            .to_string();

        let cache = MemoryCache::new();
        let err = load_results(&[good, missing.clone()], &cache, "results.json", &LoadOptions::default())
            .unwrap_err();

        assert!(format!("{:#}", err).contains(&missing));
        assert!(cache.get("results.json").unwrap().is_none());
    }
}
