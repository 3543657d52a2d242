//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.bad-crates.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".bad-crates.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Input and cache locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Where experiment results and cache artifacts live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Experiment root, containing one directory per experiment.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Directory holding the cache artifacts.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// File name of the discovered-path list.
    #[serde(default = "default_result_paths_cache")]
    pub result_paths_cache: String,

    /// File name of the path to outcome mapping.
    #[serde(default = "default_results_cache")]
    pub results_cache: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            cache_dir: default_cache_dir(),
            result_paths_cache: default_result_paths_cache(),
            results_cache: default_results_cache(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("work/ex")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_result_paths_cache() -> String {
    "result_paths.json".to_string()
}

fn default_results_cache() -> String {
    "results.json".to_string()
}

/// Skip-list output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Skip list for GitHub repositories.
    #[serde(default = "default_gh_output")]
    pub gh_output: PathBuf,

    /// Skip list for registry crates.
    #[serde(default = "default_reg_output")]
    pub reg_output: PathBuf,

    /// Optional JSON run summary.
    #[serde(default)]
    pub summary: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            gh_output: default_gh_output(),
            reg_output: default_reg_output(),
            summary: None,
        }
    }
}

fn default_gh_output() -> PathBuf {
    PathBuf::from("ghlines.toml")
}

fn default_reg_output() -> PathBuf {
    PathBuf::from("reglines.toml")
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given explicitly on the command line override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref root) = args.root {
            self.paths.root = root.clone();
        }
        if let Some(ref cache_dir) = args.cache_dir {
            self.paths.cache_dir = cache_dir.clone();
        }
        if let Some(ref gh_output) = args.gh_output {
            self.output.gh_output = gh_output.clone();
        }
        if let Some(ref reg_output) = args.reg_output {
            self.output.reg_output = reg_output.clone();
        }
        if let Some(ref summary) = args.summary {
            self.output.summary = Some(summary.clone());
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::tests::make_args;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.paths.root, PathBuf::from("work/ex"));
        assert_eq!(config.paths.result_paths_cache, "result_paths.json");
        assert_eq!(config.paths.results_cache, "results.json");
        assert_eq!(config.output.gh_output, PathBuf::from("ghlines.toml"));
        assert_eq!(config.output.reg_output, PathBuf::from("reglines.toml"));
        assert!(config.output.summary.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[paths]
root = "/srv/crater/work/ex"
cache_dir = "cache"

[output]
reg_output = "out/reg.toml"
summary = "out/summary.json"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.paths.root, PathBuf::from("/srv/crater/work/ex"));
        assert_eq!(config.paths.cache_dir, PathBuf::from("cache"));
        assert_eq!(config.paths.results_cache, "results.json");
        assert_eq!(config.output.gh_output, PathBuf::from("ghlines.toml"));
        assert_eq!(config.output.reg_output, PathBuf::from("out/reg.toml"));
        assert_eq!(
            config.output.summary,
            Some(PathBuf::from("out/summary.json"))
        );
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[paths]"));
        assert!(toml_str.contains("[output]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_merge_only_overrides_given_args() {
        let mut config = Config::default();
        config.paths.cache_dir = PathBuf::from("from-file");

        let mut args = make_args();
        args.root = Some(PathBuf::from("elsewhere/ex"));
        args.gh_output = Some(PathBuf::from("gh.toml"));
        config.merge_with_args(&args);

        assert_eq!(config.paths.root, PathBuf::from("elsewhere/ex"));
        assert_eq!(config.paths.cache_dir, PathBuf::from("from-file"));
        assert_eq!(config.output.gh_output, PathBuf::from("gh.toml"));
        assert_eq!(config.output.reg_output, PathBuf::from("reglines.toml"));
    }
}
