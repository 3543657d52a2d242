//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// bad-crates - find crates that fail in every crater experiment
///
/// Scans the results of past crater experiments, groups them by crate and
/// repository, and writes skip lists for the ones that failed identically
/// every time they were tested.
///
/// Examples:
///   bad-crates
///   bad-crates --root /srv/crater/work/ex --summary summary.json
///   bad-crates --refresh --dry-run
///   bad-crates --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Experiment root containing one directory per experiment
    ///
    /// Defaults to `work/ex` or the value from the configuration file.
    #[arg(long, value_name = "DIR", env = "BAD_CRATES_ROOT")]
    pub root: Option<PathBuf>,

    /// Directory holding the result_paths.json and results.json caches
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Output file for the GitHub repository skip list
    #[arg(long, value_name = "FILE")]
    pub gh_output: Option<PathBuf>,

    /// Output file for the registry crate skip list
    #[arg(long, value_name = "FILE")]
    pub reg_output: Option<PathBuf>,

    /// Also write a JSON summary of the run (written on --dry-run too)
    #[arg(long, value_name = "FILE")]
    pub summary: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .bad-crates.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Delete both caches before running, forcing a full rescan
    #[arg(long, conflicts_with = "no_cache")]
    pub refresh: bool,

    /// Neither read nor write cache artifacts
    #[arg(long)]
    pub no_cache: bool,

    /// Print the skip lists instead of writing the output files
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .bad-crates.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let (Some(gh), Some(reg)) = (&self.gh_output, &self.reg_output) {
            if gh == reg {
                return Err(format!(
                    "--gh-output and --reg-output must differ (both are {})",
                    gh.display()
                ));
            }
        }

        if let Some(ref root) = self.root {
            if root.exists() && !root.is_dir() {
                return Err(format!(
                    "Experiment root is not a directory: {}",
                    root.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Log filter for the subscriber.
    ///
    /// Non-empty `RUST_LOG`-style directives take precedence over the
    /// verbosity flags.
    pub fn log_filter(&self, directives: Option<&str>) -> EnvFilter {
        directives
            .filter(|d| !d.trim().is_empty())
            .and_then(|d| EnvFilter::try_new(d).ok())
            .unwrap_or_else(|| {
                EnvFilter::default().add_directive(LevelFilter::from_level(self.log_level()).into())
            })
    }
}
