//! The discover, load, aggregate and classify stages run end to end.

use crate::analysis::{aggregate, classify, expected_total, Classification};
use crate::cache::Cache;
use crate::config::Config;
use crate::loader::{self, LoadOptions};
use crate::models::{RunMetadata, RunSummary};
use crate::report;
use crate::scanner::ResultScanner;
use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

/// Switches for one run.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Forget both cache artifacts before starting.
    pub refresh: bool,
    /// Show a progress bar while reading result files.
    pub show_progress: bool,
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub classification: Classification,
    pub summary: RunSummary,
}

impl PipelineOutput {
    pub fn github_lines(&self) -> Vec<String> {
        self.classification.github_lines()
    }

    pub fn registry_lines(&self) -> Vec<String> {
        self.classification.registry_lines()
    }
}

/// Run every stage against `config`, memoizing intermediate artifacts in `cache`.
///
/// Nothing is written besides cache artifacts; see [`write_outputs`].
pub fn run(config: &Config, cache: &dyn Cache, options: &PipelineOptions) -> Result<PipelineOutput> {
    let paths_key = config.paths.result_paths_cache.as_str();
    let results_key = config.paths.results_cache.as_str();

    if options.refresh {
        info!("Refreshing caches");
        cache
            .invalidate(paths_key)
            .with_context(|| format!("Failed to invalidate '{}'", paths_key))?;
        cache
            .invalidate(results_key)
            .with_context(|| format!("Failed to invalidate '{}'", results_key))?;
    }

    let scanner = ResultScanner::new(&config.paths.root);
    let paths = scanner.discover(cache, paths_key)?;

    let load_options = LoadOptions {
        show_progress: options.show_progress,
    };
    let results = loader::load_results(&paths, cache, results_key, &load_options)?;

    let groups = aggregate(&results)?;

    let experiments = scanner.count_experiments()?;
    let expected = expected_total(experiments);
    info!(
        "{} experiments: a package must fail {} times to be listed",
        experiments, expected
    );

    let classification = classify(&groups, expected);

    let summary = RunSummary {
        metadata: RunMetadata {
            generated_at: Utc::now(),
            root: scanner.root().display().to_string(),
            experiments,
            expected_total: expected,
            result_entries: groups.entries(),
        },
        stats: classification.stats.clone(),
        github_entries: classification.github.len(),
        registry_entries: classification.registry.len(),
        dropped: classification.dropped.clone(),
    };

    Ok(PipelineOutput {
        classification,
        summary,
    })
}

/// Write both skip lists and, if configured, the JSON summary.
pub fn write_outputs(config: &Config, output: &PipelineOutput) -> Result<()> {
    report::write_skip_list(&config.output.gh_output, &output.github_lines())?;
    report::write_skip_list(&config.output.reg_output, &output.registry_lines())?;
    write_summary(config, output)
}

/// Write the JSON summary if one is configured.
pub fn write_summary(config: &Config, output: &PipelineOutput) -> Result<()> {
    if let Some(ref path) = config.output.summary {
        report::write_json_summary(&output.summary, path)?;
    }
    Ok(())
}
