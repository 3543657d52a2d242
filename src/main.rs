//! bad-crates - skip-list generator for crater experiments
//!
//! Reads the per-crate results of past crater experiments, finds the crates
//! and repositories that failed the same way every time they were tested,
//! and writes configuration lines that skip them in future runs.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Error (unreadable results, unknown outcome or layout, bad config, etc.)

mod analysis;
mod cache;
mod cli;
mod config;
mod errors;
mod loader;
mod models;
mod pipeline;
mod report;
mod scanner;

use anyhow::{Context, Result};
use cache::{Cache, FsCache, MemoryCache};
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use pipeline::{PipelineOptions, PipelineOutput};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("bad-crates v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(&args) {
        error!("Run failed: {:#}", e);
        eprintln!("\nError: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .bad-crates.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("Created {} with default settings.", DEFAULT_CONFIG_FILE);
    Ok(())
}

/// Initialize logging based on RUST_LOG or the verbosity settings.
fn init_logging(args: &Args) {
    let directives = std::env::var("RUST_LOG").ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(args.log_filter(directives.as_deref()))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the whole pipeline and write or print its outputs.
fn run(args: &Args) -> Result<()> {
    let start_time = Instant::now();

    let mut config = load_config(args)?;
    config.merge_with_args(args);

    let options = PipelineOptions {
        refresh: args.refresh,
        show_progress: !args.quiet,
    };

    let cache: Box<dyn Cache> = if args.no_cache {
        info!("Caching disabled, reading every result file");
        Box::new(MemoryCache::new())
    } else {
        Box::new(FsCache::new(&config.paths.cache_dir))
    };

    let output = pipeline::run(&config, cache.as_ref(), &options)?;

    if args.dry_run {
        print_skip_lists(&output);
        pipeline::write_summary(&config, &output)?;
    } else {
        pipeline::write_outputs(&config, &output)?;
    }

    if !args.quiet {
        print_summary(&config, &output, args.dry_run);
    }
    debug!("Finished in {:.1}s", start_time.elapsed().as_secs_f64());

    Ok(())
}

/// Print both skip lists to stdout (--dry-run).
fn print_skip_lists(output: &PipelineOutput) {
    println!("# github-repos");
    for line in output.github_lines() {
        println!("{}", line);
    }
    println!("\n# crates");
    for line in output.registry_lines() {
        println!("{}", line);
    }
}

fn print_summary(config: &Config, output: &PipelineOutput, dry_run: bool) {
    let summary = &output.summary;

    eprintln!("\nSummary:");
    eprintln!(
        "   Experiments: {} (packages must fail {} times)",
        summary.metadata.experiments, summary.metadata.expected_total
    );
    eprintln!(
        "   Results: {} in {} groups",
        summary.metadata.result_entries, summary.stats.groups
    );
    eprintln!(
        "   Excluded: {} mixed | {} passing | {} count mismatch | {} unsplittable",
        summary.stats.ambiguous,
        summary.stats.passing,
        summary.stats.count_mismatch,
        summary.dropped.len()
    );

    if dry_run {
        eprintln!(
            "   Would skip {} repos and {} crates",
            summary.github_entries, summary.registry_entries
        );
    } else {
        eprintln!(
            "   {} repos -> {}",
            summary.github_entries,
            config.output.gh_output.display()
        );
        eprintln!(
            "   {} crates -> {}",
            summary.registry_entries,
            config.output.reg_output.display()
        );
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}
