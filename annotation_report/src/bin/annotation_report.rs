use anyhow::{Context, Result};
use annotation_report::analyse;
use behavior_annotator::AnnotatorConfig;
use behavior_annotator::config::find_default_config;
use clap::Parser;
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "annotation_report")]
#[command(about = "Charts and totals for a saved annotation", long_about = None)]
struct Cli {
    /// Results folder holding annotations.csv
    #[arg(value_name = "RESULTS_DIR")]
    results_dir: PathBuf,

    /// Behavior catalog used for chart colours
    /// (default: config/default_config.toml beside the executable, else in the working directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    // --- 1. Argument Parsing & Logging ---
    let cli = Cli::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    // --- 2. Colours ---
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| find_default_config(env::current_exe().ok().as_deref()));
    let config = AnnotatorConfig::load(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    let colours = config.catalog()?.colour_map();

    // --- 3. Report ---
    let summary = analyse(&cli.results_dir, &colours)
        .with_context(|| format!("analysing {}", cli.results_dir.display()))?;
    for (behavior, seconds) in &summary.totals_s {
        info!(behavior = %behavior, seconds = *seconds, "total time");
    }
    Ok(())
}
