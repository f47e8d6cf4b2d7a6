mod display;
mod video;

use anyhow::{bail, Context, Result};
use behavior_annotator::log_file::{self, LOG_FILE_NAME};
use behavior_annotator::config::find_default_config;
use behavior_annotator::{AnnotatorConfig, FrameSource, Session};
use clap::Parser;
use display::HighGuiSurface;
use std::fs;
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use video::OpenCvSource;

#[derive(Debug, Parser)]
#[command(name = "annotate")]
#[command(about = "Frame-by-frame behavior annotation of recorded video", long_about = None)]
struct Cli {
    /// Video file to annotate
    #[arg(value_name = "VIDEO")]
    video: PathBuf,

    /// Behavior catalog and playback settings
    /// (default: config/default_config.toml beside the executable, else in the working directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Folder that receives one results folder per annotation
    #[arg(short, long, value_name = "DIR", default_value = "results")]
    results: PathBuf,

    /// Name of the results folder, the video's file stem by default
    #[arg(short, long)]
    name: Option<String>,

    /// Write charts and summaries after saving
    #[arg(long)]
    report: bool,
}

fn main() -> Result<()> {
    // --- 1. Argument Parsing & Logging ---
    let cli = Cli::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    // --- 2. Configuration ---
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| find_default_config(env::current_exe().ok().as_deref()));
    let config = AnnotatorConfig::load(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    let catalog = config.catalog()?;
    let colours = catalog.colour_map();

    // --- 3. Results Location ---
    // Checked up front so a finished session is never lost to a name clash.
    let name = match cli.name {
        Some(name) => name,
        None => cli
            .video
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    if name.trim().is_empty() {
        bail!("please specify a valid results name");
    }
    let results_dir = cli.results.join(&name);
    if results_dir.exists() {
        bail!("results folder {} already exists", results_dir.display());
    }

    // --- 4. Video & Windows ---
    let source = OpenCvSource::open(&cli.video)
        .with_context(|| format!("opening video {}", cli.video.display()))?;
    let surface = HighGuiSurface::open(&source.info(), &catalog.legend(&config.controls), &config.controls)?;

    // --- 5. Annotation ---
    let session = Session::open(source, surface, catalog, config.controls, config.playback)
        .context("video didn't load")?;
    let Some(log) = session.run()? else {
        return Ok(());
    };

    // --- 6. Save ---
    fs::create_dir_all(&results_dir)
        .with_context(|| format!("creating {}", results_dir.display()))?;
    let log_path = results_dir.join(LOG_FILE_NAME);
    log_file::save(&log, &log_path).with_context(|| format!("writing {}", log_path.display()))?;
    info!(path = %log_path.display(), segments = log.len(), "annotations written");

    // --- 7. Report ---
    if cli.report {
        annotation_report::write_report(&results_dir, &log, &colours)?;
    }
    Ok(())
}
