// THEORY:
// `annotation_report` turns a saved annotation log into something a person reads.
// The log is expanded into timed rows (each behavior runs until the next start;
// the `VIDEO_END` sentinel closes the last one) and summed per behavior.
//
// The chart is a 5000 x 500 strip where every row becomes a block whose width is
// proportional to its duration. `all.jpeg` colours every block; each behavior also
// gets its own chart where only its blocks are coloured and the rest stay dark gray,
// which makes the temporal pattern of a single behavior easy to see.

use behavior_annotator::error::LogFileError;
use behavior_annotator::log_file::{self, LOG_FILE_NAME};
use behavior_annotator::{AnnotationLog, Colour, TimedBehavior};
use image::codecs::jpeg::JpegEncoder;
use image::{ImageEncoder, Rgb, RgbImage};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

pub const CHART_WIDTH: u32 = 5000;
pub const CHART_HEIGHT: u32 = 500;
pub const GRAY_LEVEL: u8 = 25;
pub const ALL_CHART: &str = "all.jpeg";
pub const SUMMARY_MARKDOWN: &str = "summary.md";
pub const SUMMARY_JSON: &str = "summary.json";

const JPEG_QUALITY: u8 = 90;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("annotation log error: {0}")]
    Log(#[from] LogFileError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("annotation log has no timed behaviors")]
    EmptyLog,
}

/// Totals for one annotated video, as written to `summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// Name of the results folder.
    pub name: String,
    pub duration_s: f64,
    /// Seconds spent in each behavior.
    pub totals_s: BTreeMap<String, f64>,
    pub segments: usize,
}

impl Summary {
    pub fn from_log(name: impl Into<String>, log: &AnnotationLog) -> Self {
        let totals_s = log
            .totals_ms()
            .into_iter()
            .map(|(behavior, total_ms)| (behavior, total_ms / 1000.0))
            .collect();
        Self {
            name: name.into(),
            duration_s: log.duration_ms().unwrap_or(0.0) / 1000.0,
            totals_s,
            segments: log.timed_behaviors().len(),
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut markdown = format!("## {}\n\n---\n\n### Stats\n#### Total time(s)\n", self.name);
        for (behavior, seconds) in &self.totals_s {
            markdown.push_str(&format!("{behavior}: {seconds:.2}\n"));
        }
        markdown
    }
}

/// Block widths in chart pixels, each duration scaled against the total and floored.
pub fn block_widths(rows: &[TimedBehavior]) -> Vec<u32> {
    let total_ms: f64 = rows.iter().map(|row| row.duration_ms).sum();
    if total_ms <= 0.0 {
        return vec![0; rows.len()];
    }
    let scale = CHART_WIDTH as f64 / total_ms;
    rows.iter()
        .map(|row| (row.duration_ms * scale).floor() as u32)
        .collect()
}

/// Behavior charts: the combined chart, then one per behavior keyed by name.
pub struct Charts {
    pub all: RgbImage,
    pub per_behavior: BTreeMap<String, RgbImage>,
}

pub fn render_charts(rows: &[TimedBehavior], colours: &HashMap<String, Colour>) -> Charts {
    let widths = block_widths(rows);
    let chart_width: u32 = widths.iter().sum();
    let gray = Rgb([GRAY_LEVEL; 3]);

    let mut all = RgbImage::new(chart_width, CHART_HEIGHT);
    let mut per_behavior: BTreeMap<String, RgbImage> = rows
        .iter()
        .map(|row| (row.name.clone(), RgbImage::from_pixel(chart_width, CHART_HEIGHT, gray)))
        .collect();

    let mut x = 0;
    for (row, width) in rows.iter().zip(widths) {
        let colour = colours.get(&row.name).copied().unwrap_or(gray);
        paint_block(&mut all, x..x + width, colour);
        if let Some(chart) = per_behavior.get_mut(&row.name) {
            paint_block(chart, x..x + width, colour);
        }
        x += width;
    }

    Charts { all, per_behavior }
}

fn paint_block(chart: &mut RgbImage, columns: std::ops::Range<u32>, colour: Colour) {
    for column in columns {
        for y in 0..chart.height() {
            chart.put_pixel(column, y, colour);
        }
    }
}

fn save_jpeg(image: &RgbImage, path: &Path) -> Result<(), ReportError> {
    let output = BufWriter::new(fs::File::create(path)?);
    let encoder = JpegEncoder::new_with_quality(output, JPEG_QUALITY);
    encoder.write_image(image.as_raw(), image.width(), image.height(), image::ExtendedColorType::Rgb8)?;
    Ok(())
}

/// Chart file name for a behavior; path separators are replaced.
pub fn chart_file_name(behavior: &str) -> String {
    let safe: String = behavior
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{safe}.jpeg")
}

/// Writes charts, `summary.md` and `summary.json` for `log` into `results_dir`.
pub fn write_report(
    results_dir: &Path,
    log: &AnnotationLog,
    colours: &HashMap<String, Colour>,
) -> Result<Summary, ReportError> {
    let rows = log.timed_behaviors();
    if rows.is_empty() {
        return Err(ReportError::EmptyLog);
    }
    let name = results_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let summary = Summary::from_log(name, log);

    // --- 1. Charts ---
    let charts = render_charts(&rows, colours);
    if charts.all.width() == 0 {
        warn!("annotated time too short to chart");
    } else {
        save_jpeg(&charts.all, &results_dir.join(ALL_CHART))?;
        for (behavior, chart) in &charts.per_behavior {
            save_jpeg(chart, &results_dir.join(chart_file_name(behavior)))?;
        }
    }

    // --- 2. Summaries ---
    fs::write(results_dir.join(SUMMARY_MARKDOWN), summary.to_markdown())?;
    let mut json = BufWriter::new(fs::File::create(results_dir.join(SUMMARY_JSON))?);
    serde_json::to_writer_pretty(&mut json, &summary)?;
    json.flush()?;

    info!(dir = %results_dir.display(), behaviors = summary.totals_s.len(), "report written");
    Ok(summary)
}

/// Loads `annotations.csv` from `results_dir` and writes its report next to it.
pub fn analyse(results_dir: &Path, colours: &HashMap<String, Colour>) -> Result<Summary, ReportError> {
    let log = log_file::load(&log_path(results_dir))?;
    write_report(results_dir, &log, colours)
}

pub fn log_path(results_dir: &Path) -> PathBuf {
    results_dir.join(LOG_FILE_NAME)
}
