// THEORY:
// The highgui surface draws what the playback state machine describes and nothing
// more. Every frame is composed fresh: the decoded image gets a 100 px status bar
// underneath carrying the current-behavior swatch and key, the coloured progress
// bar with its position marker, the speed multiplier and the elapsed/total time.
// A pause glyph is drawn over the middle while paused. A second, static window
// shows the legend of keys.
//
// Colours arrive as RGB and are swapped to OpenCV's BGR order at the last moment.

use behavior_annotator::core_modules::input_event::key_label;
use behavior_annotator::error::DisplayError;
use behavior_annotator::{Colour, ControlKeys, KeyInput, LegendEntry, StatusOverlay, Surface, VideoInfo, WaitPolicy};
use opencv::{
    core::{self, Mat, Point, Rect, Scalar},
    highgui, imgproc,
    prelude::*,
};
use std::ops::Range;
use tracing::warn;

pub const FRAME_WINDOW: &str = "frame";
pub const LEGEND_WINDOW: &str = "legend";

/// Largest window edge; bigger videos are scaled down to fit.
pub const WINDOW_MAX: u32 = 1000;

const STATUS_BAR_HEIGHT: i32 = 100;
const BAR_MARGIN: i32 = 10;
const SWATCH_SIZE: i32 = 50;
const SWATCH_OFFSET: i32 = 10;
const PROGRESS_HEIGHT: i32 = 20;
const PROGRESS_OFFSET: i32 = 30;
const MARKER_HEIGHT: i32 = 5;
const TEXT_OFFSET: i32 = 30;
const TIME_OFFSET: i32 = 180;
const SPEED_OFFSET: i32 = 230;

const PAUSE_HALF_HEIGHT: i32 = 20;
const PAUSE_NEAR: i32 = 12;
const PAUSE_FAR: i32 = 40;

const LEGEND_WIDTH: i32 = 600;
const LEGEND_ROW: i32 = 60;
const LEGEND_FOOTER: i32 = 120;

const SAVE_PROMPT_OFFSET: i32 = 100;
const SAVE_PROMPT_SPACING: i32 = 50;

fn black() -> Scalar {
    Scalar::all(0.0)
}

fn white() -> Scalar {
    Scalar::all(255.0)
}

/// RGB colour to an OpenCV BGR scalar.
pub fn scalar(colour: Colour) -> Scalar {
    let [r, g, b] = colour.0;
    Scalar::new(b as f64, g as f64, r as f64, 0.0)
}

/// Window dimensions for a canvas, scaled so neither edge exceeds `WINDOW_MAX`.
pub fn window_size(width: u32, height: u32) -> (i32, i32) {
    let max = WINDOW_MAX as f64;
    let (width, height) = (width as f64, height as f64);
    let (w, h) = if width > max {
        (max, max / width * height)
    } else if height > max {
        (max / height * width, max)
    } else {
        (width, height)
    };
    (w as i32, h as i32)
}

/// Collapses indicator cells into runs of one colour, one rectangle each.
pub fn indicator_runs(cells: &[Colour]) -> Vec<(Range<usize>, Colour)> {
    let mut runs: Vec<(Range<usize>, Colour)> = Vec::new();
    for (index, colour) in cells.iter().enumerate() {
        match runs.last_mut() {
            Some((run, current)) if current == colour => run.end = index + 1,
            _ => runs.push((index..index + 1, *colour)),
        }
    }
    runs
}

/// One-based frame position, as shown in the status bar.
pub fn frame_counter(frame_index: usize, frame_count: usize) -> String {
    format!("frame {}/{}", frame_index + 1, frame_count)
}

fn fill(canvas: &mut Mat, rect: Rect, colour: Scalar) -> opencv::Result<()> {
    imgproc::rectangle(canvas, rect, colour, imgproc::FILLED, imgproc::LINE_8, 0)
}

fn text(canvas: &mut Mat, content: &str, origin: Point, scale: f64, colour: Scalar, thickness: i32) -> opencv::Result<()> {
    imgproc::put_text(
        canvas,
        content,
        origin,
        imgproc::FONT_HERSHEY_PLAIN,
        scale,
        colour,
        thickness,
        imgproc::LINE_8,
        false,
    )
}

fn backend(error: opencv::Error) -> DisplayError {
    DisplayError::backend(error.to_string())
}

/// The operator's window pair: the annotated frame and the key legend.
pub struct HighGuiSurface {
    info: VideoInfo,
    shown: bool,
    released: bool,
}

impl HighGuiSurface {
    pub fn open(info: &VideoInfo, legend: &[LegendEntry], controls: &ControlKeys) -> Result<Self, DisplayError> {
        let (width, height) = window_size(info.width, info.height + STATUS_BAR_HEIGHT as u32);
        highgui::named_window(FRAME_WINDOW, highgui::WINDOW_NORMAL).map_err(backend)?;
        highgui::resize_window(FRAME_WINDOW, width, height).map_err(backend)?;

        let legend = legend_image(legend, controls).map_err(backend)?;
        highgui::imshow(LEGEND_WINDOW, &legend).map_err(backend)?;
        highgui::move_window(LEGEND_WINDOW, width, 0).map_err(backend)?;

        Ok(Self {
            info: *info,
            shown: false,
            released: false,
        })
    }

    fn ensure_visible(&self) -> Result<(), DisplayError> {
        if !self.shown {
            return Ok(());
        }
        let visible = highgui::get_window_property(FRAME_WINDOW, highgui::WND_PROP_VISIBLE).map_err(backend)?;
        if visible < 1.0 {
            return Err(DisplayError::SurfaceLost);
        }
        Ok(())
    }

    fn compose(&self, frame: Option<&Mat>, status: &StatusOverlay<'_>) -> opencv::Result<Mat> {
        let blank;
        let frame = match frame {
            Some(frame) => frame,
            None => {
                blank = Mat::new_rows_cols_with_default(
                    self.info.height as i32,
                    self.info.width as i32,
                    core::CV_8UC3,
                    black(),
                )?;
                &blank
            }
        };

        // --- 1. Status Bar ---
        let mut canvas = Mat::default();
        core::copy_make_border(frame, &mut canvas, 0, STATUS_BAR_HEIGHT, 0, 0, core::BORDER_CONSTANT, black())?;
        let width = canvas.cols();
        let video_height = canvas.rows() - STATUS_BAR_HEIGHT;
        fill(&mut canvas, Rect::new(0, video_height, width, 1), white())?;

        // --- 2. Current Behavior ---
        let swatch_top = canvas.rows() - SWATCH_OFFSET - SWATCH_SIZE;
        fill(&mut canvas, Rect::new(BAR_MARGIN, swatch_top, SWATCH_SIZE, SWATCH_SIZE), scalar(status.swatch))?;
        text(&mut canvas, &status.key_label, Point::new(BAR_MARGIN + 15, swatch_top + 32), 2.0, black(), 2)?;

        // --- 3. Progress Bar & Marker ---
        let bar_top = video_height + PROGRESS_OFFSET - PROGRESS_HEIGHT;
        for (run, colour) in indicator_runs(status.indicator) {
            let rect = Rect::new(BAR_MARGIN + run.start as i32, bar_top, run.len() as i32, PROGRESS_HEIGHT);
            fill(&mut canvas, rect, scalar(colour))?;
        }
        let marker_x = BAR_MARGIN + status.marker.start as i32;
        let marker_width = (status.marker.len() as i32).max(1);
        let marker = scalar(status.marker_colour);
        fill(&mut canvas, Rect::new(marker_x, bar_top - MARKER_HEIGHT, marker_width, MARKER_HEIGHT), marker)?;
        fill(&mut canvas, Rect::new(marker_x, bar_top + PROGRESS_HEIGHT, marker_width, MARKER_HEIGHT), marker)?;

        // --- 4. Frame, Speed & Time ---
        let text_y = video_height + STATUS_BAR_HEIGHT - TEXT_OFFSET;
        let counter = frame_counter(status.frame_index, status.frame_count);
        let counter_x = BAR_MARGIN + SWATCH_SIZE + BAR_MARGIN;
        text(&mut canvas, &counter, Point::new(counter_x, text_y), 1.0, white(), 1)?;
        let speed = format!("| x{} |", status.speed);
        text(&mut canvas, &speed, Point::new(width - SPEED_OFFSET, text_y), 1.0, white(), 1)?;
        let time = format!("{} / {}", status.elapsed, status.total);
        text(&mut canvas, &time, Point::new(width - TIME_OFFSET, text_y), 1.0, white(), 1)?;

        // --- 5. Pause Glyph ---
        if status.paused {
            let (centre_x, centre_y) = (width / 2, canvas.rows() / 2);
            let bar_width = PAUSE_FAR - PAUSE_NEAR;
            let top = centre_y - PAUSE_HALF_HEIGHT;
            let height = 2 * PAUSE_HALF_HEIGHT;
            fill(&mut canvas, Rect::new(centre_x - PAUSE_FAR, top, bar_width, height), white())?;
            fill(&mut canvas, Rect::new(centre_x + PAUSE_NEAR, top, bar_width, height), white())?;
        }

        Ok(canvas)
    }

    fn show(&mut self, canvas: &Mat) -> Result<(), DisplayError> {
        self.ensure_visible()?;
        highgui::imshow(FRAME_WINDOW, canvas).map_err(backend)?;
        self.shown = true;
        Ok(())
    }
}

impl Surface<Mat> for HighGuiSurface {
    fn render(&mut self, frame: Option<&Mat>, status: &StatusOverlay<'_>) -> Result<(), DisplayError> {
        let canvas = self.compose(frame, status).map_err(backend)?;
        self.show(&canvas)
    }

    fn prompt_save(&mut self, frame: Option<&Mat>, status: &StatusOverlay<'_>, save_key: char) -> Result<(), DisplayError> {
        let mut canvas = self.compose(frame, status).map_err(backend)?;
        let top = self.info.height as i32 / 2 + SAVE_PROMPT_OFFSET;
        let lines = [
            format!("Press '{}' to save and", key_label(save_key)),
            "any other key to quit.".to_string(),
        ];
        for (row, line) in lines.iter().enumerate() {
            let origin = Point::new(BAR_MARGIN, top + row as i32 * SAVE_PROMPT_SPACING);
            text(&mut canvas, line, origin, 2.0, white(), 2).map_err(backend)?;
        }
        self.show(&canvas)
    }

    fn wait_key(&mut self, policy: WaitPolicy) -> Result<KeyInput, DisplayError> {
        // highgui treats a zero delay as "wait forever".
        let delay = match policy {
            WaitPolicy::Immediate => 1,
            WaitPolicy::Interval(interval) => interval.as_millis().clamp(1, i32::MAX as u128) as i32,
            WaitPolicy::Indefinite => 0,
        };
        let code = highgui::wait_key(delay).map_err(backend)?;
        if code < 0 {
            self.ensure_visible()?;
            return Ok(KeyInput::Timeout);
        }
        Ok(KeyInput::Key(char::from((code & 0xFF) as u8)))
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(error) = highgui::destroy_all_windows() {
            warn!(%error, "failed to close windows");
        }
    }
}

fn legend_image(entries: &[LegendEntry], controls: &ControlKeys) -> opencv::Result<Mat> {
    let rows = entries.len() as i32 * LEGEND_ROW + LEGEND_FOOTER;
    let mut legend = Mat::new_rows_cols_with_default(rows, LEGEND_WIDTH, core::CV_8UC3, white())?;

    for (index, entry) in entries.iter().enumerate() {
        let top = index as i32 * LEGEND_ROW;
        fill(&mut legend, Rect::new(5, top + 5, 50, 50), black())?;
        fill(&mut legend, Rect::new(6, top + 6, 48, 48), scalar(entry.colour))?;
        let description = format!("{}  {}", entry.key, entry.label);
        text(&mut legend, &description, Point::new(18, top + 40), 2.0, black(), 2)?;
    }

    let last_row = (entries.len() as i32 - 1).max(0) * LEGEND_ROW;
    let pause = format!("Press {} to toggle pause.", key_label(controls.pause));
    text(&mut legend, &pause, Point::new(5, last_row + 100), 2.0, black(), 2)?;
    let quit = format!("Press {} to quit.", key_label(controls.quit));
    text(&mut legend, &quit, Point::new(5, last_row + 150), 2.0, black(), 2)?;
    Ok(legend)
}
