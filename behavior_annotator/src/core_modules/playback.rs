// THEORY:
// The `PlaybackStateMachine` is the control core of an annotation session. It owns
// the frame pointer, the pause and pen flags, the selected behavior and the speed
// multiplier, and it is the only writer of the `AnnotationBuffer` and its
// `ProgressIndicator` shadow.
//
// Lifecycle:
//     Loading -> {Paused, Playing} <-> Seeking -> Paused
//     any -> AwaitingSaveDecision (quit key or end of video) -> Terminated
//
// Key architectural principles:
// 1.  **Ticks advance, events steer**: `tick` is the only place that talks to the
//     `FrameSource` and the only place that writes labels. `apply` merely flips
//     flags and records a pending seek for the next tick.
// 2.  **Seeking lifts the pen**: a jump always pauses and stops recording, so frames
//     that were skipped over can never be mislabelled silently.
// 3.  **Decode failure is the end of the video**: it pauses and clamps, never errors.
// 4.  **No dedicated pen-up**: selecting "no activity" records it like any behavior.
//     The pen only lifts on a seek.

use crate::core_modules::action_catalog::{ActionCatalog, Behavior, Colour, NO_ACTIVITY_COLOUR};
use crate::core_modules::annotation_buffer::AnnotationBuffer;
use crate::core_modules::frame_source::{DecodedFrame, FrameSource, VideoInfo};
use crate::core_modules::input_event::{key_label, InputEvent};
use crate::core_modules::progress_indicator::ProgressIndicator;
use crate::core_modules::segment_encoder::{self, AnnotationLog};
use image::Rgb;
use serde::Deserialize;
use std::ops::Range;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Swatch colour while the pen is up.
pub const PEN_UP_COLOUR: Colour = Rgb([0, 0, 0]);
pub const MARKER_COLOUR: Colour = Rgb([255, 255, 255]);
pub const PEN_UP_MARKER_COLOUR: Colour = Rgb([30, 30, 30]);

/// Tunable playback behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Upper bound of the speed multiplier (MAX_SPEED).
    pub max_speed: u32,
    /// Frames skipped by one jump key press.
    pub jump_size: usize,
    /// Ask for the save decision as soon as the video runs out. When false, playback
    /// rests paused on the last frame until the operator quits.
    pub prompt_at_end: bool,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            max_speed: 5,
            jump_size: 50,
            prompt_at_end: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Loading,
    Paused,
    Playing,
    Seeking,
    AwaitingSaveDecision,
    Terminated,
}

/// How long the event loop may block for a key before the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Tick again right away.
    Immediate,
    /// Wait at most this long; a key press ends the wait early.
    Interval(Duration),
    /// Block until a key arrives.
    Indefinite,
}

/// What a tick decoded.
#[derive(Debug)]
pub struct TickOutcome<P> {
    /// The newly decoded frame, if the tick advanced.
    pub frame: Option<DecodedFrame<P>>,
    /// The video ran out or failed to decode during this tick.
    pub reached_end: bool,
}

impl<P> TickOutcome<P> {
    fn idle() -> Self {
        Self {
            frame: None,
            reached_end: false,
        }
    }
}

/// Values for the status overlay. The renderer decides the pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusOverlay<'a> {
    pub frame_index: usize,
    pub frame_count: usize,
    /// Colour of the current behavior, black while the pen is up.
    pub swatch: Colour,
    /// Key of the current behavior, empty while the pen is up.
    pub key_label: String,
    pub indicator: &'a [Colour],
    /// Indicator columns of the current frame.
    pub marker: Range<usize>,
    pub marker_colour: Colour,
    pub elapsed: String,
    pub total: String,
    pub speed: u32,
    pub paused: bool,
}

#[derive(Debug, Clone)]
struct Selection {
    key: char,
    behavior: Behavior,
    colour: Colour,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Active,
    AwaitingSaveDecision,
    Terminated,
}

pub struct PlaybackStateMachine {
    catalog: ActionCatalog,
    info: VideoInfo,
    settings: PlaybackSettings,

    // --- Playback state ---
    frame_index: usize,
    position_ms: f64,
    paused: bool,
    speed: u32,
    /// Set until the first tick has run.
    loading: bool,
    /// The frame at `frame_index` has to be (re)decoded on the next tick.
    needs_frame: bool,
    pending_seek: Option<usize>,
    phase: Phase,

    // --- Recording state ---
    pen_down: bool,
    /// Valid only while the pen is down.
    selection: Option<Selection>,

    // --- Owned outputs ---
    buffer: AnnotationBuffer,
    indicator: ProgressIndicator,
    total_time: String,
}

impl PlaybackStateMachine {
    /// Starts paused with the pen up, waiting for frame 0.
    ///
    /// `info` must describe a playable video (see [`VideoInfo::is_playable`]).
    pub fn new(catalog: ActionCatalog, info: VideoInfo, settings: PlaybackSettings, indicator_length: usize) -> Self {
        let background = catalog.colour_of(catalog.no_activity()).unwrap_or(NO_ACTIVITY_COLOUR);
        let buffer = AnnotationBuffer::new(info.frame_count, catalog.no_activity());
        let indicator = ProgressIndicator::new(indicator_length, info.frame_count, background);
        let settings = PlaybackSettings {
            max_speed: settings.max_speed.max(1),
            ..settings
        };

        Self {
            total_time: string_from_time(info.duration_ms()),
            catalog,
            info,
            settings,
            frame_index: 0,
            position_ms: 0.0,
            paused: true,
            speed: 1,
            loading: true,
            needs_frame: true,
            pending_seek: None,
            phase: Phase::Active,
            pen_down: false,
            selection: None,
            buffer,
            indicator,
        }
    }

    pub fn state(&self) -> PlaybackState {
        match self.phase {
            Phase::AwaitingSaveDecision => PlaybackState::AwaitingSaveDecision,
            Phase::Terminated => PlaybackState::Terminated,
            Phase::Active if self.loading => PlaybackState::Loading,
            Phase::Active if self.pending_seek.is_some() || self.needs_frame => PlaybackState::Seeking,
            Phase::Active if self.paused => PlaybackState::Paused,
            Phase::Active => PlaybackState::Playing,
        }
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        match self.state() {
            PlaybackState::Loading | PlaybackState::Seeking | PlaybackState::Terminated => WaitPolicy::Immediate,
            PlaybackState::Playing => WaitPolicy::Interval(self.frame_delay()),
            PlaybackState::Paused | PlaybackState::AwaitingSaveDecision => WaitPolicy::Indefinite,
        }
    }

    /// `floor(1000 / fps / speed)` milliseconds, never zero.
    pub fn frame_delay(&self) -> Duration {
        let millis = (1000.0 / self.info.fps / f64::from(self.speed)).floor();
        Duration::from_millis((millis as u64).max(1))
    }

    /// Advances playback by one frame when playing (or when a frame is due after loading
    /// or seeking) and records the current behavior on the current frame.
    pub fn tick<S: FrameSource>(&mut self, source: &mut S) -> TickOutcome<S::Frame> {
        if self.phase != Phase::Active {
            return TickOutcome::idle();
        }
        self.loading = false;
        let mut outcome = TickOutcome::idle();

        // --- 1. Seek ---
        if let Some(target) = self.pending_seek.take() {
            match source.seek(target) {
                Ok(()) => self.needs_frame = true,
                Err(error) => {
                    warn!(frame = target, %error, "seek failed, treating as end of video");
                    self.end_of_video();
                    outcome.reached_end = true;
                }
            }
        }

        // --- 2. Decode ---
        if !outcome.reached_end && (self.needs_frame || !self.paused) {
            self.needs_frame = false;
            match source.read_next() {
                Ok(Some(frame)) if frame.index < self.info.frame_count => {
                    self.frame_index = frame.index;
                    self.position_ms = frame.timestamp_ms;
                    outcome.frame = Some(frame);
                }
                Ok(Some(frame)) => {
                    info!(index = frame.index, "decoder ran past the reported frame count");
                    self.end_of_video();
                    outcome.reached_end = true;
                }
                Ok(None) => {
                    info!(frame = self.frame_index, "end of video");
                    self.end_of_video();
                    outcome.reached_end = true;
                }
                Err(error) => {
                    warn!(frame = self.frame_index, %error, "decode failed, treating as end of video");
                    self.end_of_video();
                    outcome.reached_end = true;
                }
            }
        }

        // --- 3. Record ---
        if self.pen_down {
            if let Some(selection) = &self.selection {
                self.buffer.set(self.frame_index, &selection.behavior);
                self.indicator.paint(self.frame_index, selection.colour);
            }
        }

        if outcome.reached_end && self.settings.prompt_at_end {
            self.phase = Phase::AwaitingSaveDecision;
        }
        outcome
    }

    /// Applies one operator command. Ignored once the session is no longer active.
    pub fn apply(&mut self, event: InputEvent) {
        if self.phase != Phase::Active {
            return;
        }
        debug!(?event, frame = self.frame_index, "input event");

        match event {
            InputEvent::Quit => {
                info!(frame = self.frame_index, "stopped by operator");
                self.phase = Phase::AwaitingSaveDecision;
            }
            InputEvent::TogglePause => self.paused = !self.paused,
            InputEvent::SpeedUp => self.speed = (self.speed + 1).min(self.settings.max_speed),
            InputEvent::SpeedDown => self.speed = self.speed.saturating_sub(1).max(1),
            InputEvent::JumpBack => self.jump(false),
            InputEvent::JumpForward => self.jump(true),
            InputEvent::SelectBehavior { key, behavior } => {
                let colour = self.catalog.colour_of(&behavior).unwrap_or(NO_ACTIVITY_COLOUR);
                self.pen_down = true;
                self.selection = Some(Selection { key, behavior, colour });
            }
        }
    }

    /// Ends the session. With `save`, the buffer is encoded and returned; otherwise
    /// it is discarded. Either way the machine is `Terminated` afterwards.
    pub fn conclude(&mut self, save: bool) -> Option<AnnotationLog> {
        if self.phase == Phase::Terminated {
            return None;
        }
        self.phase = Phase::Terminated;
        let buffer = std::mem::take(&mut self.buffer);

        if save {
            let info = self.info;
            let log = segment_encoder::encode(buffer, |frame| info.frame_to_time_ms(frame));
            info!(segments = log.len(), "annotations saved");
            Some(log)
        } else {
            info!("annotations discarded");
            None
        }
    }

    pub fn status(&self) -> StatusOverlay<'_> {
        let (swatch, key_label, marker_colour) = match (&self.selection, self.pen_down) {
            (Some(selection), true) => (selection.colour, key_label(selection.key), MARKER_COLOUR),
            _ => (PEN_UP_COLOUR, String::new(), PEN_UP_MARKER_COLOUR),
        };

        StatusOverlay {
            frame_index: self.frame_index,
            frame_count: self.info.frame_count,
            swatch,
            key_label,
            indicator: self.indicator.cells(),
            marker: self.indicator.scaler().span(self.frame_index),
            marker_colour,
            elapsed: string_from_time(self.position_ms),
            total: self.total_time.clone(),
            speed: self.speed,
            paused: self.paused,
        }
    }

    pub fn catalog(&self) -> &ActionCatalog {
        &self.catalog
    }

    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_pen_down(&self) -> bool {
        self.pen_down
    }

    pub fn current_behavior(&self) -> Option<&Behavior> {
        self.selection
            .as_ref()
            .filter(|_| self.pen_down)
            .map(|selection| &selection.behavior)
    }

    pub fn speed(&self) -> u32 {
        self.speed
    }

    pub fn buffer(&self) -> &AnnotationBuffer {
        &self.buffer
    }

    pub fn indicator(&self) -> &ProgressIndicator {
        &self.indicator
    }

    fn jump(&mut self, forward: bool) {
        let last = self.info.frame_count.saturating_sub(1);
        let jump = self.settings.jump_size;
        let target = if forward {
            self.frame_index.saturating_add(jump).min(last)
        } else {
            self.frame_index.saturating_sub(jump)
        };
        info!(from = self.frame_index, to = target, "seek");

        self.frame_index = target;
        self.position_ms = self.info.frame_to_time_ms(target);
        self.pending_seek = Some(target);
        self.pen_down = false;
        self.selection = None;
        self.paused = true;
    }

    fn end_of_video(&mut self) {
        self.paused = true;
        self.frame_index = self.info.frame_count.saturating_sub(1);
        self.position_ms = self.info.frame_to_time_ms(self.frame_index);
    }
}

/// Formats milliseconds as `HH:MM:SS`, hours wrapping at 24.
pub fn string_from_time(time_ms: f64) -> String {
    let total_seconds = (time_ms.max(0.0) / 1000.0).floor() as u64;
    let seconds = total_seconds % 60;
    let minutes = (total_seconds / 60) % 60;
    let hours = (total_seconds / 3600) % 24;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::action_catalog::{BehaviorDescriptor, NO_ACTIVITY};
    use crate::core_modules::frame_source::testing::SyntheticSource;
    use crate::core_modules::segment_encoder::SegmentTag;
    use proptest::prelude::*;

    fn catalog() -> ActionCatalog {
        ActionCatalog::build(&[
            BehaviorDescriptor::new("groom", "g", "1.0,0,0"),
            BehaviorDescriptor::new("rear", "r", "0,1.0,0"),
        ])
        .expect("valid catalog")
    }

    fn machine(frame_count: usize, settings: PlaybackSettings) -> (PlaybackStateMachine, SyntheticSource) {
        let source = SyntheticSource::new(frame_count, 10.0);
        let machine = PlaybackStateMachine::new(catalog(), source.info(), settings, 20);
        (machine, source)
    }

    fn select(machine: &mut PlaybackStateMachine, key: char) {
        let behavior = machine.catalog().behavior_for_key(key).expect("bound key").clone();
        machine.apply(InputEvent::SelectBehavior { key, behavior });
    }

    fn labels(machine: &PlaybackStateMachine) -> Vec<String> {
        machine.buffer().as_slice().iter().map(|label| label.to_string()).collect()
    }

    #[test]
    fn first_tick_loads_frame_zero_and_stays_paused() {
        let (mut machine, mut source) = machine(10, PlaybackSettings::default());
        assert_eq!(machine.state(), PlaybackState::Loading);
        assert_eq!(machine.wait_policy(), WaitPolicy::Immediate);

        let outcome = machine.tick(&mut source);
        assert_eq!(outcome.frame.map(|frame| frame.index), Some(0));
        assert_eq!(machine.state(), PlaybackState::Paused);
        assert_eq!(machine.wait_policy(), WaitPolicy::Indefinite);

        // Paused ticks do not advance.
        assert!(machine.tick(&mut source).frame.is_none());
        assert_eq!(machine.frame_index(), 0);
    }

    #[test]
    fn playing_advances_and_records_while_pen_is_down() {
        let (mut machine, mut source) = machine(10, PlaybackSettings::default());
        machine.tick(&mut source);
        select(&mut machine, 'g');
        machine.apply(InputEvent::TogglePause);
        assert_eq!(machine.state(), PlaybackState::Playing);
        assert_eq!(machine.wait_policy(), WaitPolicy::Interval(Duration::from_millis(100)));

        for _ in 0..3 {
            machine.tick(&mut source);
        }
        assert_eq!(machine.frame_index(), 3);
        assert_eq!(
            labels(&machine)[..5],
            ["no_activity", "groom", "groom", "groom", "no_activity"]
        );
        assert_eq!(machine.status().swatch, Rgb([255, 0, 0]));
        assert_eq!(machine.status().key_label, "g");
    }

    #[test]
    fn selecting_while_paused_labels_the_current_frame_on_the_next_tick() {
        let (mut machine, mut source) = machine(10, PlaybackSettings::default());
        machine.tick(&mut source);
        select(&mut machine, 'r');
        machine.tick(&mut source);
        assert_eq!(labels(&machine)[0], "rear");
        assert_eq!(machine.frame_index(), 0);
    }

    #[test]
    fn no_activity_is_recorded_like_any_behavior() {
        let (mut machine, mut source) = machine(4, PlaybackSettings::default());
        machine.tick(&mut source);
        select(&mut machine, 'g');
        machine.apply(InputEvent::TogglePause);
        machine.tick(&mut source);
        select(&mut machine, 'z');
        machine.tick(&mut source);

        // The pen stays down: "no activity" is a label, not a lift.
        assert!(machine.is_pen_down());
        assert_eq!(machine.current_behavior().map(|b| &**b), Some(NO_ACTIVITY));
        assert_eq!(machine.status().swatch, Rgb([50, 50, 50]));
        assert_eq!(labels(&machine), ["no_activity", "groom", "no_activity", "no_activity"]);
    }

    #[test]
    fn seeking_lifts_the_pen_pauses_and_reloads() {
        let (mut machine, mut source) = machine(200, PlaybackSettings::default());
        machine.tick(&mut source);
        select(&mut machine, 'g');
        machine.apply(InputEvent::TogglePause);
        for _ in 0..60 {
            machine.tick(&mut source);
        }
        assert_eq!(machine.frame_index(), 60);

        machine.apply(InputEvent::JumpBack);
        assert_eq!(machine.frame_index(), 10);
        assert!(!machine.is_pen_down());
        assert!(machine.is_paused());
        assert_eq!(machine.current_behavior(), None);
        assert_eq!(machine.state(), PlaybackState::Seeking);
        assert_eq!(machine.wait_policy(), WaitPolicy::Immediate);
        assert_eq!(machine.status().swatch, PEN_UP_COLOUR);
        assert_eq!(machine.status().key_label, "");
        assert_eq!(machine.status().marker_colour, PEN_UP_MARKER_COLOUR);

        let outcome = machine.tick(&mut source);
        assert_eq!(outcome.frame.map(|frame| frame.index), Some(10));
        assert_eq!(source.seeks, [10]);
        assert_eq!(machine.state(), PlaybackState::Paused);
        // Nothing was written during the seek.
        assert_eq!(labels(&machine)[60], "groom");
        assert_eq!(labels(&machine)[61], "no_activity");
    }

    #[test]
    fn relabelling_after_a_seek_overwrites() {
        let (mut machine, mut source) = machine(100, PlaybackSettings { jump_size: 5, ..PlaybackSettings::default() });
        machine.tick(&mut source);
        select(&mut machine, 'g');
        machine.apply(InputEvent::TogglePause);
        for _ in 0..9 {
            machine.tick(&mut source);
        }
        machine.apply(InputEvent::JumpBack);
        machine.tick(&mut source);
        assert_eq!(machine.frame_index(), 4);
        select(&mut machine, 'r');
        machine.tick(&mut source);
        machine.apply(InputEvent::TogglePause);
        machine.tick(&mut source);
        machine.tick(&mut source);
        machine.apply(InputEvent::Quit);

        let log = machine.conclude(true).expect("saved");
        let entries: Vec<(String, f64)> = log
            .segments()
            .iter()
            .map(|segment| (segment.tag.to_string(), segment.start_ms))
            .collect();
        assert_eq!(
            entries,
            [
                ("no_activity".to_string(), 0.0),
                ("groom".to_string(), 100.0),
                ("rear".to_string(), 400.0),
                ("groom".to_string(), 700.0),
                ("no_activity".to_string(), 1000.0),
                ("VIDEO_END".to_string(), 10_000.0),
            ]
        );
    }

    #[test]
    fn jumps_clamp_to_the_video() {
        let (mut machine, mut source) = machine(30, PlaybackSettings::default());
        machine.tick(&mut source);

        machine.apply(InputEvent::JumpBack);
        assert_eq!(machine.frame_index(), 0);
        machine.tick(&mut source);

        machine.apply(InputEvent::JumpForward);
        assert_eq!(machine.frame_index(), 29);
        let outcome = machine.tick(&mut source);
        assert_eq!(outcome.frame.map(|frame| frame.index), Some(29));
        assert!(!outcome.reached_end);
    }

    #[test]
    fn end_of_video_pauses_clamps_and_prompts() {
        let (mut machine, mut source) = machine(3, PlaybackSettings::default());
        machine.tick(&mut source);
        select(&mut machine, 'g');
        machine.apply(InputEvent::TogglePause);
        machine.tick(&mut source);
        machine.tick(&mut source);
        let outcome = machine.tick(&mut source);

        assert!(outcome.reached_end);
        assert!(machine.is_paused());
        assert_eq!(machine.frame_index(), 2);
        assert_eq!(machine.state(), PlaybackState::AwaitingSaveDecision);
        assert_eq!(labels(&machine), ["no_activity", "groom", "groom"]);
    }

    #[test]
    fn end_of_video_can_rest_on_the_last_frame() {
        let settings = PlaybackSettings { prompt_at_end: false, ..PlaybackSettings::default() };
        let (mut machine, mut source) = machine(2, settings);
        machine.tick(&mut source);
        machine.apply(InputEvent::TogglePause);
        machine.tick(&mut source);
        assert!(machine.tick(&mut source).reached_end);

        assert_eq!(machine.state(), PlaybackState::Paused);
        assert_eq!(machine.frame_index(), 1);

        // Resuming at the end immediately pauses again.
        machine.apply(InputEvent::TogglePause);
        assert!(machine.tick(&mut source).reached_end);
        assert!(machine.is_paused());
    }

    #[test]
    fn failed_seeks_end_the_video() {
        let (mut machine, mut source) = machine(100, PlaybackSettings::default());
        machine.tick(&mut source);
        select(&mut machine, 'g');
        machine.apply(InputEvent::JumpForward);
        source.fail_seeks = true;

        let outcome = machine.tick(&mut source);
        assert!(outcome.reached_end);
        assert!(outcome.frame.is_none());
        assert!(machine.is_paused());
        assert!(!machine.is_pen_down());
        assert_eq!(machine.frame_index(), 99);
        assert_eq!(machine.state(), PlaybackState::AwaitingSaveDecision);
        assert!(source.seeks.is_empty());
        assert!(labels(&machine).iter().all(|label| label == NO_ACTIVITY));
    }

    #[test]
    fn decode_errors_end_the_video() {
        let (mut machine, mut source) = machine(10, PlaybackSettings::default());
        source.fail_from = Some(4);
        machine.tick(&mut source);
        machine.apply(InputEvent::TogglePause);
        for _ in 0..3 {
            machine.tick(&mut source);
        }
        let outcome = machine.tick(&mut source);
        assert!(outcome.reached_end);
        assert_eq!(machine.frame_index(), 9);
        assert_eq!(machine.state(), PlaybackState::AwaitingSaveDecision);
    }

    #[test]
    fn quitting_stops_frame_advancement() {
        let (mut machine, mut source) = machine(10, PlaybackSettings::default());
        machine.tick(&mut source);
        machine.apply(InputEvent::TogglePause);
        machine.tick(&mut source);
        machine.apply(InputEvent::Quit);

        assert_eq!(machine.state(), PlaybackState::AwaitingSaveDecision);
        assert_eq!(machine.wait_policy(), WaitPolicy::Indefinite);
        assert!(machine.tick(&mut source).frame.is_none());
        assert_eq!(machine.frame_index(), 1);

        // Commands are no longer dispatched.
        machine.apply(InputEvent::JumpForward);
        assert_eq!(machine.frame_index(), 1);
    }

    #[test]
    fn concluding_without_saving_discards() {
        let (mut machine, mut source) = machine(5, PlaybackSettings::default());
        machine.tick(&mut source);
        machine.apply(InputEvent::Quit);

        assert_eq!(machine.conclude(false), None);
        assert_eq!(machine.state(), PlaybackState::Terminated);
        assert_eq!(machine.wait_policy(), WaitPolicy::Immediate);
        assert_eq!(machine.conclude(true), None);
    }

    #[test]
    fn saved_log_of_an_untouched_session_has_two_entries() {
        let (mut machine, mut source) = machine(10, PlaybackSettings::default());
        machine.tick(&mut source);
        machine.apply(InputEvent::Quit);

        let log = machine.conclude(true).expect("saved");
        assert_eq!(log.len(), 2);
        assert_eq!(log.segments()[0].tag, SegmentTag::Behavior(NO_ACTIVITY.into()));
        assert_eq!(log.segments()[1].tag, SegmentTag::VideoEnd);
        assert_eq!(log.segments()[1].start_ms, 1000.0);
    }

    #[test]
    fn frame_delay_scales_with_speed_and_never_hits_zero() {
        let (mut machine, _) = machine(10, PlaybackSettings::default());
        assert_eq!(machine.frame_delay(), Duration::from_millis(100));
        machine.apply(InputEvent::SpeedUp);
        machine.apply(InputEvent::SpeedUp);
        assert_eq!(machine.frame_delay(), Duration::from_millis(33));

        let mut info = *machine.info();
        info.fps = 5_000.0;
        let fast = PlaybackStateMachine::new(catalog(), info, PlaybackSettings::default(), 20);
        assert_eq!(fast.frame_delay(), Duration::from_millis(1));
    }

    #[test]
    fn speed_changes_leave_frame_and_pen_alone() {
        let (mut machine, mut source) = machine(10, PlaybackSettings::default());
        machine.tick(&mut source);
        select(&mut machine, 'g');
        machine.apply(InputEvent::SpeedUp);
        assert_eq!(machine.speed(), 2);
        assert_eq!(machine.frame_index(), 0);
        assert!(machine.is_pen_down());
        assert_eq!(machine.status().speed, 2);
    }

    #[test]
    fn status_reports_times_and_marker() {
        let (mut machine, mut source) = machine(36_000, PlaybackSettings::default());
        machine.tick(&mut source);
        machine.apply(InputEvent::JumpForward);
        machine.tick(&mut source);

        let status = machine.status();
        assert_eq!(status.total, "01:00:00");
        assert_eq!(status.elapsed, "00:00:05");
        assert_eq!(status.marker, 0..1);
        assert_eq!(status.indicator.len(), 20);
        assert!(status.paused);
    }

    #[test]
    fn time_strings_wrap_hours_at_a_day() {
        assert_eq!(string_from_time(0.0), "00:00:00");
        assert_eq!(string_from_time(61_999.0), "00:01:01");
        assert_eq!(string_from_time(3_723_000.0), "01:02:03");
        assert_eq!(string_from_time(25.0 * 3_600_000.0), "01:00:00");
    }

    fn event_strategy() -> impl Strategy<Value = InputEvent> {
        prop_oneof![
            Just(InputEvent::SpeedUp),
            Just(InputEvent::SpeedDown),
            Just(InputEvent::JumpBack),
            Just(InputEvent::JumpForward),
            Just(InputEvent::TogglePause),
            Just(InputEvent::SelectBehavior { key: 'g', behavior: "groom".into() }),
        ]
    }

    proptest! {
        #[test]
        fn speed_stays_within_bounds(ups_and_downs in prop::collection::vec(any::<bool>(), 0..100)) {
            let (mut machine, _) = machine(10, PlaybackSettings::default());
            for up in ups_and_downs {
                machine.apply(if up { InputEvent::SpeedUp } else { InputEvent::SpeedDown });
                prop_assert!((1..=5).contains(&machine.speed()));
            }
        }

        #[test]
        fn jumps_stay_in_range_and_lift_the_pen(
            frame_count in 1usize..500,
            jump_size in 1usize..200,
            events in prop::collection::vec(event_strategy(), 1..60),
        ) {
            let settings = PlaybackSettings { jump_size, prompt_at_end: false, ..PlaybackSettings::default() };
            let (mut machine, mut source) = machine(frame_count, settings);
            machine.tick(&mut source);
            for event in events {
                let is_jump = matches!(event, InputEvent::JumpBack | InputEvent::JumpForward);
                machine.apply(event);
                if is_jump {
                    prop_assert!(!machine.is_pen_down());
                    prop_assert!(machine.is_paused());
                }
                prop_assert!(machine.frame_index() < frame_count);
                machine.tick(&mut source);
                prop_assert!(machine.frame_index() < frame_count);
            }
        }
    }
}
