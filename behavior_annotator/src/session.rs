// THEORY:
// The `session` module is the top-level API of the annotation engine. A `Session`
// owns everything one annotation pass needs: the frame source, the display surface,
// the playback state machine (and through it the catalog, buffer and indicator) and
// the last decoded frame. There is no ambient state; dropping the session drops it all.
//
// The event loop is single-threaded and strictly sequential:
//     tick -> render -> wait for a key (per `WaitPolicy`) -> dispatch
// until the state machine asks for the save decision. Then exactly one more key is
// read, without timeout, and the buffer is either encoded or discarded. The source
// and the surface are released on every exit path.

use crate::core_modules::action_catalog::ActionCatalog;
use crate::core_modules::frame_source::{DecodedFrame, FrameSource, VideoInfo};
use crate::core_modules::input_event::{classify, ControlKeys, KeyInput};
use crate::core_modules::playback::{PlaybackSettings, PlaybackState, PlaybackStateMachine, StatusOverlay, WaitPolicy};
use crate::core_modules::segment_encoder::AnnotationLog;
use crate::error::{DecodeError, DisplayError, SessionError};
use tracing::{error, info};

/// Horizontal margin on each side of the progress bar, in pixels.
pub const PROGRESS_MARGIN: u32 = 10;

/// The rendering and key-input side of a session, typically one toolkit window.
pub trait Surface<F> {
    /// Columns available to the progress indicator.
    fn indicator_length(&self, info: &VideoInfo) -> usize {
        info.width.saturating_sub(2 * PROGRESS_MARGIN) as usize
    }

    /// Shows `frame` (the last one decoded, if any) with the status overlay.
    fn render(&mut self, frame: Option<&F>, status: &StatusOverlay<'_>) -> Result<(), DisplayError>;

    /// Shows the final state with a prompt to press `save_key` to keep the annotations.
    fn prompt_save(&mut self, frame: Option<&F>, status: &StatusOverlay<'_>, save_key: char) -> Result<(), DisplayError>;

    /// Blocks according to `policy`; a key press ends any wait early.
    fn wait_key(&mut self, policy: WaitPolicy) -> Result<KeyInput, DisplayError>;

    /// Tears the surface down. Called exactly once when the session ends.
    fn release(&mut self) {}
}

impl<F, T: Surface<F> + ?Sized> Surface<F> for &mut T {
    fn indicator_length(&self, info: &VideoInfo) -> usize {
        (**self).indicator_length(info)
    }

    fn render(&mut self, frame: Option<&F>, status: &StatusOverlay<'_>) -> Result<(), DisplayError> {
        (**self).render(frame, status)
    }

    fn prompt_save(&mut self, frame: Option<&F>, status: &StatusOverlay<'_>, save_key: char) -> Result<(), DisplayError> {
        (**self).prompt_save(frame, status, save_key)
    }

    fn wait_key(&mut self, policy: WaitPolicy) -> Result<KeyInput, DisplayError> {
        (**self).wait_key(policy)
    }

    fn release(&mut self) {
        (**self).release()
    }
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    type Frame = S::Frame;

    fn info(&self) -> VideoInfo {
        (**self).info()
    }

    fn read_next(&mut self) -> Result<Option<DecodedFrame<Self::Frame>>, DecodeError> {
        (**self).read_next()
    }

    fn seek(&mut self, frame: usize) -> Result<(), DecodeError> {
        (**self).seek(frame)
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// One annotation pass over one video.
pub struct Session<S: FrameSource, D: Surface<S::Frame>> {
    source: S,
    surface: D,
    playback: PlaybackStateMachine,
    controls: ControlKeys,
    last_frame: Option<S::Frame>,
}

impl<S: FrameSource, D: Surface<S::Frame>> Session<S, D> {
    /// Prepares a session. Fails, releasing both resources, if the video is empty.
    pub fn open(
        mut source: S,
        mut surface: D,
        catalog: ActionCatalog,
        controls: ControlKeys,
        settings: PlaybackSettings,
    ) -> Result<Self, SessionError> {
        let info = source.info();
        if !info.is_playable() {
            source.release();
            surface.release();
            return Err(SessionError::EmptyVideo {
                frame_count: info.frame_count,
                fps: info.fps,
            });
        }

        info!(
            frames = info.frame_count,
            fps = info.fps,
            width = info.width,
            height = info.height,
            "opened annotation session"
        );
        let indicator_length = surface.indicator_length(&info);
        let playback = PlaybackStateMachine::new(catalog, info, settings, indicator_length);

        Ok(Self {
            source,
            surface,
            playback,
            controls,
            last_frame: None,
        })
    }

    pub fn playback(&self) -> &PlaybackStateMachine {
        &self.playback
    }

    /// Runs the session to completion.
    ///
    /// Returns the encoded annotation log if the operator chose to save, `None` if they
    /// discarded it, and an error if the display was lost (nothing is saved then).
    pub fn run(mut self) -> Result<Option<AnnotationLog>, SessionError> {
        let result = self.drive();
        if let Err(err) = &result {
            error!(%err, "session aborted, annotations discarded");
            self.playback.conclude(false);
        }
        self.source.release();
        self.surface.release();
        result
    }

    fn drive(&mut self) -> Result<Option<AnnotationLog>, SessionError> {
        while self.playback.state() != PlaybackState::AwaitingSaveDecision {
            // --- 1. Advance ---
            let outcome = self.playback.tick(&mut self.source);
            if let Some(frame) = outcome.frame {
                self.last_frame = Some(frame.pixels);
            }
            if self.playback.state() == PlaybackState::AwaitingSaveDecision {
                break;
            }

            // --- 2. Render ---
            self.surface.render(self.last_frame.as_ref(), &self.playback.status())?;

            // --- 3. Wait ---
            let input = self.surface.wait_key(self.playback.wait_policy())?;

            // --- 4. Dispatch ---
            if let Some(event) = classify(input, &self.controls, self.playback.catalog()) {
                self.playback.apply(event);
            }
        }

        // --- 5. Save decision ---
        self.surface
            .prompt_save(self.last_frame.as_ref(), &self.playback.status(), self.controls.save)?;
        let decision = self.surface.wait_key(WaitPolicy::Indefinite)?;
        Ok(self.playback.conclude(decision == KeyInput::Key(self.controls.save)))
    }
}
