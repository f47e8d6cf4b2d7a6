// THEORY:
// `FrameSource` is the seam between the annotation engine and whatever decodes the
// video. The engine only needs four things from it: how long the video is, how fast
// it plays, the next frame in order, and a way to jump. Pixels are opaque to the
// engine; they are handed back to the renderer untouched, so the frame type is an
// associated type chosen by the backend.
//
// Decode calls are strictly sequential. There is no concurrent seek and no
// out-of-order request.

use crate::error::DecodeError;

/// Static properties of an opened video.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub frame_count: usize,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

impl VideoInfo {
    /// A video the engine can annotate: at least one frame and a usable rate.
    pub fn is_playable(&self) -> bool {
        self.frame_count > 0 && self.fps.is_finite() && self.fps > 0.0
    }

    pub fn frame_to_time_ms(&self, frame: usize) -> f64 {
        frame_to_time_ms(self.fps, frame)
    }

    /// Total duration, i.e. the start time of the frame after the last one.
    pub fn duration_ms(&self) -> f64 {
        self.frame_to_time_ms(self.frame_count)
    }
}

/// Presentation time of `frame` at a constant `fps`.
pub fn frame_to_time_ms(fps: f64, frame: usize) -> f64 {
    1000.0 * frame as f64 / fps
}

/// One decoded frame and where it sits in the video.
#[derive(Debug, Clone)]
pub struct DecodedFrame<P> {
    pub pixels: P,
    pub timestamp_ms: f64,
    pub index: usize,
}

pub trait FrameSource {
    /// Backend-specific pixel container.
    type Frame;

    fn info(&self) -> VideoInfo;

    /// Decodes the frame at the current position and advances past it.
    /// `Ok(None)` marks the end of the stream.
    fn read_next(&mut self) -> Result<Option<DecodedFrame<Self::Frame>>, DecodeError>;

    /// Positions the stream so that the next `read_next` yields `frame`.
    fn seek(&mut self, frame: usize) -> Result<(), DecodeError>;

    /// Releases the underlying decoder. Called exactly once when a session terminates.
    fn release(&mut self) {}
}


#[cfg(test)]
mod tests {
    use super::testing::SyntheticSource;
    use super::*;

    #[test]
    fn frame_times_follow_the_frame_rate() {
        assert_eq!(frame_to_time_ms(10.0, 0), 0.0);
        assert_eq!(frame_to_time_ms(10.0, 3), 300.0);
        assert_eq!(frame_to_time_ms(25.0, 50), 2000.0);
    }

    #[test]
    fn playability_requires_frames_and_rate() {
        let mut info = SyntheticSource::new(10, 10.0).info();
        assert!(info.is_playable());
        assert_eq!(info.duration_ms(), 1000.0);

        info.frame_count = 0;
        assert!(!info.is_playable());

        info.frame_count = 10;
        info.fps = 0.0;
        assert!(!info.is_playable());
    }

    #[test]
    fn synthetic_source_reads_in_order_and_seeks() {
        let mut source = SyntheticSource::new(3, 10.0);
        let first = source.read_next().expect("readable").expect("frame");
        assert_eq!((first.index, first.timestamp_ms), (0, 0.0));

        source.seek(2).expect("in range");
        assert_eq!(source.read_next().expect("readable").map(|f| f.index), Some(2));
        assert!(source.read_next().expect("readable").is_none());
        assert!(source.seek(3).is_err());
    }
}
