use behavior_annotator::error::DecodeError;
use behavior_annotator::{DecodedFrame, FrameSource, VideoInfo};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture},
};
use std::path::Path;
use tracing::{debug, warn};

/// A `FrameSource` over an OpenCV `VideoCapture`. Frames stay in OpenCV's BGR layout.
pub struct OpenCvSource {
    capture: VideoCapture,
    info: VideoInfo,
    released: bool,
}

impl OpenCvSource {
    pub fn open(path: &Path) -> Result<Self, DecodeError> {
        let location = path
            .to_str()
            .ok_or_else(|| DecodeError::backend(format!("video path {} is not valid UTF-8", path.display())))?;
        let capture = VideoCapture::from_file(location, videoio::CAP_ANY).map_err(backend)?;
        if !capture.is_opened().map_err(backend)? {
            return Err(DecodeError::backend(format!("could not open {}", path.display())));
        }

        let property = |id: i32| capture.get(id).map_err(backend);
        let info = VideoInfo {
            frame_count: property(videoio::CAP_PROP_FRAME_COUNT)?.max(0.0) as usize,
            fps: property(videoio::CAP_PROP_FPS)?,
            width: property(videoio::CAP_PROP_FRAME_WIDTH)?.max(0.0) as u32,
            height: property(videoio::CAP_PROP_FRAME_HEIGHT)?.max(0.0) as u32,
        };
        debug!(path = %path.display(), ?info, "video opened");

        Ok(Self {
            capture,
            info,
            released: false,
        })
    }
}

impl FrameSource for OpenCvSource {
    type Frame = Mat;

    fn info(&self) -> VideoInfo {
        self.info
    }

    fn read_next(&mut self) -> Result<Option<DecodedFrame<Mat>>, DecodeError> {
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame).map_err(backend)? || frame.empty() {
            return Ok(None);
        }

        // The capture position is one past the frame just decoded.
        let position = self.capture.get(videoio::CAP_PROP_POS_FRAMES).map_err(backend)?;
        let timestamp_ms = self.capture.get(videoio::CAP_PROP_POS_MSEC).map_err(backend)?;
        Ok(Some(DecodedFrame {
            pixels: frame,
            timestamp_ms,
            index: (position - 1.0).max(0.0) as usize,
        }))
    }

    fn seek(&mut self, frame: usize) -> Result<(), DecodeError> {
        if frame >= self.info.frame_count {
            return Err(DecodeError::SeekOutOfRange {
                requested: frame,
                frame_count: self.info.frame_count,
            });
        }
        let accepted = self
            .capture
            .set(videoio::CAP_PROP_POS_FRAMES, frame as f64)
            .map_err(backend)?;
        if !accepted {
            return Err(DecodeError::backend(format!("backend refused to seek to frame {frame}")));
        }
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(error) = self.capture.release() {
            warn!(%error, "failed to release video capture");
        }
    }
}

fn backend(error: opencv::Error) -> DecodeError {
    DecodeError::backend(error.to_string())
}
