// THEORY:
// This file is the main entry point for the `behavior_annotator` library crate.
// It exposes the `Session` (the owned annotation pass) together with the types a
// driver needs to build one: the `ActionCatalog` and its configuration, the
// `FrameSource` and `Surface` seams a toolkit implements, and the `AnnotationLog`
// a finished session produces.
//
// The crate never links a video or windowing toolkit. Decoding and display live
// behind the two traits so the whole engine runs, and is tested, against
// in-memory doubles.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod log_file;
pub mod session;

pub use config::AnnotatorConfig;
pub use core_modules::action_catalog::{ActionCatalog, Behavior, BehaviorDescriptor, Colour, LegendEntry};
pub use core_modules::frame_source::{DecodedFrame, FrameSource, VideoInfo};
pub use core_modules::input_event::{ControlKeys, KeyInput};
pub use core_modules::playback::{PlaybackSettings, PlaybackState, StatusOverlay, WaitPolicy};
pub use core_modules::segment_encoder::{AnnotationLog, Segment, SegmentTag, TimedBehavior};
pub use session::{Session, Surface};
